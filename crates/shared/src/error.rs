use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Container,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => f.write_str("container"),
            Self::Item => f.write_str("item"),
        }
    }
}

/// Board mutations that reference state this peer does not have.
///
/// Both variants are expected during concurrent editing (a remote delete can
/// race a local edit) and are never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("container {id} already exists")]
    ContainerExists { id: String },
}

impl BoardError {
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Container,
            id: id.into(),
        }
    }

    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Item,
            id: id.into(),
        }
    }
}
