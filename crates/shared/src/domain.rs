use std::{borrow::Borrow, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(RoomId);
id_newtype!(ClientId);
id_newtype!(ContainerId);
id_newtype!(ItemId);

const SHORT_ID_LEN: usize = 10;

/// Random short id for new rooms, peers, containers and items.
pub fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

impl ContainerId {
    pub fn generate() -> Self {
        Self(short_id())
    }
}

impl ItemId {
    pub fn generate() -> Self {
        Self(short_id())
    }
}

impl ClientId {
    pub fn generate() -> Self {
        Self(short_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub payload: ItemPayload,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: ItemPayload {
                description: description.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    pub id: ContainerId,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub metadata: ContainerMetadata,
    pub data: Vec<Item>,
}

impl Container {
    pub fn new(
        id: impl Into<ContainerId>,
        label: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ContainerMetadata {
                id: id.into(),
                label: label.into(),
                color: color.into(),
            },
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.metadata.id
    }

    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.data.iter().position(|item| item.id.as_str() == item_id)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.position_of(item_id).is_some()
    }
}

pub type ContainerMap = BTreeMap<ContainerId, Container>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub containers: Vec<ContainerId>,
    pub items: ContainerMap,
}

impl BoardState {
    pub fn empty() -> Self {
        Self {
            containers: Vec::new(),
            items: BTreeMap::new(),
        }
    }

    pub fn is_container(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Every ordered id has an entry and vice versa, and no item id appears twice.
    pub fn is_consistent(&self) -> bool {
        if self.containers.len() != self.items.len()
            || !self.containers.iter().all(|id| self.items.contains_key(id.as_str()))
        {
            return false;
        }
        let mut seen = std::collections::HashSet::new();
        self.items
            .values()
            .flat_map(|container| container.data.iter())
            .all(|item| seen.insert(item.id.as_str()))
    }
}

impl Default for BoardState {
    fn default() -> Self {
        let defaults = [
            Container::new("Like", "Like", "skyblue"),
            Container::new("Love", "Love", "rose"),
            Container::new("Lacked", "Lacked", "yellow"),
        ];
        Self {
            containers: defaults.iter().map(|c| c.id().clone()).collect(),
            items: defaults
                .into_iter()
                .map(|c| (c.id().clone(), c))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    #[default]
    Paused,
    Play,
    Stopped,
}

pub const DEFAULT_TIMER_SECONDS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub seconds: u32,
    pub state: TimerPhase,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            seconds: DEFAULT_TIMER_SECONDS,
            state: TimerPhase::Paused,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    #[serde(rename = "isLeader")]
    pub is_leader: bool,
}
