//! Contract the board core needs from the external pub/sub service: publish,
//! subscribe, history and presence on one topic per room.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{ClientId, RoomId};
use thiserror::Error;
use tokio::sync::broadcast;

mod local;

pub use local::{LocalConnection, LocalHub};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn room(room_id: &RoomId) -> Self {
        Self(format!("room:{room_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub name: String,
    pub data: serde_json::Value,
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceData {
    #[serde(rename = "isLeader")]
    pub is_leader: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMember {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    pub data: PresenceData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    Enter,
    Leave,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub action: PresenceAction,
    pub member: PresenceMember,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel connection closed")]
    Closed,
    #[error("channel operation timed out")]
    Timeout,
    #[error("channel rejected operation: {0}")]
    Rejected(String),
    #[error("invalid channel payload: {0}")]
    Codec(#[from] serde_json::Error),
}

/// One connected peer's view of the messaging service.
///
/// Implementations stamp outgoing messages with [`ChannelGateway::client_id`]
/// and deliver a peer's own messages back to its subscriptions.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    fn client_id(&self) -> &ClientId;
    async fn publish(
        &self,
        topic: &Topic,
        name: &str,
        data: serde_json::Value,
    ) -> Result<(), ChannelError>;
    async fn subscribe(
        &self,
        topic: &Topic,
    ) -> Result<broadcast::Receiver<ChannelMessage>, ChannelError>;
    /// Retained messages, newest first.
    async fn history(&self, topic: &Topic) -> Result<Vec<ChannelMessage>, ChannelError>;
    async fn presence_get(&self, topic: &Topic) -> Result<Vec<PresenceMember>, ChannelError>;
    async fn presence_enter(&self, topic: &Topic, data: PresenceData) -> Result<(), ChannelError>;
    async fn presence_update(&self, topic: &Topic, data: PresenceData)
        -> Result<(), ChannelError>;
    async fn presence_leave(&self, topic: &Topic) -> Result<(), ChannelError>;
    async fn presence_subscribe(
        &self,
        topic: &Topic,
    ) -> Result<broadcast::Receiver<PresenceEvent>, ChannelError>;
}

#[cfg(test)]
#[path = "tests/local_tests.rs"]
mod tests;
