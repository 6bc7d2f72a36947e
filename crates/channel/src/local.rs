use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use shared::domain::ClientId;
use tokio::{
    sync::{broadcast, Mutex},
    time,
};
use tracing::debug;

use crate::{
    ChannelError, ChannelGateway, ChannelMessage, PresenceAction, PresenceData, PresenceEvent,
    PresenceMember, Topic,
};

const TOPIC_BROADCAST_CAPACITY: usize = 1024;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

struct TopicState {
    messages: broadcast::Sender<ChannelMessage>,
    presence_events: broadcast::Sender<PresenceEvent>,
    history: VecDeque<ChannelMessage>,
    members: Vec<PresenceMember>,
}

impl TopicState {
    fn new() -> Self {
        let (messages, _) = broadcast::channel(TOPIC_BROADCAST_CAPACITY);
        let (presence_events, _) = broadcast::channel(TOPIC_BROADCAST_CAPACITY);
        Self {
            messages,
            presence_events,
            history: VecDeque::new(),
            members: Vec::new(),
        }
    }
}

/// Process-local stand-in for the hosted pub/sub service.
///
/// Retains the last `history_limit` messages per topic and tracks presence
/// members in enter order.
pub struct LocalHub {
    history_limit: usize,
    topics: Mutex<HashMap<Topic, TopicState>>,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            history_limit,
            topics: Mutex::new(HashMap::new()),
        })
    }

    pub fn connect(self: &Arc<Self>, client_id: ClientId) -> LocalConnection {
        LocalConnection {
            hub: Arc::clone(self),
            client_id,
            op_timeout: DEFAULT_OP_TIMEOUT,
            offline: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
        }
    }

    pub async fn members(&self, topic: &Topic) -> Vec<PresenceMember> {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|state| state.members.clone())
            .unwrap_or_default()
    }

    async fn publish(&self, topic: &Topic, message: ChannelMessage) {
        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.clone()).or_insert_with(TopicState::new);
        state.history.push_back(message.clone());
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        // No subscribers yet is fine; the message stays in history.
        let _ = state.messages.send(message);
    }

    async fn set_presence(&self, topic: &Topic, action: PresenceAction, member: PresenceMember) {
        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.clone()).or_insert_with(TopicState::new);
        let existing = state
            .members
            .iter()
            .position(|m| m.client_id == member.client_id);
        let event = match (action, existing) {
            (PresenceAction::Leave, Some(index)) => {
                let departed = state.members.remove(index);
                PresenceEvent {
                    action,
                    member: departed,
                }
            }
            (PresenceAction::Leave, None) => return,
            (_, Some(index)) => {
                state.members[index] = member.clone();
                PresenceEvent {
                    action: PresenceAction::Update,
                    member,
                }
            }
            (_, None) => {
                state.members.push(member.clone());
                PresenceEvent {
                    action: PresenceAction::Enter,
                    member,
                }
            }
        };
        debug!(
            topic = %topic,
            client_id = %event.member.client_id,
            action = ?event.action,
            "channel: presence changed"
        );
        let _ = state.presence_events.send(event);
    }
}

pub struct LocalConnection {
    hub: Arc<LocalHub>,
    client_id: ClientId,
    op_timeout: Duration,
    offline: AtomicBool,
    stalled: AtomicBool,
}

impl LocalConnection {
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Simulates a dropped connection: every operation fails with
    /// [`ChannelError::Closed`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulates an unresponsive service: operations hang until the
    /// operation timeout and fail with [`ChannelError::Timeout`].
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    async fn guarded<T>(&self, op: impl Future<Output = T>) -> Result<T, ChannelError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        let stalled = self.stalled.load(Ordering::SeqCst);
        let op = async move {
            if stalled {
                std::future::pending::<()>().await;
            }
            op.await
        };
        time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| ChannelError::Timeout)
    }

    fn member(&self, data: PresenceData) -> PresenceMember {
        PresenceMember {
            client_id: self.client_id.clone(),
            data,
        }
    }
}

#[async_trait]
impl ChannelGateway for LocalConnection {
    fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Event data must be a JSON object and the name must be non-empty,
    /// matching what the hosted service accepts.
    async fn publish(
        &self,
        topic: &Topic,
        name: &str,
        data: serde_json::Value,
    ) -> Result<(), ChannelError> {
        if name.trim().is_empty() {
            return Err(ChannelError::Rejected("event name is empty".into()));
        }
        let data = serde_json::Value::Object(serde_json::from_value(data)?);
        let message = ChannelMessage {
            name: name.to_string(),
            data,
            client_id: self.client_id.clone(),
            timestamp: Utc::now(),
        };
        self.guarded(self.hub.publish(topic, message)).await
    }

    async fn subscribe(
        &self,
        topic: &Topic,
    ) -> Result<broadcast::Receiver<ChannelMessage>, ChannelError> {
        self.guarded(async {
            let mut topics = self.hub.topics.lock().await;
            let state = topics.entry(topic.clone()).or_insert_with(TopicState::new);
            state.messages.subscribe()
        })
        .await
    }

    async fn history(&self, topic: &Topic) -> Result<Vec<ChannelMessage>, ChannelError> {
        self.guarded(async {
            let topics = self.hub.topics.lock().await;
            topics
                .get(topic)
                .map(|state| state.history.iter().rev().cloned().collect())
                .unwrap_or_default()
        })
        .await
    }

    async fn presence_get(&self, topic: &Topic) -> Result<Vec<PresenceMember>, ChannelError> {
        self.guarded(self.hub.members(topic)).await
    }

    async fn presence_enter(&self, topic: &Topic, data: PresenceData) -> Result<(), ChannelError> {
        self.guarded(
            self.hub
                .set_presence(topic, PresenceAction::Enter, self.member(data)),
        )
        .await
    }

    async fn presence_update(
        &self,
        topic: &Topic,
        data: PresenceData,
    ) -> Result<(), ChannelError> {
        self.guarded(
            self.hub
                .set_presence(topic, PresenceAction::Update, self.member(data)),
        )
        .await
    }

    async fn presence_leave(&self, topic: &Topic) -> Result<(), ChannelError> {
        self.guarded(self.hub.set_presence(
            topic,
            PresenceAction::Leave,
            self.member(PresenceData::default()),
        ))
        .await
    }

    async fn presence_subscribe(
        &self,
        topic: &Topic,
    ) -> Result<broadcast::Receiver<PresenceEvent>, ChannelError> {
        self.guarded(async {
            let mut topics = self.hub.topics.lock().await;
            let state = topics.entry(topic.clone()).or_insert_with(TopicState::new);
            state.presence_events.subscribe()
        })
        .await
    }
}
