//! One peer's membership in a room.
//!
//! [`SessionCore`] owns the engines and reacts to commands, channel messages,
//! presence changes and ticks without doing any I/O. [`RoomSession`] drives
//! it from a single tokio task and carries out the publishes and presence
//! updates it queues.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use channel::{
    ChannelGateway, ChannelMessage, PresenceAction, PresenceData, PresenceEvent, PresenceMember,
    Topic,
};
use serde::Serialize;
use shared::{
    domain::{BoardState, ClientId, PresenceRecord, RoomId, TimerState},
    error::BoardError,
    protocol::{BoardSnapshot, EventPartition, RoomEvent},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    board::{BoardAction, BoardEngine},
    collision::{CollisionArgs, CollisionDetector, Rect},
    config::SessionConfig,
    dispatcher::{apply_remote, decode_message, replay_plan, Applied},
    drag::{DragOver, DragTarget},
    presence::{should_claim_leadership, PresenceEffect, PresenceRoster},
    timer::{TimerEngine, TimerTick},
};

const SESSION_EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum SessionCommand {
    Board(BoardAction),
    DragStart {
        active_id: String,
    },
    DragOver {
        active_id: String,
        over: Option<DragTarget>,
        dragging_rect: Option<Rect>,
    },
    DragEnd {
        active_id: String,
        over: Option<DragTarget>,
    },
    DetectCollision {
        args: CollisionArgs,
        reply: oneshot::Sender<Option<String>>,
    },
    PlayTimer,
    PauseTimer,
    StopTimer,
    SetTimerDuration {
        minutes: u32,
        seconds: u32,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Leave,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    BoardChanged(BoardState),
    TimerChanged(TimerState),
    RosterChanged(Vec<PresenceRecord>),
    CountdownComplete,
    Error(String),
}

/// Point-in-time copy of everything a peer holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub client_id: ClientId,
    pub board: BoardState,
    pub timer: TimerState,
    pub roster: Vec<PresenceRecord>,
    pub is_leader: bool,
    pub active_drag: Option<String>,
}

/// I/O the core wants performed on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Publish(RoomEvent),
    ClaimLeadership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Leave,
}

pub struct SessionCore {
    local: ClientId,
    config: SessionConfig,
    board: BoardEngine,
    timer: TimerEngine,
    roster: PresenceRoster,
    collision: CollisionDetector,
    awaiting_snapshot: bool,
    outbox: Vec<Outbound>,
    events: Vec<SessionEvent>,
}

impl SessionCore {
    pub fn new(local: ClientId, config: SessionConfig) -> Self {
        Self {
            roster: PresenceRoster::new(local.clone()),
            timer: TimerEngine::new(config.initial_timer_seconds),
            board: BoardEngine::default(),
            collision: CollisionDetector::new(),
            awaiting_snapshot: false,
            outbox: Vec::new(),
            events: Vec::new(),
            local,
            config,
        }
    }

    pub fn board(&self) -> &BoardEngine {
        &self.board
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn roster(&self) -> &PresenceRoster {
        &self.roster
    }

    pub fn awaiting_snapshot(&self) -> bool {
        self.awaiting_snapshot
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            client_id: self.local.clone(),
            board: self.board.state().clone(),
            timer: self.timer.state(),
            roster: self.roster.members().to_vec(),
            is_leader: self.roster.is_local_leader(),
            active_drag: self.board.active_drag().map(|drag| drag.id().to_string()),
        }
    }

    /// Rebuilds state from history and decides leadership from the current
    /// presence set. Returns the presence data to enter with.
    pub fn join(
        &mut self,
        history: &[ChannelMessage],
        members: &[PresenceMember],
    ) -> PresenceData {
        self.replay_history(history);
        self.roster.load(members);
        let is_leader = should_claim_leadership(members);
        if is_leader {
            self.roster.mark_local_leader();
        }
        self.awaiting_snapshot = !is_leader;
        self.events
            .push(SessionEvent::RosterChanged(self.roster.members().to_vec()));
        PresenceData { is_leader }
    }

    /// Applies the newest relevant history events on join.
    pub fn replay_history(&mut self, history: &[ChannelMessage]) {
        self.replay_filtered(history, |_| true);
    }

    /// The countdown has been ticking locally since join, so the fallback
    /// replays the board partitions only.
    pub fn snapshot_deadline_elapsed(&mut self, history: &[ChannelMessage]) {
        if !self.awaiting_snapshot {
            return;
        }
        warn!(client_id = %self.local, "sync: no leader snapshot, falling back to history");
        self.awaiting_snapshot = false;
        self.replay_filtered(history, |event| {
            event.partition() != EventPartition::Timer
        });
    }

    fn replay_filtered(&mut self, history: &[ChannelMessage], keep: impl Fn(&RoomEvent) -> bool) {
        let decoded: Vec<RoomEvent> = history
            .iter()
            .take(self.config.history_limit)
            .filter_map(decode_message)
            .filter(|event| keep(event))
            .collect();
        let plan = replay_plan(&decoded);
        debug!(
            retained = history.len(),
            replayed = plan.len(),
            "sync: replaying history"
        );
        for event in plan {
            self.apply_inbound(event);
        }
    }

    pub fn handle_command(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Board(action) => {
                if let Err(err) = self.board.apply(&action) {
                    self.swallow(err);
                }
            }
            SessionCommand::DragStart { active_id } => {
                self.collision.reset();
                self.board.on_drag_start(&active_id);
            }
            SessionCommand::DragOver {
                active_id,
                over,
                dragging_rect,
            } => {
                let outcome = self.board.on_drag_over(
                    &active_id,
                    over.as_ref(),
                    dragging_rect.as_ref(),
                );
                if matches!(outcome, DragOver::ItemMoved(_)) {
                    self.collision.note_moved_to_new_container();
                }
            }
            SessionCommand::DragEnd { active_id, over } => {
                self.board.on_drag_end(&active_id, over.as_ref());
                self.collision.reset();
            }
            SessionCommand::DetectCollision { args, reply } => {
                let over = self.collision.detect(
                    self.board.state(),
                    self.board.active_drag(),
                    &args,
                );
                let _ = reply.send(over);
            }
            SessionCommand::PlayTimer => self.timer.play(),
            SessionCommand::PauseTimer => self.timer.pause(),
            SessionCommand::StopTimer => self.timer.stop(),
            SessionCommand::SetTimerDuration { minutes, seconds } => {
                if self.timer.set_duration(minutes, seconds) {
                    self.events
                        .push(SessionEvent::TimerChanged(self.timer.state()));
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Leave => return Flow::Leave,
        }
        self.collect_local();
        Flow::Continue
    }

    pub fn handle_message(&mut self, message: &ChannelMessage) {
        if self.config.ignore_self_echo && message.client_id == self.local {
            return;
        }
        let Some(event) = decode_message(message) else {
            debug!(name = %message.name, "sync: ignoring unknown event");
            return;
        };
        if matches!(event, RoomEvent::NewUserJoined(_)) {
            self.awaiting_snapshot = false;
        }
        self.apply_inbound(event);
    }

    pub fn handle_presence(&mut self, event: &PresenceEvent) {
        let effects = match event.action {
            PresenceAction::Enter => self.roster.on_enter(&event.member),
            PresenceAction::Update => {
                self.roster.on_update(&event.member);
                Vec::new()
            }
            PresenceAction::Leave => self.roster.on_leave(&event.member),
        };
        for effect in effects {
            match effect {
                PresenceEffect::BroadcastSnapshot { newcomer } => {
                    info!(%newcomer, "presence: sending board to newcomer");
                    let snapshot = BoardSnapshot::from(self.board.state().clone());
                    self.outbox
                        .push(Outbound::Publish(RoomEvent::NewUserJoined(snapshot)));
                }
                PresenceEffect::ClaimLeadership => self.outbox.push(Outbound::ClaimLeadership),
            }
        }
        self.events
            .push(SessionEvent::RosterChanged(self.roster.members().to_vec()));
    }

    pub fn on_tick(&mut self) {
        match self.timer.tick() {
            TimerTick::Idle => {}
            TimerTick::Counted => self
                .events
                .push(SessionEvent::TimerChanged(self.timer.state())),
            TimerTick::Completed => {
                self.events
                    .push(SessionEvent::TimerChanged(self.timer.state()));
                self.events.push(SessionEvent::CountdownComplete);
            }
        }
    }

    pub fn report_error(&mut self, message: String) {
        self.events.push(SessionEvent::Error(message));
    }

    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn apply_inbound(&mut self, event: RoomEvent) {
        match apply_remote(&mut self.board, &mut self.timer, event) {
            Applied::Board => self
                .events
                .push(SessionEvent::BoardChanged(self.board.state().clone())),
            Applied::Timer => self
                .events
                .push(SessionEvent::TimerChanged(self.timer.state())),
            Applied::Unchanged => {}
        }
    }

    /// Moves armed envelopes into the outbox, each exactly once.
    fn collect_local(&mut self) {
        if let Some(event) = self.board.take_outbound() {
            self.outbox.push(Outbound::Publish(event));
            self.events
                .push(SessionEvent::BoardChanged(self.board.state().clone()));
        }
        if let Some(event) = self.timer.take_outbound() {
            self.outbox.push(Outbound::Publish(event));
            self.events
                .push(SessionEvent::TimerChanged(self.timer.state()));
        }
    }

    fn swallow(&self, err: BoardError) {
        debug!(client_id = %self.local, %err, "board: action rejected");
    }
}

/// Cloneable front door to a running [`RoomSession`].
#[derive(Clone)]
pub struct SessionHandle {
    client_id: ClientId,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("session {} has stopped", self.client_id))
    }

    pub async fn apply(&self, action: BoardAction) -> Result<()> {
        self.send(SessionCommand::Board(action)).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.context("session dropped snapshot request")
    }

    pub async fn detect_collision(&self, args: CollisionArgs) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::DetectCollision { args, reply }).await?;
        rx.await.context("session dropped collision request")
    }
}

pub struct RoomSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl RoomSession {
    /// Joins the room and starts the session task.
    pub async fn spawn<G>(gateway: Arc<G>, room_id: RoomId, config: SessionConfig) -> Result<Self>
    where
        G: ChannelGateway + ?Sized + 'static,
    {
        config.validate().context("invalid session config")?;
        let topic = Topic::room(&room_id);
        let client_id = gateway.client_id().clone();

        let messages = gateway
            .subscribe(&topic)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
        let presence = gateway
            .presence_subscribe(&topic)
            .await
            .with_context(|| format!("failed to subscribe to presence on {topic}"))?;
        let history = gateway
            .history(&topic)
            .await
            .with_context(|| format!("failed to read history of {topic}"))?;
        let members = gateway
            .presence_get(&topic)
            .await
            .with_context(|| format!("failed to read presence of {topic}"))?;

        let mut core = SessionCore::new(client_id.clone(), config.clone());
        let data = core.join(&history, &members);
        gateway
            .presence_enter(&topic, data)
            .await
            .with_context(|| format!("failed to enter presence on {topic}"))?;
        info!(
            room = %room_id,
            client_id = %client_id,
            leader = data.is_leader,
            members = members.len(),
            "sync: joined room"
        );

        let (command_tx, command_rx) = mpsc::channel(config.mailbox_capacity);
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let handle = SessionHandle {
            client_id,
            commands: command_tx,
            events: events.clone(),
        };
        let task = tokio::spawn(run_loop(
            gateway,
            topic,
            config,
            core,
            Channels {
                commands: command_rx,
                messages,
                presence,
                events,
            },
        ));
        Ok(Self { handle, task })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Leaves presence and waits for the task to finish.
    pub async fn leave(self) -> Result<()> {
        self.handle.send(SessionCommand::Leave).await?;
        self.task.await.context("session task panicked")
    }
}

struct Channels {
    commands: mpsc::Receiver<SessionCommand>,
    messages: broadcast::Receiver<ChannelMessage>,
    presence: broadcast::Receiver<PresenceEvent>,
    events: broadcast::Sender<SessionEvent>,
}

async fn run_loop<G>(
    gateway: Arc<G>,
    topic: Topic,
    config: SessionConfig,
    mut core: SessionCore,
    mut channels: Channels,
) where
    G: ChannelGateway + ?Sized,
{
    let mut ticker = time::interval_at(
        Instant::now() + config.tick_interval,
        config.tick_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = time::sleep(config.snapshot_timeout);
    tokio::pin!(deadline);
    let mut deadline_armed = core.awaiting_snapshot();

    flush(gateway.as_ref(), &topic, &mut core, &channels.events).await;

    loop {
        tokio::select! {
            command = channels.commands.recv() => {
                let Some(command) = command else {
                    debug!(topic = %topic, "sync: all handles dropped");
                    break;
                };
                if core.handle_command(command) == Flow::Leave {
                    break;
                }
            }
            message = channels.messages.recv() => match message {
                Ok(message) => core.handle_message(&message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "sync: message receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(topic = %topic, "sync: message stream closed");
                    break;
                }
            },
            event = channels.presence.recv() => match event {
                Ok(event) => core.handle_presence(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "presence: event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(topic = %topic, "presence: event stream closed");
                    break;
                }
            },
            _ = ticker.tick() => core.on_tick(),
            _ = &mut deadline, if deadline_armed => {
                deadline_armed = false;
                if core.awaiting_snapshot() {
                    match gateway.history(&topic).await {
                        Ok(history) => core.snapshot_deadline_elapsed(&history),
                        Err(err) => {
                            warn!(topic = %topic, %err, "sync: history fallback failed");
                            core.report_error(format!("history fallback failed: {err}"));
                        }
                    }
                }
            }
        }
        flush(gateway.as_ref(), &topic, &mut core, &channels.events).await;
    }

    if let Err(err) = gateway.presence_leave(&topic).await {
        warn!(topic = %topic, %err, "presence: leave failed");
    }
    info!(topic = %topic, client_id = %gateway.client_id(), "sync: left room");
}

async fn flush<G>(
    gateway: &G,
    topic: &Topic,
    core: &mut SessionCore,
    events: &broadcast::Sender<SessionEvent>,
) where
    G: ChannelGateway + ?Sized,
{
    for outbound in core.drain_outbox() {
        let result = match outbound {
            Outbound::Publish(event) => match event.to_wire() {
                Ok((name, data)) => gateway
                    .publish(topic, &name, data)
                    .await
                    .map_err(|err| format!("failed to publish {name}: {err}")),
                Err(err) => Err(format!("failed to encode {}: {err}", event.name())),
            },
            Outbound::ClaimLeadership => {
                info!(topic = %topic, "presence: claiming leadership");
                gateway
                    .presence_update(topic, PresenceData { is_leader: true })
                    .await
                    .map_err(|err| format!("failed to claim leadership: {err}"))
            }
        };
        if let Err(message) = result {
            warn!(topic = %topic, "sync: {message}");
            core.report_error(message);
        }
    }
    for event in core.drain_events() {
        // No subscribers is fine.
        let _ = events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
