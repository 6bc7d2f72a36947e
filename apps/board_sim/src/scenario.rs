use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use board_core::{
    drag::DragTarget, BoardAction, RoomSession, SessionCommand, SessionConfig, SessionHandle,
    SessionSnapshot,
};
use channel::LocalHub;
use clap::ValueEnum;
use futures::future::{join_all, try_join_all};
use shared::domain::{ClientId, Container, ContainerId, Item, ItemId, RoomId};
use tracing::info;

const QUIESCE_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Concurrent edits from every peer.
    Basic,
    /// Basic, then the leader leaves and a late peer joins.
    LeaderHandoff,
}

pub struct Room {
    hub: Arc<LocalHub>,
    room_id: RoomId,
    config: SessionConfig,
    sessions: Vec<RoomSession>,
}

impl Room {
    pub fn new(hub: Arc<LocalHub>, room_id: RoomId, config: SessionConfig) -> Self {
        Self {
            hub,
            room_id,
            config,
            sessions: Vec::new(),
        }
    }

    /// Joins one at a time so the first peer becomes leader.
    pub async fn join(&mut self, client_id: ClientId) -> Result<()> {
        let connection = Arc::new(self.hub.connect(client_id.clone()));
        let session = RoomSession::spawn(connection, self.room_id.clone(), self.config.clone())
            .await
            .with_context(|| format!("{client_id} failed to join"))?;
        self.sessions.push(session);
        Ok(())
    }

    pub fn handle(&self, index: usize) -> Result<SessionHandle> {
        self.sessions
            .get(index)
            .map(RoomSession::handle)
            .with_context(|| format!("no peer at index {index}"))
    }

    pub async fn leave(&mut self, index: usize) -> Result<()> {
        if index >= self.sessions.len() {
            bail!("no peer at index {index}");
        }
        self.sessions.remove(index).leave().await
    }

    pub async fn snapshots(&self) -> Result<Vec<SessionSnapshot>> {
        try_join_all(self.sessions.iter().map(|session| {
            let handle = session.handle();
            async move { handle.snapshot().await }
        }))
        .await
    }

    /// Polls until every peer holds the same board and timer, or gives up
    /// after a few seconds and returns the last observation.
    pub async fn quiesce(&self) -> Result<(bool, Vec<SessionSnapshot>)> {
        let deadline = tokio::time::Instant::now() + QUIESCE_TIMEOUT;
        loop {
            let snapshots = self.snapshots().await?;
            let converged = snapshots.windows(2).all(|pair| {
                pair[0].board == pair[1].board && pair[0].timer.state == pair[1].timer.state
            });
            if converged || tokio::time::Instant::now() >= deadline {
                return Ok((converged, snapshots));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn shutdown(self) {
        for result in join_all(self.sessions.into_iter().map(RoomSession::leave)).await {
            if let Err(err) = result {
                tracing::warn!(%err, "sim: peer did not leave cleanly");
            }
        }
    }
}

pub fn peer_id(index: usize) -> ClientId {
    ClientId::new(format!("peer-{index:02}"))
}

pub async fn run(room: &mut Room, scenario: Scenario) -> Result<()> {
    basic(room).await?;
    if scenario == Scenario::LeaderHandoff {
        leader_handoff(room).await?;
    }
    Ok(())
}

async fn basic(room: &Room) -> Result<()> {
    let first = room.handle(0)?;
    first
        .apply(BoardAction::AddContainer(Container::new(
            "Actions", "Actions", "green",
        )))
        .await?;
    wait_everywhere(room, |s| s.board.is_container("Actions")).await?;

    for index in 0..room.sessions.len() {
        let item = Item::new(format!("card-{index}"), format!("note from peer {index}"));
        room.handle(index)?
            .apply(BoardAction::AddItem {
                container_id: ContainerId::new("Like"),
                item,
            })
            .await?;
        let card = format!("card-{index}");
        wait_everywhere(room, |s| {
            s.board
                .items
                .get("Like")
                .is_some_and(|c| c.contains_item(&card))
        })
        .await?;
    }

    let last = room.handle(room.sessions.len() - 1)?;
    last.apply(BoardAction::EditItem {
        container_id: ContainerId::new("Like"),
        item: Item::new("card-0", "note from peer 0, amended"),
    })
    .await?;

    last.send(SessionCommand::DragStart {
        active_id: "card-0".into(),
    })
    .await?;
    last.send(SessionCommand::DragOver {
        active_id: "card-0".into(),
        over: Some(DragTarget::new("Actions")),
        dragging_rect: None,
    })
    .await?;
    last.send(SessionCommand::DragEnd {
        active_id: "card-0".into(),
        over: Some(DragTarget::new("Actions")),
    })
    .await?;

    first.send(SessionCommand::PlayTimer).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    first.send(SessionCommand::PauseTimer).await?;
    info!("sim: basic scenario issued");
    Ok(())
}

async fn leader_handoff(room: &mut Room) -> Result<()> {
    let (converged, _) = room.quiesce().await?;
    if !converged {
        bail!("peers diverged before the handoff");
    }
    room.leave(0).await?;
    info!("sim: first leader left");

    let new_leader = room.handle(0)?;
    new_leader
        .apply(BoardAction::RemoveItem {
            container_id: ContainerId::new("Like"),
            item_id: ItemId::new("card-1"),
        })
        .await?;
    wait_until(&new_leader, |s| s.is_leader).await?;

    let late = peer_id(room.sessions.len() + 10);
    room.join(late).await?;
    info!("sim: late peer joined");
    Ok(())
}

async fn wait_everywhere(room: &Room, check: impl Fn(&SessionSnapshot) -> bool) -> Result<()> {
    for index in 0..room.sessions.len() {
        wait_until(&room.handle(index)?, &check).await?;
    }
    Ok(())
}

async fn wait_until(handle: &SessionHandle, check: impl Fn(&SessionSnapshot) -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + QUIESCE_TIMEOUT;
    loop {
        if check(&handle.snapshot().await?) {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("{} never reached the expected state", handle.client_id());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
