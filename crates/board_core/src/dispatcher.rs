//! Routes replicated events between the engines and the channel.
//!
//! Local mutations arm a one-shot [`EventEnvelope`] which the session drains
//! exactly once per change. Remote events are applied by partition, each
//! guarded by an equality check so re-delivery is a no-op.

use channel::ChannelMessage;
use shared::protocol::{EventPartition, RoomEvent};
use tracing::debug;

use crate::{board::BoardEngine, timer::TimerEngine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventEnvelope {
    #[default]
    Idle,
    Ready(RoomEvent),
}

impl EventEnvelope {
    /// Arms the envelope. A still-armed event is replaced: every payload
    /// carries full replacement values, so the newest one subsumes it.
    pub fn arm(&mut self, event: RoomEvent) {
        *self = Self::Ready(event);
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn take_ready(&mut self) -> Option<RoomEvent> {
        match std::mem::take(self) {
            Self::Ready(event) => Some(event),
            Self::Idle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Board,
    Timer,
    Unchanged,
}

/// Applies one inbound event to whichever engine its partition addresses.
pub fn apply_remote(
    board: &mut BoardEngine,
    timer: &mut TimerEngine,
    event: RoomEvent,
) -> Applied {
    let name = event.name();
    let changed = match event {
        RoomEvent::AddContainer(snapshot)
        | RoomEvent::RemoveContainer(snapshot)
        | RoomEvent::NewUserJoined(snapshot) => board.replace_board(snapshot.into()),
        RoomEvent::MoveItemsWithinContainer(payload)
        | RoomEvent::MoveItemsOverContainer(payload)
        | RoomEvent::EditContainerMetadata(payload)
        | RoomEvent::RemoveItem(payload)
        | RoomEvent::EditItem(payload)
        | RoomEvent::AddItem(payload) => board.replace_items(payload.items),
        RoomEvent::MoveContainer(payload) => board.replace_containers(payload.containers),
        RoomEvent::PlayTimer(payload)
        | RoomEvent::PauseTimer(payload)
        | RoomEvent::StopTimer(payload) => {
            return if timer.apply_remote(payload) {
                Applied::Timer
            } else {
                Applied::Unchanged
            };
        }
    };
    debug!(event = name, changed, "sync: applied remote event");
    if changed {
        Applied::Board
    } else {
        Applied::Unchanged
    }
}

/// Decodes a channel message; unknown names yield `None`.
pub fn decode_message(message: &ChannelMessage) -> Option<RoomEvent> {
    EventPartition::of_name(&message.name)?;
    match RoomEvent::from_wire(&message.name, message.data.clone()) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(name = %message.name, %err, "sync: dropping undecodable event");
            None
        }
    }
}

/// Picks the events that rebuild current state from a newest-first history
/// page, returned oldest-first ready to apply.
///
/// The newest board-shape event is the base. Newer container-order and card
/// events refine it; older ones are already folded into it. The newest timer
/// event is independent of the board.
pub fn replay_plan(history: &[RoomEvent]) -> Vec<RoomEvent> {
    let newest = |partition: EventPartition| {
        history
            .iter()
            .position(|event| event.partition() == partition)
    };

    let board_shape = newest(EventPartition::BoardShape);
    let newer_than_base = |index: &usize| board_shape.map_or(true, |base| *index < base);
    let container_order = newest(EventPartition::ContainerOrder).filter(newer_than_base);
    let card = newest(EventPartition::Card).filter(newer_than_base);
    let timer = newest(EventPartition::Timer);

    let mut picked: Vec<usize> = [board_shape, container_order, card, timer]
        .into_iter()
        .flatten()
        .collect();
    // Larger index means older in a newest-first page.
    picked.sort_unstable_by(|a, b| b.cmp(a));
    picked.into_iter().map(|index| history[index].clone()).collect()
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
