use serde::{Deserialize, Serialize};

use crate::domain::{BoardState, ContainerId, ContainerMap, TimerPhase, TimerState};

/// Full board replacement: both the container order and every container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub items: ContainerMap,
    pub containers: Vec<ContainerId>,
}

impl From<BoardState> for BoardSnapshot {
    fn from(state: BoardState) -> Self {
        Self {
            items: state.items,
            containers: state.containers,
        }
    }
}

impl From<BoardSnapshot> for BoardState {
    fn from(snapshot: BoardSnapshot) -> Self {
        Self {
            containers: snapshot.containers,
            items: snapshot.items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsPayload {
    pub items: ContainerMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainersPayload {
    pub containers: Vec<ContainerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u32>,
    pub state: TimerPhase,
}

impl From<TimerState> for TimerPayload {
    fn from(timer: TimerState) -> Self {
        Self {
            seconds: Some(timer.seconds),
            state: timer.state,
        }
    }
}

/// Which slice of local state an event is allowed to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPartition {
    /// Replaces both the container order and the container contents.
    BoardShape,
    /// Replaces container contents only.
    Card,
    /// Replaces the container order only.
    ContainerOrder,
    Timer,
}

pub const BOARD_SHAPE_EVENTS: &[&str] = &["add_container", "remove_container", "new_user_joined"];
pub const CARD_EVENTS: &[&str] = &[
    "move_items_within_container",
    "move_items_over_container",
    "edit_container_metadata",
    "remove_item",
    "edit_item",
    "add_item",
];
pub const CONTAINER_ORDER_EVENTS: &[&str] = &["move_container"];
pub const TIMER_EVENTS: &[&str] = &["play_timer", "pause_timer", "stop_timer"];

impl EventPartition {
    pub fn of_name(name: &str) -> Option<Self> {
        if BOARD_SHAPE_EVENTS.contains(&name) {
            Some(Self::BoardShape)
        } else if CARD_EVENTS.contains(&name) {
            Some(Self::Card)
        } else if CONTAINER_ORDER_EVENTS.contains(&name) {
            Some(Self::ContainerOrder)
        } else if TIMER_EVENTS.contains(&name) {
            Some(Self::Timer)
        } else {
            None
        }
    }
}

/// Every replicated event. Serializes as `{"name": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    AddContainer(BoardSnapshot),
    RemoveContainer(BoardSnapshot),
    NewUserJoined(BoardSnapshot),
    MoveItemsWithinContainer(ItemsPayload),
    MoveItemsOverContainer(ItemsPayload),
    EditContainerMetadata(ItemsPayload),
    RemoveItem(ItemsPayload),
    EditItem(ItemsPayload),
    AddItem(ItemsPayload),
    MoveContainer(ContainersPayload),
    PlayTimer(TimerPayload),
    PauseTimer(TimerPayload),
    StopTimer(TimerPayload),
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddContainer(_) => "add_container",
            Self::RemoveContainer(_) => "remove_container",
            Self::NewUserJoined(_) => "new_user_joined",
            Self::MoveItemsWithinContainer(_) => "move_items_within_container",
            Self::MoveItemsOverContainer(_) => "move_items_over_container",
            Self::EditContainerMetadata(_) => "edit_container_metadata",
            Self::RemoveItem(_) => "remove_item",
            Self::EditItem(_) => "edit_item",
            Self::AddItem(_) => "add_item",
            Self::MoveContainer(_) => "move_container",
            Self::PlayTimer(_) => "play_timer",
            Self::PauseTimer(_) => "pause_timer",
            Self::StopTimer(_) => "stop_timer",
        }
    }

    pub fn partition(&self) -> EventPartition {
        match self {
            Self::AddContainer(_) | Self::RemoveContainer(_) | Self::NewUserJoined(_) => {
                EventPartition::BoardShape
            }
            Self::MoveItemsWithinContainer(_)
            | Self::MoveItemsOverContainer(_)
            | Self::EditContainerMetadata(_)
            | Self::RemoveItem(_)
            | Self::EditItem(_)
            | Self::AddItem(_) => EventPartition::Card,
            Self::MoveContainer(_) => EventPartition::ContainerOrder,
            Self::PlayTimer(_) | Self::PauseTimer(_) | Self::StopTimer(_) => EventPartition::Timer,
        }
    }

    /// Splits an event into its name and JSON data, the shape the channel carries.
    pub fn to_wire(&self) -> serde_json::Result<(String, serde_json::Value)> {
        let mut value = serde_json::to_value(self)?;
        let data = value
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        Ok((self.name().to_string(), data))
    }

    pub fn from_wire(name: &str, data: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::json!({ "name": name, "data": data }))
    }
}
