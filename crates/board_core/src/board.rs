use shared::{
    domain::{BoardState, Container, ContainerId, ContainerMap, ContainerMetadata, Item, ItemId},
    error::BoardError,
    protocol::{BoardSnapshot, ItemsPayload, RoomEvent},
};
use tracing::debug;

use crate::dispatcher::EventEnvelope;

/// The subject of an in-flight drag on this peer. Never replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveDrag {
    Container(Container),
    Item(Item),
}

impl ActiveDrag {
    pub fn id(&self) -> &str {
        match self {
            Self::Container(container) => container.id().as_str(),
            Self::Item(item) => item.id.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardAction {
    AddContainer(Container),
    RemoveContainer(ContainerId),
    EditContainerMetadata {
        container_id: ContainerId,
        metadata: ContainerMetadata,
    },
    AddItem {
        container_id: ContainerId,
        item: Item,
    },
    EditItem {
        container_id: ContainerId,
        item: Item,
    },
    RemoveItem {
        container_id: ContainerId,
        item_id: ItemId,
    },
}

/// Outcome of a pure transition: the next state plus the event announcing it.
pub type Transition = (BoardState, RoomEvent);

/// Owning container of `id`, which may name a container or an item.
pub fn find_container(state: &BoardState, id: &str) -> Option<ContainerId> {
    if let Some(container) = state.items.get(id) {
        return Some(container.id().clone());
    }
    state
        .items
        .values()
        .find(|container| container.contains_item(id))
        .map(|container| container.id().clone())
}

/// Removes the element at `from` and reinserts it at `to`.
pub fn array_move<T>(values: &mut Vec<T>, from: usize, to: usize) {
    if from >= values.len() {
        return;
    }
    let value = values.remove(from);
    let to = to.min(values.len());
    values.insert(to, value);
}

/// Computes the state after `action`. `Ok(None)` means nothing changed and
/// nothing should be published.
pub fn reduce(state: &BoardState, action: &BoardAction) -> Result<Option<Transition>, BoardError> {
    match action {
        BoardAction::AddContainer(container) => {
            let id = container.id();
            if state.is_container(id.as_str()) {
                return Err(BoardError::ContainerExists {
                    id: id.to_string(),
                });
            }
            let mut next = state.clone();
            next.containers.push(id.clone());
            next.items.insert(id.clone(), container.clone());
            let event = RoomEvent::AddContainer(BoardSnapshot::from(next.clone()));
            Ok(Some((next, event)))
        }
        BoardAction::RemoveContainer(container_id) => {
            if !state.is_container(container_id.as_str()) {
                return Ok(None);
            }
            let mut next = state.clone();
            next.items.remove(container_id.as_str());
            next.containers.retain(|id| id != container_id);
            let event = RoomEvent::RemoveContainer(BoardSnapshot::from(next.clone()));
            Ok(Some((next, event)))
        }
        BoardAction::EditContainerMetadata {
            container_id,
            metadata,
        } => {
            let current = state
                .items
                .get(container_id.as_str())
                .ok_or_else(|| BoardError::container_not_found(container_id.as_str()))?;
            // The map key is the container identity; metadata cannot rename it.
            if metadata.id != *container_id || &current.metadata == metadata {
                return Ok(None);
            }
            let mut next = state.clone();
            if let Some(container) = next.items.get_mut(container_id.as_str()) {
                container.metadata = metadata.clone();
            }
            Ok(Some(card_transition(next, RoomEvent::EditContainerMetadata)))
        }
        BoardAction::AddItem { container_id, item } => {
            let mut next = state.clone();
            let container = next
                .items
                .get_mut(container_id.as_str())
                .ok_or_else(|| BoardError::container_not_found(container_id.as_str()))?;
            container.data.push(item.clone());
            Ok(Some(card_transition(next, RoomEvent::AddItem)))
        }
        BoardAction::EditItem { container_id, item } => {
            let container = state
                .items
                .get(container_id.as_str())
                .ok_or_else(|| BoardError::container_not_found(container_id.as_str()))?;
            let index = container
                .position_of(item.id.as_str())
                .ok_or_else(|| BoardError::item_not_found(item.id.as_str()))?;
            if &container.data[index] == item {
                return Ok(None);
            }
            let mut next = state.clone();
            if let Some(container) = next.items.get_mut(container_id.as_str()) {
                container.data[index] = item.clone();
            }
            Ok(Some(card_transition(next, RoomEvent::EditItem)))
        }
        BoardAction::RemoveItem {
            container_id,
            item_id,
        } => {
            let present = state
                .items
                .get(container_id.as_str())
                .is_some_and(|container| container.contains_item(item_id.as_str()));
            if !present {
                return Ok(None);
            }
            let mut next = state.clone();
            if let Some(container) = next.items.get_mut(container_id.as_str()) {
                container.data.retain(|item| item.id != *item_id);
            }
            Ok(Some(card_transition(next, RoomEvent::RemoveItem)))
        }
    }
}

pub(crate) fn card_transition(
    next: BoardState,
    wrap: fn(ItemsPayload) -> RoomEvent,
) -> Transition {
    let event = wrap(ItemsPayload {
        items: next.items.clone(),
    });
    (next, event)
}

/// Board state owned by one peer, plus the drag cursor and the outbound
/// envelope armed by every local mutation.
#[derive(Debug, Clone)]
pub struct BoardEngine {
    pub(crate) state: BoardState,
    pub(crate) active: Option<ActiveDrag>,
    pub(crate) envelope: EventEnvelope,
}

impl Default for BoardEngine {
    fn default() -> Self {
        Self::new(BoardState::default())
    }
}

impl BoardEngine {
    pub fn new(state: BoardState) -> Self {
        Self {
            state,
            active: None,
            envelope: EventEnvelope::Idle,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn active_drag(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// Drains the armed envelope, leaving it idle.
    pub fn take_outbound(&mut self) -> Option<RoomEvent> {
        self.envelope.take_ready()
    }

    pub fn find_container(&self, id: &str) -> Option<ContainerId> {
        find_container(&self.state, id)
    }

    pub fn apply(&mut self, action: &BoardAction) -> Result<bool, BoardError> {
        match reduce(&self.state, action)? {
            Some(transition) => {
                self.commit(transition);
                Ok(true)
            }
            None => {
                debug!(?action, "board: action left state unchanged");
                Ok(false)
            }
        }
    }

    pub fn add_container(&mut self, container: Container) -> Result<bool, BoardError> {
        self.apply(&BoardAction::AddContainer(container))
    }

    pub fn remove_container(&mut self, container_id: ContainerId) -> Result<bool, BoardError> {
        self.apply(&BoardAction::RemoveContainer(container_id))
    }

    pub fn edit_container_metadata(
        &mut self,
        container_id: ContainerId,
        metadata: ContainerMetadata,
    ) -> Result<bool, BoardError> {
        self.apply(&BoardAction::EditContainerMetadata {
            container_id,
            metadata,
        })
    }

    pub fn add_item(&mut self, container_id: ContainerId, item: Item) -> Result<bool, BoardError> {
        self.apply(&BoardAction::AddItem { container_id, item })
    }

    pub fn edit_item(&mut self, container_id: ContainerId, item: Item) -> Result<bool, BoardError> {
        self.apply(&BoardAction::EditItem { container_id, item })
    }

    pub fn remove_item(
        &mut self,
        container_id: ContainerId,
        item_id: ItemId,
    ) -> Result<bool, BoardError> {
        self.apply(&BoardAction::RemoveItem {
            container_id,
            item_id,
        })
    }

    /// Replaces the whole board, e.g. after a leader snapshot.
    pub(crate) fn replace_board(&mut self, state: BoardState) -> bool {
        let items_changed = self.replace_items(state.items);
        let order_changed = self.replace_containers(state.containers);
        items_changed || order_changed
    }

    pub(crate) fn replace_items(&mut self, items: ContainerMap) -> bool {
        if self.state.items == items {
            return false;
        }
        self.state.items = items;
        true
    }

    pub(crate) fn replace_containers(&mut self, containers: Vec<ContainerId>) -> bool {
        if self.state.containers == containers {
            return false;
        }
        self.state.containers = containers;
        true
    }

    pub(crate) fn commit(&mut self, (state, event): Transition) {
        debug!(event = event.name(), "board: committed local mutation");
        self.state = state;
        self.envelope.arm(event);
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
