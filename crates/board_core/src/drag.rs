use serde::{Deserialize, Serialize};
use shared::{
    domain::BoardState,
    protocol::{ContainersPayload, RoomEvent},
};
use tracing::debug;

use crate::{
    board::{array_move, card_transition, find_container, ActiveDrag, BoardEngine, Transition},
    collision::Rect,
};

/// The droppable under the drag, as reported by the sensor layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragTarget {
    pub id: String,
    pub rect: Option<Rect>,
}

impl DragTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rect: None,
        }
    }

    pub fn with_rect(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect: Some(rect),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOver {
    Unchanged,
    ContainerMoved(Transition),
    ItemMoved(Transition),
}

/// Drag-over transition. Container-on-container reorders the columns; an
/// item hovering a different container is moved into it immediately.
pub fn drag_over(
    state: &BoardState,
    active_id: &str,
    over: &DragTarget,
    dragging_rect: Option<&Rect>,
) -> DragOver {
    let (Some(active_container), Some(over_container)) = (
        find_container(state, active_id),
        find_container(state, &over.id),
    ) else {
        return DragOver::Unchanged;
    };
    if active_container == over_container {
        return DragOver::Unchanged;
    }

    if state.is_container(active_id) {
        if !state.is_container(&over.id) {
            return DragOver::Unchanged;
        }
        let position = |id: &str| state.containers.iter().position(|c| c.as_str() == id);
        let (Some(from), Some(to)) = (position(active_id), position(&over.id)) else {
            return DragOver::Unchanged;
        };
        let mut containers = state.containers.clone();
        array_move(&mut containers, from, to);
        if containers == state.containers {
            return DragOver::Unchanged;
        }
        let mut next = state.clone();
        next.containers = containers.clone();
        return DragOver::ContainerMoved((
            next,
            RoomEvent::MoveContainer(ContainersPayload { containers }),
        ));
    }

    let mut next = state.clone();
    let Some(moved) = next
        .items
        .get_mut(active_container.as_str())
        .and_then(|source| {
            let index = source.position_of(active_id)?;
            Some(source.data.remove(index))
        })
    else {
        return DragOver::Unchanged;
    };
    let Some(destination) = next.items.get_mut(over_container.as_str()) else {
        return DragOver::Unchanged;
    };

    let insert_at = if over.id == over_container.as_str() {
        destination.data.len()
    } else {
        match destination.position_of(&over.id) {
            Some(index) => {
                let below_over = match (dragging_rect, over.rect.as_ref()) {
                    (Some(dragging), Some(over_rect)) => dragging.top > over_rect.bottom(),
                    _ => false,
                };
                if below_over {
                    index + 1
                } else {
                    index
                }
            }
            None => destination.data.len(),
        }
    };
    let insert_at = insert_at.min(destination.data.len());
    destination.data.insert(insert_at, moved);

    DragOver::ItemMoved(card_transition(next, RoomEvent::MoveItemsOverContainer))
}

/// Drag-end transition: reorders within one container. Moves across
/// containers already happened during drag-over.
pub fn drag_end(state: &BoardState, active_id: &str, over: &DragTarget) -> Option<Transition> {
    if state.is_container(active_id) {
        return None;
    }
    let active_container = find_container(state, active_id)?;
    let over_container = find_container(state, &over.id)?;
    if active_container != over_container {
        return None;
    }

    let container = state.items.get(active_container.as_str())?;
    let from = container.position_of(active_id)?;
    let to = if over.id == active_container.as_str() {
        container.data.len().saturating_sub(1)
    } else {
        container.position_of(&over.id)?
    };
    if from == to {
        return None;
    }

    let mut next = state.clone();
    if let Some(container) = next.items.get_mut(active_container.as_str()) {
        array_move(&mut container.data, from, to);
    }
    Some(card_transition(next, RoomEvent::MoveItemsWithinContainer))
}

impl BoardEngine {
    pub fn on_drag_start(&mut self, active_id: &str) {
        self.active = if let Some(container) = self.state.items.get(active_id) {
            Some(ActiveDrag::Container(container.clone()))
        } else {
            self.find_container(active_id)
                .and_then(|container_id| self.state.items.get(container_id.as_str()))
                .and_then(|container| {
                    container
                        .data
                        .iter()
                        .find(|item| item.id.as_str() == active_id)
                })
                .cloned()
                .map(ActiveDrag::Item)
        };
        debug!(active_id, lifted = self.active.is_some(), "board: drag started");
    }

    /// Returns what the move did so callers can update the collision
    /// detector. Moving an item across containers ends the lifted state.
    pub fn on_drag_over(
        &mut self,
        active_id: &str,
        over: Option<&DragTarget>,
        dragging_rect: Option<&Rect>,
    ) -> DragOver {
        let Some(over) = over else {
            return DragOver::Unchanged;
        };
        let outcome = drag_over(&self.state, active_id, over, dragging_rect);
        match &outcome {
            DragOver::Unchanged => {}
            DragOver::ContainerMoved(transition) => self.commit(transition.clone()),
            DragOver::ItemMoved(transition) => {
                self.active = None;
                self.commit(transition.clone());
            }
        }
        outcome
    }

    /// `over == None` is a cancelled gesture and leaves the board untouched.
    pub fn on_drag_end(&mut self, active_id: &str, over: Option<&DragTarget>) -> bool {
        let transition = over.and_then(|over| drag_end(&self.state, active_id, over));
        self.active = None;
        match transition {
            Some(transition) => {
                self.commit(transition);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
