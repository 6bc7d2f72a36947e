//! Decides which droppable a drag is currently over.
//!
//! The sensor layer calls [`CollisionDetector::detect`] on every pointer or
//! keyboard tick and feeds the resulting id into the drag-over handler.

use serde::{Deserialize, Serialize};
use shared::domain::BoardState;

use crate::board::ActiveDrag;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let width = self.right().min(other.right()) - self.left.max(other.left);
        let height = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if width <= 0.0 || height <= 0.0 {
            return 0.0;
        }
        width * height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Droppable {
    pub id: String,
    pub rect: Rect,
}

impl Droppable {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
        }
    }
}

/// One tick of geometry from the sensor layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionArgs {
    pub active_id: String,
    pub pointer: Option<Point>,
    /// Current rectangle of the dragged element.
    pub collision_rect: Rect,
    /// Registered droppables in registration order.
    pub droppables: Vec<Droppable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub id: String,
    pub value: f64,
}

/// Droppables ordered by center distance to `rect`, nearest first.
pub fn closest_center<'a>(
    rect: &Rect,
    droppables: impl IntoIterator<Item = &'a Droppable>,
) -> Vec<Collision> {
    let center = rect.center();
    let mut collisions: Vec<Collision> = droppables
        .into_iter()
        .map(|droppable| Collision {
            id: droppable.id.clone(),
            value: center.distance(&droppable.rect.center()),
        })
        .collect();
    collisions.sort_by(|a, b| a.value.total_cmp(&b.value));
    collisions
}

/// Droppables whose rectangle contains the pointer, in registration order.
pub fn pointer_within<'a>(
    pointer: &Point,
    droppables: impl IntoIterator<Item = &'a Droppable>,
) -> Vec<Collision> {
    droppables
        .into_iter()
        .filter(|droppable| droppable.rect.contains(pointer))
        .map(|droppable| Collision {
            id: droppable.id.clone(),
            value: pointer.distance(&droppable.rect.center()),
        })
        .collect()
}

/// Droppables overlapping `rect`, in registration order. `value` is the
/// overlap as a share of both areas combined.
pub fn rect_intersection<'a>(
    rect: &Rect,
    droppables: impl IntoIterator<Item = &'a Droppable>,
) -> Vec<Collision> {
    droppables
        .into_iter()
        .filter_map(|droppable| {
            let overlap = rect.intersection_area(&droppable.rect);
            if overlap <= 0.0 {
                return None;
            }
            let union = rect.area() + droppable.rect.area() - overlap;
            Some(Collision {
                id: droppable.id.clone(),
                value: overlap / union,
            })
        })
        .collect()
}

/// Collision strategy with a sticky fallback across ticks.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    last_over_id: Option<String>,
    recently_moved_to_new_container: bool,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_over_id(&self) -> Option<&str> {
        self.last_over_id.as_deref()
    }

    /// Called after the drag-over handler moved the active item across
    /// containers; the next empty tick resolves to the active item itself.
    pub fn note_moved_to_new_container(&mut self) {
        self.recently_moved_to_new_container = true;
    }

    pub fn reset(&mut self) {
        self.last_over_id = None;
        self.recently_moved_to_new_container = false;
    }

    pub fn detect(
        &mut self,
        board: &BoardState,
        active: Option<&ActiveDrag>,
        args: &CollisionArgs,
    ) -> Option<String> {
        let dragging_container = active
            .map(ActiveDrag::id)
            .is_some_and(|id| board.is_container(id));
        if dragging_container {
            let over = closest_center(
                &args.collision_rect,
                args.droppables
                    .iter()
                    .filter(|droppable| board.is_container(&droppable.id)),
            )
            .into_iter()
            .next()
            .map(|collision| collision.id);
            if over.is_some() {
                self.last_over_id.clone_from(&over);
            }
            return over;
        }

        let pointer_hits = args
            .pointer
            .map(|pointer| pointer_within(&pointer, &args.droppables))
            .unwrap_or_default();
        let intersections = if pointer_hits.is_empty() {
            rect_intersection(&args.collision_rect, &args.droppables)
        } else {
            pointer_hits
        };

        if let Some(first) = intersections.into_iter().next() {
            let over_id = self.refine_within_container(board, args, first.id);
            self.recently_moved_to_new_container = false;
            self.last_over_id = Some(over_id.clone());
            return Some(over_id);
        }

        if self.recently_moved_to_new_container {
            self.last_over_id = Some(args.active_id.clone());
        }
        self.last_over_id.clone()
    }

    fn refine_within_container(
        &self,
        board: &BoardState,
        args: &CollisionArgs,
        over_id: String,
    ) -> String {
        let Some(container) = board.items.get(over_id.as_str()) else {
            return over_id;
        };
        if container.data.is_empty() {
            return over_id;
        }
        closest_center(
            &args.collision_rect,
            args.droppables.iter().filter(|droppable| {
                droppable.id != over_id && container.contains_item(&droppable.id)
            }),
        )
        .into_iter()
        .next()
        .map(|collision| collision.id)
        .unwrap_or(over_id)
    }
}

#[cfg(test)]
#[path = "tests/collision_tests.rs"]
mod tests;
