use super::*;
use shared::domain::{Container, Item};

fn board() -> BoardState {
    let mut a = Container::new("A", "A", "skyblue");
    a.data = vec![Item::new("x", "x"), Item::new("y", "y")];
    let b = Container::new("B", "B", "rose");
    BoardState {
        containers: vec!["A".into(), "B".into()],
        items: [a, b].into_iter().map(|c| (c.id().clone(), c)).collect(),
    }
}

/// Column A at x 0..100 with two cards, empty column B at x 120..220.
fn layout() -> Vec<Droppable> {
    vec![
        Droppable::new("A", Rect::new(0.0, 0.0, 100.0, 300.0)),
        Droppable::new("x", Rect::new(10.0, 10.0, 80.0, 40.0)),
        Droppable::new("y", Rect::new(10.0, 60.0, 80.0, 40.0)),
        Droppable::new("B", Rect::new(120.0, 0.0, 100.0, 300.0)),
    ]
}

fn args(active_id: &str, pointer: Option<Point>, collision_rect: Rect) -> CollisionArgs {
    CollisionArgs {
        active_id: active_id.into(),
        pointer,
        collision_rect,
        droppables: layout(),
    }
}

#[test]
fn rect_geometry_helpers() {
    let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
    assert_eq!(rect.center(), Point::new(25.0, 40.0));
    assert_eq!(rect.bottom(), 60.0);
    assert!(rect.contains(&Point::new(10.0, 60.0)));
    assert!(!rect.contains(&Point::new(41.0, 30.0)));
    assert_eq!(rect.intersection_area(&Rect::new(30.0, 50.0, 30.0, 30.0)), 100.0);
    assert_eq!(rect.intersection_area(&Rect::new(100.0, 0.0, 5.0, 5.0)), 0.0);
}

#[test]
fn closest_center_sorts_by_distance() {
    let droppables = layout();
    let ids: Vec<String> = closest_center(&Rect::new(125.0, 0.0, 100.0, 300.0), &droppables)
        .into_iter()
        .map(|collision| collision.id)
        .collect();
    assert_eq!(ids.first().map(String::as_str), Some("B"));
    assert_eq!(ids.len(), 4);
}

#[test]
fn pointer_within_keeps_registration_order() {
    let droppables = layout();
    let hits = pointer_within(&Point::new(50.0, 30.0), &droppables);
    let ids: Vec<&str> = hits.iter().map(|collision| collision.id.as_str()).collect();
    assert_eq!(ids, ["A", "x"]);
}

#[test]
fn rect_intersection_reports_overlap_share() {
    let droppables = vec![Droppable::new("B", Rect::new(0.0, 0.0, 10.0, 10.0))];
    let hits = rect_intersection(&Rect::new(5.0, 0.0, 10.0, 10.0), &droppables);
    assert_eq!(hits.len(), 1);
    // 50 overlap over 150 combined.
    assert!((hits[0].value - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn dragging_a_container_only_considers_containers() {
    let board = board();
    let active = ActiveDrag::Container(board.items["A"].clone());
    let mut detector = CollisionDetector::new();

    let over = detector.detect(
        &board,
        Some(&active),
        &args("A", Some(Point::new(20.0, 20.0)), Rect::new(110.0, 0.0, 100.0, 300.0)),
    );
    assert_eq!(over.as_deref(), Some("B"));
}

#[test]
fn pointer_over_a_filled_column_refines_to_nearest_card() {
    let board = board();
    let active = ActiveDrag::Item(Item::new("p", "p"));
    let mut detector = CollisionDetector::new();

    // Pointer sits in column A but outside both cards; the dragged rect is
    // centred near card y.
    let over = detector.detect(
        &board,
        Some(&active),
        &args("p", Some(Point::new(5.0, 200.0)), Rect::new(10.0, 70.0, 80.0, 40.0)),
    );
    assert_eq!(over.as_deref(), Some("y"));
}

#[test]
fn empty_column_stays_the_target() {
    let board = board();
    let active = ActiveDrag::Item(Item::new("x", "x"));
    let mut detector = CollisionDetector::new();

    let over = detector.detect(
        &board,
        Some(&active),
        &args("x", Some(Point::new(150.0, 150.0)), Rect::new(130.0, 130.0, 80.0, 40.0)),
    );
    assert_eq!(over.as_deref(), Some("B"));
}

#[test]
fn falls_back_to_rect_intersection_without_pointer() {
    let board = board();
    let mut detector = CollisionDetector::new();

    let over = detector.detect(
        &board,
        None,
        &args("x", None, Rect::new(200.0, 100.0, 80.0, 40.0)),
    );
    assert_eq!(over.as_deref(), Some("B"));
}

#[test]
fn no_candidate_reuses_last_target() {
    let board = board();
    let mut detector = CollisionDetector::new();
    let far_away = Rect::new(1000.0, 1000.0, 10.0, 10.0);

    assert_eq!(detector.detect(&board, None, &args("x", None, far_away)), None);

    detector.detect(
        &board,
        None,
        &args("x", Some(Point::new(150.0, 150.0)), Rect::new(130.0, 130.0, 80.0, 40.0)),
    );
    assert_eq!(detector.last_over_id(), Some("B"));

    let over = detector.detect(&board, None, &args("x", None, far_away));
    assert_eq!(over.as_deref(), Some("B"));
}

#[test]
fn recent_container_change_resolves_to_active_item() {
    let board = board();
    let mut detector = CollisionDetector::new();
    detector.detect(
        &board,
        None,
        &args("x", Some(Point::new(150.0, 150.0)), Rect::new(130.0, 130.0, 80.0, 40.0)),
    );
    detector.note_moved_to_new_container();

    let over = detector.detect(
        &board,
        None,
        &args("x", None, Rect::new(1000.0, 1000.0, 10.0, 10.0)),
    );
    assert_eq!(over.as_deref(), Some("x"));

    detector.reset();
    assert_eq!(detector.last_over_id(), None);
}
