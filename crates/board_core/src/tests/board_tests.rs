use super::*;
use shared::error::EntityKind;

fn two_columns() -> BoardState {
    let mut a = Container::new("A", "Went well", "skyblue");
    a.data = vec![Item::new("x", "pairing"), Item::new("y", "retro notes")];
    let mut b = Container::new("B", "To improve", "rose");
    b.data = vec![Item::new("p", "flaky ci"), Item::new("q", "standups")];
    BoardState {
        containers: vec!["A".into(), "B".into()],
        items: [a, b].into_iter().map(|c| (c.id().clone(), c)).collect(),
    }
}

fn item_ids(state: &BoardState, container: &str) -> Vec<String> {
    state.items[container]
        .data
        .iter()
        .map(|item| item.id.to_string())
        .collect()
}

#[test]
fn array_move_shifts_neighbours() {
    let mut values = vec!["a", "b", "c", "d"];
    array_move(&mut values, 1, 2);
    assert_eq!(values, ["a", "c", "b", "d"]);

    array_move(&mut values, 3, 0);
    assert_eq!(values, ["d", "a", "c", "b"]);

    array_move(&mut values, 9, 0);
    assert_eq!(values, ["d", "a", "c", "b"], "out of range source is ignored");
}

#[test]
fn find_container_resolves_containers_and_items() {
    let state = two_columns();
    assert_eq!(find_container(&state, "A"), Some(ContainerId::new("A")));
    assert_eq!(find_container(&state, "q"), Some(ContainerId::new("B")));
    assert_eq!(find_container(&state, "nope"), None);
}

#[test]
fn add_container_appends_and_arms_board_shape_event() {
    let mut engine = BoardEngine::new(two_columns());
    assert!(engine
        .add_container(Container::new("C", "Actions", "yellow"))
        .expect("add"));

    assert_eq!(
        engine.state().containers,
        vec![ContainerId::new("A"), ContainerId::new("B"), ContainerId::new("C")]
    );
    assert!(engine.state().is_consistent());
    match engine.take_outbound() {
        Some(RoomEvent::AddContainer(snapshot)) => {
            assert_eq!(BoardState::from(snapshot), *engine.state());
        }
        other => panic!("unexpected outbound event: {other:?}"),
    }
}

#[test]
fn duplicate_container_is_rejected_without_event() {
    let mut engine = BoardEngine::new(two_columns());
    let err = engine
        .add_container(Container::new("A", "Again", "yellow"))
        .expect_err("duplicate id");
    assert_eq!(err, BoardError::ContainerExists { id: "A".into() });
    assert_eq!(*engine.state(), two_columns());
    assert_eq!(engine.take_outbound(), None);
}

#[test]
fn removing_a_container_cascades_its_items() {
    let mut engine = BoardEngine::new(two_columns());
    assert!(engine.remove_container(ContainerId::new("A")).expect("remove"));

    let state = engine.state();
    assert_eq!(state.containers, vec![ContainerId::new("B")]);
    assert!(find_container(state, "x").is_none());
    assert!(find_container(state, "y").is_none());
    assert!(state.is_consistent());
    assert!(matches!(
        engine.take_outbound(),
        Some(RoomEvent::RemoveContainer(_))
    ));
}

#[test]
fn removing_a_missing_container_is_a_silent_no_op() {
    let mut engine = BoardEngine::new(two_columns());
    assert!(!engine.remove_container(ContainerId::new("Z")).expect("remove"));
    assert!(!engine.envelope().is_ready());
}

#[test]
fn editing_metadata_only_publishes_real_changes() {
    let mut engine = BoardEngine::new(two_columns());
    let same = engine.state().items["A"].metadata.clone();
    assert!(!engine
        .edit_container_metadata(ContainerId::new("A"), same.clone())
        .expect("edit"));
    assert_eq!(engine.take_outbound(), None);

    let renamed = ContainerMetadata {
        label: "Kudos".into(),
        ..same
    };
    assert!(engine
        .edit_container_metadata(ContainerId::new("A"), renamed)
        .expect("edit"));
    assert_eq!(engine.state().items["A"].metadata.label, "Kudos");
    match engine.take_outbound() {
        Some(RoomEvent::EditContainerMetadata(payload)) => {
            assert_eq!(payload.items, engine.state().items);
        }
        other => panic!("unexpected outbound event: {other:?}"),
    }
}

#[test]
fn metadata_with_a_foreign_id_is_ignored() {
    let mut engine = BoardEngine::new(two_columns());
    let before = engine.state().clone();
    let hijack = ContainerMetadata {
        id: ContainerId::new("B"),
        label: "Renamed".into(),
        ..before.items["A"].metadata.clone()
    };

    assert!(!engine
        .edit_container_metadata(ContainerId::new("A"), hijack)
        .expect("edit"));
    assert_eq!(*engine.state(), before);
    assert_eq!(engine.take_outbound(), None);
}

#[test]
fn item_operations_report_missing_targets() {
    let mut engine = BoardEngine::new(two_columns());

    let err = engine
        .add_item(ContainerId::new("Z"), Item::new("n", "new"))
        .expect_err("missing container");
    assert_eq!(
        err,
        BoardError::NotFound {
            kind: EntityKind::Container,
            id: "Z".into()
        }
    );

    let err = engine
        .edit_item(ContainerId::new("A"), Item::new("ghost", "boo"))
        .expect_err("missing item");
    assert_eq!(err, BoardError::item_not_found("ghost"));

    assert!(!engine
        .remove_item(ContainerId::new("A"), ItemId::new("ghost"))
        .expect("remove is lenient"));
    assert_eq!(engine.take_outbound(), None);
}

#[test]
fn item_lifecycle_emits_card_events() {
    let mut engine = BoardEngine::new(two_columns());

    engine
        .add_item(ContainerId::new("B"), Item::new("r", "docs"))
        .expect("add");
    assert_eq!(item_ids(engine.state(), "B"), ["p", "q", "r"]);
    assert!(matches!(engine.take_outbound(), Some(RoomEvent::AddItem(_))));

    engine
        .edit_item(ContainerId::new("B"), Item::new("r", "better docs"))
        .expect("edit");
    assert_eq!(engine.state().items["B"].data[2].payload.description, "better docs");
    assert!(matches!(engine.take_outbound(), Some(RoomEvent::EditItem(_))));

    engine
        .remove_item(ContainerId::new("B"), ItemId::new("r"))
        .expect("remove");
    assert_eq!(item_ids(engine.state(), "B"), ["p", "q"]);
    assert!(matches!(engine.take_outbound(), Some(RoomEvent::RemoveItem(_))));
}

#[test]
fn envelope_is_drained_exactly_once() {
    let mut engine = BoardEngine::new(two_columns());
    engine
        .add_item(ContainerId::new("A"), Item::new("z", "coffee"))
        .expect("add");

    assert!(engine.envelope().is_ready());
    assert!(engine.take_outbound().is_some());
    assert_eq!(*engine.envelope(), EventEnvelope::Idle);
    assert!(engine.take_outbound().is_none());
}

#[test]
fn replace_helpers_report_whether_anything_changed() {
    let mut engine = BoardEngine::new(two_columns());
    assert!(!engine.replace_board(two_columns()));

    let mut reordered = two_columns().containers;
    reordered.reverse();
    assert!(engine.replace_containers(reordered.clone()));
    assert!(!engine.replace_containers(reordered));
    assert!(!engine.envelope().is_ready(), "remote replacement never publishes");
}
