use super::*;
use channel::PresenceData;

fn member(id: &str, is_leader: bool) -> PresenceMember {
    PresenceMember {
        client_id: ClientId::new(id),
        data: PresenceData { is_leader },
    }
}

fn ids(roster: &PresenceRoster) -> Vec<&str> {
    roster
        .members()
        .iter()
        .map(|record| record.client_id.as_str())
        .collect()
}

#[test]
fn first_peer_claims_leadership() {
    assert!(should_claim_leadership(&[]));
    assert!(should_claim_leadership(&[member("a", false)]));
    assert!(!should_claim_leadership(&[member("a", false), member("b", true)]));
}

#[test]
fn successor_is_lowest_client_id() {
    let records = vec![
        PresenceRecord {
            client_id: ClientId::new("c"),
            is_leader: false,
        },
        PresenceRecord {
            client_id: ClientId::new("a"),
            is_leader: false,
        },
    ];
    assert_eq!(elect_successor(&records), Some(ClientId::new("a")));
    assert_eq!(elect_successor(&[]), None);
}

#[test]
fn leader_departure_promotes_lowest_remaining_id() {
    let mut roster = PresenceRoster::new(ClientId::new("a"));
    roster.load(&[member("b", true), member("a", false), member("c", false)]);
    assert_eq!(roster.leader(), Some(&ClientId::new("b")));

    let effects = roster.on_leave(&member("b", true));
    assert_eq!(effects, vec![PresenceEffect::ClaimLeadership]);
    assert_eq!(ids(&roster), ["a", "c"]);
    assert_eq!(roster.leader(), Some(&ClientId::new("a")));
    assert!(roster.is_local_leader());
}

#[test]
fn non_winning_peers_stay_quiet_after_leader_leaves() {
    let mut roster = PresenceRoster::new(ClientId::new("c"));
    roster.load(&[member("b", true), member("a", false), member("c", false)]);

    assert!(roster.on_leave(&member("b", true)).is_empty());
    assert_eq!(roster.leader(), Some(&ClientId::new("a")));
    assert!(!roster.is_local_leader());
}

#[test]
fn follower_departure_keeps_the_leader() {
    let mut roster = PresenceRoster::new(ClientId::new("a"));
    roster.load(&[member("b", true), member("a", false), member("c", false)]);

    assert!(roster.on_leave(&member("c", false)).is_empty());
    assert_eq!(roster.leader(), Some(&ClientId::new("b")));
    assert!(roster.on_leave(&member("zz", true)).is_empty(), "unknown peer");
}

#[test]
fn leader_sends_board_to_newcomers_once() {
    let mut roster = PresenceRoster::new(ClientId::new("a"));
    roster.mark_local_leader();

    assert_eq!(
        roster.on_enter(&member("b", false)),
        vec![PresenceEffect::BroadcastSnapshot {
            newcomer: ClientId::new("b")
        }]
    );
    assert!(roster.on_enter(&member("b", false)).is_empty(), "deduped");
    assert!(roster.on_enter(&member("a", true)).is_empty(), "own echo");
    assert_eq!(ids(&roster), ["a", "b"]);
}

#[test]
fn followers_ignore_newcomers() {
    let mut roster = PresenceRoster::new(ClientId::new("b"));
    roster.load(&[member("a", true), member("b", false)]);
    assert!(roster.on_enter(&member("c", false)).is_empty());
}

#[test]
fn updates_replace_records_in_place() {
    let mut roster = PresenceRoster::new(ClientId::new("c"));
    roster.load(&[member("a", false), member("b", false)]);
    roster.on_update(&member("a", true));
    assert_eq!(ids(&roster), ["a", "b"]);
    assert_eq!(roster.leader(), Some(&ClientId::new("a")));
}
