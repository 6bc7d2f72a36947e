//! Room roster and the lowest-client-id leader election.
//!
//! The leader is the peer that sends the full board to newcomers. When it
//! leaves, every remaining peer runs the same election over the same roster
//! and only the winner announces itself.

use channel::{PresenceData, PresenceMember};
use shared::domain::{ClientId, PresenceRecord};
use tracing::{debug, info};

/// Work the session must carry out after a roster change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEffect {
    /// Publish `new_user_joined` with the full board for `newcomer`.
    BroadcastSnapshot { newcomer: ClientId },
    /// Announce local leadership through a presence update.
    ClaimLeadership,
}

/// True when nobody in `members` holds leadership yet.
pub fn should_claim_leadership(members: &[PresenceMember]) -> bool {
    !members.iter().any(|member| member.data.is_leader)
}

/// The deterministic successor: lowest client id wins.
pub fn elect_successor(records: &[PresenceRecord]) -> Option<ClientId> {
    records.iter().map(|record| &record.client_id).min().cloned()
}

#[derive(Debug, Clone)]
pub struct PresenceRoster {
    local: ClientId,
    members: Vec<PresenceRecord>,
}

impl PresenceRoster {
    pub fn new(local: ClientId) -> Self {
        Self {
            local,
            members: Vec::new(),
        }
    }

    pub fn local(&self) -> &ClientId {
        &self.local
    }

    pub fn members(&self) -> &[PresenceRecord] {
        &self.members
    }

    pub fn leader(&self) -> Option<&ClientId> {
        self.members
            .iter()
            .find(|record| record.is_leader)
            .map(|record| &record.client_id)
    }

    pub fn is_local_leader(&self) -> bool {
        self.members
            .iter()
            .any(|record| record.is_leader && record.client_id == self.local)
    }

    /// Seeds the roster from a presence fetch, replacing what was known.
    pub fn load(&mut self, members: &[PresenceMember]) {
        self.members.clear();
        for member in members {
            self.upsert(member);
        }
    }

    /// Records local leadership ahead of the presence echo.
    pub fn mark_local_leader(&mut self) {
        let local = PresenceMember {
            client_id: self.local.clone(),
            data: PresenceData { is_leader: true },
        };
        self.upsert(&local);
    }

    pub fn on_enter(&mut self, member: &PresenceMember) -> Vec<PresenceEffect> {
        let known = self.upsert(member);
        debug!(client_id = %member.client_id, known, "presence: member entered");
        if !known && member.client_id != self.local && self.is_local_leader() {
            return vec![PresenceEffect::BroadcastSnapshot {
                newcomer: member.client_id.clone(),
            }];
        }
        Vec::new()
    }

    pub fn on_update(&mut self, member: &PresenceMember) {
        self.upsert(member);
    }

    pub fn on_leave(&mut self, member: &PresenceMember) -> Vec<PresenceEffect> {
        let Some(index) = self
            .members
            .iter()
            .position(|record| record.client_id == member.client_id)
        else {
            return Vec::new();
        };
        let departed = self.members.remove(index);
        if !(departed.is_leader || member.data.is_leader) {
            return Vec::new();
        }

        let Some(successor) = elect_successor(&self.members) else {
            return Vec::new();
        };
        info!(
            departed = %departed.client_id,
            successor = %successor,
            "presence: leader left, electing successor"
        );
        for record in &mut self.members {
            record.is_leader = record.client_id == successor;
        }
        if successor == self.local {
            vec![PresenceEffect::ClaimLeadership]
        } else {
            Vec::new()
        }
    }

    /// Returns whether the member was already on the roster.
    fn upsert(&mut self, member: &PresenceMember) -> bool {
        let record = PresenceRecord {
            client_id: member.client_id.clone(),
            is_leader: member.data.is_leader,
        };
        match self
            .members
            .iter_mut()
            .find(|existing| existing.client_id == member.client_id)
        {
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.members.push(record);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/presence_tests.rs"]
mod tests;
