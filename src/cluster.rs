//! Greedy nearest-neighbor clustering of received messages.
//!
//! Each human groups the messages it has received into inferred
//! contact-groups: "these probably came from the same person". The signal is
//! approximate on purpose — pseudonyms rotate one bit per day, so the
//! scoring ladder accepts shorter prefixes as the day offset grows. The
//! result is a re-identification measurement for privacy analysis, not a
//! correct graph matching.
//!
//! Table shape: entries are keyed by the contact identity of a message (its
//! pseudonym and day); repeated sightings of the same `(uid, day)` pair with
//! an updated risk level reuse the same entry, which is what lets the
//! clustered diffusion policy difference against `previous_risk`. Entries
//! are kept in insertion order and evicted once they fall out of the gossip
//! lookback window; group ids come from a high-water counter and are never
//! reused, even after eviction.

use serde::Serialize;

use crate::codec::{MessageKey, ObservedMessage, QuantizedUid};

/// Cluster bookkeeping for one inferred contact sighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Inferred contact-group id.
    pub assignment: u32,
    /// Last quantized risk observed from this entry.
    pub previous_risk: f64,
    /// Decayed weight applied to previously accumulated risk on the next
    /// update from this entry.
    pub carry_over_transmission_proba: f64,
}

#[derive(Debug, Clone)]
struct ClusterEntry {
    uid: QuantizedUid,
    day: u16,
    /// Encoded form of the most recent message that hit this entry.
    key: MessageKey,
    state: ClusterAssignment,
}

/// Insertion-ordered table of inferred contact sightings, one per human.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    entries: Vec<ClusterEntry>,
    /// High-water group counter; survives eviction so ids are never reused.
    next_group: u32,
}

impl ClusterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, message: &ObservedMessage) -> bool {
        self.get(message).is_some()
    }

    /// The entry for `message`'s contact identity, if one exists.
    pub fn get(&self, message: &ObservedMessage) -> Option<&ClusterAssignment> {
        self.entries
            .iter()
            .find(|e| e.uid == message.uid && e.day == message.day)
            .map(|e| &e.state)
    }

    pub(crate) fn get_mut(&mut self, message: &ObservedMessage) -> Option<&mut ClusterAssignment> {
        self.entries
            .iter_mut()
            .find(|e| e.uid == message.uid && e.day == message.day)
            .map(|e| &mut e.state)
    }

    /// Match score between an incoming message and a previously seen entry.
    ///
    /// `None` means "not a candidate". The prefix requirement shrinks as the
    /// day offset grows, one segment per rotation the pseudonym has had time
    /// for. A score of 0 still makes the entry a candidate.
    fn match_score(incoming: &ObservedMessage, entry: &ClusterEntry) -> Option<u8> {
        let offset = i32::from(incoming.day) - i32::from(entry.day);
        if incoming.uid == entry.uid && offset == 0 {
            // Exact rematch; normally short-circuited by the same-contact
            // check in `assign`.
            Some(3)
        } else if incoming.uid.prefix_matches(&entry.uid, 3) && offset == 1 {
            Some(2)
        } else if incoming.uid.prefix_matches(&entry.uid, 2) && offset == 2 {
            Some(1)
        } else if incoming.uid.prefix_matches(&entry.uid, 1) && offset == 2 {
            Some(0)
        } else {
            None
        }
    }

    /// Assign `incoming` to a contact-group and record the sighting.
    ///
    /// A message whose contact identity is already in the table keeps its
    /// existing entry (only the stored key refreshes); otherwise the
    /// incoming message inherits the assignment of the best-scoring
    /// candidate, or opens a fresh group when nothing scores. The first-ever
    /// message lands in group 0.
    ///
    /// Tie-break: highest score wins; among equal scores the
    /// earliest-inserted entry wins (strict `>` below).
    pub fn assign(
        &mut self,
        incoming: &ObservedMessage,
        key: MessageKey,
        m_risk: f64,
        transmission_proba: f64,
    ) -> u32 {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.uid == incoming.uid && e.day == incoming.day)
        {
            entry.key = key;
            return entry.state.assignment;
        }

        let mut best: Option<(u8, u32)> = None;
        for entry in &self.entries {
            if let Some(score) = Self::match_score(incoming, entry) {
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, entry.state.assignment));
                }
            }
        }

        let assignment = match best {
            Some((_, group)) => group,
            None => {
                let group = self.next_group;
                self.next_group += 1;
                group
            }
        };
        self.entries.push(ClusterEntry {
            uid: incoming.uid,
            day: incoming.day,
            key,
            state: ClusterAssignment {
                assignment,
                previous_risk: m_risk,
                carry_over_transmission_proba: transmission_proba,
            },
        });
        assignment
    }

    /// Drop entries from days before `cutoff_day`. Group ids are not
    /// reclaimed.
    pub fn evict_before(&mut self, cutoff_day: i64) {
        self.entries.retain(|e| i64::from(e.day) >= cutoff_day);
    }

    /// Export rows in insertion order: the most recent key that hit each
    /// entry, paired with its assignment state.
    pub fn rows(&self) -> impl Iterator<Item = (MessageKey, &ClusterAssignment)> + '_ {
        self.entries.iter().map(|e| (e.key, &e.state))
    }
}
