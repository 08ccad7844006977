//! Per-human mutable state and its event-log application.

use std::collections::{BTreeSet, VecDeque};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cluster::ClusterTable;
use crate::codec::{Message, MessageCodec, ObservedMessage, QuantizedUid};
use crate::events::Timestamp;

/// Derive a per-human RNG stream seed from the engine seed and the stable
/// name: FNV-1a over the name bytes, SplitMix64 finalizer. Cheap, stable
/// across platforms, and gives every human an independent rotation stream.
fn stream_seed(seed: u64, name: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.as_bytes() {
        h ^= u64::from(*byte);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    splitmix64(seed ^ h)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Most recent lab test on record. Only one is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRecord {
    pub time: Timestamp,
    pub positive: bool,
}

/// Mutable per-individual state across the replay. One per unique human id
/// in the log.
#[derive(Debug, Clone)]
pub struct HumanState {
    name: String,
    uid: QuantizedUid,
    rng: StdRng,
    risk: f64,
    day_start_risk: f64,
    symptoms_start: Timestamp,
    infectiousness_start: Timestamp,
    reported_symptoms: BTreeSet<String>,
    time_of_recovery: Timestamp,
    time_of_death: Timestamp,
    is_infectious: bool,
    test: Option<TestRecord>,
    /// Messages received but not yet consumed by a daily processing pass.
    inbox: Vec<Message>,
    /// Received-message history kept for the backward-gossip lookback
    /// window; evicted beyond it.
    contact_log: VecDeque<Message>,
    pub(crate) clusters: ClusterTable,
}

impl HumanState {
    /// Fresh record for `name`, with a pseudonym-rotation stream derived
    /// from `seed` and the name.
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        let name = name.into();
        let mut rng = StdRng::seed_from_u64(stream_seed(seed, &name));
        let uid = QuantizedUid::random(&mut rng);
        HumanState {
            name,
            uid,
            rng,
            risk: 0.0,
            day_start_risk: 0.0,
            symptoms_start: Timestamp::NEVER,
            infectiousness_start: Timestamp::NEVER,
            reported_symptoms: BTreeSet::new(),
            time_of_recovery: Timestamp::NEVER,
            time_of_death: Timestamp::NEVER,
            is_infectious: false,
            test: None,
            inbox: Vec::new(),
            contact_log: VecDeque::new(),
            clusters: ClusterTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current rotating pseudonym.
    pub fn uid(&self) -> QuantizedUid {
        self.uid
    }

    /// Current risk estimate in `[0, 1]`.
    pub fn risk(&self) -> f64 {
        self.risk
    }

    pub fn is_infectious(&self) -> bool {
        self.is_infectious
    }

    pub fn symptoms_start(&self) -> Timestamp {
        self.symptoms_start
    }

    pub fn infectiousness_start(&self) -> Timestamp {
        self.infectiousness_start
    }

    pub fn time_of_recovery(&self) -> Timestamp {
        self.time_of_recovery
    }

    pub fn time_of_death(&self) -> Timestamp {
        self.time_of_death
    }

    pub fn test(&self) -> Option<TestRecord> {
        self.test
    }

    /// Messages queued for the next daily processing pass.
    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// This human's message-cluster table.
    pub fn clusters(&self) -> &ClusterTable {
        &self.clusters
    }

    pub(crate) fn day_start_risk(&self) -> f64 {
        self.day_start_risk
    }

    /// Clamped risk write: diffusion policies cannot push the estimate
    /// outside `[0, 1]`.
    pub(crate) fn set_risk(&mut self, risk: f64) {
        self.risk = risk.clamp(0.0, 1.0);
    }

    /// Record symptom onset. Infectiousness is assumed to begin
    /// `presymptomatic_days` before symptoms.
    pub fn record_symptoms(
        &mut self,
        time: Timestamp,
        reported: Vec<String>,
        presymptomatic_days: i64,
    ) {
        self.symptoms_start = time;
        self.infectiousness_start = time.minus_days(presymptomatic_days);
        self.reported_symptoms = reported.into_iter().collect();
    }

    /// Remember the most recent test only.
    pub fn record_test(&mut self, time: Timestamp, positive: bool) {
        self.test = Some(TestRecord { time, positive });
    }

    /// Terminal outcome. Recovery and death are mutually exclusive: setting
    /// one resets the other to [`Timestamp::NEVER`].
    pub fn record_outcome(&mut self, time: Timestamp, death: bool) {
        if death {
            self.time_of_death = time;
            self.time_of_recovery = Timestamp::NEVER;
        } else {
            self.time_of_recovery = time;
            self.time_of_death = Timestamp::NEVER;
        }
    }

    /// Self-reported symptoms as of `now`; `None` before onset.
    pub fn reported_symptoms_at(&self, now: Timestamp) -> Option<&BTreeSet<String>> {
        (!self.symptoms_start.is_never() && now >= self.symptoms_start)
            .then_some(&self.reported_symptoms)
    }

    /// Start-of-day bookkeeping: snapshot the risk for the swing check and
    /// rotate the pseudonym.
    pub(crate) fn begin_day(&mut self) {
        self.day_start_risk = self.risk;
        self.uid.rotate(&mut self.rng);
    }

    /// Health-state transition: infectiousness latches on once `today`
    /// passes its start, and latches off for good once the human has
    /// recovered or died.
    pub(crate) fn update_infectiousness(&mut self, today: Timestamp) {
        if today > self.infectiousness_start {
            self.is_infectious = true;
        }
        if self.time_of_recovery < today || self.time_of_death < today {
            self.is_infectious = false;
        }
    }

    /// Drain queued messages in arrival order.
    pub(crate) fn take_inbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.inbox)
    }

    /// Deliver a message: queued for the next processing pass and remembered
    /// in the contact log for backward gossip.
    pub fn receive(&mut self, message: Message) {
        self.contact_log.push_back(message.clone());
        self.inbox.push(message);
    }

    pub(crate) fn contact_log(&self) -> impl Iterator<Item = &Message> + '_ {
        self.contact_log.iter()
    }

    /// Drop history from before `cutoff_day`: contact-log messages and
    /// cluster entries alike. Messages arrive in day order, so the contact
    /// log pops from the front.
    pub(crate) fn evict_history_before(&mut self, cutoff_day: i64) {
        while self
            .contact_log
            .front()
            .is_some_and(|m| i64::from(m.observed.day) < cutoff_day)
        {
            self.contact_log.pop_front();
        }
        self.clusters.evict_before(cutoff_day);
    }

    /// The message this human would share right now: current pseudonym,
    /// quantized current risk, today's day index.
    pub fn current_message(&self, day: u16, codec: &MessageCodec) -> Message {
        Message {
            observed: ObservedMessage {
                uid: self.uid,
                risk: codec.quantize(self.risk),
                day,
            },
            route: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessageCodec;

    fn message(day: u16) -> Message {
        let codec = MessageCodec::new(4).unwrap();
        HumanState::new("sender", 0).current_message(day, &codec)
    }

    #[test]
    fn recovery_and_death_are_mutually_exclusive() {
        let mut h = HumanState::new("a", 0);
        h.record_outcome(Timestamp::from_days(5), true);
        assert!(h.time_of_recovery().is_never());
        assert!(!h.time_of_death().is_never());
        h.record_outcome(Timestamp::from_days(6), false);
        assert!(h.time_of_death().is_never());
        assert_eq!(h.time_of_recovery(), Timestamp::from_days(6));
    }

    #[test]
    fn inbox_drains_in_arrival_order() {
        let mut h = HumanState::new("a", 0);
        h.receive(message(1));
        h.receive(message(2));
        let drained = h.take_inbox();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].observed.day, 1);
        assert_eq!(drained[1].observed.day, 2);
        assert_eq!(h.inbox_len(), 0);
        // The contact log keeps what the inbox drained.
        assert_eq!(h.contact_log().count(), 2);
    }

    #[test]
    fn contact_log_eviction_drops_old_days_only() {
        let mut h = HumanState::new("a", 0);
        h.receive(message(1));
        h.receive(message(10));
        h.evict_history_before(5);
        let days: Vec<u16> = h.contact_log().map(|m| m.observed.day).collect();
        assert_eq!(days, vec![10]);
    }

    #[test]
    fn symptoms_are_invisible_before_onset() {
        let mut h = HumanState::new("a", 0);
        assert!(h.reported_symptoms_at(Timestamp::from_days(100)).is_none());
        h.record_symptoms(Timestamp::from_days(5), vec!["cough".into()], 3);
        assert!(h.reported_symptoms_at(Timestamp::from_days(4)).is_none());
        assert!(h.reported_symptoms_at(Timestamp::from_days(5)).is_some());
        assert_eq!(h.infectiousness_start(), Timestamp::from_days(2));
    }

    #[test]
    fn rotation_streams_differ_across_humans() {
        let mut a = HumanState::new("a", 0);
        let mut b = HumanState::new("b", 0);
        let a_uids: Vec<_> = (0..64)
            .map(|_| {
                a.begin_day();
                a.uid()
            })
            .collect();
        let b_uids: Vec<_> = (0..64)
            .map(|_| {
                b.begin_day();
                b.uid()
            })
            .collect();
        assert_ne!(a_uids, b_uids);
    }

    #[test]
    fn same_seed_and_name_replays_the_same_pseudonyms() {
        let mut a = HumanState::new("a", 42);
        let mut b = HumanState::new("a", 42);
        for _ in 0..16 {
            a.begin_day();
            b.begin_day();
            assert_eq!(a.uid(), b.uid());
        }
    }
}
