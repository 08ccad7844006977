//! The day-stepped replay loop.
//!
//! Ordering contract (the correctness property of this module): for a given
//! day, every human finishes inbox processing on the previous days'
//! messages before any of that day's encounters are ingested, and
//! cross-human gossip writes are buffered and flushed only after every
//! human has finished its own day. A freshly ingested or gossiped message
//! is therefore never processed on the day it arrives — one-day latency by
//! construction — and the whole replay is a pure function of the event log
//! and the configuration.
//!
//! Per human, per day:
//!
//! 1. snapshot the start-of-day risk;
//! 2. rotate the pseudonym;
//! 3. overwrite risk with the local estimate;
//! 4. infectiousness transition (terminal states latch off);
//! 5. process the inbox, oldest message first, under the active policy;
//! 6. ingest today's encounters as reciprocal messages;
//! 7. on a significant risk swing, queue backward gossip to recent
//!    plausible contacts;
//! 8. record `(risk, is_infectious, name)` for the day.
//!
//! Phases 1–5 run for the whole population before phase 6 starts anywhere.

use std::collections::BTreeMap;

use tracing::debug;

use crate::codec::{Message, MessageCodec};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EventLog, Timestamp};
use crate::human::HumanState;
use crate::metrics::{ClusterRow, HumanClusters, RiskRow, RiskTable};
use crate::policy::local_risk;

/// Whether a day's risk swing is large enough to trigger backward gossip.
/// Strict inequality: a swing of exactly the threshold does not fire.
pub(crate) fn significant_swing(start: f64, end: f64, threshold: f64) -> bool {
    (start - end).abs() > threshold
}

/// The replay orchestrator.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    codec: MessageCodec,
    start: Timestamp,
    first_day: i64,
    /// Exclusive upper bound: the last encounter day itself is not replayed.
    last_day: i64,
    next_day: i64,
    humans: BTreeMap<String, HumanState>,
    encounters: BTreeMap<String, BTreeMap<i64, Vec<String>>>,
    metrics: RiskTable,
    dropped_events: u64,
}

impl Engine {
    /// Build the population table from a partitioned log and apply the
    /// non-encounter sub-streams. Every fatal condition surfaces here;
    /// [`run`](Self::run) itself cannot fail.
    pub fn new(log: EventLog, config: EngineConfig) -> Result<Engine, EngineError> {
        config.validate()?;
        let codec = MessageCodec::new(config.risk_quantization_bits)?;

        let (first_day, last_day) = match log.encounter_span() {
            Some((lo, hi)) => (lo, hi),
            None => (0, 0),
        };
        if last_day > i64::from(u16::MAX) {
            return Err(EngineError::InvalidConfig {
                reason: format!("encounter day {last_day} exceeds the 16-bit wire day"),
            });
        }

        let EventLog {
            start,
            humans: names,
            encounters,
            symptoms,
            tests,
            outcomes,
            dropped_malformed,
            ..
        } = log;

        let mut humans: BTreeMap<String, HumanState> = names
            .iter()
            .map(|name| (name.clone(), HumanState::new(name.clone(), config.seed)))
            .collect();
        // Partitioning collected the id set from these very records, so the
        // lookups below cannot miss.
        for record in &symptoms {
            humans
                .get_mut(&record.human)
                .expect("partition lists every human id")
                .record_symptoms(
                    record.time,
                    record.reported.clone(),
                    config.symptom_plausibility_days,
                );
        }
        for record in &tests {
            humans
                .get_mut(&record.human)
                .expect("partition lists every human id")
                .record_test(record.time, record.positive);
        }
        for record in &outcomes {
            humans
                .get_mut(&record.human)
                .expect("partition lists every human id")
                .record_outcome(record.time, record.death);
        }

        Ok(Engine {
            config,
            codec,
            start,
            first_day,
            last_day,
            next_day: first_day,
            humans,
            encounters,
            metrics: RiskTable::default(),
            dropped_events: dropped_malformed,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replay span as `[first, last)` day indices.
    pub fn days(&self) -> (i64, i64) {
        (self.first_day, self.last_day)
    }

    pub fn population(&self) -> usize {
        self.humans.len()
    }

    /// Malformed events the partitioner dropped for this run.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn human(&self, name: &str) -> Option<&HumanState> {
        self.humans.get(name)
    }

    pub fn risk_table(&self) -> &RiskTable {
        &self.metrics
    }

    /// Replay one day; `None` once the span is exhausted.
    pub fn step(&mut self) -> Option<i64> {
        if self.next_day >= self.last_day {
            return None;
        }
        let day = self.next_day;
        self.next_day += 1;
        self.run_day(day);
        Some(day)
    }

    /// Replay every remaining day and return the accumulated risk table.
    pub fn run(&mut self) -> &RiskTable {
        while self.step().is_some() {}
        &self.metrics
    }

    fn run_day(&mut self, day: i64) {
        let today = self.start.plus_days(day);
        let retention_cutoff = day - self.config.gossip_lookback_days;
        let policy = self.config.policy;
        let transmission = self.config.transmission_probability;
        let codec = self.codec;

        // Phases 1-5 for everyone before any ingestion: inbox processing
        // must see only previous days' messages.
        for human in self.humans.values_mut() {
            human.begin_day();
            let local = local_risk(human, today);
            human.set_risk(local);
            human.update_infectiousness(today);
            for message in human.take_inbox() {
                policy.update_risk_encounter(human, &message.observed, &codec, transmission);
            }
            human.evict_history_before(retention_cutoff);
        }

        // Phases 6-8. Gossip targets other humans' inboxes, so it goes
        // through a buffer flushed after the whole population is done.
        let wire_day = day as u16;
        let mut gossip: Vec<(String, Message)> = Vec::new();
        let names: Vec<String> = self.humans.keys().cloned().collect();
        for name in &names {
            // 6. Reciprocal messages from today's encounters, built from the
            // counterpart's current pseudonym and risk. Queued, not
            // processed: they wait for tomorrow's phase 5.
            if let Some(counterparts) = self.encounters.get(name).and_then(|by_day| by_day.get(&day))
            {
                let messages: Vec<Message> = counterparts
                    .iter()
                    .map(|counterpart| {
                        self.humans
                            .get(counterpart)
                            .expect("counterparts validated at partition")
                            .current_message(wire_day, &codec)
                    })
                    .collect();
                let human = self
                    .humans
                    .get_mut(name)
                    .expect("iterating the population's own keys");
                for message in messages {
                    human.receive(message);
                }
            }

            // 7. Backward gossip: on a significant swing, notify recent
            // contacts whose encounter plausibly overlapped the
            // presymptomatic window.
            let human = &self.humans[name];
            if significant_swing(
                human.day_start_risk(),
                human.risk(),
                self.config.significance_threshold,
            ) {
                let outgoing = human.current_message(wire_day, &codec);
                for message in human.contact_log() {
                    let contact_day = i64::from(message.observed.day);
                    let contact_time = self.start.plus_days(contact_day);
                    let within_window = day - contact_day < self.config.gossip_lookback_days;
                    let plausible = human.symptoms_start()
                        < contact_time.plus_days(self.config.symptom_plausibility_days);
                    if within_window && plausible {
                        gossip.push((message.route.clone(), outgoing.clone()));
                    }
                }
            }

            // 8. Record the day.
            self.metrics.record(RiskRow {
                day,
                human: human.name().to_string(),
                risk: human.risk(),
                is_infectious: human.is_infectious(),
            });
        }

        // Deliver buffered gossip only now, so nobody processes a same-day
        // gossip message.
        let queued = gossip.len();
        for (target, message) in gossip {
            if let Some(human) = self.humans.get_mut(&target) {
                human.receive(message);
            }
        }
        debug!(day, gossip = queued, "replayed day");
    }

    /// Final cluster tables of every human, one record collection per
    /// human, for offline privacy analysis.
    pub fn export_clusters(&self) -> Vec<HumanClusters> {
        self.humans
            .values()
            .map(|human| HumanClusters {
                human: human.name().to_string(),
                clusters: human
                    .clusters()
                    .rows()
                    .map(|(key, state)| ClusterRow {
                        key,
                        assignment: state.assignment,
                        previous_risk: state.previous_risk,
                        carry_over_transmission_proba: state.carry_over_transmission_proba,
                    })
                    .collect(),
            })
            .collect()
    }
}
