//! Event data model and the event-log partitioner.
//!
//! The upstream epidemic simulator hands over a flat, timestamped stream of
//! typed events. [`EventLog::partition`] splits that stream into the
//! sub-streams the replay needs (encounters, symptom onsets, test results,
//! terminal outcomes) and indexes encounters by `(human, day)` so the daily
//! loop can look up a human's encounters in O(1).
//!
//! Time stays on the upstream clock: minute-granular instants, with day
//! indices derived by floor division from the log's first event.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;

/// Minutes per replay day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minute-granular instant on the upstream simulator's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for "has not happened": compares greater than any replayed
    /// instant and survives day arithmetic unchanged.
    pub const NEVER: Timestamp = Timestamp(i64::MAX);

    pub fn from_minutes(minutes: i64) -> Self {
        Timestamp(minutes)
    }

    pub fn from_days(days: i64) -> Self {
        Timestamp(days.saturating_mul(MINUTES_PER_DAY))
    }

    pub fn minutes(self) -> i64 {
        self.0
    }

    pub fn is_never(self) -> bool {
        self == Self::NEVER
    }

    /// Day offset of `self` from `start` (floor division, so an instant
    /// before `start` lands on a negative day).
    pub fn day_index(self, start: Timestamp) -> i64 {
        self.0.saturating_sub(start.0).div_euclid(MINUTES_PER_DAY)
    }

    pub fn plus_days(self, days: i64) -> Self {
        if self.is_never() {
            return self;
        }
        Timestamp(self.0.saturating_add(days.saturating_mul(MINUTES_PER_DAY)))
    }

    pub fn minus_days(self, days: i64) -> Self {
        if self.is_never() {
            return self;
        }
        Timestamp(self.0.saturating_sub(days.saturating_mul(MINUTES_PER_DAY)))
    }
}

/// One record of the upstream simulator's flat event log. Created once by
/// the upstream simulator; the replay only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable id of the human this event belongs to.
    pub human: String,
    pub time: Timestamp,
    pub kind: EventKind,
}

/// Typed event payloads.
///
/// Fields marked *unobserved* are ground truth the simulated protocol never
/// sees; they exist for routing and evaluation only and are kept away from
/// the diffusion policies by construction (see [`crate::Message`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Physical encounter. `duration_min` and `distance_m` are observed;
    /// `counterpart` is the unobserved id of the other party, used only to
    /// mint the reciprocal message and route backward gossip.
    Encounter {
        duration_min: u32,
        distance_m: f64,
        counterpart: Option<String>,
    },
    /// Lab test result (observed).
    Test { positive: bool },
    /// Onset of self-reported symptoms (observed).
    SymptomStart { reported_symptoms: Vec<String> },
    /// Ground-truth exposure marker. Recognized and counted, feeds no state.
    Contamination,
    /// Terminal outcome (unobserved): recovery, or death when `death` is set.
    Recovered { death: bool },
}

#[derive(Debug, Clone)]
pub(crate) struct SymptomRecord {
    pub human: String,
    pub time: Timestamp,
    pub reported: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct TestResultRecord {
    pub human: String,
    pub time: Timestamp,
    pub positive: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct OutcomeRecord {
    pub human: String,
    pub time: Timestamp,
    pub death: bool,
}

/// Typed, indexed view of a raw event stream.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub(crate) start: Timestamp,
    pub(crate) humans: BTreeSet<String>,
    /// Encounter counterparts by human, then by day index.
    pub(crate) encounters: BTreeMap<String, BTreeMap<i64, Vec<String>>>,
    pub(crate) symptoms: Vec<SymptomRecord>,
    pub(crate) tests: Vec<TestResultRecord>,
    pub(crate) outcomes: Vec<OutcomeRecord>,
    pub(crate) encounter_days: Option<(i64, i64)>,
    pub(crate) dropped_malformed: u64,
    pub(crate) contamination_events: u64,
}

impl EventLog {
    /// Split a raw event stream into typed sub-streams and index encounters
    /// by `(human, day)`.
    ///
    /// The replay only requires encounters to be time-ordered; the whole
    /// stream is sorted here (stably) so day indexing does not depend on
    /// input order. A malformed event — an encounter without a counterpart
    /// id — is dropped with a warning and counted; an encounter whose
    /// counterpart never appears anywhere else in the log is fatal, because
    /// the population table is built from the full id set before replay
    /// begins.
    pub fn partition(mut events: Vec<Event>) -> Result<EventLog, EngineError> {
        let start = events
            .iter()
            .map(|e| e.time)
            .min()
            .unwrap_or(Timestamp::from_minutes(0));
        let humans: BTreeSet<String> = events.iter().map(|e| e.human.clone()).collect();
        events.sort_by_key(|e| e.time);

        let mut encounters: BTreeMap<String, BTreeMap<i64, Vec<String>>> = BTreeMap::new();
        let mut symptoms = Vec::new();
        let mut tests = Vec::new();
        let mut outcomes = Vec::new();
        let mut encounter_days: Option<(i64, i64)> = None;
        let mut dropped_malformed = 0u64;
        let mut contamination_events = 0u64;

        for event in events {
            match event.kind {
                EventKind::Encounter { counterpart, .. } => {
                    let Some(counterpart) = counterpart else {
                        dropped_malformed += 1;
                        warn!(human = %event.human, "dropping encounter without counterpart id");
                        continue;
                    };
                    if !humans.contains(&counterpart) {
                        return Err(EngineError::UnknownHuman { human: counterpart });
                    }
                    let day = event.time.day_index(start);
                    encounter_days = Some(match encounter_days {
                        None => (day, day),
                        Some((lo, hi)) => (lo.min(day), hi.max(day)),
                    });
                    encounters
                        .entry(event.human)
                        .or_default()
                        .entry(day)
                        .or_default()
                        .push(counterpart);
                }
                EventKind::Test { positive } => tests.push(TestResultRecord {
                    human: event.human,
                    time: event.time,
                    positive,
                }),
                EventKind::SymptomStart { reported_symptoms } => symptoms.push(SymptomRecord {
                    human: event.human,
                    time: event.time,
                    reported: reported_symptoms,
                }),
                EventKind::Contamination => contamination_events += 1,
                EventKind::Recovered { death } => outcomes.push(OutcomeRecord {
                    human: event.human,
                    time: event.time,
                    death,
                }),
            }
        }

        if dropped_malformed > 0 {
            warn!(dropped = dropped_malformed, "dropped malformed events during partition");
        }

        Ok(EventLog {
            start,
            humans,
            encounters,
            symptoms,
            tests,
            outcomes,
            encounter_days,
            dropped_malformed,
            contamination_events,
        })
    }

    /// Instant of the earliest event; day indices count from here.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Every human id appearing in the log.
    pub fn humans(&self) -> &BTreeSet<String> {
        &self.humans
    }

    /// `(first, last)` encounter day indices, inclusive, or `None` when the
    /// log holds no well-formed encounter.
    pub fn encounter_span(&self) -> Option<(i64, i64)> {
        self.encounter_days
    }

    /// Malformed events dropped during partitioning.
    pub fn dropped_malformed(&self) -> u64 {
        self.dropped_malformed
    }

    /// Contamination markers seen (counted only; they feed no state).
    pub fn contamination_events(&self) -> u64 {
        self.contamination_events
    }
}
