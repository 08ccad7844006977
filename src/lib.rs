//! `exposure`: deterministic risk-diffusion replay for contact-tracing
//! research logs.
//!
//! This is the second-stage engine of a contact-tracing simulator: the
//! upstream epidemic model produces a flat, timestamped log of encounters,
//! symptom onsets, test results, and outcomes; this crate replays that log
//! day by day and computes, for every individual, an infection-risk
//! estimate derived only from locally-observable signals and from
//! anonymized risk summaries exchanged with physical contacts. Alongside
//! the per-day risk trajectory it clusters received messages into
//! inferred-contact groups, which is the measurement used to study
//! privacy/accuracy trade-offs of different protocols.
//!
//! **Goals:**
//! - **Deterministic by default**: a replay is a pure function of (event
//!   log, [`EngineConfig`]). The only randomness is pseudonym rotation,
//!   driven by per-human streams derived from the configured seed. Same
//!   log + same config → identical risk table and cluster export.
//! - **Privacy split in the type system**: diffusion policies only ever
//!   see [`ObservedMessage`]; ground-truth routing ids live on a separate
//!   channel ([`Message::route`]) that exists because the experiment needs
//!   to deliver backward gossip, not because the protocol could.
//! - **Swappable policies**: the three diffusion rules are a closed
//!   [`PolicyKind`] set injected at configuration time; the replay loop
//!   never changes when the policy does.
//!
//! **Diffusion policies:**
//! - [`PolicyKind::Overwrite`]: last message wins, scaled by the
//!   transmission probability.
//! - [`PolicyKind::MonotoneMax`]: risk is a one-way ratchet; a message can
//!   only raise it.
//! - [`PolicyKind::Clustered`]: messages are first clustered against
//!   history ([`ClusterTable`]), and repeated contact with the same
//!   inferred person carries risk continuity across encounters.
//!
//! **Non-goals:**
//! - No biological infection model, no movement model — those live in the
//!   upstream simulator and arrive here only as events.
//! - No cryptographic privacy. Quantized pseudonyms and risks reproduce
//!   the heuristics whose leakage is being measured.
//!
//! # Example
//!
//! ```rust
//! use exposure::{Engine, EngineConfig, Event, EventKind, EventLog, PolicyKind, Timestamp};
//!
//! let encounter = |human: &str, other: &str, day: i64| Event {
//!     human: human.into(),
//!     time: Timestamp::from_days(day),
//!     kind: EventKind::Encounter {
//!         duration_min: 15,
//!         distance_m: 1.5,
//!         counterpart: Some(other.into()),
//!     },
//! };
//! let events = vec![
//!     Event {
//!         human: "ada".into(),
//!         time: Timestamp::from_days(0),
//!         kind: EventKind::SymptomStart {
//!             reported_symptoms: vec!["moderate".into()],
//!         },
//!     },
//!     encounter("ada", "bo", 0),
//!     encounter("bo", "ada", 0),
//!     encounter("ada", "bo", 2),
//!     encounter("bo", "ada", 2),
//! ];
//!
//! let log = EventLog::partition(events)?;
//! let mut engine = Engine::new(
//!     log,
//!     EngineConfig {
//!         policy: PolicyKind::Overwrite,
//!         ..EngineConfig::default()
//!     },
//! )?;
//! let table = engine.run();
//! // Two humans over replay days 0 and 1.
//! assert_eq!(table.len(), 4);
//! # Ok::<(), exposure::EngineError>(())
//! ```

#![forbid(unsafe_code)]

mod cluster;
pub use cluster::*;

mod codec;
pub use codec::*;

mod config;
pub use config::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod events;
pub use events::*;

mod human;
pub use human::*;

mod metrics;
pub use metrics::*;

mod policy;
pub use policy::*;
