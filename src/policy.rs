//! Local risk estimation and the risk-diffusion policies.
//!
//! [`local_risk`] maps a human's own observable state (symptoms, tests,
//! resolution) to a score, independent of any message exchange. The
//! [`PolicyKind`] variants then decide how a single received message moves
//! the estimate. The set is closed and chosen once at configuration time;
//! swapping the active policy never touches the replay loop.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{MessageCodec, ObservedMessage};
use crate::error::EngineError;
use crate::events::Timestamp;
use crate::human::HumanState;

/// Severity tags recognized among self-reported symptoms.
pub const SEVERE: &str = "severe";
pub const MODERATE: &str = "moderate";
pub const MILD: &str = "mild";

/// Local risk score from observable state only.
///
/// Deterministic, side-effect-free, and never reads other humans' state.
/// Rules in priority order, first match wins:
///
/// 1. resolved (recovered or dead) — `0.0`, no residual risk;
/// 2. positive test on record (with a two-day grace on the sample time) —
///    `1.0`, a confirmed case dominates everything below;
/// 3. severity-tagged symptoms — `severe` 0.75, `moderate` 0.5, `mild`
///    0.25;
/// 4. untagged symptom counts — more than 3 distinct: 0.25, more than 1:
///    0.1, any: 0.05, none: 0.0.
pub fn local_risk(human: &HumanState, now: Timestamp) -> f64 {
    if human.time_of_recovery() < now || human.time_of_death() < now {
        return 0.0;
    }
    if let Some(test) = human.test() {
        if test.positive && test.time < now.plus_days(2) {
            return 1.0;
        }
    }
    match human.reported_symptoms_at(now) {
        None => 0.0,
        Some(symptoms) => {
            if symptoms.contains(SEVERE) {
                0.75
            } else if symptoms.contains(MODERATE) {
                0.5
            } else if symptoms.contains(MILD) {
                0.25
            } else if symptoms.len() > 3 {
                0.25
            } else if symptoms.len() > 1 {
                0.1
            } else if !symptoms.is_empty() {
                0.05
            } else {
                0.0
            }
        }
    }
}

/// Closed set of risk-diffusion policies.
///
/// Selected once at startup (string selectors parse via [`FromStr`]; an
/// unrecognized selector is [`EngineError::PolicyMisconfiguration`]) and
/// injected into the replay loop — there is no per-call string dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Last message wins: `risk = m_risk × transmission_proba`. No memory
    /// of prior messages.
    Overwrite,
    /// One-way ratchet: a single encounter can only raise risk, by
    /// `(m_risk − m_risk × risk) × transmission_proba` when the message
    /// reports more risk than the human already carries.
    #[default]
    MonotoneMax,
    /// Cluster-aware carry-over: repeated contact with the same inferred
    /// person blends the change since their last message with a decayed
    /// carry-over of previously accumulated risk.
    Clustered,
}

impl PolicyKind {
    /// Apply one received message to `human` under this policy.
    ///
    /// Only the observed part of the message is available here; the routing
    /// channel never reaches a policy.
    pub fn update_risk_encounter(
        &self,
        human: &mut HumanState,
        message: &ObservedMessage,
        codec: &MessageCodec,
        transmission_proba: f64,
    ) {
        let m_risk = codec.risk_value(message.risk);
        match self {
            PolicyKind::Overwrite => {
                human.set_risk(m_risk * transmission_proba);
            }
            PolicyKind::MonotoneMax => {
                if human.risk() < m_risk {
                    let delta = (m_risk - m_risk * human.risk()) * transmission_proba;
                    human.set_risk(human.risk() + delta);
                }
            }
            PolicyKind::Clustered => {
                let key = codec.encode(message);
                let known = human.clusters.contains(message);
                human.clusters.assign(message, key, m_risk, transmission_proba);
                let delta;
                {
                    let entry = human
                        .clusters
                        .get_mut(message)
                        .expect("assign always leaves an entry for the message");
                    delta = if known {
                        (m_risk - entry.previous_risk) * transmission_proba
                            + entry.previous_risk * entry.carry_over_transmission_proba
                    } else {
                        m_risk * transmission_proba
                    };
                    entry.previous_risk = m_risk;
                    entry.carry_over_transmission_proba = transmission_proba * (1.0 - delta);
                }
                human.set_risk(human.risk() + delta);
            }
        }
    }
}

impl FromStr for PolicyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<PolicyKind, EngineError> {
        match s {
            "overwrite" => Ok(PolicyKind::Overwrite),
            "monotone-max" => Ok(PolicyKind::MonotoneMax),
            "clustered" => Ok(PolicyKind::Clustered),
            other => Err(EngineError::PolicyMisconfiguration {
                selector: other.to_string(),
            }),
        }
    }
}
