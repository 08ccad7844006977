//! Error taxonomy for the replay engine.
//!
//! Event-level problems are isolated per event wherever possible: a
//! malformed event is dropped with a warning at partition time and the rest
//! of the log stays usable. The variants here are the unrecoverable cases —
//! all of them surface at startup or decode time, never mid-replay.

use thiserror::Error;

/// Errors that can occur while building or running a replay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An encounter referenced a human id never seen elsewhere in the log.
    ///
    /// The population table is built from the full id set before replay
    /// begins, so an id with no state record is fatal for the whole run.
    #[error("unknown human id `{human}` referenced by an encounter")]
    UnknownHuman {
        /// The id that has no state record.
        human: String,
    },

    /// A decoded message carried a risk level outside the configured
    /// quantization width: the sender and receiver codecs disagree.
    #[error("quantized risk level {level} does not fit {bits}-bit quantization")]
    InvalidQuantization {
        /// The out-of-range level found in the key.
        level: u8,
        /// The bit-width the decoding codec was configured with.
        bits: u8,
    },

    /// Unrecognized diffusion-policy selector. Raised when parsing the
    /// selector string at startup, never per call.
    #[error(
        "unrecognized diffusion policy `{selector}` \
         (expected `overwrite`, `monotone-max`, or `clustered`)"
    )]
    PolicyMisconfiguration {
        /// The selector string that failed to parse.
        selector: String,
    },

    /// A configuration value was out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the value.
        reason: String,
    },
}
