//! Lossy message codec: rotating pseudonyms, quantized risk, packed keys.
//!
//! Everything a human shares about itself goes through this module, and
//! everything here is lossy on purpose. The pseudonym is 4 bits and rotates
//! daily; the shared risk is rounded to a fixed number of levels before it
//! leaves the sender. Two senders whose true risk differs by less than one
//! level are indistinguishable to the receiver; the clustering heuristic
//! then measures how much of that blurred identity can be won back.
//!
//! [`MessageCodec::encode`]/[`MessageCodec::decode`] are exact inverses for
//! every message the codec itself produces; a key whose risk level does not
//! fit the configured width fails to decode, which indicates a codec
//! mismatch between sender and receiver rather than bad data.

use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Number of pseudonym segments (bits).
pub const UID_SEGMENTS: usize = 4;

/// Rotating 4-bit pseudonym standing in for a human's identity in exchanged
/// messages.
///
/// Rotation drops the oldest bit and appends a fresh random one, so
/// linkability degrades by one prefix segment per elapsed day — the shape
/// the cluster scoring ladder is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuantizedUid([u8; UID_SEGMENTS]);

impl QuantizedUid {
    /// Build from raw segments; anything nonzero reads as a set bit.
    pub fn from_bits(bits: [u8; UID_SEGMENTS]) -> Self {
        QuantizedUid(bits.map(|b| b & 1))
    }

    pub fn bits(&self) -> &[u8; UID_SEGMENTS] {
        &self.0
    }

    /// Whether the first `n` segments agree (`n <= 4`).
    pub fn prefix_matches(&self, other: &QuantizedUid, n: usize) -> bool {
        self.0[..n] == other.0[..n]
    }

    pub(crate) fn random(rng: &mut StdRng) -> Self {
        let mut bits = [0u8; UID_SEGMENTS];
        for bit in &mut bits {
            *bit = rng.random_range(0..=1);
        }
        QuantizedUid(bits)
    }

    /// Daily rotation: shift left one segment, append a fresh random bit.
    pub(crate) fn rotate(&mut self, rng: &mut StdRng) {
        self.0.rotate_left(1);
        self.0[UID_SEGMENTS - 1] = rng.random_range(0..=1);
    }

    fn nibble(self) -> u8 {
        self.0
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | (bit & 1))
    }

    fn from_nibble(nibble: u8) -> Self {
        let mut bits = [0u8; UID_SEGMENTS];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = (nibble >> (UID_SEGMENTS - 1 - i)) & 1;
        }
        QuantizedUid(bits)
    }
}

impl fmt::Display for QuantizedUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

/// Risk estimate rounded to one of `2^bits` discrete levels before sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuantizedRisk(u8);

impl QuantizedRisk {
    pub fn level(self) -> u8 {
        self.0
    }
}

/// The portion of an encounter message visible to the receiving protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedMessage {
    /// The sender's pseudonym on the encounter day.
    pub uid: QuantizedUid,
    /// The sender's risk, quantized.
    pub risk: QuantizedRisk,
    /// Encounter day index on the wire.
    pub day: u16,
}

/// One encounter as perceived by the receiving human.
///
/// `route` is the ground-truth return address used only to deliver backward
/// gossip; a deployed protocol would not have it. Diffusion policies receive
/// the `observed` part only, so the type system keeps the two channels
/// apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub observed: ObservedMessage,
    pub route: String,
}

/// Compact encoded form of an [`ObservedMessage`].
///
/// Layout: day in the high 16 bits, pseudonym nibble in the next byte, risk
/// level in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageKey(u32);

impl MessageKey {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Encoder/decoder between observed messages and packed keys at a fixed
/// risk bit-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCodec {
    bits: u8,
}

impl MessageCodec {
    /// A codec for `bits`-wide risk quantization (`1..=8`).
    pub fn new(bits: u8) -> Result<MessageCodec, EngineError> {
        if !(1..=8).contains(&bits) {
            return Err(EngineError::InvalidConfig {
                reason: format!("risk quantization bit-width {bits} outside 1..=8"),
            });
        }
        Ok(MessageCodec { bits })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of representable levels, `2^bits`.
    pub fn levels(&self) -> u16 {
        1u16 << self.bits
    }

    /// Quantize a risk estimate: round to the nearest level, clamped to the
    /// top one (so `1.0` shares as `(2^bits − 1) / 2^bits`).
    pub fn quantize(&self, risk: f64) -> QuantizedRisk {
        let levels = f64::from(self.levels());
        let level = (risk.max(0.0) * levels).round() as i64;
        QuantizedRisk(level.clamp(0, i64::from(self.levels()) - 1) as u8)
    }

    /// Decoded value of a level: `level / 2^bits`. Level 8 at width 4 is
    /// exactly 0.5.
    pub fn risk_value(&self, risk: QuantizedRisk) -> f64 {
        f64::from(risk.0) / f64::from(self.levels())
    }

    pub fn encode(&self, message: &ObservedMessage) -> MessageKey {
        MessageKey(
            u32::from(message.day) << 16
                | u32::from(message.uid.nibble()) << 8
                | u32::from(message.risk.0),
        )
    }

    /// Exact inverse of [`encode`](Self::encode). Fails when the stored risk
    /// level does not fit this codec's width.
    pub fn decode(&self, key: MessageKey) -> Result<ObservedMessage, EngineError> {
        let level = (key.0 & 0xff) as u8;
        if u16::from(level) >= self.levels() {
            return Err(EngineError::InvalidQuantization {
                level,
                bits: self.bits,
            });
        }
        Ok(ObservedMessage {
            uid: QuantizedUid::from_nibble(((key.0 >> 8) & 0x0f) as u8),
            risk: QuantizedRisk(level),
            day: (key.0 >> 16) as u16,
        })
    }
}
