//! Participant identity and exchanged session snapshots.

use serde::{Deserialize, Serialize};

use crate::lattice::LockDetector;
use crate::{FieldError, FieldResult};

/// Unique participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Generate a new random participant ID.
    pub fn generate() -> Self {
        let random: u64 = rand::random();
        Self(format!("gaa-{:016x}", random))
    }

    pub fn new_from_str(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant's contribution to the collective field. Each node
/// writes only its own entry; nobody mutates another participant's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Resonance strength in [0, 1].
    pub resonance: f32,
    /// Fraction of the local lattice currently matched.
    pub coherence: f32,
    /// Breath polarity in [-1, 1] (inhale positive).
    pub polarity: f32,
    pub lat: Option<f32>,
    pub lon: Option<f32>,
}

impl Default for ParticipantState {
    fn default() -> Self {
        Self {
            resonance: 0.0,
            coherence: 0.0,
            polarity: 0.0,
            lat: None,
            lon: None,
        }
    }
}

/// The wire record a participant publishes to its peers. The transport
/// layer delivers these best-effort; late or missing snapshots degrade to
/// not-locked, never to an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub state: ParticipantState,
    /// Published frequency lattice, for peers' local lock detection.
    pub lattice: Vec<f32>,
    pub ts_us: i64,
}

impl ParticipantSnapshot {
    /// Capture the publishable view of a local detector.
    pub fn capture(
        id: ParticipantId,
        detector: &LockDetector,
        polarity: f32,
        ts_us: i64,
    ) -> Self {
        Self {
            id,
            state: ParticipantState {
                resonance: (detector.gain() - 1.0).clamp(0.0, 1.0),
                coherence: detector.coherence(),
                polarity: polarity.clamp(-1.0, 1.0),
                lat: None,
                lon: None,
            },
            lattice: detector.lattice().frequencies.clone(),
            ts_us,
        }
    }

    pub fn with_location(mut self, lat: f32, lon: f32) -> Self {
        self.state.lat = Some(lat);
        self.state.lon = Some(lon);
        self
    }

    pub fn encode(&self) -> FieldResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> FieldResult<Self> {
        if payload.is_empty() {
            return Err(FieldError::InvalidPayload("empty snapshot payload".into()));
        }
        Ok(serde_json::from_slice(payload)?)
    }
}
