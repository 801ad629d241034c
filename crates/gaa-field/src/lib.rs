//! Multi-participant coherence layer.
//!
//! Each node owns a prime-ratio frequency lattice and detects lock against
//! externally observed frequencies on its own — detection is local and
//! symmetric, there is no leader and no negotiation round. Locked nodes
//! amplify their output gain along a smooth ramp; the per-participant
//! coherence readings aggregate into a session-wide collective field.

pub mod field;
pub mod lattice;
pub mod participant;

pub use field::{CollectiveField, FieldSummary};
pub use lattice::{FrequencyLattice, LockConfig, LockDetector};
pub use participant::{ParticipantId, ParticipantSnapshot, ParticipantState};

/// Result type for field operations.
pub type FieldResult<T> = Result<T, FieldError>;

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
