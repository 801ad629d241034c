//! Voice/session lifecycle state machine.
//!
//! Explicit enumerated transitions shared by the engine session and the
//! oscillator voices. Safety alerts are orthogonal cross-cutting state and
//! never drive this machine directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    Generating,
    Playing,
    FadingOut,
    Stopped,
}

impl LifecycleState {
    /// Enumerated transition table. `Stopped -> Idle` re-arms the machine
    /// for reuse; everything else follows the forward lifecycle.
    pub fn can_transition(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Generating)
                | (Generating, Playing)
                | (Generating, FadingOut)
                | (Playing, FadingOut)
                | (FadingOut, Stopped)
                | (Stopped, Idle)
        )
    }

    pub fn is_audible(self) -> bool {
        matches!(self, LifecycleState::Playing | LifecycleState::FadingOut)
    }

    /// Live means not yet torn down: everything between creation and the
    /// end of the fade-out window.
    pub fn is_live(self) -> bool {
        !matches!(self, LifecycleState::Stopped)
    }

    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Generating => "generating",
            LifecycleState::Playing => "playing",
            LifecycleState::FadingOut => "fading-out",
            LifecycleState::Stopped => "stopped",
        }
    }
}
