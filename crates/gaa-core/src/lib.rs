//! GAA core: deterministic geometry generation, bounded oscillator pool,
//! and threshold-based safety monitoring for live geometric audio.
//!
//! The control surface is synchronous by design: one control thread ticks
//! the pipeline (hierarchy → generate → normalize → voices → safety) while
//! the platform audio callback pulls `render`. Parameters travel as ramp
//! targets, never as synchronous handshakes.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_clamp)]
#![allow(clippy::new_without_default)]

pub mod biosignals;
pub mod breath;
pub mod config;
pub mod core_frame;
pub mod engine;
pub mod geometry;
pub mod layers;
pub mod oscillator;
pub mod safety;
pub mod session;
pub mod timestamp;

#[cfg(test)]
mod tests_proptest;

// Configuration
pub use config::{
    BreathSection, ConfigError, GaaConfig, GeometrySection, OscillatorSection, SafetySection,
};

// Layer hierarchy
pub use layers::{Layer, LayerHierarchy, LayerScale, LAYER_SCALES};

// Geometry pipeline
pub use geometry::{
    fallback_triangle, generator::generate_layer, normalize::normalize, Geometry,
    GeometryGenerator, SacredRatios,
};

// Synthesis parameters and voices
pub use core_frame::GaaCoreFrame;
pub use oscillator::{OscillatorEngine, Ramp, Voice, VoiceShape};

// Safety monitoring
pub use safety::{
    AlertCategory, AlertSeverity, SafetyAlert, SafetyLevel, SafetyMonitor, SafetyStatus,
};

// Lifecycle + time
pub use session::LifecycleState;
pub use timestamp::{dt_sec, TimestampLog};

// Biosignals + breath guide
pub use biosignals::BioSignals;
pub use breath::{BreathCycle, BreathDurations, BreathPhase};

// Orchestrator
pub use engine::GaaEngine;
