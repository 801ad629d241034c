//! High-level session orchestrator.
//!
//! Composes the generator, normalizer, oscillator pool, and safety monitor
//! into the per-tick pipeline: hierarchy update → generate → normalize →
//! create/update voices → safety sample. The engine owns no algorithm of
//! its own; it sequences the parts on one control thread while `render`
//! stays callable from the platform audio callback.

use tracing::{debug, info};
use uuid::Uuid;

use crate::biosignals::BioSignals;
use crate::breath::BreathCycle;
use crate::config::{ConfigError, GaaConfig};
use crate::core_frame::GaaCoreFrame;
use crate::geometry::{normalize::normalize, GeometryGenerator};
use crate::layers::{LayerHierarchy, LAYER_SCALES};
use crate::oscillator::OscillatorEngine;
use crate::safety::SafetyMonitor;
use crate::session::LifecycleState;
use crate::timestamp::TimestampLog;

pub struct GaaEngine {
    config: GaaConfig,
    session_id: Uuid,
    state: LifecycleState,
    hierarchy: LayerHierarchy,
    generator: GeometryGenerator,
    oscillators: OscillatorEngine,
    safety: SafetyMonitor,
    breath_guide: BreathCycle,
    timestamps: TimestampLog,
    frame: GaaCoreFrame,
    /// Session fundamental and master amplitude; the per-tick frame is
    /// derived from these, never from the previous frame.
    base_f0_hz: f32,
    base_a0: f32,
    /// Phase-accumulated session time feeding the frame's drift terms.
    t_accum_sec: f32,
    /// Copy of the most recent rendered block, sampled by the safety step.
    live_tap: Vec<f32>,
}

impl GaaEngine {
    pub fn new(config: GaaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let breath_guide = BreathCycle::from_bpm(config.breath.default_target_bpm);
        let oscillators = OscillatorEngine::new(config.oscillator.clone());
        let safety = SafetyMonitor::new(config.safety.clone());
        let session_id = Uuid::new_v4();
        info!(%session_id, "engine constructed");
        Ok(Self {
            config,
            session_id,
            state: LifecycleState::Idle,
            hierarchy: LayerHierarchy::new(),
            generator: GeometryGenerator::new(),
            oscillators,
            safety,
            breath_guide,
            timestamps: TimestampLog::new(),
            frame: GaaCoreFrame::default(),
            base_f0_hz: GaaCoreFrame::default().f0,
            base_a0: GaaCoreFrame::default().a0,
            t_accum_sec: 0.0,
            live_tap: Vec::new(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn hierarchy(&self) -> &LayerHierarchy {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut LayerHierarchy {
        &mut self.hierarchy
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn safety_mut(&mut self) -> &mut SafetyMonitor {
        &mut self.safety
    }

    pub fn oscillators(&self) -> &OscillatorEngine {
        &self.oscillators
    }

    pub fn current_frame(&self) -> &GaaCoreFrame {
        &self.frame
    }

    /// Apply session parameters (typically from a loaded preset).
    pub fn configure_session(&mut self, fundamental_hz: f32, amplitude: f32, target_bpm: f32) {
        self.hierarchy.retune(fundamental_hz);
        self.base_f0_hz = fundamental_hz;
        self.base_a0 = amplitude.clamp(0.0, 1.0);
        self.frame.f0 = fundamental_hz;
        self.frame.a0 = self.base_a0;
        self.breath_guide = BreathCycle::from_bpm(target_bpm);
        debug!(fundamental_hz, amplitude, target_bpm, "session configured");
    }

    /// Begin a session: arms the duration timer and enters `Generating`.
    pub fn start(&mut self, ts_us: i64) {
        if !self.state.can_transition(LifecycleState::Generating) {
            return;
        }
        self.state = LifecycleState::Generating;
        self.timestamps.start_session(ts_us);
        self.safety.start_monitoring(ts_us);
        info!(session = %self.session_id, "session started");
    }

    /// One control tick. Ordering within the tick is fixed: hierarchy
    /// update → generate → normalize → create/update voices → safety.
    pub fn control_tick(&mut self, ts_us: i64, signals: &BioSignals) -> Result<(), String> {
        let dt_sec = self.timestamps.update_control(ts_us)?;
        let dt_us = (dt_sec * 1_000_000.0) as u64;
        let signals = signals.clamped();

        // 1. Hierarchy update: advance the breath coupling.
        self.breath_guide.tick(dt_us);
        let bpm = self.breath_guide.breaths_per_minute();
        self.generator.update_breath_phase(dt_sec * bpm / 60.0);
        self.t_accum_sec += dt_sec;

        // Most recent frame always wins; no backlog of stale parameters.
        self.frame = self.compute_frame(&signals).sanitized();
        self.oscillators.update_core(&self.frame);

        if self.state == LifecycleState::Generating || self.state == LifecycleState::Playing {
            // 2–4. Generate, normalize, and sync voices to active layers.
            self.sync_voices();
            if self.state == LifecycleState::Generating
                && self.state.can_transition(LifecycleState::Playing)
            {
                self.state = LifecycleState::Playing;
                debug!(session = %self.session_id, "session playing");
            }
        }

        self.oscillators.advance(dt_us);

        if self.state == LifecycleState::FadingOut && self.oscillators.active_count() == 0 {
            self.state = LifecycleState::Stopped;
            info!(session = %self.session_id, "session stopped");
        }

        // 5. Safety sample: live buffer, breathing pace, session duration.
        if !self.live_tap.is_empty() {
            let tap = std::mem::take(&mut self.live_tap);
            self.safety.update_audio_metrics(&tap, ts_us);
            self.live_tap = tap;
        }
        self.safety.update_breathing_metrics(bpm, ts_us);
        self.safety.update_duration(ts_us);

        Ok(())
    }

    /// Begin session teardown: every voice fades, the duration timer is
    /// cancelled. Idempotent; safe mid-fade.
    pub fn stop(&mut self) {
        if self.state.can_transition(LifecycleState::FadingOut) {
            self.state = LifecycleState::FadingOut;
        }
        self.oscillators.stop_all();
        self.safety.stop_monitoring();
        self.timestamps.end_session();
    }

    /// Re-arm a stopped engine for a fresh session.
    pub fn reset(&mut self) {
        if self.state.can_transition(LifecycleState::Idle) {
            self.state = LifecycleState::Idle;
            self.session_id = Uuid::new_v4();
        }
    }

    /// Audio-callback render path; also feeds the safety tap.
    pub fn render(&mut self, out: &mut [f32]) {
        self.oscillators.render(out);
        self.live_tap.clear();
        self.live_tap.extend_from_slice(out);
    }

    fn compute_frame(&self, signals: &BioSignals) -> GaaCoreFrame {
        let breath_phase = self.generator.breath_phase();
        let tau = std::f32::consts::TAU;
        let bpm = self.breath_guide.breaths_per_minute();
        GaaCoreFrame {
            f0: self.base_f0_hz,
            a0: self.base_a0 * (0.75 + 0.25 * signals.hrv / 100.0),
            fc0: self.config.oscillator.sample_rate_hz / 24.0
                * (0.5 + signals.eeg_band_ratio),
            th_n: breath_phase * tau,
            phi_n: signals.eeg_band_ratio,
            k_n: 0.5 + signals.hrv / 100.0,
            t_n: self.t_accum_sec,
            d_th_n_dt: tau * bpm / 60.0,
            az: (self.t_accum_sec * 0.05 * tau).rem_euclid(tau),
            el: 0.3 * (breath_phase * tau).sin(),
        }
    }

    /// Create voices for active layers that lack one and tear down voices
    /// whose layer was deactivated. Geometry is normalized before any
    /// voice creation sees it.
    fn sync_voices(&mut self) {
        let resolution = self.config.geometry.resolution;
        for scale in LAYER_SCALES {
            let layer = self.hierarchy.layer(scale);
            let id = scale.name();
            if layer.active {
                if self.oscillators.voice(id).is_none() {
                    let raw = crate::geometry::generator::generate_layer(
                        layer,
                        self.generator.breath_phase(),
                        resolution,
                    );
                    let normalized = normalize(&raw);
                    self.oscillators.create_voice(&normalized, id);
                }
            } else if self.oscillators.voice(id).is_some() {
                self.oscillators.destroy_voice(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerScale;

    fn engine() -> GaaEngine {
        GaaEngine::new(GaaConfig::default()).unwrap()
    }

    const TICK_US: i64 = 16_000;

    #[test]
    fn start_walks_the_lifecycle() {
        let mut eng = engine();
        assert_eq!(eng.state(), LifecycleState::Idle);
        eng.start(0);
        assert_eq!(eng.state(), LifecycleState::Generating);
        eng.control_tick(TICK_US, &BioSignals::default()).unwrap();
        assert_eq!(eng.state(), LifecycleState::Playing);
        assert_eq!(eng.oscillators().active_count(), 6);
    }

    #[test]
    fn layer_toggle_syncs_voices() {
        let mut eng = engine();
        eng.start(0);
        eng.control_tick(TICK_US, &BioSignals::default()).unwrap();
        eng.hierarchy_mut().set_active(LayerScale::Organism, false);
        eng.control_tick(2 * TICK_US, &BioSignals::default()).unwrap();
        // The organism voice is fading; after the fade it is gone.
        let mut ts = 2 * TICK_US;
        for _ in 0..20 {
            ts += TICK_US;
            eng.control_tick(ts, &BioSignals::default()).unwrap();
        }
        assert_eq!(eng.oscillators().active_count(), 5);
    }

    #[test]
    fn stop_is_idempotent_and_reaches_stopped() {
        let mut eng = engine();
        eng.start(0);
        eng.control_tick(TICK_US, &BioSignals::default()).unwrap();
        eng.stop();
        eng.stop();
        let mut ts = TICK_US;
        for _ in 0..20 {
            ts += TICK_US;
            eng.control_tick(ts, &BioSignals::default()).unwrap();
        }
        assert_eq!(eng.state(), LifecycleState::Stopped);
        assert_eq!(eng.oscillators().active_count(), 0);
        assert!(!eng.safety().is_monitoring());
    }

    #[test]
    fn timestamp_regression_is_surfaced() {
        let mut eng = engine();
        eng.start(0);
        eng.control_tick(10_000, &BioSignals::default()).unwrap();
        assert!(eng.control_tick(5_000, &BioSignals::default()).is_err());
    }

    #[test]
    fn render_feeds_the_safety_tap() {
        let mut eng = engine();
        eng.configure_session(220.0, 1.0, 6.0);
        eng.start(0);
        eng.control_tick(TICK_US, &BioSignals::default()).unwrap();
        let mut buf = vec![0.0f32; 512];
        eng.render(&mut buf);
        eng.control_tick(2 * TICK_US, &BioSignals::default()).unwrap();
        // Six full-amplitude voices sum well past the peak threshold.
        assert!(eng.safety().history().count() > 0);
    }

    #[test]
    fn reset_rearms_after_stop() {
        let mut eng = engine();
        eng.start(0);
        eng.control_tick(TICK_US, &BioSignals::default()).unwrap();
        let first = eng.session_id();
        eng.stop();
        let mut ts = TICK_US;
        for _ in 0..20 {
            ts += TICK_US;
            eng.control_tick(ts, &BioSignals::default()).unwrap();
        }
        eng.reset();
        assert_eq!(eng.state(), LifecycleState::Idle);
        assert_ne!(eng.session_id(), first);
    }
}
