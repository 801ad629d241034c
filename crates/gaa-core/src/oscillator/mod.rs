//! Bounded-pool oscillator engine.
//!
//! A fixed pool of spatialized voices driven by normalized geometry and the
//! current core frame. Allocation is strictly admission controlled: beyond
//! capacity, creation fails without side effects — no eviction, favoring
//! predictability over loudest-wins.

use tracing::{debug, warn};

use crate::config::OscillatorSection;
use crate::core_frame::GaaCoreFrame;
use crate::geometry::Geometry;
use crate::session::LifecycleState;

pub mod voice;

pub use voice::{Ramp, Voice, VoiceShape};

pub struct OscillatorEngine {
    config: OscillatorSection,
    frame: GaaCoreFrame,
    voices: Vec<Voice>,
}

impl OscillatorEngine {
    pub fn new(config: OscillatorSection) -> Self {
        Self {
            config,
            frame: GaaCoreFrame::default(),
            voices: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(OscillatorSection::default())
    }

    fn fade_sec(&self) -> f32 {
        self.config.fade_ms / 1_000.0
    }

    /// Admit a new voice. Returns false — with no side effects — when the
    /// pool is at capacity, the id is already taken, or the geometry fails
    /// the defensive degeneracy check (unreachable for geometry that went
    /// through generate + normalize, which never emit zero faces).
    pub fn create_voice(&mut self, geometry: &Geometry, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.active_count() >= self.config.max_voices {
            debug!(id = %id, capacity = self.config.max_voices, "voice pool at capacity");
            return false;
        }
        if self.voices.iter().any(|v| v.id == id && v.state.is_live()) {
            debug!(id = %id, "voice id already live");
            return false;
        }
        if geometry.is_degenerate() {
            warn!(id = %id, "rejecting degenerate geometry at voice creation");
            return false;
        }
        self.voices.push(Voice::new(id, geometry, &self.frame));
        true
    }

    /// Begin click-free teardown of one voice. Unknown ids are ignored.
    pub fn destroy_voice(&mut self, id: &str) {
        let fade = self.fade_sec();
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.id == id && v.state.is_live())
        {
            voice.begin_fade(fade);
        }
    }

    /// Fade out every live voice. Idempotent and safe mid-fade: voices
    /// already fading keep their ramp, stopped voices are untouched.
    pub fn stop_all(&mut self) {
        let fade = self.fade_sec();
        for voice in &mut self.voices {
            voice.begin_fade(fade);
        }
    }

    /// Adopt the most recent core frame and retarget every live voice.
    /// Frames never queue; the latest always wins.
    pub fn update_core(&mut self, frame: &GaaCoreFrame) {
        self.frame = frame.sanitized();
        for voice in &mut self.voices {
            if voice.state.is_live() {
                voice.retarget(&self.frame);
            }
        }
    }

    /// Live voices, including those still inside the fade-out window.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.state.is_live()).count()
    }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id && v.state.is_live())
    }

    pub fn current_frame(&self) -> &GaaCoreFrame {
        &self.frame
    }

    /// Control-side time step: advance ramps and reap voices whose fade
    /// has completed.
    pub fn advance(&mut self, dt_us: u64) {
        let dt_sec = dt_us as f32 / 1_000_000.0;
        for voice in &mut self.voices {
            voice.advance(dt_sec);
        }
        self.reap();
    }

    /// Additive render into a mono caller buffer at the configured sample
    /// rate, interpolating every ramp per sample. This is the audio-thread
    /// path; it shares no locks with the control side.
    pub fn render(&mut self, out: &mut [f32]) {
        let dt = 1.0 / self.config.sample_rate_hz;
        for sample in out.iter_mut() {
            let mut acc = 0.0f32;
            for voice in &mut self.voices {
                if !voice.state.is_audible() {
                    continue;
                }
                voice.advance(dt);
                voice.phase = (voice.phase + voice.frequency.current * dt).rem_euclid(1.0);
                acc += (voice.phase * std::f32::consts::TAU).sin() * voice.gain.current;
            }
            *sample = acc;
        }
        self.reap();
    }

    fn reap(&mut self) {
        self.voices.retain(|v| v.state != LifecycleState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fallback_triangle;
    use crate::geometry::{generator::generate_layer, normalize};
    use crate::layers::{Layer, LayerScale};

    fn test_geometry() -> Geometry {
        let layer = Layer::new(LayerScale::Cellular);
        normalize::normalize(&generate_layer(&layer, 0.2, 8))
    }

    fn engine() -> OscillatorEngine {
        OscillatorEngine::with_defaults()
    }

    #[test]
    fn pool_admits_exactly_capacity() {
        let mut osc = engine();
        let g = test_geometry();
        for i in 0..32 {
            assert!(osc.create_voice(&g, format!("v{}", i)), "voice {} refused", i);
        }
        assert_eq!(osc.active_count(), 32);
        assert!(!osc.create_voice(&g, "v32"));
        assert_eq!(osc.active_count(), 32);
    }

    #[test]
    fn stop_all_is_idempotent_and_reaches_zero() {
        let mut osc = engine();
        let g = test_geometry();
        for i in 0..5 {
            osc.create_voice(&g, format!("v{}", i));
        }
        osc.stop_all();
        osc.stop_all();
        // Fading voices still count as live until the fade completes.
        assert_eq!(osc.active_count(), 5);
        osc.advance(200_000); // 200 ms > 120 ms fade
        assert_eq!(osc.active_count(), 0);
        osc.stop_all();
        assert_eq!(osc.active_count(), 0);
    }

    #[test]
    fn destroy_fades_before_removal() {
        let mut osc = engine();
        let g = test_geometry();
        osc.create_voice(&g, "solo");
        osc.advance(20_000); // let the attack land
        osc.destroy_voice("solo");
        assert_eq!(osc.active_count(), 1);
        osc.advance(60_000);
        // Mid-fade: still live, gain heading down.
        assert_eq!(osc.active_count(), 1);
        osc.advance(120_000);
        assert_eq!(osc.active_count(), 0);
    }

    #[test]
    fn degenerate_geometry_is_refused() {
        let mut osc = engine();
        let mut g = fallback_triangle();
        g.faces.clear();
        assert!(!osc.create_voice(&g, "bad"));
        assert_eq!(osc.active_count(), 0);
    }

    #[test]
    fn duplicate_live_id_is_refused() {
        let mut osc = engine();
        let g = test_geometry();
        assert!(osc.create_voice(&g, "dup"));
        assert!(!osc.create_voice(&g, "dup"));
        assert_eq!(osc.active_count(), 1);
    }

    #[test]
    fn update_core_retargets_live_voices() {
        let mut osc = engine();
        let g = test_geometry();
        osc.create_voice(&g, "v0");
        let before = osc.voice("v0").unwrap().frequency.target;
        osc.update_core(&GaaCoreFrame {
            f0: 220.0,
            ..Default::default()
        });
        let after = osc.voice("v0").unwrap().frequency.target;
        assert!(after > before);
    }

    #[test]
    fn render_fills_buffer_and_respects_gain() {
        let mut osc = engine();
        let g = test_geometry();
        osc.create_voice(&g, "v0");
        let mut buf = vec![0.0f32; 512];
        osc.render(&mut buf);
        assert!(buf.iter().any(|s| s.abs() > 0.0));
        osc.stop_all();
        // Two seconds of audio is far past the fade; tail must be silent.
        let mut long = vec![0.0f32; 96_000];
        osc.render(&mut long);
        assert_eq!(osc.active_count(), 0);
        assert!(long[long.len() - 1].abs() < 1e-6);
    }
}
