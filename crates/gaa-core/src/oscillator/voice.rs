//! Single synthesized voice: parameter ramps and lifecycle.

use serde::{Deserialize, Serialize};

use crate::core_frame::GaaCoreFrame;
use crate::geometry::Geometry;
use crate::session::LifecycleState;

/// Linear parameter ramp. The control side writes targets; the render side
/// interpolates toward them, never waiting on an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub current: f32,
    pub target: f32,
    /// Absolute change per second.
    pub rate_per_sec: f32,
}

impl Ramp {
    pub fn new(value: f32, rate_per_sec: f32) -> Self {
        Self {
            current: value,
            target: value,
            rate_per_sec,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Retarget with a rate chosen so the ramp lands in `time_sec`.
    pub fn set_target_over(&mut self, target: f32, time_sec: f32) {
        self.target = target;
        let dist = (target - self.current).abs();
        self.rate_per_sec = if time_sec > 1e-6 { dist / time_sec } else { f32::MAX };
    }

    pub fn advance(&mut self, dt_sec: f32) {
        let step = self.rate_per_sec * dt_sec.max(0.0);
        let diff = self.target - self.current;
        if diff.abs() <= step {
            self.current = self.target;
        } else {
            self.current += step * diff.signum();
        }
    }

    pub fn is_settled(&self) -> bool {
        (self.target - self.current).abs() < 1e-6
    }
}

/// Geometry-derived voice character, captured once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceShape {
    /// RMS vertex extent relative to the bounding radius, in (0, 1].
    pub shape: f32,
    /// Geometry center offset carried into panning.
    pub center: [f32; 3],
    pub radius: f32,
    pub phi: f32,
    pub sqrt2: f32,
}

impl VoiceShape {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let n = geometry.vertices.len().max(1) as f32;
        let mut sum_sq = 0.0f32;
        for v in &geometry.vertices {
            let dx = v[0] - geometry.center[0];
            let dy = v[1] - geometry.center[1];
            let dz = v[2] - geometry.center[2];
            sum_sq += dx * dx + dy * dy + dz * dz;
        }
        let rms = (sum_sq / n).sqrt();
        let radius = geometry.radius.max(1e-6);
        Self {
            shape: (rms / radius).clamp(1e-3, 1.0),
            center: geometry.center,
            radius: geometry.radius,
            phi: geometry.ratios.phi,
            sqrt2: geometry.ratios.sqrt2,
        }
    }

    /// Carrier frequency for the current frame: the golden-ratio spread
    /// scales with how much of the shell the shape actually fills.
    pub fn carrier_hz(&self, frame: &GaaCoreFrame) -> f32 {
        let spread = 1.0 + (self.phi - 1.0) * self.shape * frame.k_n.clamp(0.25, 4.0);
        (frame.f0 * spread).clamp(20.0, 18_000.0)
    }

    pub fn cutoff_hz(&self, frame: &GaaCoreFrame) -> f32 {
        let openness = 0.5 + 0.5 * self.shape * self.sqrt2 / std::f32::consts::SQRT_2;
        (frame.fc0 * openness).clamp(100.0, 20_000.0)
    }

    /// 3-D pan position from the frame's spatial angles plus the geometry
    /// center offset.
    pub fn pan(&self, frame: &GaaCoreFrame) -> [f32; 3] {
        let (az, el) = (frame.az, frame.el);
        let r = self.radius.min(1.0);
        [
            self.center[0] + r * el.cos() * az.cos(),
            self.center[1] + r * el.sin(),
            self.center[2] + r * el.cos() * az.sin(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub id: String,
    pub state: LifecycleState,
    pub shape: VoiceShape,
    pub frequency: Ramp,
    pub gain: Ramp,
    pub cutoff: Ramp,
    pub pan: [f32; 3],
    /// Oscillator phase accumulator for the render path, in [0, 1).
    pub phase: f32,
}

impl Voice {
    /// Attack time applied at creation so onsets are click-free too.
    const ATTACK_SEC: f32 = 0.01;

    pub fn new(id: String, geometry: &Geometry, frame: &GaaCoreFrame) -> Self {
        let shape = VoiceShape::from_geometry(geometry);
        let carrier = shape.carrier_hz(frame);
        let cutoff = shape.cutoff_hz(frame);
        let mut gain = Ramp::new(0.0, 1.0);
        gain.set_target_over(frame.a0, Self::ATTACK_SEC);
        Self {
            id,
            state: LifecycleState::Playing,
            pan: shape.pan(frame),
            shape,
            frequency: Ramp::new(carrier, carrier * 4.0),
            gain,
            cutoff: Ramp::new(cutoff, cutoff * 8.0),
            phase: 0.0,
        }
    }

    /// Retarget from a fresh frame; fading voices keep their zero gain
    /// target so teardown cannot be interrupted by a late frame.
    pub fn retarget(&mut self, frame: &GaaCoreFrame) {
        self.frequency.set_target(self.shape.carrier_hz(frame));
        self.cutoff.set_target(self.shape.cutoff_hz(frame));
        self.pan = self.shape.pan(frame);
        if self.state == LifecycleState::Playing {
            self.gain.set_target(frame.a0);
        }
    }

    /// Begin click-free teardown over `fade_sec`.
    pub fn begin_fade(&mut self, fade_sec: f32) {
        if self.state.can_transition(LifecycleState::FadingOut) {
            self.state = LifecycleState::FadingOut;
            self.gain.set_target_over(0.0, fade_sec);
        }
    }

    /// Advance ramps; returns true when a fading voice has fully settled
    /// at zero gain and can be reaped.
    pub fn advance(&mut self, dt_sec: f32) -> bool {
        self.frequency.advance(dt_sec);
        self.gain.advance(dt_sec);
        self.cutoff.advance(dt_sec);
        if self.state == LifecycleState::FadingOut && self.gain.is_settled() {
            self.state = LifecycleState::Stopped;
            return true;
        }
        false
    }
}
