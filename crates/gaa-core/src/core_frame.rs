//! Instantaneous synthesis parameter frame.

use serde::{Deserialize, Serialize};

/// The per-tick parameter set consumed by the oscillator engine. Recomputed
/// every control tick; across ticks the most recent frame wins, there is no
/// queue of stale updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaaCoreFrame {
    /// Base frequency in Hz.
    pub f0: f32,
    /// Master amplitude in [0, 1].
    pub a0: f32,
    /// Filter cutoff in Hz.
    pub fc0: f32,
    /// Geometry-derived modulation terms.
    pub th_n: f32,
    pub phi_n: f32,
    pub k_n: f32,
    pub t_n: f32,
    /// Rate of change of `th_n` per second.
    pub d_th_n_dt: f32,
    /// Spatial azimuth in radians.
    pub az: f32,
    /// Spatial elevation in radians.
    pub el: f32,
}

impl Default for GaaCoreFrame {
    fn default() -> Self {
        Self {
            f0: 110.0,
            a0: 0.5,
            fc0: 2_000.0,
            th_n: 0.0,
            phi_n: 0.0,
            k_n: 1.0,
            t_n: 0.0,
            d_th_n_dt: 0.0,
            az: 0.0,
            el: 0.0,
        }
    }
}

impl GaaCoreFrame {
    /// Clamp into ranges the oscillator engine is safe to consume.
    pub fn sanitized(mut self) -> Self {
        if !self.f0.is_finite() || self.f0 <= 0.0 {
            self.f0 = 110.0;
        }
        self.a0 = if self.a0.is_finite() {
            self.a0.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !self.fc0.is_finite() || self.fc0 <= 0.0 {
            self.fc0 = 2_000.0;
        }
        for term in [
            &mut self.th_n,
            &mut self.phi_n,
            &mut self.k_n,
            &mut self.t_n,
            &mut self.d_th_n_dt,
            &mut self.az,
            &mut self.el,
        ] {
            if !term.is_finite() {
                *term = 0.0;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_repairs_non_finite_terms() {
        let frame = GaaCoreFrame {
            f0: f32::NAN,
            a0: 3.0,
            th_n: f32::INFINITY,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(frame.f0, 110.0);
        assert_eq!(frame.a0, 1.0);
        assert_eq!(frame.th_n, 0.0);
    }
}
