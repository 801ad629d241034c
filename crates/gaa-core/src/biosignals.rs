//! Biosignal sample types supplied by the external biofeedback collaborator.

use serde::{Deserialize, Serialize};

/// One biosignal sample. The engine consumes these values at whatever
/// cadence the collaborator produces them; it never owns acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BioSignals {
    /// Respiration displacement in [-1, 1] (inhale positive).
    pub breath: f32,
    /// Heart-rate variability score in [0, 100].
    pub hrv: f32,
    /// EEG band power ratio in [0, 1].
    pub eeg_band_ratio: f32,
}

impl Default for BioSignals {
    fn default() -> Self {
        Self {
            breath: 0.0,
            hrv: 50.0,
            eeg_band_ratio: 0.5,
        }
    }
}

impl BioSignals {
    /// Clamp a sample into its documented ranges; out-of-range collaborator
    /// input degrades to the nearest valid value rather than erroring.
    pub fn clamped(self) -> Self {
        Self {
            breath: if self.breath.is_finite() {
                self.breath.clamp(-1.0, 1.0)
            } else {
                0.0
            },
            hrv: if self.hrv.is_finite() {
                self.hrv.clamp(0.0, 100.0)
            } else {
                0.0
            },
            eeg_band_ratio: if self.eeg_band_ratio.is_finite() {
                self.eeg_band_ratio.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// Breath mapped into a normalized [0, 1) phase contribution.
    pub fn breath_phase_norm(&self) -> f32 {
        ((self.breath.clamp(-1.0, 1.0) + 1.0) / 2.0).rem_euclid(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_repairs_out_of_range_samples() {
        let s = BioSignals {
            breath: 4.0,
            hrv: -3.0,
            eeg_band_ratio: f32::NAN,
        }
        .clamped();
        assert_eq!(s.breath, 1.0);
        assert_eq!(s.hrv, 0.0);
        assert_eq!(s.eeg_band_ratio, 0.0);
    }

    #[test]
    fn breath_phase_maps_into_unit_interval() {
        let exhale = BioSignals {
            breath: -1.0,
            ..Default::default()
        };
        let inhale = BioSignals {
            breath: 1.0,
            ..Default::default()
        };
        assert_eq!(exhale.breath_phase_norm(), 0.0);
        assert_eq!(inhale.breath_phase_norm(), 0.0); // wraps at the top
        let mid = BioSignals {
            breath: 0.0,
            ..Default::default()
        };
        assert_eq!(mid.breath_phase_norm(), 0.5);
    }
}
