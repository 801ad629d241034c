//! Breath cycle guide.
//!
//! A four-phase respiration cycle that yields the normalized breath phase
//! consumed by the geometry generator, and the breaths-per-minute figure
//! fed to the breathing safety check. Used when no live biosignal source
//! is attached (demos, tests, synthetic sessions).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreathPhase {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathDurations {
    pub inhale_us: u64,
    pub hold_in_us: u64,
    pub exhale_us: u64,
    pub hold_out_us: u64,
}

impl BreathDurations {
    /// Split one cycle at a given pace into the 40/5/45/10 pattern.
    pub fn from_bpm(bpm: f32) -> Self {
        let cycle_us = if bpm <= 0.0 {
            10_000_000u64
        } else {
            (60_000_000f32 / bpm).round() as u64
        };
        let inhale = (cycle_us as f32 * 0.4).round() as u64;
        let hold_in = (cycle_us as f32 * 0.05).round() as u64;
        let exhale = (cycle_us as f32 * 0.45).round() as u64;
        let hold_out = cycle_us.saturating_sub(inhale + hold_in + exhale);
        Self {
            inhale_us: inhale,
            hold_in_us: hold_in,
            exhale_us: exhale,
            hold_out_us: hold_out,
        }
    }

    pub fn total_us(&self) -> u64 {
        self.inhale_us + self.hold_in_us + self.exhale_us + self.hold_out_us
    }
}

/// Phase-accurate breath cycle machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathCycle {
    pub phase: BreathPhase,
    pub elapsed_us: u64,
    pub durations: BreathDurations,
    pub cycle_index: u64,
}

impl BreathCycle {
    pub fn new(durations: BreathDurations) -> Self {
        Self {
            phase: BreathPhase::Inhale,
            elapsed_us: 0,
            durations,
            cycle_index: 0,
        }
    }

    pub fn from_bpm(bpm: f32) -> Self {
        Self::new(BreathDurations::from_bpm(bpm))
    }

    /// Guided pace in breaths per minute.
    pub fn breaths_per_minute(&self) -> f32 {
        let total = self.durations.total_us();
        if total == 0 {
            return 0.0;
        }
        60_000_000f32 / total as f32
    }

    fn remaining_us(&self) -> u64 {
        let dur = match self.phase {
            BreathPhase::Inhale => self.durations.inhale_us,
            BreathPhase::HoldIn => self.durations.hold_in_us,
            BreathPhase::Exhale => self.durations.exhale_us,
            BreathPhase::HoldOut => self.durations.hold_out_us,
        };
        dur.saturating_sub(self.elapsed_us)
    }

    fn transition(&mut self) -> bool {
        self.elapsed_us = 0;
        let mut completed = false;
        self.phase = match self.phase {
            BreathPhase::Inhale => BreathPhase::HoldIn,
            BreathPhase::HoldIn => BreathPhase::Exhale,
            BreathPhase::Exhale => BreathPhase::HoldOut,
            BreathPhase::HoldOut => {
                completed = true;
                self.cycle_index += 1;
                BreathPhase::Inhale
            }
        };
        completed
    }

    /// Advance by `dt_us`, returning entered phases and completed cycles.
    pub fn tick(&mut self, mut dt_us: u64) -> (Vec<BreathPhase>, u64) {
        let mut entered = Vec::new();
        let mut cycles = 0u64;
        while dt_us > 0 {
            let left = self.remaining_us();
            if dt_us < left {
                self.elapsed_us = self.elapsed_us.saturating_add(dt_us);
                break;
            }
            dt_us = dt_us.saturating_sub(left);
            if self.transition() {
                cycles += 1;
            }
            entered.push(self.phase);
        }
        (entered, cycles)
    }

    /// Position in the full cycle, normalized into [0, 1).
    pub fn cycle_phase_norm(&self) -> f32 {
        let total = self.durations.total_us();
        if total == 0 {
            return 0.0;
        }
        let before = match self.phase {
            BreathPhase::Inhale => 0,
            BreathPhase::HoldIn => self.durations.inhale_us,
            BreathPhase::Exhale => self.durations.inhale_us + self.durations.hold_in_us,
            BreathPhase::HoldOut => {
                self.durations.inhale_us + self.durations.hold_in_us + self.durations.exhale_us
            }
        };
        let pos = before.saturating_add(self.elapsed_us).min(total);
        (pos as f32 / total as f32).rem_euclid(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpm_round_trips_through_durations() {
        let cycle = BreathCycle::from_bpm(6.0);
        assert!((cycle.breaths_per_minute() - 6.0).abs() < 0.01);
    }

    #[test]
    fn full_cycle_completes() {
        let mut cycle = BreathCycle::new(BreathDurations {
            inhale_us: 1_000_000,
            hold_in_us: 500_000,
            exhale_us: 1_000_000,
            hold_out_us: 500_000,
        });
        let (entered, cycles) = cycle.tick(3_000_000);
        assert!(entered.contains(&BreathPhase::Exhale));
        assert_eq!(cycles, 1);
        assert_eq!(cycle.cycle_index, 1);
    }

    #[test]
    fn phase_norm_advances_monotonically_within_cycle() {
        let mut cycle = BreathCycle::from_bpm(6.0);
        let mut last = cycle.cycle_phase_norm();
        for _ in 0..8 {
            cycle.tick(1_000_000);
            let now = cycle.cycle_phase_norm();
            if cycle.cycle_index == 0 {
                assert!(now >= last);
            }
            last = now;
        }
    }

    #[test]
    fn non_positive_bpm_falls_back_to_ten_seconds() {
        let d = BreathDurations::from_bpm(0.0);
        assert_eq!(d.total_us(), 10_000_000);
    }
}
