//! Prime-ratio frequency lattices and local lock detection.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Empirical lock constants, configurable rather than baked in: the 5%
/// tolerance and the 1.05-per-call amplification curve come from observed
/// behavior, not from a derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Number of lattice frequencies (first N primes).
    pub lattice_size: usize,
    /// Relative match tolerance.
    pub tolerance: f32,
    /// Gain multiplier applied per detecting call while locked.
    pub amplification_step: f32,
    /// Upper bound on amplified gain.
    pub amplification_cap: f32,
    /// Gain ramp speed in units per second, both directions.
    pub ramp_per_sec: f32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lattice_size: 12,
            tolerance: 0.05,
            amplification_step: 1.05,
            amplification_cap: 2.0,
            ramp_per_sec: 0.5,
        }
    }
}

/// First `n` primes by trial division; lattice sizes are small.
pub fn first_primes(n: usize) -> Vec<u32> {
    let mut primes: Vec<u32> = Vec::with_capacity(n);
    let mut candidate = 2u32;
    while primes.len() < n {
        if primes.iter().all(|p| candidate % p != 0) {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// A participant's oscillator frequencies: the base scaled by the ratio of
/// each prime to the first (`base × primeₖ / prime₀`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyLattice {
    pub base_hz: f32,
    pub frequencies: Vec<f32>,
}

impl FrequencyLattice {
    pub fn new(base_hz: f32, n: usize) -> Self {
        let primes = first_primes(n.max(1));
        let p0 = primes[0] as f32;
        let frequencies = primes
            .iter()
            .map(|&p| base_hz * p as f32 / p0)
            .collect();
        Self { base_hz, frequencies }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Per-participant lock state. Detection is purely local: a node compares
/// externally observed frequencies against its own lattice and amplifies
/// its gain while matches persist, decaying back to baseline on loss.
#[derive(Debug, Clone)]
pub struct LockDetector {
    config: LockConfig,
    lattice: FrequencyLattice,
    locked: bool,
    gain_current: f32,
    gain_target: f32,
    /// Fraction of lattice frequencies matched on the last detection.
    coherence: f32,
    last_update_us: Option<i64>,
}

impl LockDetector {
    pub fn new(base_hz: f32, config: LockConfig) -> Self {
        let lattice = FrequencyLattice::new(base_hz, config.lattice_size);
        Self {
            config,
            lattice,
            locked: false,
            gain_current: 1.0,
            gain_target: 1.0,
            coherence: 0.0,
            last_update_us: None,
        }
    }

    pub fn with_defaults(base_hz: f32) -> Self {
        Self::new(base_hz, LockConfig::default())
    }

    pub fn lattice(&self) -> &FrequencyLattice {
        &self.lattice
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Smoothed output gain.
    pub fn gain(&self) -> f32 {
        self.gain_current
    }

    /// Where the gain ramp is headed.
    pub fn target_gain(&self) -> f32 {
        self.gain_target
    }

    /// Fraction of the lattice matched by the last detection call.
    pub fn coherence(&self) -> f32 {
        self.coherence
    }

    /// Check external frequencies against the lattice. A single pair
    /// within relative tolerance locks the node. While locked, each
    /// detecting call multiplies the gain target by the amplification
    /// step, capped; on loss the target decays to baseline. The smoothed
    /// gain ramps toward the target with elapsed time — never stepped.
    pub fn detect_lock(&mut self, external: &[f32], now_us: i64) -> bool {
        self.advance_ramp(now_us);

        let mut matched = 0usize;
        for &local in &self.lattice.frequencies {
            if external
                .iter()
                .any(|&ext| (ext - local).abs() <= self.config.tolerance * local)
            {
                matched += 1;
            }
        }
        let was_locked = self.locked;
        self.locked = matched > 0;
        self.coherence = matched as f32 / self.lattice.len().max(1) as f32;

        if self.locked {
            self.gain_target =
                (self.gain_target * self.config.amplification_step).min(self.config.amplification_cap);
        } else {
            self.gain_target = 1.0;
        }
        if self.locked != was_locked {
            debug!(
                locked = self.locked,
                matched,
                target = self.gain_target,
                "lock state changed"
            );
        }
        self.locked
    }

    fn advance_ramp(&mut self, now_us: i64) {
        if let Some(last) = self.last_update_us {
            let dt_sec = ((now_us - last).max(0)) as f32 / 1_000_000.0;
            let step = self.config.ramp_per_sec * dt_sec;
            let diff = self.gain_target - self.gain_current;
            if diff.abs() <= step {
                self.gain_current = self.gain_target;
            } else {
                self.gain_current += step * diff.signum();
            }
        }
        self.last_update_us = Some(now_us);
    }
}
