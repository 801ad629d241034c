//! Preset records and the read-only catalog seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::PresetResult;

/// Three-part validity gate. A preset is only ever surfaced to users when
/// `safety_compliance` holds; the other two parts inform ranking and
/// display, not access.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriLaw {
    pub scientific_validity: bool,
    pub safety_compliance: bool,
    /// Accessibility score in [0, 1].
    pub accessibility_score: f32,
    /// Verification timestamp in microseconds.
    pub last_verified_us: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualParams {
    pub palette: String,
    /// Shared glow intensity in [0, 1].
    pub glow: f32,
    /// Guided visual pulse rate; kept under the seizure-risk band.
    pub flash_rate_hz: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioProfileParams {
    pub fundamental_hz: f32,
    pub amplitude: f32,
    pub target_bpm: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    /// Evidence basis shown alongside the preset.
    pub evidence: String,
    pub tri_law: TriLaw,
    pub visualization: VisualParams,
    pub audio_profile: AudioProfileParams,
}

impl Preset {
    pub fn is_accessible(&self) -> bool {
        self.tri_law.safety_compliance
    }
}

/// Read-only remote catalog. Fetched at most once per session; transport
/// and authentication belong to the implementing collaborator.
#[async_trait]
pub trait PresetCatalog: Send + Sync {
    async fn fetch_catalog(&self) -> PresetResult<Vec<Preset>>;
}

/// In-process catalog carrying the stock presets. Stands in for the remote
/// source in demos and tests.
#[derive(Debug, Clone, Default)]
pub struct BuiltinCatalog;

#[async_trait]
impl PresetCatalog for BuiltinCatalog {
    async fn fetch_catalog(&self) -> PresetResult<Vec<Preset>> {
        Ok(stock_presets())
    }
}

pub fn stock_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "deep-theta".into(),
            name: "Deep Theta".into(),
            evidence: "slow-breath entrainment, 4-7 Hz band studies".into(),
            tri_law: TriLaw {
                scientific_validity: true,
                safety_compliance: true,
                accessibility_score: 0.9,
                last_verified_us: 1_735_689_600_000_000,
            },
            visualization: VisualParams {
                palette: "ocean".into(),
                glow: 0.6,
                flash_rate_hz: 0.5,
            },
            audio_profile: AudioProfileParams {
                fundamental_hz: 110.0,
                amplitude: 0.4,
                target_bpm: 5.0,
            },
        },
        Preset {
            id: "alpha-coherence".into(),
            name: "Alpha Coherence".into(),
            evidence: "relaxed-alert alpha protocols".into(),
            tri_law: TriLaw {
                scientific_validity: true,
                safety_compliance: true,
                accessibility_score: 0.8,
                last_verified_us: 1_735_689_600_000_000,
            },
            visualization: VisualParams {
                palette: "forest".into(),
                glow: 0.5,
                flash_rate_hz: 1.0,
            },
            audio_profile: AudioProfileParams {
                fundamental_hz: 220.0,
                amplitude: 0.5,
                target_bpm: 6.0,
            },
        },
        Preset {
            id: "grounding".into(),
            name: "Grounding".into(),
            evidence: "paced-exhale vagal response literature".into(),
            tri_law: TriLaw {
                scientific_validity: false,
                safety_compliance: true,
                accessibility_score: 0.95,
                last_verified_us: 1_735_689_600_000_000,
            },
            visualization: VisualParams {
                palette: "earth".into(),
                glow: 0.4,
                flash_rate_hz: 0.0,
            },
            audio_profile: AudioProfileParams {
                fundamental_hz: 82.4,
                amplitude: 0.35,
                target_bpm: 4.5,
            },
        },
        Preset {
            id: "strobe-gamma".into(),
            name: "Strobe Gamma".into(),
            evidence: "experimental, pending photosensitivity review".into(),
            tri_law: TriLaw {
                scientific_validity: true,
                safety_compliance: false,
                accessibility_score: 0.2,
                last_verified_us: 1_735_689_600_000_000,
            },
            visualization: VisualParams {
                palette: "neon".into(),
                glow: 1.0,
                flash_rate_hz: 8.0,
            },
            audio_profile: AudioProfileParams {
                fundamental_hz: 440.0,
                amplitude: 0.7,
                target_bpm: 10.0,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_catalog_contains_a_blocked_preset() {
        let presets = stock_presets();
        assert!(presets.iter().any(|p| !p.is_accessible()));
        assert!(presets.iter().filter(|p| p.is_accessible()).count() >= 3);
    }

    #[test]
    fn preset_round_trips_through_json() {
        let preset = stock_presets().remove(0);
        let text = serde_json::to_string(&preset).unwrap();
        let back: Preset = serde_json::from_str(&text).unwrap();
        assert_eq!(back, preset);
    }
}
