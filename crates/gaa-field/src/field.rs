//! Session-wide collective field aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::participant::{ParticipantId, ParticipantState};

/// Aggregated view over every participant's published state. Read-mostly:
/// each participant upserts only its own entry, so aggregation never needs
/// cross-participant coordination.
#[derive(Debug, Clone, Default)]
pub struct CollectiveField {
    participants: HashMap<ParticipantId, ParticipantState>,
}

/// Scalar summary derived from the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub global_coherence: f32,
    pub regional_coherence: f32,
    pub node_count: usize,
}

/// Coarse 10°×10° geographic bucket.
fn region_key(lat: f32, lon: f32) -> (i32, i32) {
    ((lat / 10.0).floor() as i32, (lon / 10.0).floor() as i32)
}

impl CollectiveField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert one participant's own entry. Absent participants simply
    /// stay absent — they read as not-locked, never as an error.
    pub fn update_participant(&mut self, id: ParticipantId, state: ParticipantState) {
        self.participants.insert(id, state);
    }

    pub fn remove_participant(&mut self, id: &ParticipantId) {
        if self.participants.remove(id).is_some() {
            debug!(participant = %id, "participant left the field");
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantState> {
        self.participants.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.participants.len()
    }

    /// Mean coherence across all participants; 0.0 for an empty session.
    pub fn global_coherence(&self) -> f32 {
        if self.participants.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.participants.values().map(|p| p.coherence).sum();
        sum / self.participants.len() as f32
    }

    /// Mean coherence of the most-populated geographic region. Falls back
    /// to the global figure when nobody published a location.
    pub fn regional_coherence(&self) -> f32 {
        let mut regions: HashMap<(i32, i32), (f32, usize)> = HashMap::new();
        for state in self.participants.values() {
            if let (Some(lat), Some(lon)) = (state.lat, state.lon) {
                let entry = regions.entry(region_key(lat, lon)).or_insert((0.0, 0));
                entry.0 += state.coherence;
                entry.1 += 1;
            }
        }
        regions
            .values()
            .max_by_key(|(_, count)| *count)
            .map(|(sum, count)| sum / *count as f32)
            .unwrap_or_else(|| self.global_coherence())
    }

    /// Shared glow parameter fed back to every participant's renderer.
    pub fn shared_glow(&self) -> f32 {
        self.global_coherence().clamp(0.0, 1.0)
    }

    pub fn summary(&self) -> FieldSummary {
        FieldSummary {
            global_coherence: self.global_coherence(),
            regional_coherence: self.regional_coherence(),
            node_count: self.node_count(),
        }
    }
}
