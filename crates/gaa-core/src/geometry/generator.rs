//! Procedural geometry generation, one mesh per active layer.

use tracing::debug;

use super::{fallback_triangle, Geometry, SacredRatios};
use crate::layers::{Layer, LayerHierarchy};

/// Below this effective weight a layer's shape collapses and the fallback
/// triangle is substituted instead.
const WEIGHT_EPSILON: f32 = 1e-3;

/// Minimum tessellation resolution that still produces faces.
const MIN_RESOLUTION: u32 = 3;

/// Stateless mesh derivation plus a breath-phase accumulator coupling the
/// generator to respiratory input. Owns no audio state.
#[derive(Debug, Clone, Default)]
pub struct GeometryGenerator {
    breath_phase: f32,
}

impl GeometryGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the internal breath accumulator; wraps into [0, 1).
    pub fn update_breath_phase(&mut self, delta: f32) {
        if delta.is_finite() {
            self.breath_phase = (self.breath_phase + delta).rem_euclid(1.0);
        }
    }

    pub fn breath_phase(&self) -> f32 {
        self.breath_phase
    }

    /// One geometry per active layer, each independent. Deterministic in
    /// `(layer params, breath_phase, resolution)`. Every returned geometry
    /// has at least one face.
    pub fn generate(
        &self,
        hierarchy: &LayerHierarchy,
        breath_phase: f32,
        resolution: u32,
    ) -> Vec<Geometry> {
        hierarchy
            .active_layers()
            .map(|layer| generate_layer(layer, breath_phase, resolution))
            .collect()
    }

    /// Composite generation driven by the internal breath accumulator.
    pub fn generate_composite(
        &self,
        hierarchy: &LayerHierarchy,
        resolution: u32,
    ) -> Vec<Geometry> {
        self.generate(hierarchy, self.breath_phase, resolution)
    }
}

/// Derive one layer's mesh: a resonance-deformed sphere whose radius
/// breathes with the respiratory phase. Degenerate parameter combinations
/// take the named fallback path instead of returning an empty mesh.
pub fn generate_layer(layer: &Layer, breath_phase: f32, resolution: u32) -> Geometry {
    let eff_weight = layer.effective_weight();
    if eff_weight < WEIGHT_EPSILON || resolution < MIN_RESOLUTION {
        debug!(
            scale = layer.scale.name(),
            eff_weight, resolution, "degenerate layer parameters, substituting fallback triangle"
        );
        return fallback_triangle();
    }

    let ratios = SacredRatios::default();
    let rings = resolution;
    let segments = resolution;

    // Radius modulation: resonance ripples along the polar angle, breath
    // swells the whole shell by up to 10%.
    let ripple_order = 1.0 + (layer.frequency_hz / 110.0).log2().max(0.0).floor();
    let breath_swell = 1.0 + 0.1 * (breath_phase * 2.0 * ratios.pi).sin();
    let base_radius = eff_weight * breath_swell;

    let mut vertices = Vec::with_capacity(((rings + 1) * segments) as usize);
    let mut normals = Vec::with_capacity(vertices.capacity());

    for i in 0..=rings {
        let theta = ratios.pi * (i as f32) / (rings as f32);
        for j in 0..segments {
            let phi = 2.0 * ratios.pi * (j as f32) / (segments as f32);
            let ripple = 1.0
                + layer.resonance.clamp(0.0, 1.0)
                    * 0.25
                    * (ripple_order * theta + layer.phase + breath_phase * 2.0 * ratios.pi).sin();
            let r = (base_radius * ripple).max(1e-4);

            let sin_t = theta.sin();
            let x = r * sin_t * phi.cos();
            let y = r * theta.cos();
            let z = r * sin_t * phi.sin();
            vertices.push([x, y, z]);

            let len = (x * x + y * y + z * z).sqrt().max(1e-6);
            normals.push([x / len, y / len, z / len]);
        }
    }

    let mut faces = Vec::with_capacity((rings * segments * 2) as usize);
    for i in 0..rings {
        for j in 0..segments {
            let j1 = (j + 1) % segments;
            let a = i * segments + j;
            let b = i * segments + j1;
            let c = (i + 1) * segments + j;
            let d = (i + 1) * segments + j1;
            faces.push([a, c, b]);
            faces.push([b, c, d]);
        }
    }

    if faces.is_empty() {
        // Unreachable given the resolution guard, kept as the defensive
        // closure of the non-empty contract.
        return fallback_triangle();
    }

    let mut geometry = Geometry {
        vertices,
        faces,
        normals,
        center: [0.0; 3],
        radius: 0.0,
        ratios,
    };
    geometry.center = geometry.centroid();
    geometry.radius = geometry.max_extent(geometry.center);
    geometry
}
