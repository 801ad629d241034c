//! Geometry types shared by the generator, normalizer, and oscillator.

use serde::{Deserialize, Serialize};

pub mod generator;
pub mod normalize;

pub use generator::GeometryGenerator;
pub use normalize::normalize;

/// Irrational ratios carried with every geometry so downstream consumers
/// can derive frequency relations without re-deriving constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SacredRatios {
    pub phi: f32,
    pub pi: f32,
    pub sqrt2: f32,
}

impl Default for SacredRatios {
    fn default() -> Self {
        Self {
            phi: 1.618_034,
            pi: std::f32::consts::PI,
            sqrt2: std::f32::consts::SQRT_2,
        }
    }
}

/// One generated mesh. Immutable once returned; never persisted.
///
/// Invariant: `faces` is non-empty after normalization. Degenerate
/// derivations are replaced by [`fallback_triangle`] before they leave the
/// generator, so consumers may index into `faces` without emptiness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub center: [f32; 3],
    pub radius: f32,
    pub ratios: SacredRatios,
}

impl Geometry {
    pub fn is_degenerate(&self) -> bool {
        self.faces.is_empty() || self.vertices.len() < 3 || !self.radius.is_finite()
    }

    /// Vertex centroid (not the stored `center`).
    pub fn centroid(&self) -> [f32; 3] {
        if self.vertices.is_empty() {
            return [0.0; 3];
        }
        let n = self.vertices.len() as f32;
        let mut c = [0.0f32; 3];
        for v in &self.vertices {
            c[0] += v[0];
            c[1] += v[1];
            c[2] += v[2];
        }
        [c[0] / n, c[1] / n, c[2] / n]
    }

    /// Max distance from `from` to any vertex.
    pub fn max_extent(&self, from: [f32; 3]) -> f32 {
        self.vertices
            .iter()
            .map(|v| {
                let dx = v[0] - from[0];
                let dy = v[1] - from[1];
                let dz = v[2] - from[2];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .fold(0.0f32, f32::max)
    }
}

/// The named degenerate-recovery path: a single unit triangle substituted
/// whenever a layer's parameters would otherwise yield zero faces. Load
/// bearing for the non-empty-faces contract; see the generator tests.
pub fn fallback_triangle() -> Geometry {
    let vertices = vec![
        [0.0, 1.0, 0.0],
        [-0.866_025, -0.5, 0.0],
        [0.866_025, -0.5, 0.0],
    ];
    Geometry {
        normals: vec![[0.0, 0.0, 1.0]; 3],
        faces: vec![[0, 1, 2]],
        vertices,
        center: [0.0; 3],
        radius: 1.0,
        ratios: SacredRatios::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_triangle_satisfies_contract() {
        let g = fallback_triangle();
        assert_eq!(g.faces.len(), 1);
        assert_eq!(g.vertices.len(), 3);
        assert!(!g.is_degenerate());
    }

    #[test]
    fn centroid_of_fallback_is_origin() {
        let g = fallback_triangle();
        let c = g.centroid();
        assert!(c[0].abs() < 1e-5);
        assert!(c[1].abs() < 1e-5);
    }
}
