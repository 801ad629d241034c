//! Canonical unit-sphere normalization.

use super::{fallback_triangle, Geometry};

/// Canonical radius every normalized geometry is scaled to.
pub const CANONICAL_RADIUS: f32 = 1.0;

/// Recenter on the vertex centroid and rescale so the farthest vertex sits
/// on the unit sphere. Idempotent: normalizing a normalized geometry is a
/// no-op up to float rounding. Never returns zero faces; a degenerate
/// input is replaced by the fallback triangle.
pub fn normalize(geometry: &Geometry) -> Geometry {
    if geometry.is_degenerate() {
        return fallback_triangle();
    }

    let centroid = geometry.centroid();
    let extent = geometry.max_extent(centroid);
    if !extent.is_finite() || extent < 1e-6 {
        return fallback_triangle();
    }
    let scale = CANONICAL_RADIUS / extent;

    let vertices: Vec<[f32; 3]> = geometry
        .vertices
        .iter()
        .map(|v| {
            [
                (v[0] - centroid[0]) * scale,
                (v[1] - centroid[1]) * scale,
                (v[2] - centroid[2]) * scale,
            ]
        })
        .collect();

    Geometry {
        vertices,
        faces: geometry.faces.clone(),
        normals: geometry.normals.clone(),
        center: [0.0; 3],
        radius: CANONICAL_RADIUS,
        ratios: geometry.ratios,
    }
}
