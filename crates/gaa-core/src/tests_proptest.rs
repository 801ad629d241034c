//! Property-based invariants for the geometry pipeline.

use proptest::prelude::*;

use crate::geometry::{generator::generate_layer, normalize::normalize};
use crate::layers::{Layer, LayerScale, LAYER_SCALES};

fn arb_layer() -> impl Strategy<Value = Layer> {
    (
        0usize..6,
        0.0f32..=1.0,
        20.0f32..2_000.0,
        -10.0f32..10.0,
        0.0f32..=1.0,
    )
        .prop_map(|(scale_idx, weight, frequency_hz, phase, resonance)| {
            let mut layer = Layer::new(LAYER_SCALES[scale_idx]);
            layer.weight = weight;
            layer.frequency_hz = frequency_hz;
            layer.phase = phase;
            layer.resonance = resonance;
            layer
        })
}

proptest! {
    /// The load-bearing contract: no parameter combination may produce an
    /// empty mesh, before or after normalization.
    #[test]
    fn faces_never_empty(layer in arb_layer(), breath in 0.0f32..1.0, resolution in 0u32..24) {
        let raw = generate_layer(&layer, breath, resolution);
        prop_assert!(!raw.faces.is_empty());
        let normalized = normalize(&raw);
        prop_assert!(!normalized.faces.is_empty());
    }

    #[test]
    fn normalization_is_idempotent(layer in arb_layer(), breath in 0.0f32..1.0) {
        let once = normalize(&generate_layer(&layer, breath, 8));
        let twice = normalize(&once);
        prop_assert_eq!(once.faces.len(), twice.faces.len());
        for (a, b) in once.vertices.iter().zip(twice.vertices.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                prop_assert!((x - y).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn normalized_radius_is_canonical(layer in arb_layer(), breath in 0.0f32..1.0) {
        let g = normalize(&generate_layer(&layer, breath, 10));
        prop_assert!((g.radius - 1.0).abs() < 1e-5);
        prop_assert!(g.max_extent(g.centroid()) <= 1.0 + 1e-3);
    }

    #[test]
    fn all_face_indices_are_in_bounds(layer in arb_layer(), resolution in 3u32..16) {
        let g = generate_layer(&layer, 0.5, resolution);
        let n = g.vertices.len() as u32;
        for face in &g.faces {
            for &idx in face {
                prop_assert!(idx < n);
            }
        }
    }
}

#[test]
fn atomic_layer_weight_sweep_never_collapses() {
    for i in 0..=100 {
        let mut layer = Layer::new(LayerScale::Atomic);
        layer.weight = i as f32 / 100.0;
        let g = generate_layer(&layer, 0.0, 8);
        assert!(!g.faces.is_empty(), "weight {} produced empty mesh", layer.weight);
    }
}
