//! Hierarchical scale layers driving procedural geometry.

use serde::{Deserialize, Serialize};

/// Ordered scale hierarchy, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerScale {
    Atomic,
    Molecular,
    Cellular,
    Tissue,
    Organ,
    Organism,
}

pub const LAYER_SCALES: [LayerScale; 6] = [
    LayerScale::Atomic,
    LayerScale::Molecular,
    LayerScale::Cellular,
    LayerScale::Tissue,
    LayerScale::Organ,
    LayerScale::Organism,
];

impl LayerScale {
    /// Position in the hierarchy (0 = atomic).
    pub fn index(&self) -> usize {
        match self {
            Self::Atomic => 0,
            Self::Molecular => 1,
            Self::Cellular => 2,
            Self::Tissue => 3,
            Self::Organ => 4,
            Self::Organism => 5,
        }
    }

    /// Weight-scaling exponent. Higher scales carry a smaller exponent so
    /// their contribution shrinks as you ascend the hierarchy.
    pub fn weight_exponent(&self) -> f32 {
        match self {
            Self::Atomic => 1.0,
            Self::Molecular => 0.88,
            Self::Cellular => 0.76,
            Self::Tissue => 0.64,
            Self::Organ => 0.52,
            Self::Organism => 0.4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Molecular => "molecular",
            Self::Cellular => "cellular",
            Self::Tissue => "tissue",
            Self::Organ => "organ",
            Self::Organism => "organism",
        }
    }
}

/// One procedural layer. Owned and mutated only by the generator side;
/// callers toggle activation through [`LayerHierarchy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub scale: LayerScale,
    pub active: bool,
    /// Contribution weight in [0, 1].
    pub weight: f32,
    pub frequency_hz: f32,
    pub phase: f32,
    pub resonance: f32,
}

impl Layer {
    pub fn new(scale: LayerScale) -> Self {
        let idx = scale.index() as f32;
        Self {
            scale,
            active: true,
            weight: 1.0 - idx * 0.1,
            frequency_hz: 110.0 * (idx + 1.0),
            phase: 0.0,
            resonance: 0.5,
        }
    }

    /// Weight after applying the per-scale exponent. Smaller exponents map
    /// the same raw weight to a smaller effective contribution.
    pub fn effective_weight(&self) -> f32 {
        let w = self.weight.clamp(0.0, 1.0);
        if w == 0.0 {
            return 0.0;
        }
        w.powf(self.scale.weight_exponent().recip())
    }
}

/// The six ordered layers. At least one must stay active for composite
/// generation to be non-empty; the hierarchy itself does not enforce that,
/// callers observe it through an empty generate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerHierarchy {
    layers: [Layer; 6],
}

impl Default for LayerHierarchy {
    fn default() -> Self {
        Self {
            layers: LAYER_SCALES.map(Layer::new),
        }
    }
}

impl LayerHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1); takes effect on the next generate call.
    pub fn set_active(&mut self, scale: LayerScale, active: bool) {
        self.layers[scale.index()].active = active;
    }

    pub fn is_active(&self, scale: LayerScale) -> bool {
        self.layers[scale.index()].active
    }

    pub fn layer(&self, scale: LayerScale) -> &Layer {
        &self.layers[scale.index()]
    }

    pub fn layer_mut(&mut self, scale: LayerScale) -> &mut Layer {
        &mut self.layers[scale.index()]
    }

    pub fn active_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.active)
    }

    pub fn active_count(&self) -> usize {
        self.layers.iter().filter(|l| l.active).count()
    }

    /// Retune every layer's base frequency from a session fundamental,
    /// keeping the harmonic spread between scales.
    pub fn retune(&mut self, fundamental_hz: f32) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.frequency_hz = fundamental_hz * (i as f32 + 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_visible() {
        let mut h = LayerHierarchy::new();
        assert_eq!(h.active_count(), 6);
        h.set_active(LayerScale::Organ, false);
        assert!(!h.is_active(LayerScale::Organ));
        assert_eq!(h.active_count(), 5);
    }

    #[test]
    fn effective_weight_shrinks_up_the_hierarchy() {
        let mut lo = Layer::new(LayerScale::Atomic);
        let mut hi = Layer::new(LayerScale::Organism);
        lo.weight = 0.6;
        hi.weight = 0.6;
        assert!(hi.effective_weight() < lo.effective_weight());
    }

    #[test]
    fn retune_keeps_harmonic_spread() {
        let mut h = LayerHierarchy::new();
        h.retune(100.0);
        assert_eq!(h.layer(LayerScale::Atomic).frequency_hz, 100.0);
        assert_eq!(h.layer(LayerScale::Organism).frequency_hz, 600.0);
    }
}
