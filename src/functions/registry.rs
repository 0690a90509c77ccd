use crate::functions::{
    color::{FillBackground, MajorityFill, Recolor, SwapColors},
    geometry::{FlipHorizontal, FlipVertical, Rotate180, Rotate270, Rotate90, Transpose},
    morphology::{CropToContent, Gravity, Identity, Outline, PadBorder, StripBorder},
    scale::{MirrorHorizontal, MirrorVertical, ScaleDown, ScaleUp, Tile},
    traits::GridPrimitive,
};
use crate::types::TaskPattern;
use std::{collections::HashMap, sync::Arc};

/// Lookup table for every grid primitive the engine knows.
///
/// Registration order is fixed, so `all()` and the filtered views iterate
/// deterministically across runs.
pub struct PrimitiveRegistry {
    by_name: HashMap<&'static str, Arc<dyn GridPrimitive>>,
    ordered: Vec<Arc<dyn GridPrimitive>>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            ordered: Vec::new(),
        };
        registry.register_geometry();
        registry.register_color();
        registry.register_scale();
        registry.register_morphology();
        registry
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GridPrimitive>> {
        self.by_name.get(name).cloned()
    }

    /// Every primitive, in registration order.
    pub fn all(&self) -> &[Arc<dyn GridPrimitive>] {
        &self.ordered
    }

    /// Primitives the search may insert on its own.
    pub fn searchable(&self) -> Vec<Arc<dyn GridPrimitive>> {
        self.ordered
            .iter()
            .filter(|p| p.searchable())
            .cloned()
            .collect()
    }

    /// Searchable primitives whose bias list contains `pattern`.
    pub fn biased_toward(&self, pattern: TaskPattern) -> Vec<Arc<dyn GridPrimitive>> {
        self.ordered
            .iter()
            .filter(|p| p.searchable() && p.bias().contains(&pattern))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn register(&mut self, primitive: Arc<dyn GridPrimitive>) {
        debug_assert!(
            !self.by_name.contains_key(primitive.name()),
            "duplicate primitive {}",
            primitive.name()
        );
        self.by_name.insert(primitive.name(), primitive.clone());
        self.ordered.push(primitive);
    }

    fn register_geometry(&mut self) {
        let primitives: Vec<Arc<dyn GridPrimitive>> = vec![
            Arc::new(Rotate90),
            Arc::new(Rotate180),
            Arc::new(Rotate270),
            Arc::new(FlipHorizontal),
            Arc::new(FlipVertical),
            Arc::new(Transpose),
        ];
        for primitive in primitives {
            self.register(primitive);
        }
    }

    fn register_color(&mut self) {
        let primitives: Vec<Arc<dyn GridPrimitive>> = vec![
            Arc::new(Recolor),
            Arc::new(SwapColors),
            Arc::new(FillBackground),
            Arc::new(MajorityFill),
        ];
        for primitive in primitives {
            self.register(primitive);
        }
    }

    fn register_scale(&mut self) {
        let primitives: Vec<Arc<dyn GridPrimitive>> = vec![
            Arc::new(ScaleUp),
            Arc::new(ScaleDown),
            Arc::new(Tile),
            Arc::new(MirrorHorizontal),
            Arc::new(MirrorVertical),
        ];
        for primitive in primitives {
            self.register(primitive);
        }
    }

    fn register_morphology(&mut self) {
        let primitives: Vec<Arc<dyn GridPrimitive>> = vec![
            Arc::new(Identity),
            Arc::new(CropToContent),
            Arc::new(PadBorder),
            Arc::new(StripBorder),
            Arc::new(Outline),
            Arc::new(Gravity),
        ];
        for primitive in primitives {
            self.register(primitive);
        }
    }
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}
