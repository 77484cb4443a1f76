use crate::layer::{Layer, MapProps, ShapeKind};
use std::collections::BTreeMap;

/// Per-session enablement of each drawing tool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySet {
    enabled: BTreeMap<ShapeKind, bool>,
}

impl CapabilitySet {
    pub fn is_enabled(&self, kind: ShapeKind) -> bool {
        self.enabled.get(&kind).copied().unwrap_or(false)
    }

    /// Enabled kinds in toolbar order
    pub fn enabled_kinds(&self) -> impl Iterator<Item = ShapeKind> + '_ {
        self.enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(&kind, _)| kind)
    }
}

/// Enable each feature type permitted by at least one layer.
/// The circle-marker mode is always disabled.
pub fn resolve(layers: &[Layer]) -> CapabilitySet {
    let mut enabled: BTreeMap<ShapeKind, bool> =
        ShapeKind::ALL.iter().map(|&kind| (kind, false)).collect();

    for layer in layers {
        for &feature in &layer.permitted_features {
            enabled.insert(feature.into(), true);
        }
    }

    enabled.insert(ShapeKind::CircleMarker, false);

    CapabilitySet { enabled }
}

/// Drawing widget configuration: the offered tools and the edit target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolbar {
    tools: Vec<ShapeKind>,
    /// Index of the layer whose group the edit toolbar operates on
    pub edit_target: Option<usize>,
}

impl Toolbar {
    /// Build the toolbar; disabled kinds are left out entirely
    pub fn new(capabilities: &CapabilitySet, layers: &[Layer], props: MapProps) -> Self {
        let tools = if props.drawable {
            capabilities.enabled_kinds().collect()
        } else {
            Vec::new()
        };

        // Several editable layers: the last one configured wins
        let edit_target = if props.editable {
            layers.iter().rposition(|layer| layer.editable)
        } else {
            None
        };

        Self { tools, edit_target }
    }

    pub fn tools(&self) -> &[ShapeKind] {
        &self.tools
    }

    /// Select a tool, refusing kinds the toolbar does not offer
    pub fn select(&self, kind: ShapeKind) -> Option<ShapeKind> {
        self.tools.contains(&kind).then_some(kind)
    }
}
