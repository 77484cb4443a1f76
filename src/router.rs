use crate::layer::{FeatureType, Layer, ShapeKind};
use crate::shape::DrawnGeometry;
use log::debug;

/// Outcome of routing one created shape
#[derive(Clone, Debug, PartialEq)]
pub struct RoutedAssignment {
    /// Index of the receiving layer, `None` when no layer accepts the kind
    pub layer: Option<usize>,
    pub color: Option<String>,
    pub descriptor: String,
}

/// Find the layer that receives a feature type.
///
/// Layers are scanned in configured order and every match overwrites the
/// previous one, so the last permitting layer wins.
pub fn find_layer(layers: &[Layer], feature: FeatureType) -> Option<usize> {
    let mut found = None;
    for (idx, layer) in layers.iter().enumerate() {
        if layer.permits(feature) {
            found = Some(idx);
        }
    }
    found
}

/// Assign a created shape to a layer, restyling it in place.
///
/// The shape takes the layer's color (or loses its color when unmatched) and
/// its descriptor as tooltip. Group membership is left to the caller.
pub fn route(geometry: &mut DrawnGeometry, kind: ShapeKind, layers: &[Layer]) -> RoutedAssignment {
    let layer = kind.feature_type().and_then(|f| find_layer(layers, f));
    let color = layer.map(|idx| layers[idx].color.clone());
    let descriptor = geometry.describe();

    geometry.style.color = color.clone();
    geometry.style.tooltip = Some(descriptor.clone());

    debug!(
        "routed {} to {}",
        kind,
        layer.map_or("<none>", |idx| layers[idx].name.as_str())
    );

    RoutedAssignment {
        layer,
        color,
        descriptor,
    }
}

/// Refresh an edited shape's tooltip and return its descriptor.
/// Layer membership never changes on edit.
pub fn describe_edit(geometry: &mut DrawnGeometry) -> String {
    let descriptor = geometry.describe();
    geometry.style.tooltip = Some(descriptor.clone());
    descriptor
}

/// Feature types accepted by more than one layer, with the competing layer indices
pub fn ambiguous_features(layers: &[Layer]) -> Vec<(FeatureType, Vec<usize>)> {
    FeatureType::ALL
        .iter()
        .filter_map(|&feature| {
            let matches: Vec<usize> = layers
                .iter()
                .enumerate()
                .filter(|(_, layer)| layer.permits(feature))
                .map(|(idx, _)| idx)
                .collect();
            (matches.len() > 1).then_some((feature, matches))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{LatLng, Shape};

    fn polygon() -> DrawnGeometry {
        DrawnGeometry::new(Shape::Polygon(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ]))
    }

    #[test]
    fn test_last_matching_layer_wins() {
        let layers = vec![
            Layer::new("A", &[FeatureType::Polygon], "red"),
            Layer::new("B", &[FeatureType::Polygon], "blue"),
        ];
        let mut geometry = polygon();
        let assignment = route(&mut geometry, ShapeKind::Polygon, &layers);
        assert_eq!(assignment.layer, Some(1));
        assert_eq!(assignment.color.as_deref(), Some("blue"));
        assert_eq!(geometry.style.color.as_deref(), Some("blue"));
    }

    #[test]
    fn test_match_sets_tooltip_to_descriptor() {
        let layers = vec![Layer::new("A", &[FeatureType::Polygon], "red")];
        let mut geometry = polygon();
        let assignment = route(&mut geometry, ShapeKind::Polygon, &layers);
        assert!(assignment.descriptor.starts_with("The Polygon coordinates are:"));
        assert_eq!(geometry.style.tooltip.as_ref(), Some(&assignment.descriptor));
    }

    #[test]
    fn test_unmatched_feature_still_described() {
        let layers = vec![Layer::new("A", &[FeatureType::Marker], "red")];
        let mut geometry = polygon();
        geometry.style.color = Some("green".to_string());
        let assignment = route(&mut geometry, ShapeKind::Polygon, &layers);
        assert_eq!(assignment.layer, None);
        assert_eq!(geometry.style.color, None);
        assert!(!assignment.descriptor.is_empty());
    }

    #[test]
    fn test_circle_marker_never_routed() {
        let layers = vec![Layer::new("all", &FeatureType::ALL, "red")];
        let mut geometry = DrawnGeometry::new(Shape::CircleMarker {
            center: LatLng::new(0.0, 0.0),
            radius: 3.0,
        });
        let assignment = route(&mut geometry, ShapeKind::CircleMarker, &layers);
        assert_eq!(assignment.layer, None);
        assert_eq!(assignment.descriptor, "");
    }

    #[test]
    fn test_ambiguous_features() {
        let layers = vec![
            Layer::new("A", &[FeatureType::Polygon, FeatureType::Marker], "red"),
            Layer::new("B", &[FeatureType::Polygon], "blue"),
        ];
        assert_eq!(
            ambiguous_features(&layers),
            vec![(FeatureType::Polygon, vec![0, 1])]
        );
    }

    #[test]
    fn test_describe_edit_refreshes_tooltip() {
        let mut geometry = polygon();
        geometry.style.tooltip = Some("stale".to_string());
        let descriptor = describe_edit(&mut geometry);
        assert_eq!(geometry.style.tooltip, Some(descriptor));
    }
}
