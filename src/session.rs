//! Map session: owns the layer groups and connects widget events to the router.

use crate::capability::{resolve, Toolbar};
use crate::config::MapConfig;
use crate::layer::{Layer, MapProps, ShapeKind};
use crate::router::{ambiguous_features, describe_edit, route, RoutedAssignment};
use crate::shape::DrawnGeometry;
use log::{info, warn};

pub type ShapeId = usize;

/// Receives text meant for the user (create/edit summaries, load failures)
pub trait NotificationSink {
    fn notify(&mut self, message: &str);
}

impl NotificationSink for Vec<String> {
    fn notify(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Render group of one layer
#[derive(Clone, Debug, Default)]
pub struct LayerGroup {
    pub shapes: Vec<ShapeId>,
    pub visible: bool,
}

/// Result of a create event
#[derive(Clone, Debug, PartialEq)]
pub struct Created {
    /// Set when the shape joined a layer group
    pub id: Option<ShapeId>,
    pub assignment: RoutedAssignment,
}

pub struct MapSession {
    layers: Vec<Layer>,
    props: MapProps,
    toolbar: Toolbar,
    groups: Vec<LayerGroup>,
    shapes: Vec<DrawnGeometry>,
}

impl MapSession {
    pub fn new(config: MapConfig) -> Self {
        let MapConfig { map: props, layers } = config;
        let capabilities = resolve(&layers);
        let toolbar = Toolbar::new(&capabilities, &layers, props);
        let groups = layers
            .iter()
            .map(|layer| LayerGroup {
                shapes: Vec::new(),
                visible: layer.visible,
            })
            .collect();

        let session = Self {
            layers,
            props,
            toolbar,
            groups,
            shapes: Vec::new(),
        };
        for message in session.diagnostics() {
            warn!("{}", message);
        }
        info!(
            "map session ready: {} layers, tools [{}]",
            session.layers.len(),
            session
                .toolbar
                .tools()
                .iter()
                .map(|k| k.tag())
                .collect::<Vec<_>>()
                .join(", ")
        );
        session
    }

    /// Configuration problems that do not stop the session
    pub fn diagnostics(&self) -> Vec<String> {
        let mut messages = Vec::new();

        let editable: Vec<&str> = self
            .layers
            .iter()
            .filter(|l| l.editable)
            .map(|l| l.name.as_str())
            .collect();
        if editable.len() > 1 {
            messages.push(format!(
                "layers {} are all editable, edits go to {}",
                editable.join(", "),
                editable[editable.len() - 1]
            ));
        }

        for (feature, matches) in ambiguous_features(&self.layers) {
            let names: Vec<&str> = matches.iter().map(|&i| self.layers[i].name.as_str()).collect();
            messages.push(format!(
                "{:?} is permitted by {}, new shapes go to {}",
                feature,
                names.join(", "),
                names[names.len() - 1]
            ));
        }

        messages
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn group(&self, layer: usize) -> Option<&LayerGroup> {
        self.groups.get(layer)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&DrawnGeometry> {
        self.shapes.get(id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut DrawnGeometry> {
        self.shapes.get_mut(id)
    }

    /// Toggle a layer group's visibility, returning the new state
    pub fn toggle_layer(&mut self, layer: usize) -> Option<bool> {
        let group = self.groups.get_mut(layer)?;
        group.visible = !group.visible;
        Some(group.visible)
    }

    /// Shapes of visible groups, with their layer
    pub fn visible_shapes(&self) -> impl Iterator<Item = (&Layer, &DrawnGeometry)> + '_ {
        self.groups
            .iter()
            .zip(&self.layers)
            .filter(|(group, _)| group.visible)
            .flat_map(move |(group, layer)| group.shapes.iter().map(move |&id| (layer, &self.shapes[id])))
    }

    /// Shapes the edit toolbar operates on
    pub fn editable_shapes(&self) -> &[ShapeId] {
        self.toolbar
            .edit_target
            .and_then(|idx| self.groups.get(idx))
            .map(|group| group.shapes.as_slice())
            .unwrap_or(&[])
    }

    /// Handle a shape finished by the drawing widget
    pub fn on_shape_created(
        &mut self,
        mut geometry: DrawnGeometry,
        kind: ShapeKind,
        sink: &mut dyn NotificationSink,
    ) -> Option<Created> {
        if !self.props.drawable {
            warn!("ignoring {} created while drawing is disabled", kind);
            return None;
        }

        let assignment = route(&mut geometry, kind, &self.layers);
        let id = match assignment.layer {
            Some(layer) => {
                let id = self.shapes.len();
                self.shapes.push(geometry);
                self.groups[layer].shapes.push(id);
                Some(id)
            }
            None => {
                warn!("no layer accepts {}, shape not added to the map", kind);
                None
            }
        };

        sink.notify(&assignment.descriptor);
        Some(Created { id, assignment })
    }

    /// Handle a batch of edited shapes. Only shapes in the edit target are
    /// accepted; membership never changes.
    pub fn on_shapes_edited(&mut self, ids: &[ShapeId], sink: &mut dyn NotificationSink) -> Vec<String> {
        let mut descriptors = Vec::with_capacity(ids.len());
        for &id in ids {
            if !self.editable_shapes().contains(&id) {
                warn!("shape {} is not in the edit target, edit ignored", id);
                continue;
            }
            let descriptor = describe_edit(&mut self.shapes[id]);
            sink.notify(&descriptor);
            descriptors.push(descriptor);
        }
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::FeatureType;
    use crate::shape::{LatLng, Shape};
    use glam::DVec2;

    fn session() -> MapSession {
        MapSession::new(MapConfig {
            map: MapProps::default(),
            layers: vec![
                Layer::new("A", &[FeatureType::Polygon], "red"),
                Layer::new("B", &[FeatureType::Polygon, FeatureType::Marker], "blue")
                    .editable(true),
                Layer::new("C", &[FeatureType::Circle], "green").visible(false),
            ],
        })
    }

    fn marker(lat: f64, lng: f64) -> DrawnGeometry {
        DrawnGeometry::new(Shape::Marker(LatLng::new(lat, lng)))
    }

    #[test]
    fn test_created_shape_joins_last_matching_group() {
        let mut session = session();
        let mut notes = Vec::new();
        let polygon = DrawnGeometry::new(Shape::Polygon(vec![LatLng::new(0.0, 0.0)]));
        let created = session
            .on_shape_created(polygon, ShapeKind::Polygon, &mut notes)
            .unwrap();

        assert_eq!(created.assignment.layer, Some(1));
        let id = created.id.unwrap();
        assert_eq!(session.group(1).unwrap().shapes, vec![id]);
        assert_eq!(session.shape(id).unwrap().style.color.as_deref(), Some("blue"));
        assert_eq!(notes, vec![created.assignment.descriptor]);
    }

    #[test]
    fn test_unmatched_shape_notified_not_added() {
        let mut session = session();
        let mut notes = Vec::new();
        let line = DrawnGeometry::new(Shape::Polyline(vec![LatLng::new(1.0, 1.0)]));
        let created = session
            .on_shape_created(line, ShapeKind::Polyline, &mut notes)
            .unwrap();

        assert_eq!(created.id, None);
        assert_eq!(session.visible_shapes().count(), 0);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].starts_with("The Polyline"));

        // The next shape is unaffected
        let created = session
            .on_shape_created(marker(2.0, 2.0), ShapeKind::Marker, &mut notes)
            .unwrap();
        assert!(created.id.is_some());
    }

    #[test]
    fn test_drawing_disabled_ignores_events() {
        let mut session = MapSession::new(MapConfig {
            map: MapProps {
                drawable: false,
                editable: false,
            },
            layers: vec![Layer::new("A", &[FeatureType::Marker], "red")],
        });
        let mut notes = Vec::new();
        assert!(session
            .on_shape_created(marker(0.0, 0.0), ShapeKind::Marker, &mut notes)
            .is_none());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_edit_describes_without_reassigning() {
        let mut session = session();
        let mut notes = Vec::new();
        let id = session
            .on_shape_created(marker(1.0, 1.0), ShapeKind::Marker, &mut notes)
            .unwrap()
            .id
            .unwrap();

        session.shape_mut(id).unwrap().shape.translate(DVec2::new(1.0, 2.0));
        let descriptors = session.on_shapes_edited(&[id], &mut notes);

        assert_eq!(descriptors, vec!["The Marker coordinates are:\nLatLng(3, 2)".to_string()]);
        assert_eq!(notes.last(), descriptors.last());
        assert_eq!(session.group(1).unwrap().shapes, vec![id]);
        assert_eq!(
            session.shape(id).unwrap().style.tooltip.as_deref(),
            Some("The Marker coordinates are:\nLatLng(3, 2)")
        );
    }

    #[test]
    fn test_edit_outside_target_ignored() {
        let mut session = session();
        let mut notes = Vec::new();
        let circle = DrawnGeometry::new(Shape::Circle {
            center: LatLng::new(0.0, 0.0),
            radius: 2.0,
        });
        let id = session
            .on_shape_created(circle, ShapeKind::Circle, &mut notes)
            .unwrap()
            .id
            .unwrap();
        notes.clear();

        assert!(session.on_shapes_edited(&[id], &mut notes).is_empty());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_visibility_toggle() {
        let mut session = session();
        let mut notes = Vec::new();
        let circle = DrawnGeometry::new(Shape::Circle {
            center: LatLng::new(0.0, 0.0),
            radius: 2.0,
        });
        session.on_shape_created(circle, ShapeKind::Circle, &mut notes);
        assert_eq!(session.visible_shapes().count(), 0);

        assert_eq!(session.toggle_layer(2), Some(true));
        assert_eq!(session.visible_shapes().count(), 1);
        assert_eq!(session.toggle_layer(9), None);
    }

    #[test]
    fn test_diagnostics_report_ambiguity() {
        let session = session();
        let messages = session.diagnostics();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Polygon"));
        assert!(messages[0].ends_with("new shapes go to B"));
    }

    #[test]
    fn test_multiple_editable_layers_reported() {
        let session = MapSession::new(MapConfig {
            map: MapProps::default(),
            layers: vec![
                Layer::new("A", &[], "red").editable(true),
                Layer::new("B", &[], "blue").editable(true),
            ],
        });
        assert_eq!(
            session.diagnostics(),
            vec!["layers A, B are all editable, edits go to B".to_string()]
        );
        assert_eq!(session.toolbar().edit_target, Some(1));
    }
}
