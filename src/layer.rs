use serde::Deserialize;
use std::fmt;

/// Annotation shape kinds a layer can accept
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Polyline,
    Polygon,
    Rectangle,
    Circle,
    Marker,
}

impl FeatureType {
    pub const ALL: [FeatureType; 5] = [
        FeatureType::Polyline,
        FeatureType::Polygon,
        FeatureType::Rectangle,
        FeatureType::Circle,
        FeatureType::Marker,
    ];
}

/// Runtime shape tag emitted by the drawing widget.
/// Every feature type plus the lightweight circle-marker mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Polyline,
    Polygon,
    Rectangle,
    Circle,
    Marker,
    CircleMarker,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Polyline,
        ShapeKind::Polygon,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Marker,
        ShapeKind::CircleMarker,
    ];

    /// The layer-routable feature type, if this kind has one
    pub fn feature_type(self) -> Option<FeatureType> {
        match self {
            ShapeKind::Polyline => Some(FeatureType::Polyline),
            ShapeKind::Polygon => Some(FeatureType::Polygon),
            ShapeKind::Rectangle => Some(FeatureType::Rectangle),
            ShapeKind::Circle => Some(FeatureType::Circle),
            ShapeKind::Marker => Some(FeatureType::Marker),
            ShapeKind::CircleMarker => None,
        }
    }

    /// Parse the widget's event tag ("polygon", "circlemarker", ...)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "polyline" => Some(ShapeKind::Polyline),
            "polygon" => Some(ShapeKind::Polygon),
            "rectangle" => Some(ShapeKind::Rectangle),
            "circle" => Some(ShapeKind::Circle),
            "marker" => Some(ShapeKind::Marker),
            "circlemarker" => Some(ShapeKind::CircleMarker),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ShapeKind::Polyline => "polyline",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Marker => "marker",
            ShapeKind::CircleMarker => "circlemarker",
        }
    }
}

impl From<FeatureType> for ShapeKind {
    fn from(feature: FeatureType) -> Self {
        match feature {
            FeatureType::Polyline => ShapeKind::Polyline,
            FeatureType::Polygon => ShapeKind::Polygon,
            FeatureType::Rectangle => ShapeKind::Rectangle,
            FeatureType::Circle => ShapeKind::Circle,
            FeatureType::Marker => ShapeKind::Marker,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named, colored annotation group
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Shown when the map starts
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Attached to the edit toolbar
    #[serde(default)]
    pub editable: bool,
    #[serde(default, rename = "features")]
    pub permitted_features: Vec<FeatureType>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_visible() -> bool {
    true
}

fn default_color() -> String {
    "blue".to_string()
}

impl Layer {
    pub fn new(name: &str, features: &[FeatureType], color: &str) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            editable: false,
            permitted_features: features.to_vec(),
            color: color.to_string(),
        }
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn permits(&self, feature: FeatureType) -> bool {
        self.permitted_features.contains(&feature)
    }
}

/// Map-level switches for the drawing and editing toolbars
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct MapProps {
    #[serde(default = "default_visible")]
    pub drawable: bool,
    #[serde(default = "default_visible")]
    pub editable: bool,
}

impl Default for MapProps {
    fn default() -> Self {
        Self {
            drawable: true,
            editable: true,
        }
    }
}
