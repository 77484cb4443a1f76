use crate::layer::ShapeKind;
use glam::DVec2;
use std::fmt;

/// Planar map coordinate. `x` is the longitude axis, `y` the latitude axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng(pub DVec2);

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self(DVec2::new(lng, lat))
    }

    #[inline(always)]
    pub fn lat(self) -> f64 {
        self.0.y
    }

    #[inline(always)]
    pub fn lng(self) -> f64 {
        self.0.x
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LatLng({}, {})", format_num(self.lat()), format_num(self.lng()))
    }
}

/// Round to 6 decimals and print without trailing zeros (5.0 -> "5")
pub fn format_num(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    // Avoid printing "-0"
    format!("{}", rounded + 0.0)
}

fn format_vertices(vertices: &[LatLng]) -> String {
    vertices
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Geometry payload of a drawn shape, one variant per widget kind
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Polyline(Vec<LatLng>),
    Polygon(Vec<LatLng>),
    Rectangle(Vec<LatLng>),
    Circle { center: LatLng, radius: f64 },
    Marker(LatLng),
    /// Lightweight marker mode, never offered by the toolbar
    CircleMarker { center: LatLng, radius: f64 },
}

impl Shape {
    /// Axis-aligned rectangle from two opposite corners, counter-clockwise from the south-west
    pub fn rectangle(a: LatLng, b: LatLng) -> Self {
        let min = a.0.min(b.0);
        let max = a.0.max(b.0);
        Shape::Rectangle(vec![
            LatLng(min),
            LatLng(DVec2::new(min.x, max.y)),
            LatLng(max),
            LatLng(DVec2::new(max.x, min.y)),
        ])
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Polyline(_) => ShapeKind::Polyline,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Marker(_) => ShapeKind::Marker,
            Shape::CircleMarker { .. } => ShapeKind::CircleMarker,
        }
    }

    /// Shift every coordinate by `delta` map units
    pub fn translate(&mut self, delta: DVec2) {
        match self {
            Shape::Polyline(vertices) | Shape::Polygon(vertices) | Shape::Rectangle(vertices) => {
                for v in vertices {
                    v.0 += delta;
                }
            }
            Shape::Circle { center, .. } | Shape::CircleMarker { center, .. } => center.0 += delta,
            Shape::Marker(point) => point.0 += delta,
        }
    }

    /// Human-readable summary of the shape's kind and coordinates.
    /// Kinds outside the five layer feature types describe as an empty string.
    pub fn describe(&self) -> String {
        match self {
            Shape::Rectangle(vertices) => {
                format!("The Rectangle coordinates are:\n{}", format_vertices(vertices))
            }
            Shape::Polygon(vertices) => {
                format!("The Polygon coordinates are:\n{}", format_vertices(vertices))
            }
            Shape::Polyline(vertices) => {
                format!("The Polyline coordinates are:\n{}", format_vertices(vertices))
            }
            Shape::Circle { center, radius } => format!(
                "The Circle coordinates are:\n{}\nThe Circle radius is:\n{}",
                center,
                format_num(*radius)
            ),
            Shape::Marker(point) => format!("The Marker coordinates are:\n{}", point),
            Shape::CircleMarker { .. } => String::new(),
        }
    }
}

/// Mutable presentation of a drawn shape
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeStyle {
    pub color: Option<String>,
    pub tooltip: Option<String>,
}

/// A shape produced by the drawing widget
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnGeometry {
    pub shape: Shape,
    pub style: ShapeStyle,
}

impl DrawnGeometry {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            style: ShapeStyle::default(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn describe(&self) -> String {
        self.shape.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_description() {
        let shape = Shape::Circle {
            center: LatLng::new(5.0, 5.0),
            radius: 10.0,
        };
        let text = shape.describe();
        assert!(text.contains("(5, 5)"));
        assert!(text.contains("10"));
        assert_eq!(
            text,
            "The Circle coordinates are:\nLatLng(5, 5)\nThe Circle radius is:\n10"
        );
    }

    #[test]
    fn test_circle_marker_describes_empty() {
        let shape = Shape::CircleMarker {
            center: LatLng::new(1.0, 2.0),
            radius: 4.0,
        };
        assert_eq!(shape.describe(), "");
    }

    #[test]
    fn test_vertex_list_description() {
        let shape = Shape::Polyline(vec![LatLng::new(1.5, 2.0), LatLng::new(-3.0, 4.25)]);
        assert_eq!(
            shape.describe(),
            "The Polyline coordinates are:\nLatLng(1.5, 2),LatLng(-3, 4.25)"
        );
    }

    #[test]
    fn test_marker_description() {
        let shape = Shape::Marker(LatLng::new(41.125278, 16.866667));
        assert_eq!(
            shape.describe(),
            "The Marker coordinates are:\nLatLng(41.125278, 16.866667)"
        );
    }

    #[test]
    fn test_format_num_rounds_to_six_places() {
        assert_eq!(format_num(1.23456789), "1.234568");
        assert_eq!(format_num(-0.0), "0");
        assert_eq!(format_num(100.0), "100");
    }

    #[test]
    fn test_rectangle_from_corners() {
        let shape = Shape::rectangle(LatLng::new(4.0, 3.0), LatLng::new(1.0, 0.0));
        let Shape::Rectangle(vertices) = &shape else {
            panic!("expected rectangle");
        };
        assert_eq!(vertices[0], LatLng::new(1.0, 0.0));
        assert_eq!(vertices[2], LatLng::new(4.0, 3.0));
        assert!(shape.describe().starts_with("The Rectangle coordinates are:\n"));
    }

    #[test]
    fn test_translate_moves_all_vertices() {
        let mut shape = Shape::Polygon(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]);
        shape.translate(DVec2::new(2.0, -1.0));
        assert_eq!(
            shape,
            Shape::Polygon(vec![LatLng::new(-1.0, 2.0), LatLng::new(0.0, 3.0)])
        );
    }
}
