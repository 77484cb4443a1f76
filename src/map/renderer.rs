use crate::braille::BrailleCanvas;
use crate::grid::CellState;
use crate::map::geometry::{draw_disc, draw_marker, draw_path, draw_ring};
use crate::map::projection::Viewport;
use crate::session::MapSession;
use crate::shape::{LatLng, Shape};
use image::RgbaImage;
use rayon::prelude::*;

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_overlay: bool,
    pub show_annotations: bool,
    pub show_unknown: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_overlay: true,
            show_annotations: true,
            show_unknown: true,
        }
    }
}

/// Rendered canvases, back to front
pub struct MapLayers {
    pub unknown: BrailleCanvas,
    pub occupied: BrailleCanvas,
    pub unrecognized: BrailleCanvas,
    /// One canvas per visible annotation layer, with the layer color
    pub annotations: Vec<(String, BrailleCanvas)>,
    /// Shape being drawn or selected for edit
    pub highlight: BrailleCanvas,
}

/// Renders the occupancy overlay and the session's annotation layers
pub struct MapRenderer {
    /// Overlay image, one pixel per map unit, bottom-left corner at the origin
    overlay: Option<RgbaImage>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            overlay: None,
            settings: DisplaySettings::default(),
        }
    }

    pub fn set_overlay(&mut self, image: RgbaImage) {
        self.overlay = Some(image);
    }

    /// Overlay size in map units
    pub fn overlay_size(&self) -> Option<(u32, u32)> {
        self.overlay.as_ref().map(|image| image.dimensions())
    }

    /// Render all map features for a canvas of `width` x `height` characters
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        session: &MapSession,
        highlight: Option<&Shape>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            unknown: BrailleCanvas::new(width, height),
            occupied: BrailleCanvas::new(width, height),
            unrecognized: BrailleCanvas::new(width, height),
            annotations: Vec::new(),
            highlight: BrailleCanvas::new(width, height),
        };

        if self.settings.show_overlay {
            if let Some(image) = &self.overlay {
                self.render_overlay(&mut layers, image, viewport);
            }
        }

        if self.settings.show_annotations {
            for layer in session.layers() {
                let mut canvas = BrailleCanvas::new(width, height);
                let mut any = false;
                for (_, geometry) in session.visible_shapes().filter(|(l, _)| l.name == layer.name) {
                    draw_shape(&mut canvas, &geometry.shape, viewport);
                    any = true;
                }
                if any {
                    layers.annotations.push((layer.color.clone(), canvas));
                }
            }
        }

        if let Some(shape) = highlight {
            draw_shape(&mut layers.highlight, shape, viewport);
            draw_handles(&mut layers.highlight, shape, viewport);
        }

        layers
    }

    /// Sample the overlay once per braille dot
    fn render_overlay(&self, layers: &mut MapLayers, image: &RgbaImage, viewport: &Viewport) {
        let (img_w, img_h) = image.dimensions();
        let pixel_width = layers.occupied.pixel_width();

        let rows: Vec<Vec<CellState>> = (0..layers.occupied.pixel_height())
            .into_par_iter()
            .map(|py| {
                (0..pixel_width)
                    .map(|px| {
                        let point = viewport.unproject(px as i32, py as i32).0;
                        if point.x < 0.0 || point.y < 0.0 {
                            return CellState::Free;
                        }
                        let (col, up) = (point.x as u32, point.y as u32);
                        if col >= img_w || up >= img_h {
                            return CellState::Free;
                        }
                        // Image row 0 is the top of the map
                        CellState::from_rgba(image.get_pixel(col, img_h - 1 - up).0)
                    })
                    .collect()
            })
            .collect();

        for (py, row) in rows.iter().enumerate() {
            for (px, state) in row.iter().enumerate() {
                match state {
                    CellState::Free => {}
                    CellState::Occupied => layers.occupied.set_pixel(px, py),
                    CellState::Unknown if self.settings.show_unknown => layers.unknown.set_pixel(px, py),
                    CellState::Unknown => {}
                    CellState::Unrecognized(_) => layers.unrecognized.set_pixel(px, py),
                }
            }
        }
    }

    pub fn toggle_overlay(&mut self) {
        self.settings.show_overlay = !self.settings.show_overlay;
    }

    pub fn toggle_annotations(&mut self) {
        self.settings.show_annotations = !self.settings.show_annotations;
    }

    pub fn toggle_unknown(&mut self) {
        self.settings.show_unknown = !self.settings.show_unknown;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn project_all(points: &[LatLng], viewport: &Viewport) -> Vec<(i32, i32)> {
    points.iter().map(|&p| viewport.project(p)).collect()
}

/// Draw one shape's outline
pub fn draw_shape(canvas: &mut BrailleCanvas, shape: &Shape, viewport: &Viewport) {
    match shape {
        Shape::Polyline(vertices) => {
            let points = project_all(vertices, viewport);
            if points.iter().any(|&(x, y)| viewport.is_visible(x, y))
                || points
                    .windows(2)
                    .any(|pair| viewport.line_might_be_visible(pair[0], pair[1]))
            {
                draw_path(canvas, &points, false);
            }
        }
        Shape::Polygon(vertices) | Shape::Rectangle(vertices) => {
            draw_path(canvas, &project_all(vertices, viewport), true);
        }
        Shape::Circle { center, radius } | Shape::CircleMarker { center, radius } => {
            let (x, y) = viewport.project(*center);
            draw_ring(canvas, x, y, viewport.scale(*radius));
        }
        Shape::Marker(point) => {
            let (x, y) = viewport.project(*point);
            draw_marker(canvas, x, y, 2);
        }
    }
}

/// Draw vertex handles for a highlighted shape
fn draw_handles(canvas: &mut BrailleCanvas, shape: &Shape, viewport: &Viewport) {
    let points: Vec<LatLng> = match shape {
        Shape::Polyline(vertices) | Shape::Polygon(vertices) | Shape::Rectangle(vertices) => {
            vertices.clone()
        }
        Shape::Circle { center, .. } | Shape::CircleMarker { center, .. } => vec![*center],
        Shape::Marker(point) => vec![*point],
    };
    for point in points {
        let (x, y) = viewport.project(point);
        draw_disc(canvas, x, y, 1);
    }
}
