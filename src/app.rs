use glam::DVec2;
use log::{debug, info};
use std::collections::{BTreeMap, VecDeque};
use tui_layer_map::layer::ShapeKind;
use tui_layer_map::map::{MapRenderer, Viewport};
use tui_layer_map::session::{MapSession, NotificationSink, ShapeId};
use tui_layer_map::shape::{DrawnGeometry, LatLng, Shape};

/// Recent user-facing messages; the newest also opens as a popup
pub struct StatusLog {
    messages: VecDeque<String>,
    pub popup: Option<String>,
}

impl StatusLog {
    const CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(Self::CAPACITY),
            popup: None,
        }
    }

    pub fn latest(&self) -> Option<&str> {
        self.messages.back().map(String::as_str)
    }

    pub fn dismiss(&mut self) -> bool {
        self.popup.take().is_some()
    }
}

impl NotificationSink for StatusLog {
    fn notify(&mut self, message: &str) {
        // Kinds without a description leave the log and popup untouched
        if message.is_empty() {
            return;
        }
        if self.messages.len() == Self::CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(message.to_string());
        self.popup = Some(message.to_string());
    }
}

/// Edit toolbar state: the selected shape and originals of moved shapes
pub struct EditState {
    pub selected: usize,
    originals: BTreeMap<ShapeId, Shape>,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub session: MapSession,
    pub status: StatusLog,
    pub should_quit: bool,
    /// Active drawing tool
    pub tool: Option<ShapeKind>,
    /// Vertices placed for the shape being drawn
    pub draft: Vec<LatLng>,
    pub edit: Option<EditState>,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
}

impl App {
    pub fn new(width: usize, height: usize, session: MapSession, map_renderer: MapRenderer) -> Self {
        let viewport = Self::home_viewport(&map_renderer, width, height);
        Self {
            viewport,
            map_renderer,
            session,
            status: StatusLog::new(),
            should_quit: false,
            tool: None,
            draft: Vec::new(),
            edit: None,
            last_mouse: None,
            dragged: false,
            mouse_pos: None,
        }
    }

    /// Frame the overlay, or a 100x100 area when there is none
    fn home_viewport(renderer: &MapRenderer, width: usize, height: usize) -> Viewport {
        // Account for border (2 chars horizontal, 2 chars vertical plus status bar)
        let pixel_width = width.saturating_sub(2) * 2;
        let pixel_height = height.saturating_sub(3) * 4;
        let size = renderer
            .overlay_size()
            .map_or(DVec2::splat(100.0), |(w, h)| DVec2::new(w as f64, h as f64));
        Viewport::fit(size, pixel_width, pixel_height)
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width.saturating_sub(2) * 2;
        self.viewport.height = height.saturating_sub(3) * 4;
    }

    pub fn reset_view(&mut self, width: usize, height: usize) {
        self.viewport = Self::home_viewport(&self.map_renderer, width, height);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = Self::to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = Self::to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Terminal cell to braille pixel, accounting for the 1-cell border
    fn to_pixel(col: u16, row: u16) -> (i32, i32) {
        ((col.saturating_sub(1) as i32) * 2, (row.saturating_sub(1) as i32) * 4)
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.2}px/cell", self.viewport.zoom)
    }

    /// Map coordinate under the mouse cursor
    pub fn cursor_point(&self) -> Option<LatLng> {
        self.mouse_pos.map(|(col, row)| {
            let (px, py) = Self::to_pixel(col, row);
            self.viewport.unproject(px, py)
        })
    }

    pub fn cursor_coords(&self) -> String {
        self.cursor_point().map_or_else(String::new, |p| p.to_string())
    }

    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| Self::to_pixel(col, row))
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    pub fn begin_press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Mouse drag pans the map
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            self.pan(dx * 2, dy * 4);
            self.dragged = true;
        }
        self.last_mouse = Some((x, y));
    }

    /// A release without drag is a click
    pub fn end_press(&mut self, col: u16, row: u16) {
        let was_click = !self.dragged && self.last_mouse.is_some();
        self.last_mouse = None;
        self.dragged = false;
        if was_click {
            self.click(col, row);
        }
    }

    /// Pick a drawing tool. Tools the toolbar does not offer are refused.
    pub fn select_tool(&mut self, kind: ShapeKind) {
        if self.edit.is_some() {
            return;
        }
        match self.session.toolbar().select(kind) {
            Some(kind) => {
                self.tool = Some(kind);
                self.draft.clear();
            }
            None => debug!("{} tool is not offered", kind),
        }
    }

    fn click(&mut self, col: u16, row: u16) {
        let Some(kind) = self.tool else {
            return;
        };
        let (px, py) = Self::to_pixel(col, row);
        let point = self.viewport.unproject(px, py);
        self.draft.push(point);

        let finished = match (kind, self.draft.as_slice()) {
            (ShapeKind::Marker, [p]) => Some(Shape::Marker(*p)),
            (ShapeKind::Rectangle, [a, b]) => Some(Shape::rectangle(*a, *b)),
            (ShapeKind::Circle, [center, edge]) => Some(Shape::Circle {
                center: *center,
                radius: center.0.distance(edge.0),
            }),
            (ShapeKind::CircleMarker, [center]) => Some(Shape::CircleMarker {
                center: *center,
                radius: 10.0,
            }),
            _ => None,
        };
        if let Some(shape) = finished {
            self.create(shape, kind);
        }
    }

    /// Enter finishes a polyline or polygon draft
    pub fn finish_draft(&mut self) {
        let Some(kind) = self.tool else {
            return;
        };
        let shape = match kind {
            ShapeKind::Polyline if self.draft.len() >= 2 => Shape::Polyline(self.draft.clone()),
            ShapeKind::Polygon if self.draft.len() >= 3 => Shape::Polygon(self.draft.clone()),
            _ => return,
        };
        self.create(shape, kind);
    }

    fn create(&mut self, shape: Shape, kind: ShapeKind) {
        self.draft.clear();
        let created = self
            .session
            .on_shape_created(DrawnGeometry::new(shape), kind, &mut self.status);
        if let Some(created) = created {
            if let (Some(id), Some(layer)) = (created.id, created.assignment.layer) {
                info!("shape {} added to {}", id, self.session.layers()[layer].name);
            }
        }
    }

    /// Esc: drop the draft, or leave edit mode restoring moved shapes
    pub fn cancel(&mut self) {
        if let Some(edit) = self.edit.take() {
            for (id, original) in edit.originals {
                if let Some(geometry) = self.session.shape_mut(id) {
                    geometry.shape = original;
                }
            }
            return;
        }
        if self.draft.is_empty() {
            self.tool = None;
        }
        self.draft.clear();
    }

    /// Shape preview: the draft plus the cursor, or the shape selected for edit
    pub fn highlight(&self) -> Option<Shape> {
        if let Some(edit) = &self.edit {
            let id = *self.session.editable_shapes().get(edit.selected)?;
            return self.session.shape(id).map(|g| g.shape.clone());
        }

        let kind = self.tool?;
        let mut points = self.draft.clone();
        if let Some(cursor) = self.cursor_point() {
            points.push(cursor);
        }
        match (kind, points.as_slice()) {
            (_, []) => None,
            (ShapeKind::Rectangle, [a, b]) => Some(Shape::rectangle(*a, *b)),
            (ShapeKind::Circle, [center, edge]) => Some(Shape::Circle {
                center: *center,
                radius: center.0.distance(edge.0),
            }),
            (ShapeKind::Polygon, _) => Some(Shape::Polygon(points)),
            _ => Some(Shape::Polyline(points)),
        }
    }

    /// `e`: enter edit mode on the edit target layer
    pub fn toggle_edit(&mut self) {
        if self.edit.is_some() {
            self.commit_edit();
            return;
        }
        if self.session.toolbar().edit_target.is_none() {
            debug!("no edit target configured");
            return;
        }
        self.tool = None;
        self.draft.clear();
        self.edit = Some(EditState {
            selected: 0,
            originals: BTreeMap::new(),
        });
    }

    pub fn cycle_selection(&mut self) {
        let count = self.session.editable_shapes().len();
        if let Some(edit) = &mut self.edit {
            if count > 0 {
                edit.selected = (edit.selected + 1) % count;
            }
        }
    }

    /// Move the selected shape by whole map units
    pub fn nudge(&mut self, dx: f64, dy: f64) {
        let Some(edit) = &mut self.edit else {
            return;
        };
        let Some(&id) = self.session.editable_shapes().get(edit.selected) else {
            return;
        };
        if let Some(geometry) = self.session.shape_mut(id) {
            edit.originals.entry(id).or_insert_with(|| geometry.shape.clone());
            geometry.shape.translate(DVec2::new(dx, dy));
        }
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// Enter in edit mode: report every moved shape as one edit batch
    pub fn commit_edit(&mut self) {
        if let Some(edit) = self.edit.take() {
            let ids: Vec<ShapeId> = edit.originals.into_keys().collect();
            if !ids.is_empty() {
                self.session.on_shapes_edited(&ids, &mut self.status);
            }
        }
    }
}
