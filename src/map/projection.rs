use crate::shape::LatLng;
use glam::DVec2;

const MIN_ZOOM: f64 = 0.05;
const MAX_ZOOM: f64 = 64.0;

/// Viewport over a planar, y-up map (one unit per grid cell)
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Map coordinate at the canvas center
    pub center: DVec2,
    /// Canvas pixels per map unit
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: DVec2, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    /// Frame a `size` map-unit area whose bottom-left corner is the origin
    pub fn fit(size: DVec2, width: usize, height: usize) -> Self {
        let zoom = if size.x > 0.0 && size.y > 0.0 {
            (width as f64 / size.x).min(height as f64 / size.y)
        } else {
            1.0
        };
        Self::new(size * 0.5, zoom.clamp(MIN_ZOOM, MAX_ZOOM), width, height)
    }

    fn half_canvas(&self) -> DVec2 {
        DVec2::new(self.width as f64, self.height as f64) * 0.5
    }

    /// Pan the viewport by pixel delta (screen y grows downward)
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.center += DVec2::new(dx as f64, -(dy as f64)) / self.zoom;
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in keeping the point under (px, py) fixed
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py).0;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        // Shift so the anchor projects back under the pointer
        let half = self.half_canvas();
        let offset = DVec2::new(px as f64 - half.x, half.y - py as f64);
        self.center = anchor - offset / self.zoom;
    }

    /// Canvas pixel to map coordinate
    pub fn unproject(&self, px: i32, py: i32) -> LatLng {
        let half = self.half_canvas();
        let x = (px as f64 - half.x) / self.zoom + self.center.x;
        let y = (half.y - py as f64) / self.zoom + self.center.y;
        LatLng(DVec2::new(x, y))
    }

    /// Map coordinate to canvas pixel
    pub fn project(&self, point: LatLng) -> (i32, i32) {
        let half = self.half_canvas();
        let offset = (point.0 - self.center) * self.zoom;
        ((half.x + offset.x).floor() as i32, (half.y - offset.y).floor() as i32)
    }

    /// Map distance to canvas pixels
    pub fn scale(&self, distance: f64) -> i32 {
        (distance * self.zoom).round() as i32
    }

    /// Check if a projected point is near the canvas
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a segment might cross the canvas (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(DVec2::new(10.0, 10.0), 2.0, 100, 100);
        assert_eq!(vp.project(LatLng::new(10.0, 10.0)), (50, 50));
    }

    #[test]
    fn test_y_axis_points_up() {
        let vp = Viewport::new(DVec2::ZERO, 1.0, 100, 100);
        let (_, above) = vp.project(LatLng::new(10.0, 0.0));
        let (_, below) = vp.project(LatLng::new(-10.0, 0.0));
        assert!(above < below);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(DVec2::new(3.0, -4.0), 4.0, 80, 60);
        let point = vp.unproject(17, 42);
        assert_eq!(vp.project(point), (17, 42));
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(DVec2::ZERO, 2.0, 100, 100);
        vp.pan(10, 4);
        assert_eq!(vp.center, DVec2::new(5.0, -2.0));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut vp = Viewport::new(DVec2::ZERO, 1.0, 100, 100);
        let before = vp.unproject(80, 20);
        vp.zoom_in_at(80, 20);
        let after = vp.unproject(80, 20);
        assert!((before.0 - after.0).length() < 1e-9);
    }

    #[test]
    fn test_fit_frames_area() {
        let vp = Viewport::fit(DVec2::new(50.0, 25.0), 100, 100);
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(vp.center, DVec2::new(25.0, 12.5));
    }
}
