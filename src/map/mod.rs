mod geometry;
mod projection;
mod renderer;

pub use projection::Viewport;
pub use renderer::{draw_shape, DisplaySettings, MapLayers, MapRenderer};
