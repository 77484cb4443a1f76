//! Layered terminal map: routes drawn annotations to layers and renders
//! occupancy grids as image overlays.

pub mod braille;
pub mod capability;
pub mod config;
pub mod grid;
pub mod layer;
pub mod map;
pub mod router;
pub mod session;
pub mod shape;
pub mod source;
