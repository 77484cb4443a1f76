use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use image::{imageops, ImageFormat, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;
use thiserror::Error;

pub const UNKNOWN_RGBA: [u8; 4] = [112, 98, 94, 200];
pub const FREE_RGBA: [u8; 4] = [254, 250, 250, 255];
pub const OCCUPIED_RGBA: [u8; 4] = [0, 0, 0, 255];
pub const UNRECOGNIZED_RGBA: [u8; 4] = [255, 0, 0, 255];

#[derive(Debug, Error)]
pub enum GridError {
    #[error("occupancy grid is empty")]
    EmptyGrid,
    #[error("grid has {actual} cells but dimensions require {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("pixel buffer holds {actual} bytes, {width}x{height} needs {expected}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
    #[error("grid of {width}x{height} cells exceeds image limits")]
    TooLarge { width: usize, height: usize },
    #[error("failed to encode overlay image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Status of one occupancy grid cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Unknown,
    Free,
    Occupied,
    /// Any code outside the table; `None` when read back from a pixel
    Unrecognized(Option<i32>),
}

impl CellState {
    #[inline(always)]
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => CellState::Unknown,
            0 => CellState::Free,
            100 => CellState::Occupied,
            other => CellState::Unrecognized(Some(other)),
        }
    }

    #[inline(always)]
    pub fn rgba(self) -> [u8; 4] {
        match self {
            CellState::Unknown => UNKNOWN_RGBA,
            CellState::Free => FREE_RGBA,
            CellState::Occupied => OCCUPIED_RGBA,
            CellState::Unrecognized(_) => UNRECOGNIZED_RGBA,
        }
    }

    /// Classify an overlay pixel. Exact table colors map back to their state,
    /// anything else (server-rendered images) falls back to brightness.
    pub fn from_rgba(px: [u8; 4]) -> Self {
        match px {
            UNKNOWN_RGBA => CellState::Unknown,
            FREE_RGBA => CellState::Free,
            OCCUPIED_RGBA => CellState::Occupied,
            UNRECOGNIZED_RGBA => CellState::Unrecognized(None),
            [r, g, b, a] => {
                if a == 0 {
                    return CellState::Free;
                }
                let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
                if luma < 64 {
                    CellState::Occupied
                } else if luma < 192 {
                    CellState::Unknown
                } else {
                    CellState::Free
                }
            }
        }
    }
}

/// Grid size, either declared by the source or inferred as a square
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimensions {
    Explicit { width: usize, height: usize },
    InferSquare,
}

impl Dimensions {
    /// Explicit only when both sides are known
    pub fn from_optional(width: Option<usize>, height: Option<usize>) -> Self {
        match (width, height) {
            (Some(width), Some(height)) => Dimensions::Explicit { width, height },
            _ => Dimensions::InferSquare,
        }
    }

    /// Resolve to `(width, height)` for a grid of `cells` codes
    pub fn resolve(self, cells: usize) -> Result<(usize, usize), GridError> {
        match self {
            Dimensions::Explicit { width, height } => {
                let expected = width.saturating_mul(height);
                if expected != cells {
                    return Err(GridError::DimensionMismatch {
                        expected,
                        actual: cells,
                    });
                }
                Ok((width, height))
            }
            Dimensions::InferSquare => {
                let side = (cells as f64).sqrt().round() as usize;
                if side * side != cells {
                    return Err(GridError::DimensionMismatch {
                        expected: side * side,
                        actual: cells,
                    });
                }
                Ok((side, side))
            }
        }
    }
}

/// Row-major status codes, first code at the logical top-left
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    pub codes: Vec<i32>,
    pub dimensions: Dimensions,
}

impl OccupancyGrid {
    pub fn new(codes: Vec<i32>, dimensions: Dimensions) -> Self {
        Self { codes, dimensions }
    }

    pub fn rasterize(&self) -> Result<EncodedImage, GridError> {
        rasterize(&self.codes, self.dimensions)
    }

    pub fn render_pixels(&self) -> Result<RgbaImage, GridError> {
        render_pixels(&self.codes, self.dimensions)
    }
}

/// RGBA bytes, four per cell, top row first
pub struct PixelBuffer {
    width: usize,
    height: usize,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self, GridError> {
        let Some(expected) = width.checked_mul(height).and_then(|cells| cells.checked_mul(4))
        else {
            return Err(GridError::TooLarge { width, height });
        };
        if bytes.len() != expected {
            return Err(GridError::BufferSize {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    /// Color every cell from the fixed table
    pub fn from_codes(codes: &[i32], width: usize, height: usize) -> Result<Self, GridError> {
        let mut bytes = vec![0u8; codes.len() * 4];
        bytes
            .par_chunks_exact_mut(4)
            .zip(codes.par_iter())
            .for_each(|(px, &code)| px.copy_from_slice(&CellState::from_code(code).rgba()));
        Self::new(width, height, bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Surface with buffer row 0 as the first image row
    pub fn into_image(self) -> Result<RgbaImage, GridError> {
        let too_large = GridError::TooLarge {
            width: self.width,
            height: self.height,
        };
        let (Ok(width), Ok(height)) = (u32::try_from(self.width), u32::try_from(self.height))
        else {
            return Err(too_large);
        };
        RgbaImage::from_raw(width, height, self.bytes).ok_or(too_large)
    }
}

/// Decode grid codes into an image with the vertical axis corrected.
///
/// Grid rows count up from the bottom while image rows count down from the
/// top, so buffer row `height - 1` becomes output row 0.
pub fn render_pixels(codes: &[i32], dimensions: Dimensions) -> Result<RgbaImage, GridError> {
    if codes.is_empty() {
        return Err(GridError::EmptyGrid);
    }
    let (width, height) = dimensions.resolve(codes.len())?;

    let mut image = PixelBuffer::from_codes(codes, width, height)?.into_image()?;
    imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

/// Rasterize a grid and encode it as PNG
pub fn rasterize(codes: &[i32], dimensions: Dimensions) -> Result<EncodedImage, GridError> {
    let image = render_pixels(codes, dimensions)?;
    EncodedImage::encode(&image)
}

/// A self-contained PNG ready to embed or transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl EncodedImage {
    pub fn encode(image: &RgbaImage) -> Result<Self, GridError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&self.png))
    }
}

/// Generate a small floor plan for when no grid source is configured
pub fn demo_grid(width: usize, height: usize) -> OccupancyGrid {
    let mut codes = vec![0; width * height];
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let on_wall = row == 0 || col == 0 || row == height - 1 || col == width - 1;
            let on_partition = col == width / 2 && row % 12 > 3;
            let unexplored = row < height / 4 && col > width * 3 / 4;
            codes[idx] = if on_wall || on_partition {
                100
            } else if unexplored {
                -1
            } else {
                0
            };
        }
    }
    // A block of out-of-range readings
    for row in height / 2..(height / 2 + 2).min(height) {
        for col in width / 4..(width / 4 + 3).min(width) {
            codes[row * width + col] = 50;
        }
    }
    OccupancyGrid::new(codes, Dimensions::Explicit { width, height })
}
