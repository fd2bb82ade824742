use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Visible bounds of a view, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// PNG bitmap captured from a view before it was released.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    png: Arc<[u8]>,
}

impl Snapshot {
    pub fn from_png(width: u32, height: u32, png: Vec<u8>) -> Self {
        Self {
            width,
            height,
            png: png.into(),
        }
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Encodes the bitmap as a `data:` URL usable as an `<img>` source.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}
