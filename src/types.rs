//! Vertex and image types uploaded to the context.
//!
//! The vertex types are `Pod` so buffers can be handed to
//! [`buffer_data_u8_slice`](crate::GlContext::buffer_data_u8_slice) with
//! [`bytemuck::cast_slice`] and no copying.

use bytemuck::{Pod, Zeroable};

use crate::error::HarnessError;

/// A 2D position of a quad corner.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: [f32; 2],
}

/// A texture coordinate.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TexCoord {
    /// Normalized `(u, v)`.
    pub uv: [f32; 2],
}

/// A vertex of an indexed grid. `z` is always zero.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GridVertex {
    /// Clip-space position.
    pub position: [f32; 3],
}

/// A per-vertex grid color in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GridColor {
    /// Red, green, blue, alpha.
    pub rgba: [f32; 4],
}

/// A decoded image, tightly packed RGBA8, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl LoadedImage {
    /// Decode an encoded PNG or JPEG.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Image`] if the data does not decode.
    pub fn from_memory(data: &[u8]) -> Result<Self, HarnessError> {
        let img = image::load_from_memory(data)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// The pixels with the bottom row first, as GL expects for uploads.
    #[must_use]
    pub fn flipped_rows(&self) -> Vec<u8> {
        let row = self.width as usize * 4;
        if row == 0 {
            return Vec::new();
        }
        self.pixels
            .chunks_exact(row)
            .rev()
            .flatten()
            .copied()
            .collect()
    }
}
