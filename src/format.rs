//! Byte layouts of GL pixel types and formats.
//!
//! These mirror the unpack rules of ES 2.0 §3.6.2 / ES 3.0 §3.7.2 closely
//! enough to build texture upload buffers and readback buffers of the right
//! size.

use crate::{
    color::Rgba8,
    enums::{self, describe},
    error::HarnessError,
};

/// Element type of a client-side pixel array for a GL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayType {
    /// `i8` elements.
    Int8,
    /// `u8` elements.
    Uint8,
    /// `i16` elements.
    Int16,
    /// `u16` elements.
    Uint16,
    /// `i32` elements.
    Int32,
    /// `u32` elements.
    Uint32,
    /// `f32` elements.
    Float32,
}

impl ArrayType {
    /// Size of one element in bytes.
    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
        }
    }
}

/// The client array element type that holds pixels of GL type `ty`.
///
/// Packed 16-bit types and half floats map to `Uint16`; packed 32-bit types
/// map to `Uint32`.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownType`] for any other type.
pub fn gl_type_to_array_type(ty: u32) -> Result<ArrayType, HarnessError> {
    Ok(match ty {
        enums::BYTE => ArrayType::Int8,
        enums::UNSIGNED_BYTE => ArrayType::Uint8,
        enums::SHORT => ArrayType::Int16,
        enums::UNSIGNED_SHORT
        | enums::UNSIGNED_SHORT_5_6_5
        | enums::UNSIGNED_SHORT_4_4_4_4
        | enums::UNSIGNED_SHORT_5_5_5_1
        | enums::HALF_FLOAT
        | enums::HALF_FLOAT_OES => ArrayType::Uint16,
        enums::INT => ArrayType::Int32,
        enums::UNSIGNED_INT
        | enums::UNSIGNED_INT_5_9_9_9_REV
        | enums::UNSIGNED_INT_10F_11F_11F_REV
        | enums::UNSIGNED_INT_2_10_10_10_REV
        | enums::UNSIGNED_INT_24_8 => ArrayType::Uint32,
        enums::FLOAT => ArrayType::Float32,
        other => return Err(HarnessError::UnknownType(describe(other))),
    })
}

/// Bytes occupied by one component of GL type `ty`.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownType`] for unrecognized types.
pub fn bytes_per_component(ty: u32) -> Result<usize, HarnessError> {
    gl_type_to_array_type(ty).map(ArrayType::element_size)
}

/// Number of array elements per pixel for a color `format`/`ty` pair.
///
/// # Errors
///
/// Returns [`HarnessError::NotColorType`] for types other than
/// `UNSIGNED_BYTE` and the packed 16-bit color types, and
/// [`HarnessError::UnknownFormat`] for formats outside
/// RGBA/RGB/LUMINANCE_ALPHA/LUMINANCE/ALPHA.
pub fn typed_array_elements_per_pixel(format: u32, ty: u32) -> Result<usize, HarnessError> {
    match ty {
        enums::UNSIGNED_SHORT_5_6_5 | enums::UNSIGNED_SHORT_4_4_4_4 | enums::UNSIGNED_SHORT_5_5_5_1 => {
            return Ok(1);
        }
        enums::UNSIGNED_BYTE => {}
        other => return Err(HarnessError::NotColorType(describe(other))),
    }
    match format {
        enums::RGBA => Ok(4),
        enums::RGB => Ok(3),
        enums::LUMINANCE_ALPHA => Ok(2),
        enums::LUMINANCE | enums::ALPHA => Ok(1),
        other => Err(HarnessError::UnknownFormat(describe(other))),
    }
}

/// Row stride, in elements, of an unpacked image with the given alignment.
///
/// When a component is at least as wide as the alignment, rows are tightly
/// packed; otherwise each row is rounded up to a multiple of `alignment`
/// bytes.
#[must_use]
pub fn padded_row_length(
    components: usize,
    width: usize,
    bytes_per_component: usize,
    alignment: usize,
) -> usize {
    if bytes_per_component >= alignment {
        return components * width;
    }
    let row_bytes = components * width * bytes_per_component;
    row_bytes.div_ceil(alignment) * alignment / bytes_per_component
}

/// Element count of an upload buffer for `height` rows of `width` pixels.
///
/// The last row is not padded.
#[must_use]
pub fn unpack_buffer_len(components: usize, width: usize, height: usize, padded_row: usize) -> usize {
    if height == 0 {
        return 0;
    }
    width * components + (height - 1) * padded_row
}

/// Build an upload buffer, as bytes, filled with one solid color.
///
/// `color` supplies `components` leading channels, which are written as
/// elements of `ty`; padding elements stay zero.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownType`] if `ty` has no array type.
pub fn solid_fill_data(
    color: &[u8],
    width: usize,
    height: usize,
    ty: u32,
    alignment: usize,
) -> Result<Vec<u8>, HarnessError> {
    let array_type = gl_type_to_array_type(ty)?;
    let element_size = array_type.element_size();
    let components = color.len();
    let padded_row = padded_row_length(components, width, element_size, alignment);
    let len = unpack_buffer_len(components, width, height, padded_row);

    let mut out = vec![0u8; len * element_size];
    for y in 0..height {
        let mut offset = y * padded_row;
        for _ in 0..width {
            for &channel in color {
                write_element(&mut out, offset, array_type, channel);
                offset += 1;
            }
        }
    }
    Ok(out)
}

/// Store `value` as element `index` of a native-endian array of `array_type`.
fn write_element(buf: &mut [u8], index: usize, array_type: ArrayType, value: u8) {
    let size = array_type.element_size();
    let dst = &mut buf[index * size..(index + 1) * size];
    match array_type {
        ArrayType::Int8 | ArrayType::Uint8 => dst[0] = value,
        ArrayType::Int16 | ArrayType::Uint16 => dst.copy_from_slice(&u16::from(value).to_ne_bytes()),
        ArrayType::Int32 | ArrayType::Uint32 => dst.copy_from_slice(&u32::from(value).to_ne_bytes()),
        ArrayType::Float32 => dst.copy_from_slice(&f32::from(value).to_ne_bytes()),
    }
}

/// A solid RGBA8 image with rows tightly packed.
#[must_use]
pub fn solid_rgba8(color: Rgba8, width: usize, height: usize) -> Vec<u8> {
    color.repeat(width * height)
}
