//! Color-space conversion and per-format sampling for 8-bit RGBA colors.
//!
//! All conversions work channel by channel on the `0..=255` domain and leave
//! alpha untouched. Results are rounded by truncating `v * 255 + 0.5`, which
//! is the rounding conformance expectations are written against.

use crate::error::HarnessError;

/// An 8-bit RGBA color.
pub type Rgba8 = [u8; 4];

/// Exponent used for the linear→sRGB curve, an approximation of `1 / 2.4`.
const SRGB_ENCODE_EXPONENT: f64 = 0.41666;

fn quantize(value: f64) -> u8 {
    // value is in [0, 1], so the truncated result is in [0, 255].
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let q = (value * 255.0 + 0.5).trunc() as u8;
    q
}

/// Convert one sRGB-encoded channel to linear.
#[must_use]
pub fn srgb_channel_to_linear(value: u8) -> u8 {
    let v = f64::from(value) / 255.0;
    let v = if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    };
    quantize(v)
}

/// Convert one linear channel to sRGB encoding.
#[must_use]
pub fn linear_channel_to_srgb(value: u8) -> u8 {
    let v = f64::from(value) / 255.0;
    let v = if v <= 0.0 {
        0.0
    } else if v < 0.003_130_8 {
        v * 12.92
    } else if v < 1.0 {
        v.powf(SRGB_ENCODE_EXPONENT) * 1.055 - 0.055
    } else {
        1.0
    };
    quantize(v)
}

/// Convert the RGB channels of an sRGB color to linear.
#[must_use]
pub fn srgb_to_linear(color: Rgba8) -> Rgba8 {
    [
        srgb_channel_to_linear(color[0]),
        srgb_channel_to_linear(color[1]),
        srgb_channel_to_linear(color[2]),
        color[3],
    ]
}

/// Convert the RGB channels of a linear color to sRGB.
#[must_use]
pub fn linear_to_srgb(color: Rgba8) -> Rgba8 {
    [
        linear_channel_to_srgb(color[0]),
        linear_channel_to_srgb(color[1]),
        linear_channel_to_srgb(color[2]),
        color[3],
    ]
}

/// Look up a named color as 8-bit RGBA with unpremultiplied alpha.
///
/// | Name    | `None` / `"srgb"` | `"display-p3"`   |
/// |---------|-------------------|------------------|
/// | `Red`   | `255, 0, 0, 255`  | `234, 51, 35, 255` |
/// | `Green` | `0, 255, 0, 255`  | `117, 251, 76, 255` |
///
/// # Errors
///
/// Returns [`HarnessError::UnknownColorSpace`] or
/// [`HarnessError::UnknownColorName`] for anything outside the table.
pub fn named_color_in_color_space(
    name: &str,
    color_space: Option<&str>,
) -> Result<Rgba8, HarnessError> {
    let unknown_name = || HarnessError::UnknownColorName(name.to_owned());
    match color_space {
        None | Some("srgb") => match name {
            "Red" => Ok([255, 0, 0, 255]),
            "Green" => Ok([0, 255, 0, 255]),
            _ => Err(unknown_name()),
        },
        Some("display-p3") => match name {
            "Red" => Ok([234, 51, 35, 255]),
            "Green" => Ok([117, 251, 76, 255]),
            _ => Err(unknown_name()),
        },
        Some(other) => Err(HarnessError::UnknownColorSpace(other.to_owned())),
    }
}

/// The color a texture with the given internal format returns when sampled,
/// given the color it was filled with.
///
/// Formats are named as in the GL headers (`"ALPHA"`, `"RG8UI"`, ...).
/// Unrecognized formats return `color` unchanged.
#[must_use]
pub fn color_as_sampled_with_internal_format(color: Rgba8, internal_format: &str) -> Rgba8 {
    let [r, g, _, a] = color;
    match internal_format {
        "ALPHA" => [0, 0, 0, a],
        "LUMINANCE" => [r, r, r, 255],
        "LUMINANCE_ALPHA" => [r, r, r, a],
        "SRGB8" | "SRGB8_ALPHA8" => srgb_to_linear(color),
        "R16F" | "R32F" | "R8" | "R8UI" | "RED" | "RED_INTEGER" => [r, 0, 0, 0],
        "RG" | "RG16F" | "RG32F" | "RG8" | "RG8UI" | "RG_INTEGER" => [r, g, 0, 0],
        _ => color,
    }
}

/// Map an 8-bit channel to `[0, 1]`.
#[must_use]
pub fn ubyte_to_float(c: u8) -> f32 {
    f32::from(c) / 255.0
}

/// Map an 8-bit color to `[0, 1]` per channel.
#[must_use]
pub fn ubyte_color_to_float_color(color: Rgba8) -> [f32; 4] {
    color.map(ubyte_to_float)
}
