//! Texture creation and size probing.

use std::path::Path;

use crate::{
    color::Rgba8,
    context::{gl_size, GlContext},
    enums,
    error::HarnessError,
    format::{gl_type_to_array_type, solid_fill_data, typed_array_elements_per_pixel},
    loader::load_image_async,
    report::Reporter,
    session::Session,
    types::LoadedImage,
};

/// Level, format, and type of a [`fill_texture`] upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOptions {
    /// Mip level.
    pub level: i32,
    /// Pixel format of the data.
    pub format: u32,
    /// Component type of the data.
    pub ty: u32,
    /// Internal format; `None` means the same as `format`.
    pub internal_format: Option<u32>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            level: 0,
            format: enums::RGBA,
            ty: enums::UNSIGNED_BYTE,
            internal_format: None,
        }
    }
}

/// Bind `texture` to `TEXTURE_2D` and define it as a solid `color` image.
///
/// Each channel of `color` is written as one element of `options.ty`, and
/// rows are padded to the context's `UNPACK_ALIGNMENT`.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownType`] if `options.ty` has no element
/// layout.
pub fn fill_texture<C: GlContext>(
    gl: &C,
    texture: C::Texture,
    width: u32,
    height: u32,
    color: &[u8],
    options: &FillOptions,
) -> Result<(), HarnessError> {
    let alignment = usize::try_from(gl.get_parameter_i32(enums::UNPACK_ALIGNMENT)).unwrap_or(1);
    let data = solid_fill_data(color, width as usize, height as usize, options.ty, alignment.max(1))?;
    #[expect(clippy::cast_possible_wrap)]
    let internal_format = options.internal_format.unwrap_or(options.format) as i32;
    gl.bind_texture(enums::TEXTURE_2D, Some(texture));
    gl.tex_image_2d(
        enums::TEXTURE_2D,
        options.level,
        internal_format,
        gl_size(width),
        gl_size(height),
        options.format,
        options.ty,
        Some(&data),
    );
    Ok(())
}

/// Create a `width`×`height` RGBA8 texture of one color.
pub fn create_colored_texture<C: GlContext>(gl: &C, width: u32, height: u32, color: Rgba8) -> Option<C::Texture> {
    let texture = gl.create_texture()?;
    // RGBA/UNSIGNED_BYTE always has a layout.
    fill_texture(gl, texture, width, height, &color, &FillOptions::default()).ok()?;
    Some(texture)
}

/// Create a texture with `NEAREST` filtering and upload the image at
/// `path` into it, bottom row first.
///
/// Returns `None`, deleting the texture, if the image cannot be loaded.
pub async fn load_texture<C: GlContext>(gl: &C, path: impl AsRef<Path>) -> Option<(C::Texture, LoadedImage)> {
    let texture = gl.create_texture()?;
    gl.bind_texture(enums::TEXTURE_2D, Some(texture));
    #[expect(clippy::cast_possible_wrap)]
    let nearest = enums::NEAREST as i32;
    gl.tex_parameter_i32(enums::TEXTURE_2D, enums::TEXTURE_MIN_FILTER, nearest);
    gl.tex_parameter_i32(enums::TEXTURE_2D, enums::TEXTURE_MAG_FILTER, nearest);

    let Some(image) = load_image_async(path).await else {
        gl.delete_texture(texture);
        return None;
    };
    #[expect(clippy::cast_possible_wrap)]
    let rgba = enums::RGBA as i32;
    gl.bind_texture(enums::TEXTURE_2D, Some(texture));
    gl.tex_image_2d(
        enums::TEXTURE_2D,
        0,
        rgba,
        gl_size(image.width),
        gl_size(image.height),
        enums::RGBA,
        enums::UNSIGNED_BYTE,
        Some(&image.flipped_rows()),
    );
    Some((texture, image))
}

impl<R: Reporter> Session<R> {
    /// Check that the texture bound to `TEXTURE_2D` is exactly
    /// `width`×`height` by writing single pixels at and past its far
    /// corner. One corner pixel is overwritten.
    ///
    /// Returns whether the size matched.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotColorType`] or
    /// [`HarnessError::UnknownFormat`] if `format`/`ty` have no layout.
    pub fn check_texture_size<C: GlContext>(
        &mut self,
        gl: &C,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
    ) -> Result<bool, HarnessError> {
        let elements = typed_array_elements_per_pixel(format, ty)?;
        let pixel = vec![0u8; elements * gl_type_to_array_type(ty)?.element_size()];
        let probe = |x: i32, y: i32| {
            gl.tex_sub_image_2d(enums::TEXTURE_2D, 0, x, y, 1, 1, format, ty, &pixel);
            gl.get_error() == enums::NO_ERROR
        };

        let mut errors = 0;
        if !probe(width - 1, height - 1) {
            self.failed(&format!("Texture was smaller than the expected size {width}x{height}"));
            errors += 1;
        }
        if probe(width - 1, height) {
            self.failed(&format!("Texture was taller than {height}"));
            errors += 1;
        }
        if probe(width, height - 1) {
            self.failed(&format!("Texture was wider than {width}"));
            errors += 1;
        }
        if errors == 0 {
            self.passed(&format!("Texture had the expected size {width}x{height}"));
        }
        Ok(errors == 0)
    }
}
