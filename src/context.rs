//! The graphics context interface the helpers drive.
//!
//! [`GlContext`] lists exactly the GL entry points the harness uses, with the
//! argument conventions of [`glow::HasContext`]. [`GlowContext`] implements
//! it over a real `glow` context; [`ErrorCheckedContext`] decorates any
//! implementation with per-call error checks.
//!
//! [`GlowContext`]: crate::GlowContext
//! [`ErrorCheckedContext`]: crate::ErrorCheckedContext

use std::fmt::Debug;

use crate::enums::EnumSource;

/// An active attribute or uniform as reported by the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    /// Variable name, with `[0]` for arrays.
    pub name: String,
    /// Array size, `1` for non-arrays.
    pub size: i32,
    /// GL type enum, e.g. `FLOAT_VEC4`.
    pub kind: u32,
}

/// The GL entry points used by the harness.
///
/// Methods take `&self`, as in `glow`. All of them are safe to call: an
/// implementation establishes whatever context-currency guarantees it needs
/// when it is constructed.
pub trait GlContext: EnumSource {
    /// Shader object handle.
    type Shader: Copy + Debug + PartialEq;
    /// Program object handle.
    type Program: Copy + Debug + PartialEq;
    /// Buffer object handle.
    type Buffer: Copy + Debug + PartialEq;
    /// Texture object handle.
    type Texture: Copy + Debug + PartialEq;
    /// Framebuffer object handle.
    type Framebuffer: Copy + Debug + PartialEq;
    /// Uniform location handle.
    type UniformLocation: Clone + Debug;

    /// Pop the oldest recorded error, or `NO_ERROR`.
    fn get_error(&self) -> u32;
    /// Size of the default framebuffer in pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);
    /// Resize the default framebuffer.
    fn set_drawing_buffer_size(&self, width: u32, height: u32);
    /// Force a context loss. Returns `false` if unsupported.
    fn lose_context(&self) -> bool;
    /// Names of the extensions the context advertises.
    fn supported_extensions(&self) -> Vec<String>;
    /// Enable an extension. Returns `false` if it is not available.
    fn get_extension(&self, name: &str) -> bool;
    /// `glGetIntegerv` for a single value.
    fn get_parameter_i32(&self, pname: u32) -> i32;
    /// `glGetString`, e.g. for `RENDERER`.
    fn get_parameter_string(&self, pname: u32) -> String;
    /// `glPixelStorei`.
    fn pixel_store_i32(&self, pname: u32, value: i32);
    /// The program bound by the last `use_program`.
    fn current_program(&self) -> Option<Self::Program>;
    /// The bound framebuffer, `None` for the default framebuffer.
    fn framebuffer_binding(&self) -> Option<Self::Framebuffer>;

    /// Create a shader of the given kind.
    fn create_shader(&self, kind: u32) -> Option<Self::Shader>;
    /// Replace a shader's source.
    fn shader_source(&self, shader: Self::Shader, source: &str);
    /// Compile a shader.
    fn compile_shader(&self, shader: Self::Shader);
    /// `COMPILE_STATUS` of a shader.
    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool;
    /// Compile diagnostics of a shader.
    fn get_shader_info_log(&self, shader: Self::Shader) -> String;
    /// Delete a shader.
    fn delete_shader(&self, shader: Self::Shader);

    /// Create an empty program.
    fn create_program(&self) -> Option<Self::Program>;
    /// Attach a shader to a program.
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Bind an attribute name to a location before linking.
    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str);
    /// Declare transform-feedback outputs before linking.
    fn transform_feedback_varyings(&self, program: Self::Program, varyings: &[&str], buffer_mode: u32);
    /// Link a program.
    fn link_program(&self, program: Self::Program);
    /// `LINK_STATUS` of a program.
    fn get_program_link_status(&self, program: Self::Program) -> bool;
    /// Link diagnostics of a program.
    fn get_program_info_log(&self, program: Self::Program) -> String;
    /// Make a program current, or unbind with `None`.
    fn use_program(&self, program: Option<Self::Program>);
    /// Delete a program.
    fn delete_program(&self, program: Self::Program);
    /// `ACTIVE_ATTRIBUTES` of a linked program.
    fn get_active_attributes(&self, program: Self::Program) -> u32;
    /// Describe the active attribute at `index`.
    fn get_active_attribute(&self, program: Self::Program, index: u32) -> Option<ActiveInfo>;
    /// `ACTIVE_UNIFORMS` of a linked program.
    fn get_active_uniforms(&self, program: Self::Program) -> u32;
    /// Describe the active uniform at `index`.
    fn get_active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveInfo>;
    /// Location of a named attribute.
    fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Location of a named uniform.
    fn get_uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    /// `glUniform4f` on the current program.
    fn uniform_4_f32(&self, location: Option<&Self::UniformLocation>, value: [f32; 4]);

    /// Create a buffer object.
    fn create_buffer(&self) -> Option<Self::Buffer>;
    /// Bind a buffer to `target`.
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    /// Upload `data` to the buffer bound at `target`.
    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32);
    /// Read back from the buffer bound at `target`.
    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]);
    /// Delete a buffer object.
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// Enable a generic vertex attribute array.
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Point a vertex attribute at the bound `ARRAY_BUFFER`.
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    /// Create a texture object.
    fn create_texture(&self) -> Option<Self::Texture>;
    /// Bind a texture to `target`.
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    /// `glTexParameteri`.
    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32);
    /// Define a texture image, optionally uploading `pixels`.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    /// Replace a region of a texture image.
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    /// Delete a texture object.
    fn delete_texture(&self, texture: Self::Texture);

    /// Create a framebuffer object.
    fn create_framebuffer(&self) -> Option<Self::Framebuffer>;
    /// Bind a framebuffer, or the default framebuffer with `None`.
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>);
    /// Completeness status of the framebuffer bound at `target`.
    fn check_framebuffer_status(&self, target: u32) -> u32;
    /// Delete a framebuffer object.
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    /// Set the clear color.
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    /// Clear the buffers selected by `mask`.
    fn clear(&self, mask: u32);
    /// Draw non-indexed primitives.
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    /// Draw indexed primitives from the bound `ELEMENT_ARRAY_BUFFER`.
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);
    /// Read a block of pixels from the bound framebuffer.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    );
}

/// Lose `gl` where supported and shrink its surface to 1×1.
///
/// Frees most of the memory a context holds without waiting for the owner
/// to drop it.
pub fn destroy_context<C: GlContext + ?Sized>(gl: &C) {
    if !gl.lose_context() {
        log::debug!("context loss not supported; only shrinking surface");
    }
    gl.set_drawing_buffer_size(1, 1);
}

/// Convert a `u32` dimension to the `i32` GL calls expect, saturating at
/// `i32::MAX`.
pub(crate) fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Convert a possibly negative GL dimension to `usize`, clamping at zero.
pub(crate) fn to_len(value: i32) -> usize {
    usize::try_from(value).unwrap_or(0)
}
