//! A context decorator that turns GL errors into raised errors.
//!
//! [`ErrorCheckedContext`] forwards every call and then drains one error
//! from the wrapped context. A non-`NO_ERROR` result is raised with
//! [`std::panic::panic_any`] carrying a [`GlCallError`], so a test stops at
//! the call that misbehaved. [`catch_gl_error`] converts the raise back into
//! a `Result`; [`ErrorCheckedContext::call`] avoids unwinding altogether.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    context::{ActiveInfo, GlContext},
    enums::{self, describe_in, EnumSource},
    error::GlCallError,
};

/// Wraps a context so that any call leaving an error raises [`GlCallError`].
///
/// `get_error` is passed through unchecked.
#[derive(Debug)]
pub struct ErrorCheckedContext<C> {
    inner: C,
}

impl<C: GlContext> ErrorCheckedContext<C> {
    /// Wrap `inner`.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped context, for calls that should not be checked.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Run `f` against the wrapped context and check the error state.
    ///
    /// `name` is the function named in the message.
    ///
    /// # Errors
    ///
    /// Returns a [`GlCallError`] if `get_error` reports anything after `f`.
    pub fn call<T>(&self, name: &str, f: impl FnOnce(&C) -> T) -> Result<T, GlCallError> {
        let value = f(&self.inner);
        let code = self.inner.get_error();
        if code == enums::NO_ERROR {
            return Ok(value);
        }
        let message = format!(
            "GL error {} in {name}",
            describe_in(self.inner.enum_constants(), code)
        );
        log::debug!("{message}");
        Err(GlCallError { message, code })
    }

    fn checked<T>(&self, name: &str, f: impl FnOnce(&C) -> T) -> T {
        match self.call(name, f) {
            Ok(value) => value,
            Err(err) => panic::panic_any(err),
        }
    }
}

/// Run `f`, converting a raised [`GlCallError`] into `Err`.
///
/// Any other panic keeps unwinding.
///
/// # Errors
///
/// Returns the [`GlCallError`] raised inside `f`.
pub fn catch_gl_error<T>(f: impl FnOnce() -> T) -> Result<T, GlCallError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<GlCallError>() {
            Ok(err) => Err(*err),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Human-readable text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(err) = payload.downcast_ref::<GlCallError>() {
        err.message.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

impl<C: GlContext> EnumSource for ErrorCheckedContext<C> {
    fn enum_constants(&self) -> &'static [(&'static str, u32)] {
        self.inner.enum_constants()
    }
}

/// Every method except `get_error` panics with a [`GlCallError`] if the
/// wrapped call left an error.
impl<C: GlContext> GlContext for ErrorCheckedContext<C> {
    type Shader = C::Shader;
    type Program = C::Program;
    type Buffer = C::Buffer;
    type Texture = C::Texture;
    type Framebuffer = C::Framebuffer;
    type UniformLocation = C::UniformLocation;

    fn get_error(&self) -> u32 {
        self.inner.get_error()
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.checked("drawingBufferSize", C::drawing_buffer_size)
    }

    fn set_drawing_buffer_size(&self, width: u32, height: u32) {
        self.checked("setDrawingBufferSize", |gl| gl.set_drawing_buffer_size(width, height));
    }

    fn lose_context(&self) -> bool {
        self.checked("loseContext", C::lose_context)
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.checked("getSupportedExtensions", C::supported_extensions)
    }

    fn get_extension(&self, name: &str) -> bool {
        self.checked("getExtension", |gl| gl.get_extension(name))
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        self.checked("getParameter", |gl| gl.get_parameter_i32(pname))
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        self.checked("getParameter", |gl| gl.get_parameter_string(pname))
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        self.checked("pixelStorei", |gl| gl.pixel_store_i32(pname, value));
    }

    fn current_program(&self) -> Option<Self::Program> {
        self.checked("getParameter", C::current_program)
    }

    fn framebuffer_binding(&self) -> Option<Self::Framebuffer> {
        self.checked("getParameter", C::framebuffer_binding)
    }

    fn create_shader(&self, kind: u32) -> Option<Self::Shader> {
        self.checked("createShader", |gl| gl.create_shader(kind))
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        self.checked("shaderSource", |gl| gl.shader_source(shader, source));
    }

    fn compile_shader(&self, shader: Self::Shader) {
        self.checked("compileShader", |gl| gl.compile_shader(shader));
    }

    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        self.checked("getShaderParameter", |gl| gl.get_shader_compile_status(shader))
    }

    fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        self.checked("getShaderInfoLog", |gl| gl.get_shader_info_log(shader))
    }

    fn delete_shader(&self, shader: Self::Shader) {
        self.checked("deleteShader", |gl| gl.delete_shader(shader));
    }

    fn create_program(&self) -> Option<Self::Program> {
        self.checked("createProgram", C::create_program)
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        self.checked("attachShader", |gl| gl.attach_shader(program, shader));
    }

    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        self.checked("bindAttribLocation", |gl| gl.bind_attrib_location(program, index, name));
    }

    fn transform_feedback_varyings(&self, program: Self::Program, varyings: &[&str], buffer_mode: u32) {
        self.checked("transformFeedbackVaryings", |gl| {
            gl.transform_feedback_varyings(program, varyings, buffer_mode);
        });
    }

    fn link_program(&self, program: Self::Program) {
        self.checked("linkProgram", |gl| gl.link_program(program));
    }

    fn get_program_link_status(&self, program: Self::Program) -> bool {
        self.checked("getProgramParameter", |gl| gl.get_program_link_status(program))
    }

    fn get_program_info_log(&self, program: Self::Program) -> String {
        self.checked("getProgramInfoLog", |gl| gl.get_program_info_log(program))
    }

    fn use_program(&self, program: Option<Self::Program>) {
        self.checked("useProgram", |gl| gl.use_program(program));
    }

    fn delete_program(&self, program: Self::Program) {
        self.checked("deleteProgram", |gl| gl.delete_program(program));
    }

    fn get_active_attributes(&self, program: Self::Program) -> u32 {
        self.checked("getProgramParameter", |gl| gl.get_active_attributes(program))
    }

    fn get_active_attribute(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        self.checked("getActiveAttrib", |gl| gl.get_active_attribute(program, index))
    }

    fn get_active_uniforms(&self, program: Self::Program) -> u32 {
        self.checked("getProgramParameter", |gl| gl.get_active_uniforms(program))
    }

    fn get_active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        self.checked("getActiveUniform", |gl| gl.get_active_uniform(program, index))
    }

    fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        self.checked("getAttribLocation", |gl| gl.get_attrib_location(program, name))
    }

    fn get_uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        self.checked("getUniformLocation", |gl| gl.get_uniform_location(program, name))
    }

    fn uniform_4_f32(&self, location: Option<&Self::UniformLocation>, value: [f32; 4]) {
        self.checked("uniform4f", |gl| gl.uniform_4_f32(location, value));
    }

    fn create_buffer(&self) -> Option<Self::Buffer> {
        self.checked("createBuffer", C::create_buffer)
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        self.checked("bindBuffer", |gl| gl.bind_buffer(target, buffer));
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        self.checked("bufferData", |gl| gl.buffer_data_u8_slice(target, data, usage));
    }

    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]) {
        self.checked("getBufferSubData", |gl| gl.get_buffer_sub_data(target, offset, dst));
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        self.checked("deleteBuffer", |gl| gl.delete_buffer(buffer));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.checked("enableVertexAttribArray", |gl| gl.enable_vertex_attrib_array(index));
    }

    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.checked("vertexAttribPointer", |gl| {
            gl.vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset);
        });
    }

    fn create_texture(&self) -> Option<Self::Texture> {
        self.checked("createTexture", C::create_texture)
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        self.checked("bindTexture", |gl| gl.bind_texture(target, texture));
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        self.checked("texParameteri", |gl| gl.tex_parameter_i32(target, pname, value));
    }

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
    ) {
        self.checked("texImage2D", |gl| {
            gl.tex_image_2d(target, level, internal_format, width, height, format, ty, pixels);
        });
    }

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
    ) {
        self.checked("texSubImage2D", |gl| {
            gl.tex_sub_image_2d(target, level, x, y, width, height, format, ty, pixels);
        });
    }

    fn delete_texture(&self, texture: Self::Texture) {
        self.checked("deleteTexture", |gl| gl.delete_texture(texture));
    }

    fn create_framebuffer(&self) -> Option<Self::Framebuffer> {
        self.checked("createFramebuffer", C::create_framebuffer)
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>) {
        self.checked("bindFramebuffer", |gl| gl.bind_framebuffer(target, framebuffer));
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        self.checked("checkFramebufferStatus", |gl| gl.check_framebuffer_status(target))
    }

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        self.checked("deleteFramebuffer", |gl| gl.delete_framebuffer(framebuffer));
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.checked("clearColor", |gl| gl.clear_color(red, green, blue, alpha));
    }

    fn clear(&self, mask: u32) {
        self.checked("clear", |gl| gl.clear(mask));
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.checked("drawArrays", |gl| gl.draw_arrays(mode, first, count));
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.checked("drawElements", |gl| gl.draw_elements(mode, count, element_type, offset));
    }

    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) {
        self.checked("readPixels", |gl| gl.read_pixels(x, y, width, height, format, ty, pixels));
    }
}
