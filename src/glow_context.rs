//! [`GlContext`] over a real OpenGL / WebGL context via [`glow`].
//!
//! Every GL entry point in `glow` is `unsafe` because it requires a current
//! context. [`GlowContext::new`] takes that obligation once, so the trait
//! methods can be safe.

use std::{cell::Cell, sync::Arc};

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::{
    context::{ActiveInfo, GlContext},
    enums::{EnumSource, WEBGL2_CONSTANTS},
};

/// A `glow` context plus the bits of state GL cannot report portably.
///
/// The drawing-buffer size is whatever the owner of the surface says it is;
/// the current program and framebuffer are tracked from the calls made
/// through this wrapper.
pub struct GlowContext {
    gl: Arc<glow::Context>,
    size: Cell<(u32, u32)>,
    program: Cell<Option<glow::Program>>,
    framebuffer: Cell<Option<glow::Framebuffer>>,
}

impl std::fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowContext")
            .field("size", &self.size.get())
            .field("program", &self.program.get())
            .field("framebuffer", &self.framebuffer.get())
            .finish_non_exhaustive()
    }
}

impl GlowContext {
    /// Wrap `gl`, whose default framebuffer is `width`×`height`.
    ///
    /// # Safety
    ///
    /// `gl` must be current on this thread whenever a method of the returned
    /// value is called, and nothing else may change its program or
    /// framebuffer bindings behind the wrapper's back.
    pub unsafe fn new(gl: Arc<glow::Context>, width: u32, height: u32) -> Self {
        Self {
            gl,
            size: Cell::new((width, height)),
            program: Cell::new(None),
            framebuffer: Cell::new(None),
        }
    }

    /// The underlying `glow` context.
    #[must_use]
    pub fn glow(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

fn created<T>(what: &str, result: Result<T, String>) -> Option<T> {
    result
        .map_err(|err| log::warn!("failed to create {what}: {err}"))
        .ok()
}

impl EnumSource for GlowContext {
    fn enum_constants(&self) -> &'static [(&'static str, u32)] {
        WEBGL2_CONSTANTS
    }
}

impl GlContext for GlowContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type Framebuffer = glow::Framebuffer;
    type UniformLocation = glow::UniformLocation;

    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn set_drawing_buffer_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    fn lose_context(&self) -> bool {
        false
    }

    fn supported_extensions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gl.supported_extensions().iter().cloned().collect();
        names.sort();
        names
    }

    fn get_extension(&self, name: &str) -> bool {
        self.gl.supported_extensions().contains(name)
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(pname) }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        unsafe { self.gl.get_parameter_string(pname) }
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(pname, value) }
    }

    fn current_program(&self) -> Option<Self::Program> {
        self.program.get()
    }

    fn framebuffer_binding(&self) -> Option<Self::Framebuffer> {
        self.framebuffer.get()
    }

    fn create_shader(&self, kind: u32) -> Option<Self::Shader> {
        created("shader", unsafe { self.gl.create_shader(kind) })
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Option<Self::Program> {
        created("program", unsafe { self.gl.create_program() })
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) }
    }

    fn transform_feedback_varyings(&self, program: Self::Program, varyings: &[&str], buffer_mode: u32) {
        unsafe { self.gl.transform_feedback_varyings(program, varyings, buffer_mode) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn get_program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn get_program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) };
        self.program.set(program);
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn get_active_attributes(&self, program: Self::Program) -> u32 {
        unsafe { self.gl.get_active_attributes(program) }
    }

    fn get_active_attribute(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        let attribute = unsafe { self.gl.get_active_attribute(program, index) }?;
        Some(ActiveInfo {
            name: attribute.name,
            size: attribute.size,
            kind: attribute.atype,
        })
    }

    fn get_active_uniforms(&self, program: Self::Program) -> u32 {
        unsafe { self.gl.get_active_uniforms(program) }
    }

    fn get_active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        let uniform = unsafe { self.gl.get_active_uniform(program, index) }?;
        Some(ActiveInfo {
            name: uniform.name,
            size: uniform.size,
            kind: uniform.utype,
        })
    }

    fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn get_uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_4_f32(&self, location: Option<&Self::UniformLocation>, [x, y, z, w]: [f32; 4]) {
        unsafe { self.gl.uniform_4_f32(location, x, y, z, w) }
    }

    fn create_buffer(&self) -> Option<Self::Buffer> {
        created("buffer", unsafe { self.gl.create_buffer() })
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]) {
        unsafe { self.gl.get_buffer_sub_data(target, offset, dst) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset);
        }
    }

    fn create_texture(&self) -> Option<Self::Texture> {
        created("texture", unsafe { self.gl.create_texture() })
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
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
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            );
        }
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
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                ty,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn create_framebuffer(&self) -> Option<Self::Framebuffer> {
        created("framebuffer", unsafe { self.gl.create_framebuffer() })
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(target, framebuffer) };
        self.framebuffer.set(framebuffer);
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) };
        if self.framebuffer.get() == Some(framebuffer) {
            self.framebuffer.set(None);
        }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, element_type, offset) }
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
        unsafe {
            self.gl
                .read_pixels(x, y, width, height, format, ty, PixelPackData::Slice(Some(pixels)));
        }
    }
}
