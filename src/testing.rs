//! A CPU-side [`GlContext`] for unit tests.
//!
//! `SoftContext` models just enough GL to exercise the helpers: object
//! lifetimes, an error queue, a toy shader "compiler" that parses
//! declarations, and RGBA8 framebuffers that draws fill with `u_color`.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use crate::{
    color::Rgba8,
    context::{ActiveInfo, GlContext},
    enums::{self, EnumSource, WEBGL2_CONSTANTS},
};

/// Handle for every object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

/// Uniform location: owning program plus uniform index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftUniform {
    program: Handle,
    index: usize,
}

#[derive(Debug)]
struct ShaderState {
    kind: u32,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    kind: u32,
    location: u32,
}

#[derive(Debug, Default)]
struct ProgramState {
    shaders: Vec<Handle>,
    bound: HashMap<String, u32>,
    varyings: Vec<String>,
    linked: bool,
    log: String,
    attributes: Vec<Variable>,
    uniforms: Vec<Variable>,
    values: HashMap<usize, [f32; 4]>,
}

#[derive(Debug)]
struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl Surface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; (width * height) as usize],
        }
    }

    fn get(&self, x: i32, y: i32) -> Option<Rgba8> {
        let (x, y) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        (x < self.width && y < self.height).then(|| self.pixels[(y * self.width + x) as usize])
    }
}

#[derive(Debug)]
struct FramebufferState {
    surface: Surface,
    status: u32,
}

#[derive(Debug, Default)]
struct TextureState {
    width: i32,
    height: i32,
    uploads: Vec<Vec<u8>>,
    params: HashMap<u32, i32>,
}

#[derive(Debug)]
struct State {
    next_id: u32,
    errors: VecDeque<u32>,
    lost: bool,
    default_surface: Surface,
    shaders: HashMap<Handle, ShaderState>,
    programs: HashMap<Handle, ProgramState>,
    buffers: HashMap<Handle, Vec<u8>>,
    buffer_bindings: HashMap<u32, Handle>,
    textures: HashMap<Handle, TextureState>,
    texture_binding: Option<Handle>,
    framebuffers: HashMap<Handle, FramebufferState>,
    framebuffer_binding: Option<Handle>,
    current_program: Option<Handle>,
    clear_color: [f32; 4],
    pixel_store: HashMap<u32, i32>,
    enabled_attribs: Vec<u32>,
    extensions: Vec<String>,
    enabled_extensions: Vec<String>,
    calls: Vec<String>,
}

/// Software stand-in for a GL context.
#[derive(Debug)]
pub struct SoftContext {
    state: RefCell<State>,
    lose_supported: Cell<bool>,
}

fn unit_to_u8(v: f32) -> u8 {
    let v = if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    };
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let q = (v * 255.0 + 0.5) as u8;
    q
}

fn glsl_type(name: &str) -> Option<u32> {
    Some(match name {
        "float" => enums::FLOAT,
        "vec2" => enums::FLOAT_VEC2,
        "vec3" => enums::FLOAT_VEC3,
        "vec4" => enums::FLOAT_VEC4,
        "int" => enums::INT,
        "mat3" => enums::FLOAT_MAT3,
        "mat4" => enums::FLOAT_MAT4,
        "sampler2D" => enums::SAMPLER_2D,
        "samplerCube" => enums::SAMPLER_CUBE,
        _ => return None,
    })
}

/// Parse `<qualifier> [precision] <type> <name>;` declarations.
fn declarations(source: &str, qualifiers: &[&str]) -> Vec<(String, u32)> {
    let mut found = Vec::new();
    for line in source.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        let line = match line.strip_prefix("layout(") {
            Some(rest) => rest.split_once(')').map_or("", |(_, decl)| decl.trim_start()),
            None => line,
        };
        let mut words = line.split_whitespace();
        if !words.next().is_some_and(|q| qualifiers.contains(&q)) {
            continue;
        }
        let rest: Vec<&str> = words
            .filter(|w| !matches!(*w, "lowp" | "mediump" | "highp"))
            .collect();
        if let [ty, name, ..] = rest.as_slice() {
            if let Some(kind) = glsl_type(ty) {
                found.push((name.trim_end_matches(';').to_owned(), kind));
            }
        }
    }
    found
}

impl SoftContext {
    /// A context whose default framebuffer is `width`×`height`, cleared to
    /// transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixel_store = HashMap::new();
        pixel_store.insert(enums::UNPACK_ALIGNMENT, 4);
        pixel_store.insert(enums::PACK_ALIGNMENT, 4);
        Self {
            state: RefCell::new(State {
                next_id: 1,
                errors: VecDeque::new(),
                lost: false,
                default_surface: Surface::new(width, height),
                shaders: HashMap::new(),
                programs: HashMap::new(),
                buffers: HashMap::new(),
                buffer_bindings: HashMap::new(),
                textures: HashMap::new(),
                texture_binding: None,
                framebuffers: HashMap::new(),
                framebuffer_binding: None,
                current_program: None,
                clear_color: [0.0; 4],
                pixel_store,
                enabled_attribs: Vec::new(),
                extensions: Vec::new(),
                enabled_extensions: Vec::new(),
                calls: Vec::new(),
            }),
            lose_supported: Cell::new(true),
        }
    }

    /// Advertise the given extension names.
    pub fn with_extensions(self, names: &[&str]) -> Self {
        self.state.borrow_mut().extensions = names.iter().map(|&n| n.to_owned()).collect();
        self
    }

    /// Fill the currently bound color buffer.
    pub fn fill(&self, color: Rgba8) {
        let mut state = self.state.borrow_mut();
        state.target_surface_mut().pixels.fill(color);
    }

    /// Overwrite one pixel of the currently bound color buffer.
    pub fn set_pixel(&self, x: u32, y: u32, color: Rgba8) {
        let mut state = self.state.borrow_mut();
        let surface = state.target_surface_mut();
        let index = (y * surface.width + x) as usize;
        surface.pixels[index] = color;
    }

    /// Read one pixel of the currently bound color buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let state = self.state.borrow();
        let surface = state.target_surface();
        surface.pixels[(y * surface.width + x) as usize]
    }

    /// Queue an error for the next `get_error`.
    pub fn push_error(&self, code: u32) {
        self.state.borrow_mut().errors.push_back(code);
    }

    /// How many times `name` was called.
    pub fn call_count(&self, name: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| *c == name).count()
    }

    /// Whether `lose_context` has run.
    pub fn is_lost(&self) -> bool {
        self.state.borrow().lost
    }

    /// Pretend the context cannot be lost on demand.
    pub fn without_lose_context(self) -> Self {
        self.lose_supported.set(false);
        self
    }

    /// Give an off-screen framebuffer color storage of the given size.
    pub fn attach_color_storage(&self, framebuffer: Handle, width: u32, height: u32) {
        if let Some(fb) = self.state.borrow_mut().framebuffers.get_mut(&framebuffer) {
            fb.surface = Surface::new(width, height);
        }
    }

    /// Override the status `check_framebuffer_status` reports for `framebuffer`.
    pub fn set_framebuffer_status(&self, framebuffer: Handle, status: u32) {
        if let Some(fb) = self.state.borrow_mut().framebuffers.get_mut(&framebuffer) {
            fb.status = status;
        }
    }

    /// Whether a shader or program object is still alive.
    pub fn is_alive(&self, handle: Handle) -> bool {
        let state = self.state.borrow();
        state.shaders.contains_key(&handle)
            || state.programs.contains_key(&handle)
            || state.buffers.contains_key(&handle)
            || state.textures.contains_key(&handle)
    }

    /// Contents of a buffer object.
    pub fn buffer_contents(&self, buffer: Handle) -> Vec<u8> {
        self.state
            .borrow()
            .buffers
            .get(&buffer)
            .cloned()
            .unwrap_or_default()
    }

    /// Uploads made to a texture, in order.
    pub fn texture_uploads(&self, texture: Handle) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| t.uploads.clone())
            .unwrap_or_default()
    }

    /// A `tex_parameter_i32` value set on a texture.
    pub fn texture_param(&self, texture: Handle, pname: u32) -> Option<i32> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .and_then(|t| t.params.get(&pname).copied())
    }

    /// Size of a texture's level-0 image.
    pub fn texture_size(&self, texture: Handle) -> Option<(i32, i32)> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| (t.width, t.height))
    }

    /// Attribute arrays enabled so far.
    pub fn enabled_attribs(&self) -> Vec<u32> {
        self.state.borrow().enabled_attribs.clone()
    }

    /// Transform-feedback varyings declared on a program.
    pub fn varyings(&self, program: Handle) -> Vec<String> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.varyings.clone())
            .unwrap_or_default()
    }

    /// Extensions enabled through `get_extension`.
    pub fn enabled_extensions(&self) -> Vec<String> {
        self.state.borrow().enabled_extensions.clone()
    }

    fn record(&self, name: &str) {
        self.state.borrow_mut().calls.push(name.to_owned());
    }
}

impl State {
    fn alloc(&mut self) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        Handle(id)
    }

    fn error(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    fn target_surface(&self) -> &Surface {
        self.framebuffer_binding
            .and_then(|fb| self.framebuffers.get(&fb))
            .map_or(&self.default_surface, |fb| &fb.surface)
    }

    fn target_surface_mut(&mut self) -> &mut Surface {
        if let Some(fb) = self.framebuffer_binding {
            if let Some(f) = self.framebuffers.get_mut(&fb) {
                return &mut f.surface;
            }
        }
        &mut self.default_surface
    }

    fn draw(&mut self) {
        let Some(program) = self.current_program else {
            self.error(enums::INVALID_OPERATION);
            return;
        };
        let color = self.programs.get(&program).and_then(|p| {
            let index = p.uniforms.iter().position(|u| u.name == "u_color")?;
            p.values.get(&index).copied()
        });
        if let Some(color) = color {
            let color = color.map(unit_to_u8);
            self.target_surface_mut().pixels.fill(color);
        }
    }
}

impl EnumSource for SoftContext {
    fn enum_constants(&self) -> &'static [(&'static str, u32)] {
        WEBGL2_CONSTANTS
    }
}

impl GlContext for SoftContext {
    type Shader = Handle;
    type Program = Handle;
    type Buffer = Handle;
    type Texture = Handle;
    type Framebuffer = Handle;
    type UniformLocation = SoftUniform;

    fn get_error(&self) -> u32 {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(enums::NO_ERROR)
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.default_surface.width, state.default_surface.height)
    }

    fn set_drawing_buffer_size(&self, width: u32, height: u32) {
        self.state.borrow_mut().default_surface = Surface::new(width, height);
    }

    fn lose_context(&self) -> bool {
        if self.lose_supported.get() {
            self.state.borrow_mut().lost = true;
        }
        self.lose_supported.get()
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.state.borrow().extensions.clone()
    }

    fn get_extension(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        if state.extensions.iter().any(|e| e == name) {
            state.enabled_extensions.push(name.to_owned());
            true
        } else {
            false
        }
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        let state = self.state.borrow();
        match pname {
            enums::MAX_TEXTURE_SIZE => 4096,
            _ => state.pixel_store.get(&pname).copied().unwrap_or(0),
        }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        match pname {
            enums::RENDERER => "SoftContext".to_owned(),
            enums::VENDOR => "gl-conformance-utils".to_owned(),
            enums::UNMASKED_RENDERER_WEBGL => "SoftContext (CPU)".to_owned(),
            _ => {
                self.state.borrow_mut().errors.push_back(enums::INVALID_ENUM);
                String::new()
            }
        }
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        self.state.borrow_mut().pixel_store.insert(pname, value);
    }

    fn current_program(&self) -> Option<Handle> {
        self.state.borrow().current_program
    }

    fn framebuffer_binding(&self) -> Option<Handle> {
        self.state.borrow().framebuffer_binding
    }

    fn create_shader(&self, kind: u32) -> Option<Handle> {
        self.record("create_shader");
        let mut state = self.state.borrow_mut();
        if kind != enums::VERTEX_SHADER && kind != enums::FRAGMENT_SHADER {
            state.error(enums::INVALID_ENUM);
            return None;
        }
        let handle = state.alloc();
        state.shaders.insert(
            handle,
            ShaderState {
                kind,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        Some(handle)
    }

    fn shader_source(&self, shader: Handle, source: &str) {
        if let Some(s) = self.state.borrow_mut().shaders.get_mut(&shader) {
            s.source = source.to_owned();
        }
    }

    fn compile_shader(&self, shader: Handle) {
        self.record("compile_shader");
        if let Some(s) = self.state.borrow_mut().shaders.get_mut(&shader) {
            s.compiled = s.source.contains("main") && !s.source.contains("COMPILE_ERROR");
            s.log = if s.compiled {
                String::new()
            } else {
                "ERROR: 0:1: syntax error".to_owned()
            };
        }
    }

    fn get_shader_compile_status(&self, shader: Handle) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn get_shader_info_log(&self, shader: Handle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: Handle) {
        self.record("delete_shader");
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn create_program(&self) -> Option<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        state.programs.insert(handle, ProgramState::default());
        Some(handle)
    }

    fn attach_shader(&self, program: Handle, shader: Handle) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.shaders.push(shader);
        }
    }

    fn bind_attrib_location(&self, program: Handle, index: u32, name: &str) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.bound.insert(name.to_owned(), index);
        }
    }

    fn transform_feedback_varyings(&self, program: Handle, varyings: &[&str], _buffer_mode: u32) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.varyings = varyings.iter().map(|&v| v.to_owned()).collect();
        }
    }

    fn link_program(&self, program: Handle) {
        self.record("link_program");
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(p) = state.programs.get(&program) else {
            state.error(enums::INVALID_VALUE);
            return;
        };
        let sources: Vec<(u32, String, bool)> = p
            .shaders
            .iter()
            .filter_map(|s| state.shaders.get(s))
            .map(|s| (s.kind, s.source.clone(), s.compiled))
            .collect();

        let vertex = sources.iter().find(|s| s.0 == enums::VERTEX_SHADER);
        let fragment = sources.iter().find(|s| s.0 == enums::FRAGMENT_SHADER);
        let failure = match (vertex, fragment) {
            (Some(v), Some(f)) if !v.2 || !f.2 => Some("Link failed: shader not compiled"),
            (Some(v), Some(f)) if v.1.contains("LINK_ERROR") || f.1.contains("LINK_ERROR") => {
                Some("Link failed: varyings mismatch")
            }
            (Some(_), Some(_)) => None,
            _ => Some("Link failed: missing shader stage"),
        };

        let mut attributes = Vec::new();
        let mut uniforms = Vec::new();
        if failure.is_none() {
            let vs = vertex.map(|v| v.1.as_str()).unwrap_or_default();
            let fs = fragment.map(|f| f.1.as_str()).unwrap_or_default();
            let bound = &p.bound;
            let mut next = 0;
            for (name, kind) in declarations(vs, &["attribute", "in"]) {
                let location = bound.get(&name).copied().unwrap_or_else(|| {
                    while bound.values().any(|&l| l == next) {
                        next += 1;
                    }
                    let l = next;
                    next += 1;
                    l
                });
                attributes.push(Variable { name, kind, location });
            }
            for (index, (name, kind)) in declarations(vs, &["uniform"])
                .into_iter()
                .chain(declarations(fs, &["uniform"]))
                .enumerate()
            {
                if uniforms.iter().any(|u: &Variable| u.name == name) {
                    continue;
                }
                let location = u32::try_from(index).unwrap_or_default();
                uniforms.push(Variable { name, kind, location });
            }
        }

        if let Some(p) = state.programs.get_mut(&program) {
            p.linked = failure.is_none();
            p.log = failure.unwrap_or_default().to_owned();
            p.attributes = attributes;
            p.uniforms = uniforms;
            p.values.clear();
        }
    }

    fn get_program_link_status(&self, program: Handle) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn get_program_info_log(&self, program: Handle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<Handle>) {
        self.record("use_program");
        let mut state = self.state.borrow_mut();
        match program {
            Some(p) if !state.programs.get(&p).is_some_and(|p| p.linked) => {
                state.error(enums::INVALID_OPERATION);
            }
            _ => state.current_program = program,
        }
    }

    fn delete_program(&self, program: Handle) {
        self.record("delete_program");
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn get_active_attributes(&self, program: Handle) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(0, |p| u32::try_from(p.attributes.len()).unwrap_or_default())
    }

    fn get_active_attribute(&self, program: Handle, index: u32) -> Option<ActiveInfo> {
        let state = self.state.borrow();
        let v = state.programs.get(&program)?.attributes.get(index as usize)?;
        Some(ActiveInfo {
            name: v.name.clone(),
            size: 1,
            kind: v.kind,
        })
    }

    fn get_active_uniforms(&self, program: Handle) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(0, |p| u32::try_from(p.uniforms.len()).unwrap_or_default())
    }

    fn get_active_uniform(&self, program: Handle, index: u32) -> Option<ActiveInfo> {
        let state = self.state.borrow();
        let v = state.programs.get(&program)?.uniforms.get(index as usize)?;
        Some(ActiveInfo {
            name: v.name.clone(),
            size: 1,
            kind: v.kind,
        })
    }

    fn get_attrib_location(&self, program: Handle, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let p = state.programs.get(&program)?;
        p.attributes.iter().find(|a| a.name == name).map(|a| a.location)
    }

    fn get_uniform_location(&self, program: Handle, name: &str) -> Option<SoftUniform> {
        let state = self.state.borrow();
        let p = state.programs.get(&program)?;
        let index = p.uniforms.iter().position(|u| u.name == name)?;
        Some(SoftUniform { program, index })
    }

    fn uniform_4_f32(&self, location: Option<&SoftUniform>, value: [f32; 4]) {
        self.record("uniform_4_f32");
        let Some(location) = location else { return };
        let mut state = self.state.borrow_mut();
        if state.current_program != Some(location.program) {
            state.error(enums::INVALID_OPERATION);
            return;
        }
        if let Some(p) = state.programs.get_mut(&location.program) {
            p.values.insert(location.index, value);
        }
    }

    fn create_buffer(&self) -> Option<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        state.buffers.insert(handle, Vec::new());
        Some(handle)
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Handle>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(b) => {
                state.buffer_bindings.insert(target, b);
            }
            None => {
                state.buffer_bindings.remove(&target);
            }
        }
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], _usage: u32) {
        let mut state = self.state.borrow_mut();
        match state.buffer_bindings.get(&target).copied() {
            Some(b) => {
                state.buffers.insert(b, data.to_vec());
            }
            None => state.error(enums::INVALID_OPERATION),
        }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: i32, dst: &mut [u8]) {
        self.record("get_buffer_sub_data");
        let mut state = self.state.borrow_mut();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let data = state
            .buffer_bindings
            .get(&target)
            .and_then(|b| state.buffers.get(b))
            .and_then(|d| d.get(start..start.checked_add(dst.len())?))
            .map(<[u8]>::to_vec);
        match data {
            Some(data) => dst.copy_from_slice(&data),
            None => state.error(enums::INVALID_VALUE),
        }
    }

    fn delete_buffer(&self, buffer: Handle) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.buffer_bindings.retain(|_, b| *b != buffer);
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.state.borrow_mut().enabled_attribs.push(index);
    }

    fn vertex_attrib_pointer_f32(
        &self,
        _index: u32,
        size: i32,
        _data_type: u32,
        _normalized: bool,
        _stride: i32,
        _offset: i32,
    ) {
        let mut state = self.state.borrow_mut();
        if !(1..=4).contains(&size) {
            state.error(enums::INVALID_VALUE);
        } else if !state.buffer_bindings.contains_key(&enums::ARRAY_BUFFER) {
            state.error(enums::INVALID_OPERATION);
        }
    }

    fn create_texture(&self) -> Option<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        state.textures.insert(handle, TextureState::default());
        Some(handle)
    }

    fn bind_texture(&self, _target: u32, texture: Option<Handle>) {
        self.state.borrow_mut().texture_binding = texture;
    }

    fn tex_parameter_i32(&self, _target: u32, pname: u32, value: i32) {
        let mut state = self.state.borrow_mut();
        let Some(bound) = state.texture_binding else {
            state.error(enums::INVALID_OPERATION);
            return;
        };
        if let Some(t) = state.textures.get_mut(&bound) {
            t.params.insert(pname, value);
        }
    }

    fn tex_image_2d(
        &self,
        _target: u32,
        level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.record("tex_image_2d");
        let mut state = self.state.borrow_mut();
        let Some(bound) = state.texture_binding else {
            state.error(enums::INVALID_OPERATION);
            return;
        };
        if width < 0 || height < 0 {
            state.error(enums::INVALID_VALUE);
            return;
        }
        if let Some(t) = state.textures.get_mut(&bound) {
            if level == 0 {
                t.width = width;
                t.height = height;
            }
            t.uploads.push(pixels.map(<[u8]>::to_vec).unwrap_or_default());
        }
    }

    fn tex_sub_image_2d(
        &self,
        _target: u32,
        _level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        _pixels: &[u8],
    ) {
        self.record("tex_sub_image_2d");
        let mut state = self.state.borrow_mut();
        let size = state
            .texture_binding
            .and_then(|t| state.textures.get(&t))
            .map(|t| (t.width, t.height));
        match size {
            None => state.error(enums::INVALID_OPERATION),
            Some((tw, th)) => {
                if x < 0 || y < 0 || x + width > tw || y + height > th {
                    state.error(enums::INVALID_VALUE);
                }
            }
        }
    }

    fn delete_texture(&self, texture: Handle) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        if state.texture_binding == Some(texture) {
            state.texture_binding = None;
        }
    }

    fn create_framebuffer(&self) -> Option<Handle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        state.framebuffers.insert(
            handle,
            FramebufferState {
                surface: Surface::new(0, 0),
                status: enums::FRAMEBUFFER_COMPLETE,
            },
        );
        Some(handle)
    }

    fn bind_framebuffer(&self, _target: u32, framebuffer: Option<Handle>) {
        self.state.borrow_mut().framebuffer_binding = framebuffer;
    }

    fn check_framebuffer_status(&self, _target: u32) -> u32 {
        let state = self.state.borrow();
        state
            .framebuffer_binding
            .and_then(|fb| state.framebuffers.get(&fb))
            .map_or(enums::FRAMEBUFFER_COMPLETE, |fb| fb.status)
    }

    fn delete_framebuffer(&self, framebuffer: Handle) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&framebuffer);
        if state.framebuffer_binding == Some(framebuffer) {
            state.framebuffer_binding = None;
        }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.state.borrow_mut().clear_color = [red, green, blue, alpha];
    }

    fn clear(&self, mask: u32) {
        self.record("clear");
        let mut state = self.state.borrow_mut();
        if mask & enums::COLOR_BUFFER_BIT != 0 {
            let color = state.clear_color.map(unit_to_u8);
            state.target_surface_mut().pixels.fill(color);
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.record("draw_arrays");
        self.record(&format!("draw_arrays({mode}, {first}, {count})"));
        self.state.borrow_mut().draw();
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.record("draw_elements");
        self.record(&format!("draw_elements({mode}, {count}, {element_type}, {offset})"));
        let mut state = self.state.borrow_mut();
        if !state.buffer_bindings.contains_key(&enums::ELEMENT_ARRAY_BUFFER) {
            state.error(enums::INVALID_OPERATION);
            return;
        }
        state.draw();
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
        self.record("read_pixels");
        let mut state = self.state.borrow_mut();
        let channels = match format {
            enums::RGBA => 4,
            enums::RGB => 3,
            _ => {
                state.error(enums::INVALID_ENUM);
                return;
            }
        };
        let bytes = match ty {
            enums::UNSIGNED_BYTE => 1,
            enums::UNSIGNED_SHORT => 2,
            enums::FLOAT => 4,
            _ => {
                state.error(enums::INVALID_ENUM);
                return;
            }
        };
        let (w, h) = (crate::context::to_len(width), crate::context::to_len(height));
        if pixels.len() < w * h * channels * bytes {
            state.error(enums::INVALID_OPERATION);
            return;
        }
        let surface = state.target_surface();
        let mut out = 0;
        for row in 0..height {
            for col in 0..width {
                let color = surface.get(x + col, y + row).unwrap_or([0; 4]);
                for &c in &color[..channels] {
                    match bytes {
                        1 => pixels[out] = c,
                        2 => pixels[out..out + 2].copy_from_slice(&(u16::from(c) * 257).to_ne_bytes()),
                        _ => pixels[out..out + 4].copy_from_slice(&(f32::from(c) / 255.0).to_ne_bytes()),
                    }
                    out += bytes;
                }
            }
        }
    }
}
