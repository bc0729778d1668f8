//! Shader sources and program construction.
//!
//! The built-in sources target ESSL 1.00 unless their name says ESSL 3.00.
//! Programs are built through [`Session`] so that compile and link failures
//! are reported and remembered in [`Session::last_error`]; none of them is
//! an `Err`. Errors are reserved for misuse, such as naming a script that was
//! never registered.
//!
//! Attribute locations default to [`DEFAULT_POSITION_LOCATION`] for
//! `vPosition` and [`DEFAULT_TEXCOORD_LOCATION`] for the second attribute.

use std::{collections::HashMap, path::Path};

use crate::{
    context::{ActiveInfo, GlContext},
    enums,
    error::HarnessError,
    loader,
    report::Reporter,
    session::{Session, FRAGMENT_SCRIPT_TYPE, VERTEX_SCRIPT_TYPE},
};

/// Location `vPosition` is bound to unless the caller picks another.
pub const DEFAULT_POSITION_LOCATION: u32 = 0;
/// Location of the texture coordinate or vertex color attribute unless the
/// caller picks another.
pub const DEFAULT_TEXCOORD_LOCATION: u32 = 1;

/// Passes `vPosition` through and forwards `texCoord0` as `texCoord`.
///
/// # Attributes
///
/// | Name        | Type   |
/// |-------------|--------|
/// | `vPosition` | `vec4` |
/// | `texCoord0` | `vec2` |
pub const SIMPLE_TEXTURE_VERTEX_SHADER: &str = "attribute vec4 vPosition;
attribute vec2 texCoord0;
varying vec2 texCoord;
void main() {
    gl_Position = vPosition;
    texCoord = texCoord0;
}";

/// ESSL 3.00 version of [`SIMPLE_TEXTURE_VERTEX_SHADER`], with the
/// attributes at fixed locations 0 and 1.
pub const SIMPLE_TEXTURE_VERTEX_SHADER_ESSL300: &str = "#version 300 es
layout(location=0) in vec4 vPosition;
layout(location=1) in vec2 texCoord0;
out vec2 texCoord;
void main() {
    gl_Position = vPosition;
    texCoord = texCoord0;
}";

/// Samples `tex` at `texCoord`.
pub const SIMPLE_TEXTURE_FRAGMENT_SHADER: &str = "precision mediump float;
uniform sampler2D tex;
varying vec2 texCoord;
void main() {
    gl_FragData[0] = texture2D(tex, texCoord);
}";

/// ESSL 3.00 version of [`SIMPLE_TEXTURE_FRAGMENT_SHADER`], in high
/// precision.
pub const SIMPLE_TEXTURE_FRAGMENT_SHADER_ESSL300: &str = "#version 300 es
precision highp float;
uniform highp sampler2D tex;
in vec2 texCoord;
out vec4 out_color;
void main() {
    out_color = texture(tex, texCoord);
}";

/// [`SIMPLE_TEXTURE_FRAGMENT_SHADER`] in high precision.
pub const SIMPLE_HIGH_PRECISION_TEXTURE_FRAGMENT_SHADER: &str = "precision highp float;
uniform highp sampler2D tex;
varying vec2 texCoord;
void main() {
    gl_FragData[0] = texture2D(tex, texCoord);
}";

/// Samples one face of a cube map as if it were a 2D texture.
///
/// # Uniforms
///
/// | Name   | Type          | Description                                   |
/// |--------|---------------|-----------------------------------------------|
/// | `tex`  | `samplerCube` | The cube map                                  |
/// | `face` | `int`         | `TEXTURE_CUBE_MAP_POSITIVE_X` .. `NEGATIVE_Z` |
pub const SIMPLE_CUBE_MAP_TEXTURE_FRAGMENT_SHADER: &str = "precision mediump float;
uniform samplerCube tex;
uniform highp int face;
varying vec2 texCoord;
void main() {
    vec2 texC2 = (texCoord * 2.) - 1.;
    vec3 texCube = vec3(0., 0., 0.);
    if (face == 34069) {
        texCube = vec3(1., -texC2.y, -texC2.x);
    } else if (face == 34070) {
        texCube = vec3(-1., -texC2.y, texC2.x);
    } else if (face == 34071) {
        texCube = vec3(texC2.x, 1., texC2.y);
    } else if (face == 34072) {
        texCube = vec3(texC2.x, -1., -texC2.y);
    } else if (face == 34073) {
        texCube = vec3(texC2.x, -texC2.y, 1.);
    } else if (face == 34074) {
        texCube = vec3(-texC2.x, -texC2.y, -1.);
    }
    gl_FragData[0] = textureCube(tex, texCube);
}";

/// Derives `texCoord` from the clip-space position.
pub const NO_TEX_COORD_TEXTURE_VERTEX_SHADER: &str = "attribute vec4 vPosition;
varying vec2 texCoord;
void main() {
    gl_Position = vPosition;
    texCoord = vPosition.xy * 0.5 + 0.5;
}";

/// Passes `vPosition` through.
pub const SIMPLE_VERTEX_SHADER: &str = "attribute vec4 vPosition;
void main() {
    gl_Position = vPosition;
}";

/// ESSL 3.00 version of [`SIMPLE_VERTEX_SHADER`].
pub const SIMPLE_VERTEX_SHADER_ESSL300: &str = "#version 300 es
in vec4 vPosition;
void main() {
    gl_Position = vPosition;
}";

/// Writes the `u_color` uniform.
///
/// # Uniforms
///
/// | Name      | Type   | Description              |
/// |-----------|--------|--------------------------|
/// | `u_color` | `vec4` | Output color, 0-1 floats |
pub const SIMPLE_COLOR_FRAGMENT_SHADER: &str = "precision mediump float;
uniform vec4 u_color;
void main() {
    gl_FragData[0] = u_color;
}";

/// ESSL 3.00 version of [`SIMPLE_COLOR_FRAGMENT_SHADER`].
pub const SIMPLE_COLOR_FRAGMENT_SHADER_ESSL300: &str = "#version 300 es
precision mediump float;
out vec4 out_color;
uniform vec4 u_color;
void main() {
    out_color = u_color;
}";

/// Forwards a per-vertex `a_color`.
pub const SIMPLE_VERTEX_COLOR_VERTEX_SHADER: &str = "attribute vec4 vPosition;
attribute vec4 a_color;
varying vec4 v_color;
void main() {
    gl_Position = vPosition;
    v_color = a_color;
}";

/// Writes the interpolated vertex color.
pub const SIMPLE_VERTEX_COLOR_FRAGMENT_SHADER: &str = "precision mediump float;
varying vec4 v_color;
void main() {
    gl_FragData[0] = v_color;
}";

/// Vertex or fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// `VERTEX_SHADER`.
    Vertex,
    /// `FRAGMENT_SHADER`.
    Fragment,
}

impl ShaderKind {
    /// The GL enum for this stage.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => enums::VERTEX_SHADER,
            Self::Fragment => enums::FRAGMENT_SHADER,
        }
    }

    /// The stage a GL enum names, if any.
    #[must_use]
    pub fn from_gl_enum(value: u32) -> Option<Self> {
        match value {
            enums::VERTEX_SHADER => Some(Self::Vertex),
            enums::FRAGMENT_SHADER => Some(Self::Fragment),
            _ => None,
        }
    }

    /// The stage implied by a position in a shader list: first is vertex,
    /// everything after is fragment.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        if index == 0 {
            Self::Vertex
        } else {
            Self::Fragment
        }
    }

    /// The stage a script `type` attribute declares.
    #[must_use]
    pub fn from_script_type(type_attr: &str) -> Option<Self> {
        match type_attr {
            VERTEX_SCRIPT_TYPE => Some(Self::Vertex),
            FRAGMENT_SCRIPT_TYPE => Some(Self::Fragment),
            _ => None,
        }
    }

    /// The stage a `.vert` or `.frag` file name implies.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".vert") {
            Some(Self::Vertex)
        } else if name.ends_with(".frag") {
            Some(Self::Fragment)
        } else {
            None
        }
    }

    fn log_label(self) -> &'static str {
        match self {
            Self::Vertex => "vertex shader",
            Self::Fragment => "fragment_shader",
        }
    }
}

/// One entry of a shader list passed to
/// [`setup_program`](Session::setup_program).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderRef<'a, S> {
    /// An already compiled shader, attached as is.
    Compiled(S),
    /// A registered script id, a `.vert`/`.frag` path, or inline source,
    /// tried in that order.
    Text(&'a str),
}

/// Options for loading one shader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderOptions<'a> {
    /// Log a numbered listing of the source.
    pub log_shaders: bool,
    /// Prefix for the listing's label.
    pub label: Option<&'a str>,
    /// Where the source came from, shown next to the label.
    pub url: Option<&'a str>,
    /// Return the shader even if it failed to compile.
    pub skip_compile_status: bool,
}

/// Receives compile and link diagnostics in place of the session default.
pub type ErrorCallback<'a> = &'a mut dyn FnMut(&str);

/// Reborrow an optional callback for one more call.
fn reborrow<'s>(on_error: &'s mut Option<ErrorCallback<'_>>) -> Option<ErrorCallback<'s>> {
    match on_error {
        Some(f) => {
            let f: ErrorCallback<'s> = &mut **f;
            Some(f)
        }
        None => None,
    }
}

/// Options for building a program from a shader list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramOptions<'a> {
    /// Attribute names to bind before linking.
    pub attribs: &'a [&'a str],
    /// Locations for `attribs`; attribute `i` binds to `i` when absent.
    pub locations: Option<&'a [u32]>,
    /// Log each compiled source.
    pub log_shaders: bool,
    /// Attach shaders even if they failed to compile.
    pub skip_compile_status: bool,
}

impl<'a> ProgramOptions<'a> {
    /// Bind `attribs` to locations `0..`.
    #[must_use]
    pub fn with_attribs(attribs: &'a [&'a str]) -> Self {
        Self {
            attribs,
            ..Self::default()
        }
    }

    /// Bind the attributes to explicit `locations` instead.
    #[must_use]
    pub fn at(self, locations: &'a [u32]) -> Self {
        Self {
            locations: Some(locations),
            ..self
        }
    }

    fn location(&self, index: usize) -> u32 {
        match self.locations {
            Some(locations) => locations.get(index).copied().unwrap_or_default(),
            None => u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    fn shader_options(&self) -> ShaderOptions<'static> {
        ShaderOptions {
            log_shaders: self.log_shaders,
            skip_compile_status: self.skip_compile_status,
            ..ShaderOptions::default()
        }
    }
}

/// An active attribute or uniform of a linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveVariable<L> {
    /// Name as reported by the context.
    pub name: String,
    /// Array size.
    pub size: i32,
    /// GL type enum.
    pub kind: u32,
    /// Location, if the name resolves to one.
    pub location: Option<L>,
}

/// Prefix each line of `source` with a right-aligned line number.
#[must_use]
pub fn format_shader_source(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Expand `$(name)` templates in `template`.
///
/// Each name is looked up in `params` in order; the first table with the
/// key wins. Names are runs of ASCII letters, digits, and underscores.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownParam`] if a name is in none of the
/// tables.
pub fn replace_params(template: &str, params: &[&[(&str, &str)]]) -> Result<String, HarnessError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$(") {
        let after = &rest[start + 2..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if name_len == 0 || !after[name_len..].starts_with(')') {
            out.push_str(&rest[..start + 2]);
            rest = after;
            continue;
        }
        let name = &after[..name_len];
        let value = params
            .iter()
            .find_map(|table| table.iter().find(|(k, _)| *k == name).map(|(_, v)| *v))
            .ok_or_else(|| HarnessError::UnknownParam(name.to_owned()))?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &after[name_len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

impl<R: Reporter> Session<R> {
    fn report_error(&mut self, on_error: Option<ErrorCallback<'_>>, msg: &str) {
        match on_error {
            Some(f) => f(msg),
            None => self.error(msg),
        }
    }

    fn log_shader_source(&mut self, kind: ShaderKind, source: &str, options: &ShaderOptions<'_>) {
        let mut label = kind.log_label().to_owned();
        if let Some(prefix) = options.label {
            label = format!("{prefix} {label}");
        }
        if let Some(url) = options.url {
            label = format!("{label} ({url})");
        }
        let listing = format!("{label}\n{}", format_shader_source(source));
        self.log(&listing);
        self.debug(&listing);
    }

    /// Create and compile a shader.
    ///
    /// On a compile failure the info log becomes
    /// [`last_error`](Self::last_error), `on_error` (or
    /// [`error`](Self::error)) receives `*** Error compiling <KIND>
    /// '<shader>':<log>`, and the shader is deleted.
    pub fn load_shader<C: GlContext>(
        &mut self,
        gl: &C,
        source: &str,
        kind: ShaderKind,
        options: &ShaderOptions<'_>,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Shader> {
        let Some(shader) = gl.create_shader(kind.gl_enum()) else {
            self.report_error(on_error, &format!("*** Error: unable to create shader '{source}'"));
            return None;
        };
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if options.log_shaders {
            self.log_shader_source(kind, source, options);
        }

        if !options.skip_compile_status && !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            let kind_name = self.gl_enum_to_string(gl, kind.gl_enum());
            let msg = format!("*** Error compiling {kind_name} '{shader:?}':{log}");
            self.set_last_error(log);
            self.report_error(on_error, &msg);
            gl.delete_shader(shader);
            return None;
        }
        Some(shader)
    }

    /// [`load_shader`](Self::load_shader) with the source read from `path`.
    ///
    /// Carriage returns are stripped. A read failure goes to `on_error` like
    /// a compile failure.
    pub fn load_shader_from_file<C: GlContext>(
        &mut self,
        gl: &C,
        path: impl AsRef<Path>,
        kind: ShaderKind,
        options: &ShaderOptions<'_>,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Shader> {
        let path = path.as_ref();
        let source = match loader::read_file(path) {
            Ok(source) => source,
            Err(err) => {
                self.report_error(on_error, &err.to_string());
                return None;
            }
        };
        let url = path.to_string_lossy();
        let options = ShaderOptions {
            url: options.url.or(Some(&*url)),
            ..*options
        };
        self.load_shader(gl, &source, kind, &options, on_error)
    }

    /// Asynchronous [`load_shader_from_file`](Self::load_shader_from_file).
    pub async fn load_shader_from_file_async<C: GlContext>(
        &mut self,
        gl: &C,
        path: impl AsRef<Path>,
        kind: ShaderKind,
        options: &ShaderOptions<'_>,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Shader> {
        let path = path.as_ref();
        let Some(source) = loader::load_text_file_async(path).await else {
            let msg = format!("failed to load shader {}", path.display());
            self.report_error(on_error, &msg);
            return None;
        };
        let url = path.to_string_lossy();
        let options = ShaderOptions {
            url: options.url.or(Some(&*url)),
            ..*options
        };
        self.load_shader(gl, &source, kind, &options, on_error)
    }

    /// [`load_shader`](Self::load_shader) with the trimmed text of a
    /// registered script.
    ///
    /// Without an explicit `kind`, the script's type attribute decides.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UnknownScript`] for an unregistered id and
    /// [`HarnessError::UnknownShaderType`] if the kind cannot be derived.
    pub fn load_shader_from_script<C: GlContext>(
        &mut self,
        gl: &C,
        id: &str,
        kind: Option<ShaderKind>,
        options: &ShaderOptions<'_>,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Result<Option<C::Shader>, HarnessError> {
        let script = self
            .script(id)
            .ok_or_else(|| HarnessError::UnknownScript(id.to_owned()))?;
        let kind = match kind {
            Some(kind) => kind,
            None => ShaderKind::from_script_type(&script.type_attr).ok_or(HarnessError::UnknownShaderType)?,
        };
        let source = script.text.trim().to_owned();
        Ok(self.load_shader(gl, &source, kind, options, on_error))
    }

    /// Compile one [`ShaderRef::Text`] entry of a shader list.
    fn resolve_shader<C: GlContext>(
        &mut self,
        gl: &C,
        text: &str,
        index: usize,
        options: &ShaderOptions<'_>,
    ) -> Option<C::Shader> {
        let by_index = ShaderKind::for_index(index);
        if let Some(script) = self.script(text).filter(|_| !text.is_empty()) {
            let kind = ShaderKind::from_script_type(&script.type_attr).unwrap_or(by_index);
            let source = script.text.trim().to_owned();
            return self.load_shader(gl, &source, kind, options, None);
        }
        if let Some(kind) = ShaderKind::from_file_name(text) {
            return self.load_shader_from_file(gl, text, kind, options, None);
        }
        self.load_shader(gl, text, by_index, options, None)
    }

    /// Shared body of the program builders. Expects `shaders` to be free of
    /// compiled entries when shader logging is on.
    fn build_program<C: GlContext>(
        &mut self,
        gl: &C,
        shaders: &[ShaderRef<'_, C::Shader>],
        options: &ProgramOptions<'_>,
        feedback: Option<(&[&str], u32)>,
    ) -> Option<C::Program> {
        let Some(program) = gl.create_program() else {
            self.error("*** Error: unable to create program");
            return None;
        };
        let shader_options = options.shader_options();
        let mut owned = Vec::new();
        let mut attached = 0;
        for (index, shader) in shaders.iter().enumerate() {
            let shader = match *shader {
                ShaderRef::Compiled(shader) => Some(shader),
                ShaderRef::Text(text) => {
                    let shader = self.resolve_shader(gl, text, index, &shader_options);
                    owned.extend(shader);
                    shader
                }
            };
            if let Some(shader) = shader {
                attached += 1;
                gl.attach_shader(program, shader);
            }
        }

        if attached != 2 {
            self.error("Error in compiling shader");
            for shader in owned {
                gl.delete_shader(shader);
            }
            gl.delete_program(program);
            return None;
        }

        for (index, name) in options.attribs.iter().enumerate() {
            gl.bind_attrib_location(program, options.location(index), name);
        }
        if let Some((varyings, buffer_mode)) = feedback {
            gl.transform_feedback_varyings(program, varyings, buffer_mode);
        }
        gl.link_program(program);
        let linked = gl.get_program_link_status(program);

        // The program keeps what it needs; shaders we compiled are ours to free.
        for shader in owned {
            gl.delete_shader(shader);
        }

        if !linked {
            let log = gl.get_program_info_log(program);
            self.error(&format!("Error in program linking:{log}"));
            self.set_last_error(log);
            gl.delete_program(program);
            return None;
        }

        gl.use_program(Some(program));
        Some(program)
    }

    /// Build, link, and use a program from exactly two shaders.
    ///
    /// Returns `Ok(None)` after reporting if a shader fails to compile, the
    /// list does not yield exactly two shaders, or linking fails.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::LoggingWithoutSource`] if `log_shaders` is set
    /// and a [`ShaderRef::Compiled`] entry has no source to log.
    pub fn setup_program<C: GlContext>(
        &mut self,
        gl: &C,
        shaders: &[ShaderRef<'_, C::Shader>],
        options: &ProgramOptions<'_>,
    ) -> Result<Option<C::Program>, HarnessError> {
        check_loggable(shaders, options)?;
        Ok(self.build_program(gl, shaders, options, None))
    }

    /// [`setup_program`](Self::setup_program) that also declares
    /// transform-feedback `varyings` before linking.
    ///
    /// # Errors
    ///
    /// As for [`setup_program`](Self::setup_program).
    pub fn setup_transform_feedback_program<C: GlContext>(
        &mut self,
        gl: &C,
        shaders: &[ShaderRef<'_, C::Shader>],
        varyings: &[&str],
        buffer_mode: u32,
        options: &ProgramOptions<'_>,
    ) -> Result<Option<C::Program>, HarnessError> {
        check_loggable(shaders, options)?;
        Ok(self.build_program(gl, shaders, options, Some((varyings, buffer_mode))))
    }

    fn setup_builtin_program<C: GlContext>(
        &mut self,
        gl: &C,
        vertex: &str,
        fragment: &str,
        attribs: &[&str],
        locations: &[u32],
    ) -> Option<C::Program> {
        let options = ProgramOptions::with_attribs(attribs).at(locations);
        self.build_program(
            gl,
            &[ShaderRef::Text(vertex), ShaderRef::Text(fragment)],
            &options,
            None,
        )
    }

    /// Texture program whose coordinates come from the position.
    pub fn setup_no_tex_coord_texture_program<C: GlContext>(&mut self, gl: &C) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            NO_TEX_COORD_TEXTURE_VERTEX_SHADER,
            SIMPLE_TEXTURE_FRAGMENT_SHADER,
            &["vPosition"],
            &[DEFAULT_POSITION_LOCATION],
        )
    }

    /// Program drawing `tex` at `texCoord0`, optionally with a replacement
    /// fragment shader.
    pub fn setup_simple_texture_program<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
        fragment_override: Option<&str>,
    ) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            SIMPLE_TEXTURE_VERTEX_SHADER,
            fragment_override.unwrap_or(SIMPLE_TEXTURE_FRAGMENT_SHADER),
            &["vPosition", "texCoord0"],
            &[
                position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
                texcoord_location.unwrap_or(DEFAULT_TEXCOORD_LOCATION),
            ],
        )
    }

    /// ESSL 3.00 version of
    /// [`setup_simple_texture_program`](Self::setup_simple_texture_program).
    pub fn setup_simple_texture_program_essl300<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
        fragment_override: Option<&str>,
    ) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            SIMPLE_TEXTURE_VERTEX_SHADER_ESSL300,
            fragment_override.unwrap_or(SIMPLE_TEXTURE_FRAGMENT_SHADER_ESSL300),
            &["vPosition", "texCoord0"],
            &[
                position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
                texcoord_location.unwrap_or(DEFAULT_TEXCOORD_LOCATION),
            ],
        )
    }

    /// Program drawing one face of a cube map, selected by the `face`
    /// uniform.
    pub fn setup_simple_cube_map_texture_program<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        texcoord_location: Option<u32>,
    ) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            SIMPLE_TEXTURE_VERTEX_SHADER,
            SIMPLE_CUBE_MAP_TEXTURE_FRAGMENT_SHADER,
            &["vPosition", "texCoord0"],
            &[
                position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
                texcoord_location.unwrap_or(DEFAULT_TEXCOORD_LOCATION),
            ],
        )
    }

    /// Program drawing per-vertex `a_color`.
    pub fn setup_simple_vertex_color_program<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
        color_location: Option<u32>,
    ) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            SIMPLE_VERTEX_COLOR_VERTEX_SHADER,
            SIMPLE_VERTEX_COLOR_FRAGMENT_SHADER,
            &["vPosition", "a_color"],
            &[
                position_location.unwrap_or(DEFAULT_POSITION_LOCATION),
                color_location.unwrap_or(DEFAULT_TEXCOORD_LOCATION),
            ],
        )
    }

    /// Program drawing the `u_color` uniform.
    pub fn setup_simple_color_program<C: GlContext>(
        &mut self,
        gl: &C,
        position_location: Option<u32>,
    ) -> Option<C::Program> {
        self.setup_builtin_program(
            gl,
            SIMPLE_VERTEX_SHADER,
            SIMPLE_COLOR_FRAGMENT_SHADER,
            &["vPosition"],
            &[position_location.unwrap_or(DEFAULT_POSITION_LOCATION)],
        )
    }

    /// Link `program`, reporting failure through `on_error` or, by default,
    /// as a failed expectation. A program that fails to link is deleted.
    ///
    /// Returns whether linking succeeded.
    pub fn link_program<C: GlContext>(
        &mut self,
        gl: &C,
        program: C::Program,
        on_error: Option<ErrorCallback<'_>>,
    ) -> bool {
        gl.link_program(program);
        if gl.get_program_link_status(program) {
            return true;
        }
        let msg = format!("Error in program linking:{}", gl.get_program_info_log(program));
        match on_error {
            Some(f) => f(&msg),
            None => self.failed(&msg),
        }
        gl.delete_program(program);
        false
    }

    /// Attach two compiled shaders to a new program and link it.
    ///
    /// The shaders stay owned by the caller.
    pub fn create_program<C: GlContext>(
        &mut self,
        gl: &C,
        vertex: C::Shader,
        fragment: C::Shader,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Program> {
        let program = gl.create_program()?;
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        self.link_program(gl, program, on_error).then_some(program)
    }

    /// Compile both sources and link them. The shaders are deleted either way.
    pub fn load_program<C: GlContext>(
        &mut self,
        gl: &C,
        vertex_source: &str,
        fragment_source: &str,
        options: &ShaderOptions<'_>,
        mut on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Program> {
        let vs = self.load_shader(gl, vertex_source, ShaderKind::Vertex, options, reborrow(&mut on_error));
        let fs = self.load_shader(gl, fragment_source, ShaderKind::Fragment, options, reborrow(&mut on_error));
        self.finish_program(gl, vs, fs, on_error)
    }

    /// [`load_program`](Self::load_program) with both sources read from
    /// files.
    pub fn load_program_from_file<C: GlContext>(
        &mut self,
        gl: &C,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        mut on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Program> {
        let options = ShaderOptions::default();
        let vs = self.load_shader_from_file(gl, vertex_path, ShaderKind::Vertex, &options, reborrow(&mut on_error));
        let fs = self.load_shader_from_file(gl, fragment_path, ShaderKind::Fragment, &options, reborrow(&mut on_error));
        self.finish_program(gl, vs, fs, on_error)
    }

    /// [`load_program`](Self::load_program) with both sources taken from
    /// registered scripts, as vertex and fragment shaders respectively.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UnknownScript`] if either id is unregistered.
    pub fn load_program_from_script<C: GlContext>(
        &mut self,
        gl: &C,
        vertex_id: &str,
        fragment_id: &str,
        mut on_error: Option<ErrorCallback<'_>>,
    ) -> Result<Option<C::Program>, HarnessError> {
        let options = ShaderOptions::default();
        let vs = self.load_shader_from_script(gl, vertex_id, Some(ShaderKind::Vertex), &options, reborrow(&mut on_error))?;
        let fs = match self.load_shader_from_script(
            gl,
            fragment_id,
            Some(ShaderKind::Fragment),
            &options,
            reborrow(&mut on_error),
        ) {
            Ok(fs) => fs,
            Err(err) => {
                if let Some(vs) = vs {
                    gl.delete_shader(vs);
                }
                return Err(err);
            }
        };
        Ok(self.finish_program(gl, vs, fs, on_error))
    }

    /// Build a program from two scripts that may legitimately fail.
    ///
    /// Returns `Ok(None)` if either shader fails to compile or the program
    /// fails to link. Link failures are not reported.
    ///
    /// # Errors
    ///
    /// As for [`load_shader_from_script`](Self::load_shader_from_script)
    /// with no explicit kind.
    pub fn load_program_from_script_expect_error<C: GlContext>(
        &mut self,
        gl: &C,
        vertex_id: &str,
        fragment_id: &str,
    ) -> Result<Option<C::Program>, HarnessError> {
        let options = ShaderOptions::default();
        let Some(vs) = self.load_shader_from_script(gl, vertex_id, None, &options, None)? else {
            return Ok(None);
        };
        let fs = match self.load_shader_from_script(gl, fragment_id, None, &options, None) {
            Ok(Some(fs)) => fs,
            other => {
                gl.delete_shader(vs);
                return other.map(|_| None);
            }
        };
        let mut ignore = |_: &str| {};
        let program = self.create_program(gl, vs, fs, Some(&mut ignore));
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        Ok(program)
    }

    fn finish_program<C: GlContext>(
        &mut self,
        gl: &C,
        vs: Option<C::Shader>,
        fs: Option<C::Shader>,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Option<C::Program> {
        let program = match (vs, fs) {
            (Some(vs), Some(fs)) => self.create_program(gl, vs, fs, on_error),
            _ => None,
        };
        for shader in [vs, fs].into_iter().flatten() {
            gl.delete_shader(shader);
        }
        program
    }

    /// Attach the standard vertex/normal shaders, bind `a_vertex` to 0 and
    /// `a_normal` to 1, and link.
    fn link_standard_pair<C: GlContext>(
        &mut self,
        gl: &C,
        vs: Option<C::Shader>,
        fs: Option<C::Shader>,
    ) -> Option<C::Program> {
        let (Some(vs), Some(fs)) = (vs, fs) else {
            for shader in [vs, fs].into_iter().flatten() {
                gl.delete_shader(shader);
            }
            return None;
        };
        let program = gl.create_program()?;
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.bind_attrib_location(program, 0, "a_vertex");
        gl.bind_attrib_location(program, 1, "a_normal");
        let linked = self.link_program(gl, program, None);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        linked.then_some(program)
    }

    /// Program from `vertexShader.vert` and `fragmentShader.frag` in the
    /// resource directory.
    pub fn load_standard_program<C: GlContext>(&mut self, gl: &C) -> Option<C::Program> {
        let options = ShaderOptions::default();
        let vs = self.load_shader_from_file(gl, self.resource_path("vertexShader.vert"), ShaderKind::Vertex, &options, None);
        let fs = self.load_shader_from_file(gl, self.resource_path("fragmentShader.frag"), ShaderKind::Fragment, &options, None);
        self.link_standard_pair(gl, vs, fs)
    }

    /// Asynchronous [`load_standard_program`](Self::load_standard_program).
    ///
    /// The fragment shader is only loaded once the vertex shader has
    /// compiled.
    pub async fn load_standard_program_async<C: GlContext>(&mut self, gl: &C) -> Option<C::Program> {
        let options = ShaderOptions::default();
        let vs_path = self.resource_path("vertexShader.vert");
        let vs = self
            .load_shader_from_file_async(gl, vs_path, ShaderKind::Vertex, &options, None)
            .await?;
        let fs_path = self.resource_path("fragmentShader.frag");
        let fs = self
            .load_shader_from_file_async(gl, fs_path, ShaderKind::Fragment, &options, None)
            .await;
        self.link_standard_pair(gl, Some(vs), fs)
    }

    /// Program from `uniformBlockShader.vert` and `uniformBlockShader.frag`
    /// in the resource directory.
    pub fn load_uniform_block_program<C: GlContext>(&mut self, gl: &C) -> Option<C::Program> {
        let options = ShaderOptions::default();
        let vs = self.load_shader_from_file(
            gl,
            self.resource_path("uniformBlockShader.vert"),
            ShaderKind::Vertex,
            &options,
            None,
        );
        let fs = self.load_shader_from_file(
            gl,
            self.resource_path("uniformBlockShader.frag"),
            ShaderKind::Fragment,
            &options,
            None,
        );
        self.link_standard_pair(gl, vs, fs)
    }
}

fn check_loggable<S>(shaders: &[ShaderRef<'_, S>], options: &ProgramOptions<'_>) -> Result<(), HarnessError> {
    if options.log_shaders && shaders.iter().any(|s| matches!(s, ShaderRef::Compiled(_))) {
        return Err(HarnessError::LoggingWithoutSource);
    }
    Ok(())
}

fn active_map<L>(
    count: u32,
    info: impl Fn(u32) -> Option<ActiveInfo>,
    location: impl Fn(&str) -> Option<L>,
) -> HashMap<String, ActiveVariable<L>> {
    (0..count)
        .filter_map(info)
        .map(|info| {
            let variable = ActiveVariable {
                location: location(&info.name),
                name: info.name,
                size: info.size,
                kind: info.kind,
            };
            (variable.name.clone(), variable)
        })
        .collect()
}

/// Active attributes of a linked program, by name.
pub fn get_attrib_map<C: GlContext>(gl: &C, program: C::Program) -> HashMap<String, ActiveVariable<u32>> {
    active_map(
        gl.get_active_attributes(program),
        |i| gl.get_active_attribute(program, i),
        |name| gl.get_attrib_location(program, name),
    )
}

/// Active uniforms of a linked program, by name.
pub fn get_uniform_map<C: GlContext>(
    gl: &C,
    program: C::Program,
) -> HashMap<String, ActiveVariable<C::UniformLocation>> {
    active_map(
        gl.get_active_uniforms(program),
        |i| gl.get_active_uniform(program, i),
        |name| gl.get_uniform_location(program, name),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{report::RecordingReporter, testing::SoftContext};

    const BAD_SHADER: &str = "COMPILE_ERROR void main() {}";

    fn session() -> Session<RecordingReporter> {
        Session::with_reporter(RecordingReporter::new())
    }

    #[test]
    fn kinds_from_names() {
        assert_eq!(ShaderKind::for_index(0), ShaderKind::Vertex);
        assert_eq!(ShaderKind::for_index(3), ShaderKind::Fragment);
        assert_eq!(ShaderKind::from_file_name("a/b.frag"), Some(ShaderKind::Fragment));
        assert_eq!(ShaderKind::from_file_name("a/b.glsl"), None);
        assert_eq!(ShaderKind::from_script_type("text/plain"), None);
        assert_eq!(
            ShaderKind::from_gl_enum(enums::VERTEX_SHADER),
            Some(ShaderKind::Vertex)
        );
    }

    #[test]
    fn load_shader_compiles() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let shader = s.load_shader(&gl, SIMPLE_VERTEX_SHADER, ShaderKind::Vertex, &ShaderOptions::default(), None);
        assert!(shader.is_some());
        assert!(s.reporter().outcomes.is_empty());
    }

    #[test]
    fn compile_failure_records_last_error_and_deletes() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let mut seen = Vec::new();
        let shader = s.load_shader(
            &gl,
            BAD_SHADER,
            ShaderKind::Fragment,
            &ShaderOptions::default(),
            Some(&mut |m: &str| seen.push(m.to_owned())),
        );
        assert!(shader.is_none());
        assert_eq!(s.last_error(), "ERROR: 0:1: syntax error");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("*** Error compiling FRAGMENT_SHADER '"));
        assert!(seen[0].ends_with("':ERROR: 0:1: syntax error"));
        assert_eq!(gl.call_count("delete_shader"), 1);
        // The callback replaced the default sink.
        assert!(s.reporter().outcomes.is_empty());
    }

    #[test]
    fn skip_compile_status_keeps_broken_shader() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let options = ShaderOptions {
            skip_compile_status: true,
            ..ShaderOptions::default()
        };
        assert!(s.load_shader(&gl, BAD_SHADER, ShaderKind::Vertex, &options, None).is_some());
    }

    #[test]
    fn shader_logging_numbers_lines() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let options = ShaderOptions {
            log_shaders: true,
            label: Some("quad"),
            ..ShaderOptions::default()
        };
        s.load_shader(&gl, SIMPLE_VERTEX_SHADER, ShaderKind::Vertex, &options, None);
        let debugs: Vec<_> = s.reporter().debugs().collect();
        assert_eq!(debugs.len(), 1);
        assert!(debugs[0].starts_with("quad vertex shader\n1: attribute vec4 vPosition;"));
    }

    #[test]
    fn source_listing_aligns_numbers() {
        let source = (1..=10).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let listing = format_shader_source(&source);
        assert!(listing.starts_with(" 1: l1\n"));
        assert!(listing.ends_with("10: l10"));
        assert_eq!(format_shader_source(""), "");
    }

    #[test]
    fn script_loading() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        s.add_script("vs", VERTEX_SCRIPT_TYPE, "\n  void main() {}\n");
        s.add_script("plain", "text/plain", "void main() {}");
        let options = ShaderOptions::default();
        assert!(s.load_shader_from_script(&gl, "vs", None, &options, None).unwrap().is_some());
        assert!(matches!(
            s.load_shader_from_script(&gl, "plain", None, &options, None),
            Err(HarnessError::UnknownShaderType)
        ));
        assert!(s
            .load_shader_from_script(&gl, "plain", Some(ShaderKind::Fragment), &options, None)
            .unwrap()
            .is_some());
        assert!(matches!(
            s.load_shader_from_script(&gl, "nope", None, &options, None),
            Err(HarnessError::UnknownScript(id)) if id == "nope"
        ));
    }

    #[test]
    fn setup_program_binds_links_and_uses() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = s
            .setup_program(
                &gl,
                &[ShaderRef::Text(SIMPLE_VERTEX_SHADER), ShaderRef::Text(SIMPLE_COLOR_FRAGMENT_SHADER)],
                &ProgramOptions::with_attribs(&["vPosition"]).at(&[3]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(gl.current_program(), Some(program));
        assert_eq!(gl.get_attrib_location(program, "vPosition"), Some(3));
        // Builder-owned shaders are released after linking.
        assert_eq!(gl.call_count("delete_shader"), 2);
    }

    #[test]
    fn setup_program_resolves_scripts_before_sources() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        s.add_script("fs", "text/unknown", SIMPLE_COLOR_FRAGMENT_SHADER);
        let program = s
            .setup_program(
                &gl,
                &[ShaderRef::Text(SIMPLE_VERTEX_SHADER), ShaderRef::Text("fs")],
                &ProgramOptions::default(),
            )
            .unwrap();
        assert!(program.is_some());
        let uniforms = get_uniform_map(&gl, program.unwrap());
        assert!(uniforms.contains_key("u_color"));
    }

    #[test]
    fn setup_program_reads_shader_files() {
        let dir = tempfile::tempdir().unwrap();
        let vs = dir.path().join("simple.vert");
        let fs_path = dir.path().join("simple.frag");
        fs::write(&vs, SIMPLE_VERTEX_SHADER.replace('\n', "\r\n")).unwrap();
        fs::write(&fs_path, SIMPLE_COLOR_FRAGMENT_SHADER).unwrap();

        let gl = SoftContext::new(1, 1);
        let mut s = session();
        // File order decides nothing: the suffix picks the stage.
        let program = s
            .setup_program(
                &gl,
                &[
                    ShaderRef::Text(fs_path.to_str().unwrap()),
                    ShaderRef::Text(vs.to_str().unwrap()),
                ],
                &ProgramOptions::default(),
            )
            .unwrap();
        assert!(program.is_some());
    }

    #[test]
    fn wrong_shader_count_reports_once() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = s
            .setup_program(
                &gl,
                &[ShaderRef::Text(SIMPLE_VERTEX_SHADER), ShaderRef::Text(BAD_SHADER)],
                &ProgramOptions::default(),
            )
            .unwrap();
        assert!(program.is_none());
        let debugs: Vec<_> = s.reporter().debugs().collect();
        assert_eq!(debugs.len(), 2);
        assert!(debugs[0].starts_with("*** Error compiling FRAGMENT_SHADER"));
        assert_eq!(debugs[1], "Error in compiling shader");
        assert_eq!(gl.call_count("delete_program"), 1);
    }

    #[test]
    fn link_failure_reports_once_and_deletes() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = s
            .setup_program(
                &gl,
                &[
                    ShaderRef::Text(SIMPLE_VERTEX_SHADER),
                    ShaderRef::Text("// LINK_ERROR\nvoid main() {}"),
                ],
                &ProgramOptions::default(),
            )
            .unwrap();
        assert!(program.is_none());
        assert_eq!(s.last_error(), "Link failed: varyings mismatch");
        assert_eq!(
            s.reporter().debugs().collect::<Vec<_>>(),
            ["Error in program linking:Link failed: varyings mismatch"]
        );
        assert!(s.reporter().failures().next().is_none());
        assert_eq!(gl.call_count("delete_program"), 1);
        assert_eq!(gl.call_count("use_program"), 0);
    }

    #[test]
    fn compiled_shaders_cannot_be_logged() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let vs = s
            .load_shader(&gl, SIMPLE_VERTEX_SHADER, ShaderKind::Vertex, &ShaderOptions::default(), None)
            .unwrap();
        let options = ProgramOptions {
            log_shaders: true,
            ..ProgramOptions::default()
        };
        let result = s.setup_program(
            &gl,
            &[ShaderRef::Compiled(vs), ShaderRef::Text(SIMPLE_COLOR_FRAGMENT_SHADER)],
            &options,
        );
        assert!(matches!(result, Err(HarnessError::LoggingWithoutSource)));
    }

    #[test]
    fn transform_feedback_varyings_are_declared() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = s
            .setup_transform_feedback_program(
                &gl,
                &[ShaderRef::Text(SIMPLE_VERTEX_SHADER), ShaderRef::Text(SIMPLE_COLOR_FRAGMENT_SHADER)],
                &["gl_Position"],
                enums::INTERLEAVED_ATTRIBS,
                &ProgramOptions::default(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(gl.varyings(program), ["gl_Position"]);
    }

    #[test]
    fn builtin_programs_link() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        assert!(s.setup_no_tex_coord_texture_program(&gl).is_some());
        assert!(s.setup_simple_texture_program(&gl, None, None, None).is_some());
        assert!(s.setup_simple_texture_program_essl300(&gl, None, None, None).is_some());
        assert!(s.setup_simple_cube_map_texture_program(&gl, None, None).is_some());
        assert!(s.setup_simple_color_program(&gl, Some(2)).is_some());
        let program = s.setup_simple_vertex_color_program(&gl, None, Some(5)).unwrap();
        let attribs = get_attrib_map(&gl, program);
        assert_eq!(attribs["vPosition"].location, Some(0));
        assert_eq!(attribs["a_color"].location, Some(5));
        assert_eq!(attribs["a_color"].kind, enums::FLOAT_VEC4);
    }

    #[test]
    fn link_program_defaults_to_failure_report() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = gl.create_program().unwrap();
        assert!(!s.link_program(&gl, program, None));
        assert_eq!(
            s.reporter().failures().collect::<Vec<_>>(),
            ["Error in program linking:Link failed: missing shader stage"]
        );
        assert!(!gl.is_alive(program));
    }

    #[test]
    fn load_program_deletes_shaders() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        let program = s.load_program(
            &gl,
            SIMPLE_VERTEX_SHADER,
            SIMPLE_COLOR_FRAGMENT_SHADER,
            &ShaderOptions::default(),
            None,
        );
        assert!(program.is_some());
        assert_eq!(gl.call_count("delete_shader"), 2);

        let mut errors = Vec::new();
        let program = s.load_program(
            &gl,
            BAD_SHADER,
            BAD_SHADER,
            &ShaderOptions::default(),
            Some(&mut |m: &str| errors.push(m.to_owned())),
        );
        assert!(program.is_none());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn expect_error_variant_is_silent() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        s.add_script("vs", VERTEX_SCRIPT_TYPE, SIMPLE_VERTEX_SHADER);
        s.add_script("bad-link", FRAGMENT_SCRIPT_TYPE, "// LINK_ERROR\nvoid main() {}");
        s.add_script("fs", FRAGMENT_SCRIPT_TYPE, SIMPLE_COLOR_FRAGMENT_SHADER);
        assert!(s
            .load_program_from_script_expect_error(&gl, "vs", "bad-link")
            .unwrap()
            .is_none());
        assert!(s.reporter().failures().next().is_none());
        assert!(s
            .load_program_from_script_expect_error(&gl, "vs", "fs")
            .unwrap()
            .is_some());
        assert!(s.load_program_from_script(&gl, "vs", "missing", None).is_err());
    }

    #[test]
    fn standard_programs_come_from_resources() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        s.config_mut().resource_base = concat!(env!("CARGO_MANIFEST_DIR"), "/resources").into();
        let program = s.load_standard_program(&gl).unwrap();
        let attribs = get_attrib_map(&gl, program);
        assert_eq!(attribs["a_vertex"].location, Some(0));
        assert_eq!(attribs["a_normal"].location, Some(1));
        assert!(s.load_uniform_block_program(&gl).is_some());
        let program = smol::block_on(s.load_standard_program_async(&gl));
        assert!(program.is_some());
    }

    #[test]
    fn missing_resource_reports_error() {
        let gl = SoftContext::new(1, 1);
        let mut s = session();
        s.config_mut().resource_base = "/nonexistent/resources".into();
        assert!(s.load_standard_program(&gl).is_none());
        assert_eq!(s.reporter().debugs().count(), 2);
    }

    #[test]
    fn params_are_replaced() {
        let first: &[(&str, &str)] = &[("name", "vPosition")];
        let second: &[(&str, &str)] = &[("name", "ignored"), ("type", "vec4")];
        let out = replace_params("attribute $(type) $(name); $x $() $(", &[first, second]).unwrap();
        assert_eq!(out, "attribute vec4 vPosition; $x $() $(");
        assert!(matches!(
            replace_params("$(missing)", &[first]),
            Err(HarnessError::UnknownParam(name)) if name == "missing"
        ));
    }
}
