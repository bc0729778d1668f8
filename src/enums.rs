//! GL enum constants and value-to-name resolution.
//!
//! The constant table below mirrors the enumerable constant properties of a
//! WebGL 2 context, in declaration order. Values come from [`glow`]; the few
//! names desktop core GL does not define (WebGL pixel-store flags, ES-only
//! framebuffer statuses, legacy luminance formats) carry their registry
//! value inline. [`EnumNames`] turns numeric enum values back into names for
//! diagnostics, joining aliases with `/`.

use std::collections::{HashMap, HashSet};

use crate::error::HarnessError;

macro_rules! gl_value {
    ($name:ident) => {
        glow::$name
    };
    ($name:ident $value:expr) => {
        $value
    };
}

/// Declares each constant as a `pub const` and collects all of them, in
/// order, into [`WEBGL2_CONSTANTS`]. A bare name takes glow's value.
macro_rules! gl_constants {
    ($($name:ident $(= $value:expr)?),* $(,)?) => {
        $(
            #[doc = concat!("`GL_", stringify!($name), "`")]
            pub const $name: u32 = gl_value!($name $($value)?);
        )*

        /// Every WebGL 2 constant as a `(name, value)` pair, in the order a
        /// context prototype enumerates them.
        pub const WEBGL2_CONSTANTS: &[(&str, u32)] = &[$((stringify!($name), $name)),*];
    };
}

gl_constants! {
    DEPTH_BUFFER_BIT,
    STENCIL_BUFFER_BIT,
    COLOR_BUFFER_BIT,
    POINTS,
    LINES,
    LINE_LOOP,
    LINE_STRIP,
    TRIANGLES,
    TRIANGLE_STRIP,
    TRIANGLE_FAN,
    ZERO,
    ONE,
    SRC_COLOR,
    ONE_MINUS_SRC_COLOR,
    SRC_ALPHA,
    ONE_MINUS_SRC_ALPHA,
    DST_ALPHA,
    ONE_MINUS_DST_ALPHA,
    DST_COLOR,
    ONE_MINUS_DST_COLOR,
    SRC_ALPHA_SATURATE,
    FUNC_ADD,
    BLEND_EQUATION = 0x8009,
    BLEND_EQUATION_RGB,
    BLEND_EQUATION_ALPHA,
    FUNC_SUBTRACT,
    FUNC_REVERSE_SUBTRACT,
    BLEND_DST_RGB,
    BLEND_SRC_RGB,
    BLEND_DST_ALPHA,
    BLEND_SRC_ALPHA,
    CONSTANT_COLOR,
    ONE_MINUS_CONSTANT_COLOR,
    CONSTANT_ALPHA,
    ONE_MINUS_CONSTANT_ALPHA,
    BLEND_COLOR,
    ARRAY_BUFFER,
    ELEMENT_ARRAY_BUFFER,
    ARRAY_BUFFER_BINDING,
    ELEMENT_ARRAY_BUFFER_BINDING,
    STREAM_DRAW,
    STATIC_DRAW,
    DYNAMIC_DRAW,
    BUFFER_SIZE,
    BUFFER_USAGE,
    CURRENT_VERTEX_ATTRIB,
    FRONT,
    BACK,
    FRONT_AND_BACK,
    CULL_FACE,
    BLEND,
    DITHER,
    STENCIL_TEST,
    DEPTH_TEST,
    SCISSOR_TEST,
    POLYGON_OFFSET_FILL,
    SAMPLE_ALPHA_TO_COVERAGE,
    SAMPLE_COVERAGE,
    NO_ERROR,
    INVALID_ENUM,
    INVALID_VALUE,
    INVALID_OPERATION,
    OUT_OF_MEMORY,
    CW,
    CCW,
    LINE_WIDTH,
    ALIASED_POINT_SIZE_RANGE = 0x846D,
    ALIASED_LINE_WIDTH_RANGE,
    CULL_FACE_MODE,
    FRONT_FACE,
    DEPTH_RANGE,
    DEPTH_WRITEMASK,
    DEPTH_CLEAR_VALUE,
    DEPTH_FUNC,
    STENCIL_CLEAR_VALUE,
    STENCIL_FUNC,
    STENCIL_FAIL,
    STENCIL_PASS_DEPTH_FAIL,
    STENCIL_PASS_DEPTH_PASS,
    STENCIL_REF,
    STENCIL_VALUE_MASK,
    STENCIL_WRITEMASK,
    VIEWPORT,
    SCISSOR_BOX,
    COLOR_CLEAR_VALUE,
    COLOR_WRITEMASK,
    UNPACK_ALIGNMENT,
    PACK_ALIGNMENT,
    MAX_TEXTURE_SIZE,
    MAX_VIEWPORT_DIMS,
    SUBPIXEL_BITS,
    RED_BITS = 0x0D52,
    GREEN_BITS = 0x0D53,
    BLUE_BITS = 0x0D54,
    ALPHA_BITS = 0x0D55,
    DEPTH_BITS = 0x0D56,
    STENCIL_BITS = 0x0D57,
    POLYGON_OFFSET_UNITS,
    POLYGON_OFFSET_FACTOR,
    TEXTURE_BINDING_2D,
    SAMPLE_BUFFERS,
    SAMPLES,
    DONT_CARE,
    FASTEST,
    NICEST,
    GENERATE_MIPMAP_HINT = 0x8192,
    BYTE,
    UNSIGNED_BYTE,
    SHORT,
    UNSIGNED_SHORT,
    INT,
    UNSIGNED_INT,
    FLOAT,
    DEPTH_COMPONENT,
    ALPHA = 0x1906,
    RGB,
    RGBA,
    LUMINANCE = 0x1909,
    LUMINANCE_ALPHA = 0x190A,
    UNSIGNED_SHORT_4_4_4_4,
    UNSIGNED_SHORT_5_5_5_1,
    UNSIGNED_SHORT_5_6_5,
    FRAGMENT_SHADER,
    VERTEX_SHADER,
    MAX_VERTEX_ATTRIBS,
    MAX_VERTEX_UNIFORM_VECTORS,
    MAX_VARYING_VECTORS,
    MAX_COMBINED_TEXTURE_IMAGE_UNITS,
    MAX_VERTEX_TEXTURE_IMAGE_UNITS,
    MAX_TEXTURE_IMAGE_UNITS,
    MAX_FRAGMENT_UNIFORM_VECTORS,
    SHADER_TYPE,
    DELETE_STATUS,
    LINK_STATUS,
    VALIDATE_STATUS,
    ATTACHED_SHADERS,
    ACTIVE_UNIFORMS,
    ACTIVE_ATTRIBUTES,
    SHADING_LANGUAGE_VERSION,
    CURRENT_PROGRAM,
    NEVER,
    LESS,
    EQUAL,
    LEQUAL,
    GREATER,
    NOTEQUAL,
    GEQUAL,
    ALWAYS,
    KEEP,
    REPLACE,
    INCR,
    DECR,
    INVERT,
    INCR_WRAP,
    DECR_WRAP,
    VENDOR,
    RENDERER,
    VERSION,
    NEAREST,
    LINEAR,
    NEAREST_MIPMAP_NEAREST,
    LINEAR_MIPMAP_NEAREST,
    NEAREST_MIPMAP_LINEAR,
    LINEAR_MIPMAP_LINEAR,
    TEXTURE_MAG_FILTER,
    TEXTURE_MIN_FILTER,
    TEXTURE_WRAP_S,
    TEXTURE_WRAP_T,
    TEXTURE_2D,
    TEXTURE,
    TEXTURE_CUBE_MAP,
    TEXTURE_BINDING_CUBE_MAP,
    TEXTURE_CUBE_MAP_POSITIVE_X,
    TEXTURE_CUBE_MAP_NEGATIVE_X,
    TEXTURE_CUBE_MAP_POSITIVE_Y,
    TEXTURE_CUBE_MAP_NEGATIVE_Y,
    TEXTURE_CUBE_MAP_POSITIVE_Z,
    TEXTURE_CUBE_MAP_NEGATIVE_Z,
    MAX_CUBE_MAP_TEXTURE_SIZE,
    TEXTURE0,
    TEXTURE1,
    TEXTURE2,
    TEXTURE3,
    ACTIVE_TEXTURE,
    REPEAT,
    CLAMP_TO_EDGE,
    MIRRORED_REPEAT,
    FLOAT_VEC2,
    FLOAT_VEC3,
    FLOAT_VEC4,
    INT_VEC2,
    INT_VEC3,
    INT_VEC4,
    BOOL,
    BOOL_VEC2,
    BOOL_VEC3,
    BOOL_VEC4,
    FLOAT_MAT2,
    FLOAT_MAT3,
    FLOAT_MAT4,
    SAMPLER_2D,
    SAMPLER_CUBE,
    VERTEX_ATTRIB_ARRAY_ENABLED,
    VERTEX_ATTRIB_ARRAY_SIZE,
    VERTEX_ATTRIB_ARRAY_STRIDE,
    VERTEX_ATTRIB_ARRAY_TYPE,
    VERTEX_ATTRIB_ARRAY_NORMALIZED,
    VERTEX_ATTRIB_ARRAY_POINTER,
    VERTEX_ATTRIB_ARRAY_BUFFER_BINDING,
    IMPLEMENTATION_COLOR_READ_TYPE,
    IMPLEMENTATION_COLOR_READ_FORMAT,
    COMPILE_STATUS,
    LOW_FLOAT,
    MEDIUM_FLOAT,
    HIGH_FLOAT,
    LOW_INT,
    MEDIUM_INT,
    HIGH_INT,
    FRAMEBUFFER,
    RENDERBUFFER,
    RGBA4,
    RGB5_A1,
    RGB565,
    DEPTH_COMPONENT16,
    STENCIL_INDEX8,
    DEPTH_STENCIL,
    RENDERBUFFER_WIDTH,
    RENDERBUFFER_HEIGHT,
    RENDERBUFFER_INTERNAL_FORMAT,
    FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE,
    FRAMEBUFFER_ATTACHMENT_OBJECT_NAME,
    COLOR_ATTACHMENT0,
    DEPTH_ATTACHMENT,
    STENCIL_ATTACHMENT,
    DEPTH_STENCIL_ATTACHMENT,
    NONE,
    FRAMEBUFFER_COMPLETE,
    FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
    FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
    FRAMEBUFFER_INCOMPLETE_DIMENSIONS = 0x8CD9,
    FRAMEBUFFER_UNSUPPORTED,
    FRAMEBUFFER_BINDING,
    RENDERBUFFER_BINDING,
    MAX_RENDERBUFFER_SIZE,
    INVALID_FRAMEBUFFER_OPERATION,
    UNPACK_FLIP_Y_WEBGL = 0x9240,
    UNPACK_PREMULTIPLY_ALPHA_WEBGL = 0x9241,
    CONTEXT_LOST_WEBGL = 0x9242,
    UNPACK_COLORSPACE_CONVERSION_WEBGL = 0x9243,
    BROWSER_DEFAULT_WEBGL = 0x9244,
    READ_BUFFER,
    UNPACK_ROW_LENGTH,
    UNPACK_SKIP_ROWS,
    UNPACK_SKIP_PIXELS,
    PACK_ROW_LENGTH,
    PACK_SKIP_ROWS,
    PACK_SKIP_PIXELS,
    COLOR,
    DEPTH,
    STENCIL,
    RED,
    RGB8,
    RGBA8,
    RGB10_A2,
    TEXTURE_BINDING_3D,
    UNPACK_SKIP_IMAGES,
    UNPACK_IMAGE_HEIGHT,
    TEXTURE_3D,
    TEXTURE_WRAP_R,
    MAX_3D_TEXTURE_SIZE,
    UNSIGNED_INT_2_10_10_10_REV,
    MAX_ELEMENTS_VERTICES = 0x80E8,
    MAX_ELEMENTS_INDICES = 0x80E9,
    MIN,
    MAX,
    DEPTH_COMPONENT24,
    MAX_TEXTURE_LOD_BIAS,
    TEXTURE_COMPARE_MODE,
    TEXTURE_COMPARE_FUNC,
    CURRENT_QUERY,
    QUERY_RESULT,
    QUERY_RESULT_AVAILABLE,
    STREAM_READ,
    STREAM_COPY,
    STATIC_READ,
    STATIC_COPY,
    DYNAMIC_READ,
    DYNAMIC_COPY,
    MAX_DRAW_BUFFERS,
    DRAW_BUFFER0,
    MAX_FRAGMENT_UNIFORM_COMPONENTS,
    MAX_VERTEX_UNIFORM_COMPONENTS,
    SAMPLER_3D,
    SAMPLER_2D_SHADOW,
    FRAGMENT_SHADER_DERIVATIVE_HINT,
    PIXEL_PACK_BUFFER,
    PIXEL_UNPACK_BUFFER,
    PIXEL_PACK_BUFFER_BINDING,
    PIXEL_UNPACK_BUFFER_BINDING,
    FLOAT_MAT2X3 = glow::FLOAT_MAT2x3,
    FLOAT_MAT2X4 = glow::FLOAT_MAT2x4,
    FLOAT_MAT3X2 = glow::FLOAT_MAT3x2,
    FLOAT_MAT3X4 = glow::FLOAT_MAT3x4,
    FLOAT_MAT4X2 = glow::FLOAT_MAT4x2,
    FLOAT_MAT4X3 = glow::FLOAT_MAT4x3,
    SRGB,
    SRGB8,
    SRGB8_ALPHA8,
    COMPARE_REF_TO_TEXTURE,
    RGBA32F,
    RGB32F,
    RGBA16F,
    RGB16F,
    VERTEX_ATTRIB_ARRAY_INTEGER,
    MAX_ARRAY_TEXTURE_LAYERS,
    MIN_PROGRAM_TEXEL_OFFSET,
    MAX_PROGRAM_TEXEL_OFFSET,
    MAX_VARYING_COMPONENTS = 0x8B4B,
    TEXTURE_2D_ARRAY,
    TEXTURE_BINDING_2D_ARRAY,
    R11F_G11F_B10F,
    UNSIGNED_INT_10F_11F_11F_REV,
    RGB9_E5,
    UNSIGNED_INT_5_9_9_9_REV,
    TRANSFORM_FEEDBACK_BUFFER_MODE,
    MAX_TRANSFORM_FEEDBACK_SEPARATE_COMPONENTS,
    TRANSFORM_FEEDBACK_VARYINGS,
    TRANSFORM_FEEDBACK_BUFFER_START,
    TRANSFORM_FEEDBACK_BUFFER_SIZE,
    TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN,
    RASTERIZER_DISCARD,
    MAX_TRANSFORM_FEEDBACK_INTERLEAVED_COMPONENTS,
    MAX_TRANSFORM_FEEDBACK_SEPARATE_ATTRIBS,
    INTERLEAVED_ATTRIBS,
    SEPARATE_ATTRIBS,
    TRANSFORM_FEEDBACK_BUFFER,
    TRANSFORM_FEEDBACK_BUFFER_BINDING,
    RGBA32UI,
    RGB32UI,
    RGBA16UI,
    RGB16UI,
    RGBA8UI,
    RGB8UI,
    RGBA32I,
    RGB32I,
    RGBA16I,
    RGB16I,
    RGBA8I,
    RGB8I,
    RED_INTEGER,
    RGB_INTEGER,
    RGBA_INTEGER,
    SAMPLER_2D_ARRAY,
    SAMPLER_2D_ARRAY_SHADOW,
    SAMPLER_CUBE_SHADOW,
    UNSIGNED_INT_VEC2,
    UNSIGNED_INT_VEC3,
    UNSIGNED_INT_VEC4,
    INT_SAMPLER_2D,
    INT_SAMPLER_3D,
    INT_SAMPLER_CUBE,
    INT_SAMPLER_2D_ARRAY,
    UNSIGNED_INT_SAMPLER_2D,
    UNSIGNED_INT_SAMPLER_3D,
    UNSIGNED_INT_SAMPLER_CUBE,
    UNSIGNED_INT_SAMPLER_2D_ARRAY,
    DEPTH_COMPONENT32F,
    DEPTH32F_STENCIL8,
    FLOAT_32_UNSIGNED_INT_24_8_REV,
    FRAMEBUFFER_ATTACHMENT_COLOR_ENCODING,
    FRAMEBUFFER_ATTACHMENT_COMPONENT_TYPE,
    FRAMEBUFFER_DEFAULT,
    UNSIGNED_INT_24_8,
    DEPTH24_STENCIL8,
    UNSIGNED_NORMALIZED,
    DRAW_FRAMEBUFFER_BINDING,
    READ_FRAMEBUFFER,
    DRAW_FRAMEBUFFER,
    READ_FRAMEBUFFER_BINDING,
    RENDERBUFFER_SAMPLES,
    MAX_COLOR_ATTACHMENTS,
    COLOR_ATTACHMENT1,
    FRAMEBUFFER_INCOMPLETE_MULTISAMPLE,
    MAX_SAMPLES,
    HALF_FLOAT,
    RG,
    RG_INTEGER,
    R8,
    RG8,
    R16F,
    R32F,
    RG16F,
    RG32F,
    R8I,
    R8UI,
    R16I,
    R16UI,
    R32I,
    R32UI,
    RG8I,
    RG8UI,
    RG16I,
    RG16UI,
    RG32I,
    RG32UI,
    VERTEX_ARRAY_BINDING,
    R8_SNORM,
    RG8_SNORM,
    RGB8_SNORM,
    RGBA8_SNORM,
    SIGNED_NORMALIZED,
    COPY_READ_BUFFER,
    COPY_WRITE_BUFFER,
    UNIFORM_BUFFER,
    UNIFORM_BUFFER_BINDING,
    MAX_UNIFORM_BUFFER_BINDINGS,
    MAX_UNIFORM_BLOCK_SIZE,
    ACTIVE_UNIFORM_BLOCKS,
    INVALID_INDEX,
    MAX_VERTEX_OUTPUT_COMPONENTS,
    MAX_FRAGMENT_INPUT_COMPONENTS,
    MAX_SERVER_WAIT_TIMEOUT,
    OBJECT_TYPE,
    SYNC_CONDITION,
    SYNC_STATUS,
    SYNC_FLAGS,
    SYNC_FENCE,
    SYNC_GPU_COMMANDS_COMPLETE,
    UNSIGNALED,
    SIGNALED,
    ALREADY_SIGNALED,
    TIMEOUT_EXPIRED,
    CONDITION_SATISFIED,
    WAIT_FAILED,
    SYNC_FLUSH_COMMANDS_BIT,
    VERTEX_ATTRIB_ARRAY_DIVISOR,
    ANY_SAMPLES_PASSED,
    ANY_SAMPLES_PASSED_CONSERVATIVE,
    SAMPLER_BINDING,
    RGB10_A2UI,
    INT_2_10_10_10_REV,
    TRANSFORM_FEEDBACK,
    TRANSFORM_FEEDBACK_PAUSED = 0x8E23,
    TRANSFORM_FEEDBACK_ACTIVE = 0x8E24,
    TRANSFORM_FEEDBACK_BINDING,
    TEXTURE_IMMUTABLE_FORMAT,
    MAX_ELEMENT_INDEX,
    TEXTURE_IMMUTABLE_LEVELS,
}

/// `HALF_FLOAT_OES` from `OES_texture_half_float`; not a core constant.
pub const HALF_FLOAT_OES: u32 = 0x8D61;

/// `UNMASKED_RENDERER_WEBGL` from `WEBGL_debug_renderer_info`.
pub const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

/// A source of enumerable `(NAME, value)` constants, such as a context or an
/// extension object.
///
/// The returned table must be `'static`: [`EnumNames`] identifies a source by
/// the address of its table and scans each distinct table only once.
pub trait EnumSource {
    /// Constants exposed by this source, in enumeration order.
    fn enum_constants(&self) -> &'static [(&'static str, u32)];
}

/// Returns `true` if `name` looks like a GL constant: an uppercase letter
/// followed by uppercase letters, digits, or underscores.
fn is_constant_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Formats a value as lowercase hex with a `0x` prefix.
fn hex_name(value: u32) -> String {
    format!("0x{value:x}")
}

/// Cache of enum value names built from every [`EnumSource`] seen so far.
///
/// Sources share one value→name map, so a name learned from an extension
/// also resolves for the base context.
#[derive(Debug, Default)]
pub struct EnumNames {
    /// Addresses of tables already merged into `names`.
    scanned: HashSet<usize>,
    names: HashMap<u32, String>,
}

impl EnumNames {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn scan(&mut self, table: &'static [(&'static str, u32)]) {
        if !self.scanned.insert(table.as_ptr() as usize) {
            return;
        }
        for &(name, value) in table {
            if !is_constant_name(name) {
                continue;
            }
            match self.names.get_mut(&value) {
                Some(existing) if existing.split('/').any(|n| n == name) => {}
                Some(existing) => {
                    existing.push('/');
                    existing.push_str(name);
                }
                None => {
                    self.names.insert(value, name.to_owned());
                }
            }
        }
        log::trace!("scanned {} enum constants", table.len());
    }

    /// Name of `value` as known to `source`, with aliases joined by `/`.
    ///
    /// Falls back to `0x<hex>` when no constant has this value.
    pub fn name<S: EnumSource + ?Sized>(&mut self, source: &S, value: u32) -> String {
        self.scan(source.enum_constants());
        self.names
            .get(&value)
            .cloned()
            .unwrap_or_else(|| hex_name(value))
    }

    /// Like [`name`](Self::name) for a value that may be missing.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UndefinedEnum`] if `value` is `None`.
    pub fn try_name<S: EnumSource + ?Sized>(
        &mut self,
        source: &S,
        value: Option<u32>,
    ) -> Result<String, HarnessError> {
        let value = value.ok_or(HarnessError::UndefinedEnum)?;
        Ok(self.name(source, value))
    }
}

/// Resolve `value` against [`WEBGL2_CONSTANTS`] without a cache.
///
/// Used in error messages raised outside a session.
#[must_use]
pub fn describe(value: u32) -> String {
    describe_in(WEBGL2_CONSTANTS, value)
}

/// Resolve `value` against one constant table, aliases joined by `/`.
///
/// Zero is always `NO_ERROR`.
#[must_use]
pub fn describe_in(table: &[(&str, u32)], value: u32) -> String {
    if value == NO_ERROR {
        return "NO_ERROR".to_owned();
    }
    let joined = table
        .iter()
        .filter(|&&(name, v)| v == value && is_constant_name(name))
        .map(|&(name, _)| name)
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        hex_name(value)
    } else {
        joined
    }
}
