//! Error types for the harness.
//!
//! Compile and link failures are not errors here: the program builders
//! report them as diagnostics and return `None`. Errors are reserved for
//! misuse (unknown enums, formats, or names), I/O, and GL errors raised by
//! [`ErrorCheckedContext`](crate::ErrorCheckedContext).

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An enum value to stringify was missing.
    #[error("glEnumToString: `value` must not be undefined")]
    UndefinedEnum,

    /// A GL type has no typed-array or byte-size mapping.
    #[error("unknown gl type {0}")]
    UnknownType(String),

    /// A GL type cannot carry color information.
    #[error("not a gl type for color information {0}")]
    NotColorType(String),

    /// A GL pixel format is not one the helpers understand.
    #[error("unknown gl format {0}")]
    UnknownFormat(String),

    /// A named color outside the built-in table.
    #[error("unexpected color name: {0}")]
    UnknownColorName(String),

    /// A color space outside the built-in table.
    #[error("unexpected color space: {0}")]
    UnknownColorSpace(String),

    /// No script was registered under the given id.
    #[error("*** Error: unknown script element {0}")]
    UnknownScript(String),

    /// A script's type attribute names neither a vertex nor a fragment shader.
    #[error("*** Error: unknown shader type")]
    UnknownShaderType,

    /// Shader logging was requested for an already-compiled shader.
    #[error("Shader source logging requested but no shader source provided")]
    LoggingWithoutSource,

    /// A helper needed the current program but none was in use.
    #[error("no current program")]
    NoCurrentProgram,

    /// A `$(name)` template parameter had no replacement.
    #[error("unknown string param '{0}'")]
    UnknownParam(String),

    /// A resource file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An image resource could not be decoded.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An awaited operation did not finish in time.
    #[error("timeout")]
    Timeout,

    /// A GL call left an error in the context's error state.
    #[error(transparent)]
    Gl(#[from] GlCallError),
}

/// A GL error observed after a wrapped call.
///
/// Raised by [`ErrorCheckedContext`](crate::ErrorCheckedContext), either as a
/// panic payload or as the error side of
/// [`call`](crate::ErrorCheckedContext::call).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GlCallError {
    /// `GL error <NAME> in <function>`.
    pub message: String,
    /// The raw error code returned by `get_error`.
    pub code: u32,
}
