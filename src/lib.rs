//! Support library for OpenGL / WebGL conformance tests, driving a context
//! through [glow]-style calls.
//!
//! The helpers build shader programs, upload reference geometry, draw it,
//! and read the framebuffer back to compare against expected colors. The
//! context is abstracted by [`GlContext`]; [`GlowContext`] implements it over
//! a real `glow` context. Results go to a [`Reporter`] owned by a
//! [`Session`], which also holds the caches and diagnostics a test run
//! accumulates.
//!
//! # Features
//!
//! - **Programs** from built-in sources, files, or registered scripts, with
//!   compile and link diagnostics reported rather than raised.
//! - **Geometry**: unit quads with optional texture coordinates, and indexed
//!   grids of any resolution.
//! - **Verification** of framebuffer rects, batched rects, float buffers,
//!   and whole images, each within a per-channel tolerance.
//! - **Strict mode**: [`ErrorCheckedContext`] raises on the first call that
//!   leaves a GL error.
//! - **Async loading** of text, file lists, and images on [smol].
//!
//! # Example
//!
//! ```no_run
//! # use gl_conformance_utils::{GlContext, Session, verify::Rect};
//! # fn example<C: GlContext>(gl: &C) {
//! let mut session = Session::new();
//! session.setup_color_quad(gl, None).unwrap();
//! gl_conformance_utils::render::draw_ubyte_color_quad(gl, [0, 255, 0, 255]).unwrap();
//! session.check_canvas_rect(gl, Rect::new(0, 0, 16, 16), [0, 255, 0, 255], None, 0);
//! # }
//! ```
//!
//! [glow]: https://docs.rs/glow
//! [smol]: https://docs.rs/smol

pub mod color;
pub mod config;
mod context;
pub mod enums;
mod error;
pub mod expect;
pub mod extensions;
pub mod format;
pub mod geometry;
mod glow_context;
pub mod loader;
pub mod render;
mod report;
mod session;
pub mod shaders;
mod strict;
#[cfg(test)]
mod testing;
pub mod texture;
pub mod types;
pub mod verify;

pub use config::{ContextAttributes, HarnessConfig};
pub use context::{destroy_context, ActiveInfo, GlContext};
pub use enums::EnumSource;
pub use error::{GlCallError, HarnessError};
pub use glow_context::GlowContext;
pub use report::{LogReporter, Outcome, RecordingReporter, Reporter};
pub use session::{Script, Session, FRAGMENT_SCRIPT_TYPE, VERTEX_SCRIPT_TYPE};
pub use strict::{catch_gl_error, ErrorCheckedContext};
