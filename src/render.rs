//! Draw helpers for the reference geometry.
//!
//! These issue draws against whatever program and buffers are current. They
//! pair with [`geometry`](crate::geometry): a unit quad is six vertices of
//! `TRIANGLES`, an indexed grid of resolution `n` is `6n²` unsigned-short
//! indices.

use crate::{
    color::{ubyte_color_to_float_color, Rgba8},
    context::GlContext,
    enums,
    error::HarnessError,
    report::Reporter,
    session::Session,
    shaders::{ProgramOptions, ShaderRef},
};

/// Clear color used when a caller gives none.
pub const DEFAULT_CLEAR_COLOR: Rgba8 = [255, 255, 255, 255];

const DUMMY_VERTEX_SHADER: &str = "void main() { gl_Position = vec4(0.0); }";
const DUMMY_FRAGMENT_SHADER: &str = "void main() { gl_FragColor = vec4(0.0); }";

/// Set `u_color` on the current program.
///
/// # Errors
///
/// Returns [`HarnessError::NoCurrentProgram`] if no program is in use.
pub fn set_float_draw_color<C: GlContext>(gl: &C, color: [f32; 4]) -> Result<(), HarnessError> {
    let program = gl.current_program().ok_or(HarnessError::NoCurrentProgram)?;
    let location = gl.get_uniform_location(program, "u_color");
    gl.uniform_4_f32(location.as_ref(), color);
    Ok(())
}

/// [`set_float_draw_color`] with 0-255 components.
///
/// # Errors
///
/// As [`set_float_draw_color`].
pub fn set_ubyte_draw_color<C: GlContext>(gl: &C, color: Rgba8) -> Result<(), HarnessError> {
    set_float_draw_color(gl, ubyte_color_to_float_color(color))
}

/// Draw the current quad in `color`. Nothing is drawn without a program.
///
/// # Errors
///
/// As [`set_float_draw_color`].
pub fn draw_float_color_quad<C: GlContext>(gl: &C, color: [f32; 4]) -> Result<(), HarnessError> {
    set_float_draw_color(gl, color)?;
    draw_unit_quad(gl);
    Ok(())
}

/// [`draw_float_color_quad`] with 0-255 components.
///
/// # Errors
///
/// As [`set_float_draw_color`].
pub fn draw_ubyte_color_quad<C: GlContext>(gl: &C, color: Rgba8) -> Result<(), HarnessError> {
    draw_float_color_quad(gl, ubyte_color_to_float_color(color))
}

/// Draw the six vertices of a unit quad.
pub fn draw_unit_quad<C: GlContext>(gl: &C) {
    gl.draw_arrays(enums::TRIANGLES, 0, 6);
}

fn clear_to<C: GlContext>(gl: &C, color: Option<Rgba8>) {
    let [r, g, b, a] = ubyte_color_to_float_color(color.unwrap_or(DEFAULT_CLEAR_COLOR));
    gl.clear_color(r, g, b, a);
    gl.clear(enums::COLOR_BUFFER_BIT | enums::DEPTH_BUFFER_BIT);
}

/// Clear color and depth to `color` (white by default), then draw a unit
/// quad.
pub fn clear_and_draw_unit_quad<C: GlContext>(gl: &C, color: Option<Rgba8>) {
    clear_to(gl, color);
    draw_unit_quad(gl);
}

/// Draw an indexed grid of `grid_res`² quads.
pub fn draw_indexed_quad<C: GlContext>(gl: &C, grid_res: u32) {
    let count = grid_res
        .checked_mul(grid_res)
        .and_then(|n| n.checked_mul(6))
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(i32::MAX);
    gl.draw_elements(enums::TRIANGLES, count, enums::UNSIGNED_SHORT, 0);
}

/// Clear like [`clear_and_draw_unit_quad`], then draw an indexed grid.
pub fn clear_and_draw_indexed_quad<C: GlContext>(gl: &C, grid_res: u32, color: Option<Rgba8>) {
    clear_to(gl, color);
    draw_indexed_quad(gl, grid_res);
}

impl<R: Reporter> Session<R> {
    /// Use a trivial program and draw three vertices, producing no
    /// fragments.
    ///
    /// The program is built on first use and kept in `slot`, which should
    /// live as long as the context.
    pub fn dummy_set_program_and_draw_nothing<C: GlContext>(&mut self, gl: &C, slot: &mut Option<C::Program>) {
        if slot.is_none() {
            *slot = self.setup_program(
                gl,
                &[ShaderRef::Text(DUMMY_VERTEX_SHADER), ShaderRef::Text(DUMMY_FRAGMENT_SHADER)],
                &ProgramOptions::default(),
            )
            .ok()
            .flatten();
        }
        gl.use_program(*slot);
        gl.draw_arrays(enums::TRIANGLES, 0, 3);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{report::RecordingReporter, testing::SoftContext};

    fn color_program(gl: &SoftContext) {
        let mut s = Session::with_reporter(RecordingReporter::new());
        s.setup_color_quad(gl, None).unwrap();
    }

    #[test]
    fn float_color_quad_fills_surface() {
        let gl = SoftContext::new(2, 2);
        color_program(&gl);
        draw_float_color_quad(&gl, [1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(gl.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(gl.call_count("draw_arrays(4, 0, 6)"), 1);
    }

    #[test]
    fn ubyte_color_quad_matches_bytes() {
        let gl = SoftContext::new(2, 2);
        color_program(&gl);
        draw_ubyte_color_quad(&gl, [0, 128, 255, 64]).unwrap();
        assert_eq!(gl.pixel(0, 0), [0, 128, 255, 64]);
    }

    #[test]
    fn draw_color_without_program_is_an_error() {
        let gl = SoftContext::new(1, 1);
        assert!(matches!(
            set_ubyte_draw_color(&gl, [1, 2, 3, 4]),
            Err(HarnessError::NoCurrentProgram)
        ));
        assert!(matches!(
            draw_float_color_quad(&gl, [1.0, 0.0, 0.0, 1.0]),
            Err(HarnessError::NoCurrentProgram)
        ));
        assert_eq!(gl.call_count("uniform_4_f32"), 0);
        assert_eq!(gl.call_count("draw_arrays(4, 0, 6)"), 0);
    }

    #[test]
    fn clear_defaults_to_white() {
        let gl = SoftContext::new(2, 1);
        clear_and_draw_unit_quad(&gl, None);
        assert_eq!(gl.pixel(1, 0), [255, 255, 255, 255]);
        // Nothing was current, so the draw itself failed.
        assert_eq!(gl.get_error(), enums::INVALID_OPERATION);

        clear_and_draw_unit_quad(&gl, Some([0, 0, 255, 255]));
        assert_eq!(gl.pixel(0, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn indexed_quad_count() {
        let gl = SoftContext::new(1, 1);
        crate::geometry::setup_indexed_quad(&gl, 4, None, false);
        clear_and_draw_indexed_quad(&gl, 4, Some([0, 0, 0, 255]));
        assert_eq!(gl.call_count("draw_elements(4, 96, 5123, 0)"), 1);
    }

    #[test]
    fn dummy_program_is_built_once() {
        let gl = SoftContext::new(1, 1);
        let mut s = Session::with_reporter(RecordingReporter::new());
        let mut slot = None;
        s.dummy_set_program_and_draw_nothing(&gl, &mut slot);
        let first = slot.unwrap();
        s.dummy_set_program_and_draw_nothing(&gl, &mut slot);
        assert_eq!(slot, Some(first));
        assert_eq!(gl.call_count("link_program"), 1);
        assert_eq!(gl.call_count("draw_arrays(4, 0, 3)"), 2);
        assert_eq!(gl.get_error(), enums::NO_ERROR);
    }
}
