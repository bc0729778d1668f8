//! Pixel and buffer verification.
//!
//! Single-rect checks stop at the first mismatching pixel and report one
//! outcome per rect. [`compare_pixels`](Session::compare_pixels) is the
//! exception: it counts every differing pixel.
//!
//! Coordinates follow GL: `y` is the bottom row of a rect.

use std::{fmt::Display, path::Path};

use bytemuck::Pod;
use image::{
    error::{ParameterError, ParameterErrorKind},
    ImageError, RgbaImage,
};

use crate::{
    color::Rgba8,
    context::{gl_size, to_len, GlContext},
    enums,
    error::HarnessError,
    report::Reporter,
    session::Session,
};

/// Element type of a readback buffer.
pub trait Channel: Pod + Default + Display {
    /// The GL type `read_pixels` is asked for.
    const GL_TYPE: u32;

    /// The value as a float for tolerance arithmetic.
    fn to_f64(self) -> f64;
}

impl Channel for u8 {
    const GL_TYPE: u32 = enums::UNSIGNED_BYTE;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Channel for u16 {
    const GL_TYPE: u32 = enums::UNSIGNED_SHORT;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Channel for f32 {
    const GL_TYPE: u32 = enums::FLOAT;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

/// Per-channel absolute tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tolerance(pub [f64; 4]);

impl Tolerance {
    /// No difference allowed.
    pub const EXACT: Self = Self([0.0; 4]);

    /// The same limit for every channel.
    #[must_use]
    pub fn splat(value: f64) -> Self {
        Self([value; 4])
    }
}

impl From<u8> for Tolerance {
    fn from(value: u8) -> Self {
        Self::splat(f64::from(value))
    }
}

impl From<f64> for Tolerance {
    fn from(value: f64) -> Self {
        Self::splat(value)
    }
}

impl From<[f64; 4]> for Tolerance {
    fn from(value: [f64; 4]) -> Self {
        Self(value)
    }
}

/// A reusable readback buffer.
#[derive(Debug, Clone)]
pub struct Readback<T> {
    format: u32,
    data: Vec<T>,
}

impl<T: Channel> Default for Readback<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Channel> Readback<T> {
    /// An empty `RGBA` buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_format(enums::RGBA)
    }

    /// An empty buffer read back with `format`.
    #[must_use]
    pub fn with_format(format: u32) -> Self {
        Self {
            format,
            data: Vec::new(),
        }
    }

    /// Values from the most recent readback.
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    fn components(&self) -> usize {
        match self.format {
            enums::RGB | enums::RGB_INTEGER => 3,
            enums::RG | enums::RG_INTEGER | enums::LUMINANCE_ALPHA => 2,
            enums::RED | enums::RED_INTEGER | enums::ALPHA | enums::LUMINANCE => 1,
            _ => 4,
        }
    }

    fn read<C: GlContext>(&mut self, gl: &C, rect: Rect) {
        let len = to_len(rect.width) * to_len(rect.height) * self.components();
        self.data.clear();
        self.data.resize(len, T::default());
        gl.read_pixels(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.format,
            T::GL_TYPE,
            bytemuck::cast_slice_mut(&mut self.data),
        );
    }
}

/// A rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Outcome of [`check_canvas_rect_color`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RectCheck {
    /// Every pixel was within tolerance.
    Matched,
    /// Clipping left nothing to check.
    Skipped,
    /// The first pixel outside tolerance.
    Mismatch {
        /// Framebuffer column.
        x: i32,
        /// Framebuffer row.
        y: i32,
        /// `at (x, y) expected: … was …`.
        message: String,
    },
}

/// Clip `[value, value + extent)` to `[min, max]`.
///
/// An empty result is `(max, 0)`.
#[must_use]
pub fn clip_to_range(value: i32, extent: i32, min: i32, max: i32) -> (i32, i32) {
    let (mut value, mut extent) = (value, extent);
    if value < min {
        extent -= min - value;
        value = min;
    }
    let end = value + extent;
    if end > max {
        extent -= end - max;
    }
    if extent < 0 {
        (max, 0)
    } else {
        (value, extent)
    }
}

fn join<T: Display>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Read back `rect` and compare each pixel against `color`.
///
/// The rect is clipped to the drawing buffer only while the default
/// framebuffer is bound. `color` may have fewer channels than the readback
/// format; extra channels are not compared.
pub fn check_canvas_rect_color<C: GlContext, T: Channel>(
    gl: &C,
    rect: Rect,
    color: &[T],
    tolerance: Tolerance,
    readback: &mut Readback<T>,
) -> RectCheck {
    let mut rect = rect;
    if gl.framebuffer_binding().is_none() {
        let (width, height) = gl.drawing_buffer_size();
        let (x, w) = clip_to_range(rect.x, rect.width, 0, gl_size(width));
        let (y, h) = clip_to_range(rect.y, rect.height, 0, gl_size(height));
        if w == 0 || h == 0 {
            return RectCheck::Skipped;
        }
        rect = Rect::new(x, y, w, h);
    }
    if rect.width <= 0 || rect.height <= 0 {
        return RectCheck::Skipped;
    }

    readback.read(gl, rect);
    let stride = readback.components();
    let channels = color.len().min(stride);
    let width = to_len(rect.width);
    for (i, pixel) in readback.data.chunks_exact(stride).enumerate() {
        let off = (0..channels).any(|j| (pixel[j].to_f64() - color[j].to_f64()).abs() > tolerance.0[j]);
        if off {
            let x = rect.x + i32::try_from(i % width).unwrap_or(i32::MAX);
            let y = rect.y + i32::try_from(i / width).unwrap_or(i32::MAX);
            let message = format!(
                "at ({x}, {y}) expected: {} was {}",
                join(color),
                join(&pixel[..channels])
            );
            return RectCheck::Mismatch { x, y, message };
        }
    }
    RectCheck::Matched
}

/// One rect of a batched [`check_canvas_rects`](Session::check_canvas_rects)
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
    /// Expected color.
    pub color: Rgba8,
    /// Reported on pass and on failure.
    pub message: String,
    /// Allowed difference per channel.
    pub tolerance: u8,
}

impl CheckRect {
    /// An exact-match check.
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32, color: Rgba8, message: &str) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
            message: message.to_owned(),
            tolerance: 0,
        }
    }

    /// Allow `tolerance` per channel.
    #[must_use]
    pub fn with_tolerance(self, tolerance: u8) -> Self {
        Self { tolerance, ..self }
    }

    /// Evaluate against a shared RGBA8 buffer whose bottom-left pixel is
    /// `(left, bottom)` and whose rows are `stride` pixels wide.
    ///
    /// Scans column by column and returns the first mismatch, in
    /// buffer-local coordinates.
    fn first_mismatch(&self, buf: &[u8], left: i32, bottom: i32, stride: i32) -> Option<String> {
        for px in (self.x - left)..(self.x + self.width - left) {
            for py in (self.y - bottom)..(self.y + self.height - bottom) {
                let offset = to_len(py * stride + px) * 4;
                let Some(pixel) = buf.get(offset..offset + 4) else {
                    continue;
                };
                if pixel
                    .iter()
                    .zip(self.color)
                    .any(|(&was, expected)| was.abs_diff(expected) > self.tolerance)
                {
                    return Some(format!(
                        "at ({px}, {py}) expected: {} was {}",
                        join(&self.color[..]),
                        join(pixel)
                    ));
                }
            }
        }
        None
    }
}

impl<R: Reporter> Session<R> {
    /// Check that `rect` is `color` (RGBA8), reporting one outcome.
    ///
    /// `msg` defaults to `should be r,g,b,a`.
    pub fn check_canvas_rect<C: GlContext>(
        &mut self,
        gl: &C,
        rect: Rect,
        color: Rgba8,
        msg: Option<&str>,
        tolerance: impl Into<Tolerance>,
    ) -> RectCheck {
        self.check_canvas_rect_with(gl, rect, &color, msg, tolerance.into(), &mut Readback::new())
    }

    /// [`check_canvas_rect`](Self::check_canvas_rect) with a caller-owned
    /// readback buffer of any channel type.
    pub fn check_canvas_rect_with<C: GlContext, T: Channel>(
        &mut self,
        gl: &C,
        rect: Rect,
        color: &[T],
        msg: Option<&str>,
        tolerance: Tolerance,
        readback: &mut Readback<T>,
    ) -> RectCheck {
        let msg = msg.map_or_else(|| format!("should be {}", join(color)), str::to_owned);
        let result = check_canvas_rect_color(gl, rect, color, tolerance, readback);
        match &result {
            RectCheck::Matched => self.passed(&msg),
            RectCheck::Skipped => {
                self.debug("checking rect: effective width or height is zero");
                self.passed(&msg);
            }
            RectCheck::Mismatch { message, .. } => self.failed(&format!("{msg}\n{message}")),
        }
        result
    }

    /// Check the whole drawing buffer.
    pub fn check_canvas<C: GlContext>(
        &mut self,
        gl: &C,
        color: Rgba8,
        msg: Option<&str>,
        tolerance: impl Into<Tolerance>,
    ) -> RectCheck {
        let (width, height) = gl.drawing_buffer_size();
        let rect = Rect::new(0, 0, gl_size(width), gl_size(height));
        self.check_canvas_rect(gl, rect, color, msg, tolerance)
    }

    /// Check `rect` (shrunk by `edge_size`) for `inner` and the four bands
    /// around it (grown by `edge_size`) for `outer`.
    ///
    /// `outer_size` defaults to the drawing buffer.
    pub fn check_area_in_and_out<C: GlContext>(
        &mut self,
        gl: &C,
        rect: Rect,
        inner: Rgba8,
        outer: Rgba8,
        edge_size: i32,
        outer_size: Option<(i32, i32)>,
    ) {
        let (ow, oh) = outer_size.unwrap_or_else(|| {
            let (w, h) = gl.drawing_buffer_size();
            (gl_size(w), gl_size(h))
        });
        let Rect { x, y, width, height } = rect;
        let e = edge_size;
        let checks = [
            (Rect::new(x + e, y + e, width - e * 2, height - e * 2), inner),
            (Rect::new(0, 0, x - e, oh), outer),
            (Rect::new(x + width + e, 0, ow - x - width - e, oh), outer),
            (Rect::new(0, 0, ow, y - e), outer),
            (Rect::new(0, y + height + e, ow, oh - y - height - e), outer),
        ];
        for (rect, color) in checks {
            self.check_canvas_rect(gl, rect, color, None, Tolerance::EXACT);
        }
    }

    /// Check several rects with a single RGBA8 readback of their bounding
    /// box. Each rect reports its own outcome.
    pub fn check_canvas_rects<C: GlContext>(&mut self, gl: &C, rects: &[CheckRect]) {
        let Some(first) = rects.first() else { return };
        let (mut left, mut bottom) = (first.x, first.y);
        let (mut right, mut top) = (first.x + first.width, first.y + first.height);
        for r in &rects[1..] {
            left = left.min(r.x);
            right = right.max(r.x + r.width);
            bottom = bottom.min(r.y);
            top = top.max(r.y + r.height);
        }
        let (width, height) = (right - left, top - bottom);
        let mut buf = vec![0u8; to_len(width) * to_len(height) * 4];
        gl.read_pixels(left, bottom, width, height, enums::RGBA, enums::UNSIGNED_BYTE, &mut buf);

        for rect in rects {
            match rect.first_mismatch(&buf, left, bottom, width) {
                Some(detail) => {
                    self.failed(&rect.message);
                    self.debug(&detail);
                }
                None => self.passed(&rect.message),
            }
        }
    }

    /// Check the `expected.len()` floats at the start of the buffer bound
    /// to `target`.
    ///
    /// `tolerance` defaults to the configured float tolerance.
    pub fn check_float_buffer<C: GlContext>(
        &mut self,
        gl: &C,
        target: u32,
        expected: &[f32],
        msg: Option<&str>,
        tolerance: Option<f32>,
    ) -> bool {
        let msg = msg.unwrap_or("buffer should match expected values");
        let tolerance = tolerance.unwrap_or(self.config().float_tolerance);
        let mut actual = vec![0f32; expected.len()];
        gl.get_buffer_sub_data(target, 0, bytemuck::cast_slice_mut(&mut actual));

        let mismatch = expected
            .iter()
            .zip(&actual)
            .position(|(e, a)| (a - e).abs() > tolerance);
        if let Some(i) = mismatch {
            self.failed(msg);
            self.debug(&format!("at [{i}] expected: {} was {}", expected[i], actual[i]));
            return false;
        }
        self.passed(msg);
        true
    }

    /// Count pixels of `cmp` differing from `reference` by more than
    /// `tolerance` in any channel. The first ten are reported as failures.
    ///
    /// With `diff`, matching pixels are painted green and differing ones
    /// red.
    pub fn compare_pixels(&mut self, cmp: &[u8], reference: &[u8], tolerance: u8, diff: Option<&mut [u8]>) -> usize {
        if cmp.len() != reference.len() {
            self.failed("invalid pixel size.");
        }
        let mut diff = diff;
        let mut count = 0;
        for (i, (got, want)) in cmp.chunks_exact(4).zip(reference.chunks_exact(4)).enumerate() {
            let out = diff.as_deref_mut().and_then(|d| d.get_mut(i * 4..i * 4 + 4));
            let differs = got.iter().zip(want).any(|(g, w)| g.abs_diff(*w) > tolerance);
            if let Some(out) = out {
                out.copy_from_slice(if differs { &[255, 0, 0, 255] } else { &[0, 255, 0, 255] });
            }
            if differs {
                if count < 10 {
                    self.failed(&format!(
                        "Pixel {i}: expected ({}), got ({})",
                        join(want),
                        join(got)
                    ));
                }
                count += 1;
            }
        }
        count
    }
}

/// Save `reference`, `result`, and `diff` as `<prefix>-reference.png`,
/// `<prefix>-result.png`, and `<prefix>-diff.png` in `dir`.
///
/// # Errors
///
/// Returns [`HarnessError::Image`] if a buffer does not hold
/// `width * height` RGBA8 pixels or a file cannot be written.
pub fn write_image_diff(
    dir: &Path,
    prefix: &str,
    (width, height): (u32, u32),
    reference: &[u8],
    result: &[u8],
    diff: &[u8],
) -> Result<(), HarnessError> {
    for (name, pixels) in [("reference", reference), ("result", result), ("diff", diff)] {
        let img = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
            ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch))
        })?;
        img.save(dir.join(format!("{prefix}-{name}.png")))?;
    }
    Ok(())
}
