//! Expectations about the context's error state.
//!
//! Closures stand in for evaluated expression strings: the helpers run
//! them, catch anything they raise, and report instead of propagating.

use std::panic::{self, AssertUnwindSafe};

use crate::{
    context::GlContext, enums, report::Reporter, session::Session, strict::panic_message,
};

impl<R: Reporter> Session<R> {
    fn error_name<C: GlContext>(&mut self, gl: &C, value: u32) -> String {
        if value == enums::NO_ERROR {
            "NO_ERROR".to_owned()
        } else {
            self.gl_enum_to_string(gl, value)
        }
    }

    fn expected_names<C: GlContext>(&mut self, gl: &C, values: &[u32]) -> String {
        values
            .iter()
            .map(|&v| self.error_name(gl, v))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn check_gl_error<C: GlContext>(
        &mut self,
        gl: &C,
        errors: &[u32],
        report_successes: bool,
        msg: Option<&str>,
    ) -> u32 {
        let msg = msg.unwrap_or("");
        let err = gl.get_error();
        let expected = self.expected_names(gl, errors);
        let many = errors.len() > 1;
        if !errors.contains(&err) {
            let was = self.error_name(gl, err);
            let lead = if many { "one of: " } else { ": " };
            self.failed(&format!("getError expected{lead}{expected}. Was {was} : {msg}"));
        } else if report_successes {
            let lead = if many { "one of: " } else { "expected value: " };
            self.passed(&format!("getError was {lead}{expected} : {msg}"));
        }
        err
    }

    /// Pop one error and check it is among `errors`.
    ///
    /// Reports a pass or a failure and returns the error popped.
    pub fn gl_error_should_be<C: GlContext>(&mut self, gl: &C, errors: &[u32], msg: Option<&str>) -> u32 {
        self.check_gl_error(gl, errors, true, msg)
    }

    /// Like [`gl_error_should_be`](Self::gl_error_should_be), but a match is
    /// silent.
    pub fn gl_error_assert<C: GlContext>(&mut self, gl: &C, errors: &[u32], msg: Option<&str>) -> u32 {
        self.check_gl_error(gl, errors, false, msg)
    }

    /// Run `f` and expect it to leave one of `errors`.
    ///
    /// If `f` panics, that is reported as a failure and `None` is returned.
    /// `msg` defaults to `after evaluating: <label>`.
    pub fn should_generate_gl_error<C: GlContext, T>(
        &mut self,
        gl: &C,
        errors: &[u32],
        label: &str,
        msg: Option<&str>,
        f: impl FnOnce() -> T,
    ) -> Option<u32> {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            self.failed(&format!("{label} threw exception {}", panic_message(&*payload)));
            return None;
        }
        let fallback;
        let msg = match msg {
            Some(msg) => msg,
            None => {
                fallback = format!("after evaluating: {label}");
                &fallback
            }
        };
        Some(self.gl_error_should_be(gl, errors, Some(msg)))
    }

    /// Run `f` and fail if it panics or leaves an error. Success is silent.
    pub fn fail_if_gl_error<C: GlContext, T>(&mut self, gl: &C, label: &str, f: impl FnOnce() -> T) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            self.failed(&format!("{label} threw exception {}", panic_message(&*payload)));
            return;
        }
        let msg = format!("after evaluating: {label}");
        self.gl_error_assert(gl, &[enums::NO_ERROR], Some(&msg));
    }

    /// Check the status of the framebuffer bound at `target`.
    ///
    /// Returns the status when it is among `statuses`.
    pub fn framebuffer_status_should_be<C: GlContext>(
        &mut self,
        gl: &C,
        target: u32,
        statuses: &[u32],
        msg: Option<&str>,
    ) -> Option<u32> {
        let status = gl.check_framebuffer_status(target);
        let expected = statuses
            .iter()
            .map(|&s| self.gl_enum_to_string(gl, s))
            .collect::<Vec<_>>()
            .join(" or ");
        let was = self.gl_enum_to_string(gl, status);
        let many = statuses.len() > 1;
        let suffix = msg.filter(|m| !m.is_empty()).map(|m| format!(": {m}")).unwrap_or_default();
        if !statuses.contains(&status) {
            let lead = if many { " one of: " } else { ": " };
            self.failed(&format!("checkFramebufferStatus expected{lead}{expected}. Was {was}{suffix}"));
            return None;
        }
        let options = if many { format!(", one of: {expected}") } else { String::new() };
        self.passed(&format!("checkFramebufferStatus was {was}{options}{suffix}"));
        Some(status)
    }

    /// Check whether `f` panics. The error queue is drained before and
    /// after, and a panic must not leave an error behind.
    pub fn should_throw<C: GlContext>(&mut self, gl: &C, expect_throw: bool, info: &str, f: impl FnOnce()) {
        drain_errors(gl);
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) if expect_throw => self.failed(&format!("Should throw: {info}")),
            Ok(()) => self.passed(&format!("Should not have thrown: {info}")),
            Err(payload) => {
                if expect_throw {
                    self.passed(&format!("Should throw: {info}"));
                } else {
                    self.failed(&format!("Should not have thrown: {info}"));
                    self.debug(&format!("threw {}", panic_message(&*payload)));
                }
                if gl.get_error() != enums::NO_ERROR {
                    self.failed(&format!("Should not generate an error when throwing: {info}"));
                }
            }
        }
        drain_errors(gl);
    }
}

fn drain_errors<C: GlContext>(gl: &C) {
    while gl.get_error() != enums::NO_ERROR {}
}
