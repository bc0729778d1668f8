//! The harness session.
//!
//! A [`Session`] owns everything the helpers share between calls: the
//! reporter, the configuration, the enum-name cache, registered shader
//! scripts, and the text of the last compile or link failure. Helpers that
//! report outcomes are methods on it.

use std::{collections::HashMap, path::PathBuf};

use crate::{
    config::HarnessConfig,
    context::GlContext,
    enums::{self, EnumNames, EnumSource},
    error::HarnessError,
    report::{LogReporter, Reporter},
};

/// `type` attribute of a vertex shader script.
pub const VERTEX_SCRIPT_TYPE: &str = "x-shader/x-vertex";
/// `type` attribute of a fragment shader script.
pub const FRAGMENT_SCRIPT_TYPE: &str = "x-shader/x-fragment";

/// An embedded shader source registered under an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Declared type, normally [`VERTEX_SCRIPT_TYPE`] or
    /// [`FRAGMENT_SCRIPT_TYPE`].
    pub type_attr: String,
    /// Source text as registered, untrimmed.
    pub text: String,
}

/// Shared state for one test run.
#[derive(Debug)]
pub struct Session<R: Reporter = LogReporter> {
    reporter: R,
    config: HarnessConfig,
    enum_names: EnumNames,
    scripts: HashMap<String, Script>,
    last_error: String,
    logging: bool,
}

impl Session {
    /// A session that reports through the `log` crate with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reporter(LogReporter)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reporter> Session<R> {
    /// A session reporting to `reporter` with default settings.
    #[must_use]
    pub fn with_reporter(reporter: R) -> Self {
        Self::with_config(reporter, HarnessConfig::default())
    }

    /// A session reporting to `reporter` with the given settings.
    #[must_use]
    pub fn with_config(reporter: R, config: HarnessConfig) -> Self {
        let logging = config.logging;
        Self {
            reporter,
            config,
            enum_names: EnumNames::new(),
            scripts: HashMap::new(),
            last_error: String::new(),
            logging,
        }
    }

    /// The reporter outcomes go to.
    #[must_use]
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Mutable access to the reporter.
    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Consume the session, returning its reporter.
    #[must_use]
    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Mutable settings.
    pub fn config_mut(&mut self) -> &mut HarnessConfig {
        &mut self.config
    }

    /// Write a diagnostic line, unless logging is off.
    pub fn log(&self, msg: &str) {
        if self.logging {
            log::debug!("{msg}");
        }
    }

    /// Write an error diagnostic, unless logging is off.
    ///
    /// Errors also reach the reporter as debug output so they end up next to
    /// the failures they explain.
    pub fn error(&mut self, msg: &str) {
        if self.logging {
            log::warn!("{msg}");
            self.reporter.debug(msg);
        }
    }

    /// Silence [`log`](Self::log) and [`error`](Self::error) for the rest of
    /// the session.
    pub fn logging_off(&mut self) {
        self.logging = false;
    }

    /// The info log of the most recent compile or link failure.
    #[must_use]
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub(crate) fn set_last_error(&mut self, log: String) {
        self.last_error = log;
    }

    /// Name of an enum value as known to `source`, e.g. `"INVALID_ENUM"`.
    ///
    /// Aliases are joined with `/`; unknown values print as `0x<hex>`.
    pub fn gl_enum_to_string<S: EnumSource + ?Sized>(&mut self, source: &S, value: u32) -> String {
        self.enum_names.name(source, value)
    }

    /// [`gl_enum_to_string`](Self::gl_enum_to_string) for a value that may
    /// be missing.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UndefinedEnum`] if `value` is `None`.
    pub fn try_gl_enum_to_string<S: EnumSource + ?Sized>(
        &mut self,
        source: &S,
        value: Option<u32>,
    ) -> Result<String, HarnessError> {
        self.enum_names.try_name(source, value)
    }

    /// Register a shader script that program builders can refer to by id.
    ///
    /// A later registration under the same id replaces the earlier one.
    pub fn add_script(&mut self, id: &str, type_attr: &str, text: &str) {
        self.scripts.insert(
            id.to_owned(),
            Script {
                type_attr: type_attr.to_owned(),
                text: text.to_owned(),
            },
        );
    }

    /// The script registered under `id`.
    #[must_use]
    pub fn script(&self, id: &str) -> Option<&Script> {
        self.scripts.get(id)
    }

    /// The source text of the script registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UnknownScript`] if nothing is registered
    /// under `id`.
    pub fn script_text(&self, id: &str) -> Result<&str, HarnessError> {
        self.scripts
            .get(id)
            .map(|s| s.text.as_str())
            .ok_or_else(|| HarnessError::UnknownScript(id.to_owned()))
    }

    /// Report the renderer string as debug output if the configuration asks
    /// for it. Call once after creating a context.
    ///
    /// The unmasked renderer is used when `WEBGL_debug_renderer_info` is
    /// available.
    pub fn report_renderer<C: GlContext>(&mut self, gl: &C) {
        if !self.config.show_renderer {
            return;
        }
        let pname = if gl.get_extension("WEBGL_debug_renderer_info") {
            enums::UNMASKED_RENDERER_WEBGL
        } else {
            enums::RENDERER
        };
        let renderer = gl.get_parameter_string(pname);
        self.reporter.debug(&format!("RENDERER: {renderer}"));
    }

    /// `name` resolved against the configured resource directory.
    #[must_use]
    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.config.resource_base.join(name)
    }

    pub(crate) fn passed(&mut self, msg: &str) {
        self.reporter.passed(msg);
    }

    pub(crate) fn failed(&mut self, msg: &str) {
        self.reporter.failed(msg);
    }

    pub(crate) fn debug(&mut self, msg: &str) {
        self.reporter.debug(msg);
    }
}
