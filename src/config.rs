//! Harness configuration.
//!
//! [`HarnessConfig`] is plain serde data, loadable from JSON. A test page URL
//! can override the context version and context attributes through its
//! query string, the same keys a browser-hosted conformance run accepts.

use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Attributes requested when creating a context.
///
/// Unset fields leave the implementation default in place, except
/// `antialias`, which the harness turns off unless asked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextAttributes {
    /// Whether the drawing buffer has an alpha channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<bool>,
    /// Whether to antialias the default framebuffer.
    pub antialias: bool,
    /// Whether the drawing buffer has a depth buffer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<bool>,
    /// Low-latency presentation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desynchronized: Option<bool>,
    /// Refuse to create a context on slow implementations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_if_major_performance_caveat: Option<bool>,
    /// GPU selection hint, e.g. `"high-performance"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_preference: Option<String>,
    /// Whether colors in the drawing buffer are premultiplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premultiplied_alpha: Option<bool>,
    /// Whether the drawing buffer survives compositing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_drawing_buffer: Option<bool>,
    /// Whether the drawing buffer has a stencil buffer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil: Option<bool>,
}

impl ContextAttributes {
    /// Context type names to try, in order, for a WebGL version.
    #[must_use]
    pub fn context_names(version: u32) -> &'static [&'static str] {
        match version {
            2 => &["webgl2"],
            _ => &["webgl", "experimental-webgl"],
        }
    }

    /// Apply one query-string override. Returns `false` for unknown keys.
    fn set_from_query(&mut self, key: &str, value: &str) -> bool {
        let flag = parse_boolean(value);
        match key {
            "alpha" => self.alpha = Some(flag),
            "antialias" => self.antialias = flag,
            "depth" => self.depth = Some(flag),
            "desynchronized" => self.desynchronized = Some(flag),
            "failIfMajorPerformanceCaveat" => self.fail_if_major_performance_caveat = Some(flag),
            "powerPreference" => self.power_preference = Some(value.to_owned()),
            "premultipliedAlpha" => self.premultiplied_alpha = Some(flag),
            "preserveDrawingBuffer" => self.preserve_drawing_buffer = Some(flag),
            "stencil" => self.stencil = Some(flag),
            _ => return false,
        }
        true
    }
}

/// Settings shared by every helper in a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Directory resource paths are resolved against.
    pub resource_base: PathBuf,
    /// WebGL version used when a caller does not ask for one.
    pub default_context_version: u32,
    /// Whether [`Session::log`](crate::Session::log) emits anything.
    pub logging: bool,
    /// Bound for [`Session::await_or_timeout`](crate::Session::await_or_timeout).
    pub await_timeout_ms: u64,
    /// Default per-element tolerance for float buffer checks.
    pub float_tolerance: f32,
    /// Have [`Session::report_renderer`](crate::Session::report_renderer)
    /// report the renderer string.
    pub show_renderer: bool,
    /// Attributes for context creation.
    pub attributes: ContextAttributes,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            resource_base: PathBuf::from("resources"),
            default_context_version: 1,
            logging: true,
            await_timeout_ms: 5000,
            float_tolerance: 0.001,
            show_renderer: false,
            attributes: ContextAttributes::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the document is not valid.
    pub fn from_json(text: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] if the file cannot be read, or
    /// [`HarnessError::Config`] if it does not parse.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| HarnessError::Io { path, source })?;
        Self::from_json(&text)
    }

    /// Apply overrides from a page URL's query string.
    ///
    /// Honors `webglVersion`, `showRenderer`, and each context attribute by
    /// its camel-case name. Empty values are ignored.
    pub fn apply_url_query(&mut self, href: &str) {
        let options = url_options(href);
        if let Some(version) = options.get("webglVersion").and_then(|v| parse_int_prefix(v)) {
            if version > 0 {
                self.default_context_version = version;
            }
        }
        if options.get("showRenderer").is_some_and(|v| !v.is_empty()) {
            self.show_renderer = true;
        }
        for (key, value) in &options {
            if value.is_empty() {
                continue;
            }
            if self.attributes.set_from_query(key, value) {
                log::debug!("setting context attribute: {key} = {value}");
            }
        }
    }

    /// Context type names for the configured default version.
    #[must_use]
    pub fn context_names(&self) -> &'static [&'static str] {
        ContextAttributes::context_names(self.default_context_version)
    }
}

/// Decode the query string of `href` into a key/value map.
///
/// Everything between the first `?` and the first `#` is parsed as
/// `application/x-www-form-urlencoded`; later duplicates win.
#[must_use]
pub fn url_options(href: &str) -> HashMap<String, String> {
    let end = href.find('#').unwrap_or(href.len());
    let start = href[..end].find('?').map_or(end, |q| q + 1);
    url::form_urlencoded::parse(href[start..end].as_bytes())
        .into_owned()
        .collect()
}

/// `true` if `value` starts with `t`/`T` or is a number greater than zero.
#[must_use]
pub fn parse_boolean(value: &str) -> bool {
    value.to_lowercase().starts_with('t') || parse_float_prefix(value).is_some_and(|v| v > 0.0)
}

/// Parse the longest leading decimal number, ignoring leading whitespace.
fn parse_float_prefix(value: &str) -> Option<f64> {
    let value = value.trim_start();
    (1..=value.len())
        .rev()
        .filter(|&end| value.is_char_boundary(end))
        .find_map(|end| value[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_int_prefix(value: &str) -> Option<u32> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
