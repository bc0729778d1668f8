//! Lookup of extensions that may be exposed under a vendor prefix.

use crate::{context::GlContext, report::Reporter, session::Session};

/// Prefixes tried, in order, when looking up an extension.
pub const KNOWN_PREFIXES: [&str; 4] = ["", "MOZ_", "OP_", "WEBKIT_"];

/// The first prefixed form of `name` the context lists as supported.
pub fn get_supported_extension_with_known_prefixes<C: GlContext>(gl: &C, name: &str) -> Option<String> {
    let supported = gl.supported_extensions();
    KNOWN_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{name}"))
        .find(|prefixed| supported.contains(prefixed))
}

/// Enable the first prefixed form of `name` the context accepts, returning
/// the name that worked.
pub fn get_extension_with_known_prefixes<C: GlContext>(gl: &C, name: &str) -> Option<String> {
    KNOWN_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{name}"))
        .find(|prefixed| gl.get_extension(prefixed))
}

/// Every prefixed spelling of `name`, which may itself carry a known
/// prefix (matched case-insensitively).
#[must_use]
pub fn get_extension_prefixed_names(name: &str) -> Vec<String> {
    let unprefixed = KNOWN_PREFIXES
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .find_map(|prefix| {
            let head = name.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix).then(|| &name[prefix.len()..])
        })
        .unwrap_or(name);
    KNOWN_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{unprefixed}"))
        .collect()
}

impl<R: Reporter> Session<R> {
    /// Check that `get_extension` agreed with the supported list.
    ///
    /// `enabled` is whether enabling `name` succeeded.
    pub fn run_extension_supported_test<C: GlContext>(&mut self, gl: &C, name: &str, enabled: bool) {
        let listed = get_supported_extension_with_known_prefixes(gl, name).is_some();
        match (listed, enabled) {
            (true, true) => self.passed(&format!("{name} listed as supported and getExtension succeeded")),
            (true, false) => self.failed(&format!("{name} listed as supported but getExtension failed")),
            (false, true) => self.failed(&format!("{name} not listed as supported but getExtension succeeded")),
            (false, false) => self.passed(&format!(
                "{name} not listed as supported and getExtension failed -- this is legal"
            )),
        }
    }
}
