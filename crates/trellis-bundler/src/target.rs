//! Target platform resolution.
//!
//! Driver step one: turn the configured browser support list into a
//! concrete feature set. Pure function of configuration, no I/O.

/// Runtime a compilation unit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPlatform {
    Browser,
    Server,
}

/// Language/runtime capabilities the output may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    /// ECMAScript edition the output is allowed to use.
    pub es_version: u16,
    /// Whether native dynamic `import()` can be emitted.
    pub native_dynamic_import: bool,
    /// Whether `async`/`await` can be left untransformed.
    pub native_async_await: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            es_version: 2020,
            native_dynamic_import: true,
            native_async_await: true,
        }
    }
}

/// Resolve a browser support list into a feature set.
///
/// Entries are `name major` pairs (`"chrome 90"`, `"safari 12"`); the
/// lowest common capability wins. An empty list resolves to the default
/// evergreen feature set.
pub fn resolve_feature_set(supported_browsers: &[String]) -> FeatureSet {
    let mut features = FeatureSet::default();

    for entry in supported_browsers {
        let mut parts = entry.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let major: u32 = parts
            .next()
            .and_then(|v| v.split('.').next())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let (min_dynamic_import, min_async) = match name.as_str() {
            "chrome" | "edge" => (63, 55),
            "firefox" => (67, 52),
            "safari" | "ios" => (11, 11),
            // Unknown browsers are treated conservatively.
            _ => (u32::MAX, u32::MAX),
        };

        if major < min_dynamic_import {
            features.native_dynamic_import = false;
            features.es_version = features.es_version.min(2017);
        }
        if major < min_async {
            features.native_async_await = false;
            features.es_version = features.es_version.min(2015);
        }
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_resolves_to_evergreen_defaults() {
        let features = resolve_feature_set(&[]);
        assert!(features.native_dynamic_import);
        assert_eq!(features.es_version, 2020);
    }

    #[test]
    fn old_browser_lowers_the_common_feature_set() {
        let features = resolve_feature_set(&["chrome 120".into(), "safari 10".into()]);
        assert!(!features.native_dynamic_import);
        assert!(!features.native_async_await);
        assert_eq!(features.es_version, 2015);
    }

    #[test]
    fn unknown_browser_is_conservative() {
        let features = resolve_feature_set(&["netscape 4".into()]);
        assert!(!features.native_dynamic_import);
    }
}
