//! Options for the development rebuild middleware.

use serde::{Deserialize, Serialize};

/// How much of each rebuild cycle is reported to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevLogLevel {
    /// Nothing
    Silent,
    /// Failed cycles only
    Error,
    /// Failed cycles and warnings
    Warn,
    /// Every cycle
    #[default]
    Info,
}

impl DevLogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DevLogLevel::Silent => "silent",
            DevLogLevel::Error => "error",
            DevLogLevel::Warn => "warn",
            DevLogLevel::Info => "info",
        }
    }

    /// Whether messages at `level` should be shown.
    pub fn allows(self, level: DevLogLevel) -> bool {
        level != DevLogLevel::Silent && level <= self
    }
}

impl PartialEq<&str> for DevLogLevel {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Effective middleware options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOptions {
    /// URL prefix the client bundle is served under
    pub public_path: String,
    /// Operator-facing verbosity of rebuild reports
    pub log_level: DevLogLevel,
    /// Print per-target stats after each successful cycle
    pub stats: bool,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            public_path: "/".to_string(),
            log_level: DevLogLevel::Info,
            stats: false,
        }
    }
}

/// Partial options; every present field replaces the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevOptionsOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<DevLogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<bool>,
}

impl DevOptions {
    /// Apply `overlay` field by field.
    pub fn merge(self, overlay: DevOptionsOverlay) -> Self {
        Self {
            public_path: overlay
                .public_path
                .map(normalize_public_path)
                .unwrap_or(self.public_path),
            log_level: overlay.log_level.unwrap_or(self.log_level),
            stats: overlay.stats.unwrap_or(self.stats),
        }
    }

    /// Map a request path onto a bundle path, if it lives under `public_path`.
    ///
    /// `/assets/main.js` with a public path of `/assets/` becomes `/main.js`.
    pub fn bundle_path<'a>(&self, request_path: &'a str) -> Option<&'a str> {
        let prefix = self.public_path.trim_end_matches('/');
        let rest = request_path.strip_prefix(prefix)?;
        rest.starts_with('/').then_some(rest)
    }
}

fn normalize_public_path(path: String) -> String {
    let mut path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}
