//! Build target types and configuration.
//!
//! This module defines the compilation units handed to the bundler:
//! - `TargetKind`: Which bundle a target produces (server, client, static)
//! - `BuildTarget`: The complete, immutable description of one target
//! - `TargetOverlay`: A partial target used to layer environment-specific settings
//! - `TargetSelection`: Which targets a single compiler run covers
//!
//! Targets are pure configuration. Nothing in here reads the process
//! environment; the caller passes a [`TargetEnv`] built once at startup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One independently compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Server-side rendering bundle
    Server,
    /// Browser bundle
    Client,
    /// Static export bundle
    Static,
}

impl TargetKind {
    /// Target name as used in stats file names and bundler configs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Targets covered by a single compiler run.
///
/// The static export has an incompatible output shape, so it is never
/// compiled together with the server/client pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelection {
    /// The `{server, client}` pair, in that order
    App,
    /// The static export target alone
    Static,
}

impl TargetSelection {
    /// Kinds compiled by this selection, in bundler order.
    pub fn kinds(&self) -> &'static [TargetKind] {
        match self {
            Self::App => &[TargetKind::Server, TargetKind::Client],
            Self::Static => &[TargetKind::Static],
        }
    }

    /// Whether a successful run of this selection persists stats files.
    pub fn persists_stats(&self) -> bool {
        matches!(self, Self::App)
    }
}

/// Source map generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Devtool {
    /// Source maps embedded as data URLs
    InlineSourceMap,
    /// Separate `.map` files
    SourceMap,
}

/// Where and how a target writes its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Output directory
    pub path: PathBuf,
    /// Entry chunk filename template (e.g., `[name].js`)
    pub filename: String,
    /// Non-entry chunk filename template
    pub chunk_filename: String,
}

/// A loader rule: files matching `test` are emitted under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderRule {
    /// File pattern, as understood by the bundler
    pub test: String,
    /// Loader name (e.g., `file-loader`)
    pub loader: String,
    /// Output name template
    pub name: String,
}

/// A bundler plugin reference with its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Plugin name
    pub name: String,
    /// Plugin options, passed through untouched
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl PluginSpec {
    /// Create a plugin reference.
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Complete description of one compilation unit.
///
/// Immutable once constructed; serialized as JSON for the bundler process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTarget {
    /// Target name reported in stats (`server`, `client`, `static`)
    pub name: String,
    /// Which bundle this is
    pub kind: TargetKind,
    /// Entry points
    pub entry: Vec<PathBuf>,
    /// Output location and naming
    pub output: OutputConfig,
    /// Source map mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool: Option<Devtool>,
    /// Loader rules, in match order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<LoaderRule>,
    /// Plugins, in application order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginSpec>,
    /// Compile-time global definitions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defines: BTreeMap<String, Value>,
}

/// Partial target used to layer settings over a base target.
///
/// Merge semantics per field (see [`BuildTarget::merge`]):
///
/// | field | rule |
/// |-------|------|
/// | `name`, `devtool`, `output.*`, `entry` | override when set |
/// | `rules`, `plugins` | append |
/// | `defines` | extend, overlay keys win |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetOverlay {
    pub name: Option<String>,
    pub entry: Option<Vec<PathBuf>>,
    pub output_path: Option<PathBuf>,
    pub filename: Option<String>,
    pub chunk_filename: Option<String>,
    pub devtool: Option<Devtool>,
    pub rules: Vec<LoaderRule>,
    pub plugins: Vec<PluginSpec>,
    pub defines: BTreeMap<String, Value>,
}

impl BuildTarget {
    /// Layer `overlay` over this target.
    ///
    /// Total over every field: scalars override, lists append, defines extend.
    pub fn merge(mut self, overlay: TargetOverlay) -> Self {
        if let Some(name) = overlay.name {
            self.name = name;
        }
        if let Some(entry) = overlay.entry {
            self.entry = entry;
        }
        if let Some(path) = overlay.output_path {
            self.output.path = path;
        }
        if let Some(filename) = overlay.filename {
            self.output.filename = filename;
        }
        if let Some(chunk_filename) = overlay.chunk_filename {
            self.output.chunk_filename = chunk_filename;
        }
        if overlay.devtool.is_some() {
            self.devtool = overlay.devtool;
        }
        self.rules.extend(overlay.rules);
        self.plugins.extend(overlay.plugins);
        self.defines.extend(overlay.defines);
        self
    }
}

/// Inputs shared by every target preset.
#[derive(Debug, Clone)]
pub struct TargetEnv {
    /// Project root (sources live under `<root>/src`)
    pub root: PathBuf,
    /// Distribution directory
    pub dist: PathBuf,
    /// Production posture (hashed names, external source maps, compression)
    pub production: bool,
    /// Whether the data-fetching layer is enabled in the bundles
    pub graphql: bool,
}

impl TargetEnv {
    fn src(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join("src").join(rel)
    }

    fn common(&self, kind: TargetKind, entry: PathBuf, output: PathBuf) -> BuildTarget {
        BuildTarget {
            name: kind.as_str().to_string(),
            kind,
            entry: vec![entry],
            output: OutputConfig {
                path: output,
                filename: "[name].js".to_string(),
                chunk_filename: "[name].js".to_string(),
            },
            devtool: None,
            rules: Vec::new(),
            plugins: Vec::new(),
            defines: BTreeMap::new(),
        }
    }

    fn hashed(&self, token: &str) -> String {
        if self.production {
            format!(".[{}]", token)
        } else {
            String::new()
        }
    }

    /// Server-side rendering target, written to `<dist>/server.js`.
    pub fn server(&self) -> BuildTarget {
        let mut defines = BTreeMap::new();
        defines.insert("GRAPHQL".to_string(), Value::Bool(self.graphql));
        defines.insert("SERVER".to_string(), Value::Bool(true));

        self.common(
            TargetKind::Server,
            self.src("entry/server.tsx"),
            self.dist.clone(),
        )
        .merge(TargetOverlay {
            filename: Some("server.js".to_string()),
            defines,
            ..Default::default()
        })
    }

    /// Browser target, written to `<dist>/public`.
    pub fn client(&self) -> BuildTarget {
        let mut defines = BTreeMap::new();
        defines.insert("GRAPHQL".to_string(), Value::Bool(self.graphql));
        defines.insert("SERVER".to_string(), Value::Bool(false));

        let base = self
            .common(
                TargetKind::Client,
                self.src("client/client.tsx"),
                self.dist.join("public"),
            )
            .merge(TargetOverlay {
                rules: vec![
                    LoaderRule {
                        test: r"\.(woff|woff2|(o|t)tf|eot)$".to_string(),
                        loader: "file-loader".to_string(),
                        name: format!("assets/fonts/[name]{}.[ext]", self.hashed("hash")),
                    },
                    LoaderRule {
                        test: r"\.(jpe?g|png|gif|svg)$".to_string(),
                        loader: "file-loader".to_string(),
                        name: format!("assets/img/[name]{}.[ext]", self.hashed("hash")),
                    },
                ],
                plugins: vec![PluginSpec::new(
                    "mini-css-extract",
                    serde_json::json!({
                        "chunkFilename": "assets/css/[id].css",
                        "filename": format!("assets/css/[name]{}.css", self.hashed("contenthash")),
                    }),
                )],
                defines,
                ..Default::default()
            });

        if self.production {
            base.merge(TargetOverlay {
                devtool: Some(Devtool::SourceMap),
                filename: Some("assets/js/[name].[chunkhash].js".to_string()),
                chunk_filename: Some("assets/js/[name].[chunkhash].js".to_string()),
                plugins: vec![PluginSpec::new(
                    "compression",
                    serde_json::json!({ "cache": true, "minRatio": 0.99 }),
                )],
                ..Default::default()
            })
        } else {
            base.merge(TargetOverlay {
                devtool: Some(Devtool::InlineSourceMap),
                ..Default::default()
            })
        }
    }

    /// Static export target, written to `<dist>/static`.
    pub fn static_export(&self) -> BuildTarget {
        let mut defines = BTreeMap::new();
        defines.insert("GRAPHQL".to_string(), Value::Bool(self.graphql));
        defines.insert("SERVER".to_string(), Value::Bool(true));

        self.common(
            TargetKind::Static,
            self.src("entry/static.tsx"),
            self.dist.join("static"),
        )
        .merge(TargetOverlay {
            defines,
            ..Default::default()
        })
    }

    /// Resolve the targets of a selection, in bundler order.
    pub fn targets(&self, selection: TargetSelection) -> Vec<BuildTarget> {
        selection
            .kinds()
            .iter()
            .map(|kind| match kind {
                TargetKind::Server => self.server(),
                TargetKind::Client => self.client(),
                TargetKind::Static => self.static_export(),
            })
            .collect()
    }
}
