use crate::config::{AppConfig, ConfigOverrides};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use std::path::Path;

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Process variables read without a prefix.
const PROCESS_VARS: &[&str] = &["NODE_ENV", "PORT", "GRAPHQL"];

impl AppConfig {
    /// Load configuration from all sources.
    ///
    /// Priority: CLI args > `KILN_*` env > `NODE_ENV`/`PORT`/`GRAPHQL` >
    /// config file > defaults.
    ///
    /// An explicit `config_path` must exist; the implicit `kiln.toml` is
    /// optional and is looked up under `--root` when one is given, else in
    /// the working directory.
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(overrides, config_path)?;
        let config = Self::from_figment(&figment)?;
        tracing::debug!(
            mode = %config.mode,
            port = config.port,
            graphql = config.graphql,
            root = %config.root.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Assemble the layered providers without extracting.
    pub fn figment(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = overrides
                    .root
                    .as_deref()
                    .unwrap_or_else(|| Path::new("."))
                    .join(CONFIG_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        // NODE_ENV feeds `mode`; PORT and GRAPHQL map to their lowercase keys
        figment = figment.merge(Env::raw().only(PROCESS_VARS).map(|key| {
            if key.as_str().eq_ignore_ascii_case("node_env") {
                "mode".into()
            } else {
                key.as_str().to_ascii_lowercase().into()
            }
        }));

        // KILN_WATCH__DEBOUNCE_MS -> watch.debounce_ms
        figment = figment.merge(Env::prefixed("KILN_").split("__"));

        figment = figment.merge(Serialized::defaults(overrides));

        Ok(figment)
    }

    /// Extract a config from an assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct EnvGuard(&'static [&'static str]);

    impl EnvGuard {
        fn set(vars: &'static [&'static str], values: &[&str]) -> Self {
            for (key, value) in vars.iter().zip(values) {
                unsafe { std::env::set_var(key, value) };
            }
            EnvGuard(vars)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in self.0 {
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    fn empty_config() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "").unwrap();
        (dir, path)
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        let (_dir, path) = empty_config();
        let config = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_process_env_is_mapped() {
        let (_dir, path) = empty_config();
        let _env = EnvGuard::set(&["NODE_ENV", "PORT", "GRAPHQL"], &["production", "8080", "1"]);

        let config = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap();
        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.port, 8080);
        assert!(config.graphql);
    }

    #[test]
    #[serial]
    fn test_file_is_layered_under_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
port = 4000
dist = "build"

[bundler]
program = "bun"
args = ["bundle.ts"]

[watch]
debounce_ms = 250
"#,
        )
        .unwrap();
        let _env = EnvGuard::set(&["PORT"], &["5000"]);

        let config = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.dist, PathBuf::from("build"));
        assert_eq!(config.bundler.program, "bun");
        assert_eq!(config.bundler.args, vec!["bundle.ts".to_string()]);
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win() {
        let (_dir, path) = empty_config();
        let _env = EnvGuard::set(&["NODE_ENV", "PORT"], &["production", "8080"]);

        let overrides = ConfigOverrides {
            mode: Some(Mode::Development),
            port: Some(9090),
            root: None,
        };
        let config = AppConfig::load(&overrides, Some(&path)).unwrap();
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.port, 9090);
        assert_eq!(config.root, PathBuf::from("."));
    }

    #[test]
    #[serial]
    fn test_prefixed_env_reaches_nested_fields() {
        let (_dir, path) = empty_config();
        let _env = EnvGuard::set(&["KILN_WATCH__DEBOUNCE_MS"], &["42"]);

        let config = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap();
        assert_eq!(config.watch.debounce_ms, 42);
    }

    #[test]
    #[serial]
    fn test_invalid_mode_is_rejected() {
        let (_dir, path) = empty_config();
        let _env = EnvGuard::set(&["NODE_ENV"], &["staging"]);

        let err = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file_is_an_error() {
        let err = AppConfig::load(
            &ConfigOverrides::default(),
            Some(Path::new("/nope/kiln.toml")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    #[serial]
    fn test_implicit_file_is_found_under_root_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "port = 4100\n").unwrap();

        let overrides = ConfigOverrides {
            root: Some(dir.path().to_path_buf()),
            ..ConfigOverrides::default()
        };
        let config = AppConfig::load(&overrides, None).unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.root, dir.path());
    }

    #[test]
    #[serial]
    fn test_dev_middleware_overrides_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[dev_middleware]\npublic_path = \"/assets/\"\nstats = true\n",
        )
        .unwrap();

        let config = AppConfig::load(&ConfigOverrides::default(), Some(&path)).unwrap();
        let options = config.dev_options();
        assert_eq!(options.public_path, "/assets/");
        assert!(options.stats);
        assert_eq!(options.log_level, "info");
    }
}
