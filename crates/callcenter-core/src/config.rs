//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars into a [`Settings`] tree.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};

use crate::settings::Settings;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the working directory, overlaying the `RUST_ENV` file and
    /// `APP_*` variables (`__` separates nested keys).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| String::from("dev"));
        let base_dir = PathBuf::from(".");
        let figment = Self::file_layers(&base_dir, &env_name).merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir };
        config.settings()?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    /// Defaults plus the config files found under `base_dir`, without any
    /// environment overrides.
    pub fn from_dir(base_dir: &Path, env_name: &str) -> Self {
        Self { figment: Self::file_layers(base_dir, env_name), base_dir: base_dir.to_path_buf() }
    }

    fn file_layers(base_dir: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        let overlay = match env_name {
            "dev" | "development" => Some("config.dev.toml"),
            "prod" | "production" => Some("config.prod.toml"),
            "test" | "testing" => Some("config.test.toml"),
            _ => None,
        };
        if let Some(file) = overlay {
            figment = figment.merge(Toml::file(base_dir.join(file)));
        }
        figment
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("config key '{key}': {e}"))
    }

    /// The full typed settings tree, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve a configured path against the directory the config came from.
    pub fn resolve<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }
}

/// `~` and `$VAR`/`${VAR}` expansion. When a variable is undefined only
/// the tilde is expanded.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            tracing::warn!(path = raw, error = %e, "path variables left unexpanded");
            PathBuf::from(shellexpand::tilde(raw).into_owned())
        }
    }
}

/// Expanded `p`, joined onto `base` unless it is already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let expanded = expand_path(p);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
