//! Layered configuration for rewire.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, if present, or the
//!    file passed explicitly (TOML, YAML or JSON, chosen by extension)
//! 3. `REWIRE_` environment variables, with `__` between nested keys
//!    (`REWIRE_EXPORT__SITE_TITLE`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use rewire_export::ExportOptions;
use rewire_extract::models::{ExtractOptions, TrackingFilter};
use rewire_library::{ScanOptions, Scanner};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "REWIRE_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingFilter,
    pub scan: ScanOptions,
    pub extract: ExtractOptions,
    pub export: ExportOptions,
}
impl Config {
    /// Loads and validates the configuration. An explicit `path` replaces the
    /// file in the platform config directory and must exist.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(path)?;
        let config: Self = match figment.extract() {
            Ok(config) => config,
            Err(err) => {
                let complaint = err.to_string();
                return Err(err).or_raise(|| ErrorKind::Invalid(complaint));
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// The merged providers, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                tracing::debug!(path = %path.display(), "using config file");
                Self::merge_file(figment, path)?
            },
            None => match Self::default_path().filter(|path| path.is_file()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "using config file from config directory");
                    Self::merge_file(figment, &path)?
                },
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// `config.toml` inside the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rewire").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
        Ok(match extension.as_str() {
            "toml" => figment.merge(Toml::file_exact(path)),
            "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
            "json" => figment.merge(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(extension)),
        })
    }

    /// Checks the values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.scan.context_chars == 0 {
            exn::bail!(ErrorKind::Invalid("scan.context_chars must be greater than zero".to_string()));
        }
        if self.extract.content_selectors.iter().all(|selector| selector.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("extract.content_selectors must name at least one selector".to_string()));
        }
        if self.tracking.patterns.iter().any(|pattern| pattern.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("tracking.patterns must not contain blank entries".to_string()));
        }
        if self.export.site_url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("export.site_url must not be empty".to_string()));
        }
        self.scanner()?;
        Ok(())
    }

    /// A scanner using the configured chrome selectors and tracking filter.
    pub fn scanner(&self) -> Result<Scanner> {
        match Scanner::new(&self.scan, self.tracking.clone()) {
            Ok(scanner) => Ok(scanner),
            Err(err) => {
                let complaint = (*err).to_string();
                Err(err).or_raise(|| ErrorKind::Invalid(complaint))
            },
        }
    }
}
