//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the synthesis runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_patterns_base_dir() -> PathBuf {
    PathBuf::from("data/patterns")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/output")
}

/// Primary configuration object for LoadSynth tooling.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "LOADSYNTH_CONFIG";

    /// Load configuration from disk, respecting the `LOADSYNTH_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike the environment override, the candidate list is optional: when none of
    /// the candidates exist the built-in defaults are returned with `source: None`.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.paths.patterns_base_dir.as_os_str().is_empty() {
            return Err(anyhow!("paths.patterns_base_dir must not be empty"));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("paths.output_dir must not be empty"));
        }
        if self.logging.directory.as_os_str().is_empty() {
            return Err(anyhow!("logging.directory must not be empty"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Directory layout for template libraries and generated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding one `<appliance>_patterns` directory per appliance.
    #[serde(default = "default_patterns_base_dir")]
    pub patterns_base_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            patterns_base_dir: default_patterns_base_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.paths.patterns_base_dir, PathBuf::from("data/patterns"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parses_sections() {
        let config: AppConfig = r#"
            [logging]
            directory = "/tmp/loadsynth-logs"
            format = "structured-json"

            [paths]
            patterns_base_dir = "/srv/patterns"
            output_dir = "/srv/out"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert_eq!(config.paths.output_dir, PathBuf::from("/srv/out"));
    }

    #[test]
    fn rejects_empty_paths() {
        let result = r#"
            [paths]
            output_dir = ""
        "#
        .parse::<AppConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() -> Result<()> {
        let loaded = AppConfig::load_with_source(&["/definitely/not/here.toml"])?;
        assert!(loaded.source.is_none());
        Ok(())
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[paths]\npatterns_base_dir = \"/opt/patterns\"")?;
        file.flush()?;
        let config = AppConfig::from_path(file.path())?;
        assert_eq!(config.paths.patterns_base_dir, PathBuf::from("/opt/patterns"));
        Ok(())
    }
}
