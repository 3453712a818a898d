//! Optional RON settings file, overlaid by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use convert_core::PollPolicy;
use convert_engine::{EngineSettings, ServiceSettings};
use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub server: String,
    pub output_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub poll: PollPolicy,
}

impl Default for SettingsFile {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            server: engine.service.base_url,
            output_dir: engine.output_dir,
            connect_timeout_secs: engine.service.connect_timeout.as_secs(),
            request_timeout_secs: engine.service.request_timeout.as_secs(),
            poll: engine.poll,
        }
    }
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = ron::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        engine_info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn into_engine_settings(self) -> EngineSettings {
        EngineSettings {
            service: ServiceSettings {
                base_url: self.server,
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            poll: self.poll,
            output_dir: self.output_dir,
        }
    }
}

/// Settings file (when given) with `--server` and `--output` applied on top.
pub fn resolve(cli: &Cli) -> Result<EngineSettings, SettingsError> {
    let mut file = match &cli.config {
        Some(path) => SettingsFile::load(path)?,
        None => SettingsFile::default(),
    };
    if let Some(server) = &cli.server {
        file.server = server.clone();
    }
    if let Some(output) = &cli.output {
        file.output_dir = output.clone();
    }
    Ok(file.into_engine_settings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: SettingsFile =
            ron::from_str("(server: \"http://media.local:8080\", poll: (max_consecutive_failures: 5))")
                .expect("parse");
        assert_eq!(settings.server, "http://media.local:8080");
        assert_eq!(settings.request_timeout_secs, 15);
        assert_eq!(settings.poll.max_consecutive_failures, 5);
        assert_eq!(settings.poll.initial_delay_ms, 1_000);
    }

    #[test]
    fn cli_flags_override_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("convert.ron");
        fs::write(&path, "(server: \"http://from-file:1\", output_dir: \"file-out\")").unwrap();

        let cli = Cli::try_parse_from([
            "convert_app",
            "https://video.example.com/watch?v=abc",
            "--config",
            path.to_str().unwrap(),
            "--output",
            "cli-out",
        ])
        .unwrap();
        let settings = resolve(&cli).unwrap();

        assert_eq!(settings.service.base_url, "http://from-file:1");
        assert_eq!(settings.output_dir, PathBuf::from("cli-out"));
        assert_eq!(settings.service.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = SettingsFile::load(&temp.path().join("absent.ron")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
