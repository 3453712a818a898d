use std::path::PathBuf;
use std::time::Duration;

use convert_core::PollPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Origin of the conversion service; `/api/...` paths are appended to it.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Bound for metadata, job start and artifact requests.
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub service: ServiceSettings,
    pub poll: PollPolicy,
    pub output_dir: PathBuf,
}

impl EngineSettings {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            service: ServiceSettings::default(),
            poll: PollPolicy::default(),
            output_dir,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::default_with_output(PathBuf::from("downloads"))
    }
}
