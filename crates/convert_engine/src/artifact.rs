use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use convert_core::{artifact_filename, ConvertError, JobHandle, OutputFormat, RequestStage};
use engine_logging::{engine_info, engine_warn};

use crate::service::{http_status_error, RawArtifact, RemoteJobService};
use crate::sink::ArtifactSink;
use crate::submit::bounded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub byte_len: u64,
}

/// Retrieves the finished file of a completed job. Fetching never changes the
/// remote artifact, so it may be repeated freely.
#[derive(Clone)]
pub struct ArtifactFetcher {
    service: Arc<dyn RemoteJobService>,
    timeout: Duration,
}

impl ArtifactFetcher {
    pub fn new(service: Arc<dyn RemoteJobService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub async fn fetch(
        &self,
        job: &JobHandle,
        format: OutputFormat,
    ) -> Result<Artifact, ConvertError> {
        let raw = bounded(
            self.timeout,
            RequestStage::Artifact,
            self.service.fetch_artifact(job),
        )
        .await?;
        if !raw.is_success() {
            let err = error_from_response(&raw);
            engine_warn!("Artifact fetch for job {} failed: {}", job, err);
            return Err(err);
        }
        let filename = artifact_filename(raw.content_disposition.as_deref(), format);
        Ok(Artifact {
            bytes: raw.body,
            filename,
        })
    }

    /// Fetch, then hand the artifact to `sink` exactly once. A failed save is
    /// not retried; calling again fetches again.
    pub async fn fetch_and_save(
        &self,
        job: &JobHandle,
        format: OutputFormat,
        sink: &dyn ArtifactSink,
    ) -> Result<SavedArtifact, ConvertError> {
        let artifact = self.fetch(job, format).await?;
        let path = sink
            .save(&artifact)
            .map_err(|err| ConvertError::Save(err.to_string()))?;
        engine_info!(
            "Saved artifact job={} file={} bytes={}",
            job,
            path.display(),
            artifact.bytes.len()
        );
        Ok(SavedArtifact {
            path,
            filename: artifact.filename,
            byte_len: artifact.bytes.len() as u64,
        })
    }
}

fn error_from_response(raw: &RawArtifact) -> ConvertError {
    let is_json = raw
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .is_some_and(|ct| ct.eq_ignore_ascii_case("application/json") || ct.ends_with("+json"));
    if !is_json {
        return http_status_error(raw.status);
    }
    let message = serde_json::from_slice::<serde_json::Value>(&raw.body)
        .ok()
        .and_then(|value| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        });
    match message {
        Some(message) if !message.trim().is_empty() => ConvertError::Remote(message),
        _ => http_status_error(raw.status),
    }
}
