//! The remote conversion service as the client sees it.

use std::time::Duration;

use bytes::Bytes;
use convert_core::{
    ConversionRequest, ConvertError, JobHandle, JobStatus, MediaInfo, ProgressSnapshot,
    RequestStage,
};
use engine_logging::engine_debug;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ServiceSettings;

/// Artifact response exactly as received; interpretation is left to
/// [`crate::ArtifactFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Bytes,
}

impl RawArtifact {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait RemoteJobService: Send + Sync {
    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ConvertError>;

    async fn start_job(&self, request: &ConversionRequest) -> Result<JobHandle, ConvertError>;

    /// One status query, abandoned after `bound`.
    async fn query_progress(
        &self,
        job: &JobHandle,
        bound: Duration,
    ) -> Result<ProgressSnapshot, ConvertError>;

    async fn fetch_artifact(&self, job: &JobHandle) -> Result<RawArtifact, ConvertError>;
}

#[derive(Debug, Serialize)]
struct InfoBody<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct StartBody<'a> {
    url: &'a str,
    format: &'a str,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartEnvelope {
    success: bool,
    #[serde(default)]
    download_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProgressBody {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ProgressBody {
    fn into_snapshot(self) -> Result<ProgressSnapshot, ConvertError> {
        let status: JobStatus = self.status.parse().map_err(ConvertError::Remote)?;
        let mut message = self.message.unwrap_or_default();
        if matches!(status, JobStatus::Failed | JobStatus::Error) && message.is_empty() {
            message = self.error.unwrap_or_default();
        }
        Ok(ProgressSnapshot::new(
            status,
            self.progress.unwrap_or(0.0),
            message,
            self.filename,
        ))
    }
}

/// HTTP implementation against the `/api` REST contract.
#[derive(Debug, Clone)]
pub struct ReqwestJobService {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestJobService {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ConvertError> {
        let base = Url::parse(&settings.base_url).map_err(|err| {
            ConvertError::Validation(format!("invalid service url `{}`: {err}", settings.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ConvertError::Validation(format!(
                "service url `{}` cannot carry api paths",
                settings.base_url
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ConvertError::Network(err.to_string()))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait::async_trait]
impl RemoteJobService for ReqwestJobService {
    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ConvertError> {
        let stage = RequestStage::Metadata;
        let response = self
            .client
            .post(self.endpoint(&["api", "info"]))
            .json(&InfoBody { url })
            .send()
            .await
            .map_err(|err| map_reqwest_error(stage, err))?;
        let envelope: Envelope<MediaInfo> = read_json(stage, response).await?;
        if !envelope.success {
            return Err(remote_failure(envelope.error, "could not fetch video info"));
        }
        envelope
            .data
            .ok_or_else(|| ConvertError::Remote("video info response carried no data".to_string()))
    }

    async fn start_job(&self, request: &ConversionRequest) -> Result<JobHandle, ConvertError> {
        let stage = RequestStage::JobStart;
        let body = StartBody {
            url: request.trimmed_url(),
            format: request.output_format.as_str(),
            quality: request.video_quality.as_str(),
        };
        let response = self
            .client
            .post(self.endpoint(&["api", "download"]))
            .json(&body)
            .send()
            .await
            .map_err(|err| map_reqwest_error(stage, err))?;
        let envelope: StartEnvelope = read_json(stage, response).await?;
        if !envelope.success {
            return Err(remote_failure(envelope.error, "could not start conversion"));
        }
        match envelope.download_id {
            Some(id) if !id.trim().is_empty() => Ok(JobHandle::new(id)),
            _ => Err(ConvertError::Remote(
                "job start response carried no download id".to_string(),
            )),
        }
    }

    async fn query_progress(
        &self,
        job: &JobHandle,
        bound: Duration,
    ) -> Result<ProgressSnapshot, ConvertError> {
        let stage = RequestStage::Progress;
        let response = self
            .client
            .get(self.endpoint(&["api", "progress", job.as_str()]))
            .timeout(bound)
            .send()
            .await
            .map_err(|err| map_reqwest_error(stage, err))?;
        let body: ProgressBody = read_json(stage, response).await?;
        body.into_snapshot()
    }

    async fn fetch_artifact(&self, job: &JobHandle) -> Result<RawArtifact, ConvertError> {
        let stage = RequestStage::Artifact;
        let response = self
            .client
            .get(self.endpoint(&["api", "download", job.as_str()]))
            .send()
            .await
            .map_err(|err| map_reqwest_error(stage, err))?;

        let status = response.status().as_u16();
        let content_type = header_string(&response, CONTENT_TYPE);
        let content_disposition = header_string(&response, CONTENT_DISPOSITION);
        let body = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(stage, err))?;
        engine_debug!(
            "Artifact response job={} status={} bytes={}",
            job,
            status,
            body.len()
        );

        Ok(RawArtifact {
            status,
            content_type,
            content_disposition,
            body,
        })
    }
}

fn header_string(response: &reqwest::Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

async fn read_json<T: DeserializeOwned>(
    stage: RequestStage,
    response: reqwest::Response,
) -> Result<T, ConvertError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| map_reqwest_error(stage, err))?;
    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Ok(value),
        Err(err) if status.is_success() => Err(ConvertError::Remote(format!(
            "malformed {stage} response: {err}"
        ))),
        Err(_) => Err(http_status_error(status.as_u16())),
    }
}

fn remote_failure(error: Option<String>, fallback: &str) -> ConvertError {
    let message = error
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    ConvertError::Remote(message)
}

pub(crate) fn http_status_error(status: u16) -> ConvertError {
    ConvertError::Network(format!("http status {status}"))
}

fn map_reqwest_error(stage: RequestStage, err: reqwest::Error) -> ConvertError {
    if err.is_timeout() {
        return ConvertError::Timeout { stage };
    }
    ConvertError::Network(err.to_string())
}
