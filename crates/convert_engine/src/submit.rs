use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use convert_core::{ConversionRequest, ConvertError, JobHandle, MediaInfo, RequestStage};
use engine_logging::{engine_info, engine_warn};

use crate::service::RemoteJobService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub info: MediaInfo,
    pub job: JobHandle,
}

/// A failed submission. `info` is kept when metadata arrived before the job
/// start failed, so the caller can still show it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct SubmitFailure {
    pub info: Option<MediaInfo>,
    pub error: ConvertError,
}

impl SubmitFailure {
    fn without_info(error: ConvertError) -> Self {
        Self { info: None, error }
    }
}

/// Turns a request into a started remote job: metadata first, then job start.
/// It never starts polling.
#[derive(Clone)]
pub struct JobSubmitter {
    service: Arc<dyn RemoteJobService>,
    step_timeout: Duration,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn RemoteJobService>, step_timeout: Duration) -> Self {
        Self {
            service,
            step_timeout,
        }
    }

    pub async fn submit(&self, request: &ConversionRequest) -> Result<Submission, SubmitFailure> {
        request.validate().map_err(SubmitFailure::without_info)?;

        let url = request.trimmed_url();
        let info = bounded(
            self.step_timeout,
            RequestStage::Metadata,
            self.service.fetch_info(url),
        )
        .await
        .map_err(|error| {
            engine_warn!("Metadata request failed url={}: {}", url, error);
            SubmitFailure::without_info(error)
        })?;
        engine_info!(
            "Metadata ok url={} title={:?} duration={}",
            url,
            info.title,
            info.duration_label()
        );

        match bounded(
            self.step_timeout,
            RequestStage::JobStart,
            self.service.start_job(request),
        )
        .await
        {
            Ok(job) => {
                engine_info!(
                    "Job started job={} format={} quality={}",
                    job,
                    request.output_format,
                    request.quality_label()
                );
                Ok(Submission { info, job })
            }
            Err(error) => {
                engine_warn!("Job start failed url={}: {}", url, error);
                Err(SubmitFailure {
                    info: Some(info),
                    error,
                })
            }
        }
    }
}

/// Run `call` with a hard upper bound, independent of what the transport enforces.
pub(crate) async fn bounded<T>(
    limit: Duration,
    stage: RequestStage,
    call: impl Future<Output = Result<T, ConvertError>>,
) -> Result<T, ConvertError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ConvertError::Timeout { stage })?
}
