//! Composition root: one active job at a time, from submission to download.

use std::sync::Arc;

use convert_core::{
    completed_notification, failure_notification, notify_once, ConversionRequest, ConvertError,
    JobHandle, JobPhase, JobStatus, JobView, Notification, NotificationFlags, NotificationKind,
    Notifier, ProgressSnapshot, STATUS_UNAVAILABLE,
};
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::sync::mpsc;

use crate::artifact::{ArtifactFetcher, SavedArtifact};
use crate::poller::{PollEnd, PollObserver, ProgressPoller};
use crate::service::{RemoteJobService, ReqwestJobService};
use crate::sink::{ArtifactSink, DirectorySink};
use crate::submit::{JobSubmitter, Submission, SubmitFailure};
use crate::EngineSettings;

/// What [`Orchestrator::next_update`] observed for the active job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Progress(ProgressSnapshot),
    Completed(ProgressSnapshot),
    Failed {
        snapshot: ProgressSnapshot,
        error: ConvertError,
    },
}

#[derive(Debug)]
enum PollEvent {
    Snapshot(ProgressSnapshot),
    Terminal { job: JobHandle, end: PollEnd },
}

#[derive(Debug)]
struct TaggedEvent {
    generation: u64,
    event: PollEvent,
}

/// Forwards poller callbacks into the orchestrator's queue, tagged with the
/// submission they belong to.
struct ChannelObserver {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl ChannelObserver {
    fn forward(&self, event: PollEvent) {
        let _ = self.tx.send(TaggedEvent {
            generation: self.generation,
            event,
        });
    }
}

impl PollObserver for ChannelObserver {
    fn on_snapshot(&self, _job: &JobHandle, snapshot: ProgressSnapshot) {
        self.forward(PollEvent::Snapshot(snapshot));
    }

    fn on_terminal(&self, job: &JobHandle, end: PollEnd) {
        self.forward(PollEvent::Terminal {
            job: job.clone(),
            end,
        });
    }
}

/// Everything tied to one submission. Dropping it cancels its poller.
struct ActiveJob {
    generation: u64,
    request: ConversionRequest,
    job: Option<JobHandle>,
    poller: Option<ProgressPoller>,
    flags: NotificationFlags,
    view: JobView,
}

pub struct Orchestrator {
    service: Arc<dyn RemoteJobService>,
    settings: EngineSettings,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn ArtifactSink>,
    submitter: JobSubmitter,
    fetcher: ArtifactFetcher,
    generation: u64,
    active: Option<ActiveJob>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn RemoteJobService>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn ArtifactSink>,
        settings: EngineSettings,
    ) -> Self {
        let timeout = settings.service.request_timeout;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            submitter: JobSubmitter::new(service.clone(), timeout),
            fetcher: ArtifactFetcher::new(service.clone(), timeout),
            service,
            settings,
            notifier,
            sink,
            generation: 0,
            active: None,
            events_tx,
            events_rx,
        }
    }

    /// HTTP service and a directory sink, both built from `settings`.
    pub fn from_settings(
        settings: EngineSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConvertError> {
        let service = Arc::new(ReqwestJobService::new(&settings.service)?);
        let sink = Arc::new(DirectorySink::new(settings.output_dir.clone()));
        Ok(Self::new(service, notifier, sink, settings))
    }

    pub fn view(&self) -> JobView {
        self.active
            .as_ref()
            .map(|active| active.view.clone())
            .unwrap_or_default()
    }

    pub fn active_job(&self) -> Option<&JobHandle> {
        self.active.as_ref().and_then(|active| active.job.as_ref())
    }

    /// Supersede whatever was running, then submit `request` and start polling
    /// the new job immediately.
    pub async fn submit(&mut self, request: ConversionRequest) -> Result<Submission, SubmitFailure> {
        self.supersede();
        self.generation += 1;
        let generation = self.generation;
        self.active = Some(ActiveJob {
            generation,
            request: request.clone(),
            job: None,
            poller: None,
            flags: NotificationFlags::default(),
            view: JobView {
                phase: JobPhase::Submitting,
                ..JobView::default()
            },
        });

        let result = self.submitter.submit(&request).await;
        let Some(active) = self.active.as_mut().filter(|a| a.generation == generation) else {
            return result;
        };

        match result {
            Ok(submission) => {
                let observer = Arc::new(ChannelObserver {
                    generation,
                    tx: self.events_tx.clone(),
                });
                active.poller = Some(ProgressPoller::start(
                    self.service.clone(),
                    self.settings.poll,
                    submission.job.clone(),
                    observer,
                ));
                active.job = Some(submission.job.clone());
                active.view.info = Some(submission.info.clone());
                active.view.phase = JobPhase::Polling;
                Ok(submission)
            }
            Err(failure) => {
                active.view.info = failure.info.clone();
                active.view.phase = JobPhase::Failed;
                active.view.last_error = Some(failure.error.to_string());
                active.flags = notify_once(
                    active.flags,
                    NotificationKind::Error,
                    failure_notification(&failure.error.to_string()),
                    self.notifier.as_ref(),
                );
                Err(failure)
            }
        }
    }

    /// Wait for the next poll result of the active job. `None` when nothing is
    /// being polled. Results from superseded jobs are dropped here.
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        loop {
            let active = self.active.as_mut()?;
            if active.view.phase != JobPhase::Polling {
                return None;
            }
            let tagged = self.events_rx.recv().await?;
            if tagged.generation != active.generation {
                engine_debug!(
                    "Dropping stale poll event from submission {}",
                    tagged.generation
                );
                continue;
            }
            return Some(match tagged.event {
                PollEvent::Snapshot(snapshot) => {
                    active.view.latest = Some(snapshot.clone());
                    JobUpdate::Progress(snapshot)
                }
                PollEvent::Terminal { job, end } => {
                    finish(active, &job, end, self.notifier.as_ref())
                }
            });
        }
    }

    /// Drive [`Self::next_update`] until the active job reaches a terminal
    /// state, reporting intermediate snapshots to `on_progress`.
    pub async fn wait_for_terminal(
        &mut self,
        mut on_progress: impl FnMut(&ProgressSnapshot),
    ) -> Option<Result<ProgressSnapshot, ConvertError>> {
        while let Some(update) = self.next_update().await {
            match update {
                JobUpdate::Progress(snapshot) => on_progress(&snapshot),
                JobUpdate::Completed(snapshot) => return Some(Ok(snapshot)),
                JobUpdate::Failed { error, .. } => return Some(Err(error)),
            }
        }
        None
    }

    /// Fetch and save the artifact of the completed active job. May be called
    /// repeatedly; each call downloads again.
    pub async fn download(&mut self) -> Result<SavedArtifact, ConvertError> {
        let (job, format) = match self.active.as_ref() {
            Some(ActiveJob {
                job: Some(job),
                request,
                view,
                ..
            }) if view.can_download => (job.clone(), request.output_format),
            _ => {
                return Err(ConvertError::Validation(
                    "no completed job to download".to_string(),
                ))
            }
        };

        self.notifier.notify(Notification::info(
            "Download started",
            format!("{} file is downloading...", format.extension().to_uppercase()),
        ));
        let result = self
            .fetcher
            .fetch_and_save(&job, format, self.sink.as_ref())
            .await;
        if let Err(err) = &result {
            engine_warn!("Download failed job={}: {}", job, err);
            self.notifier
                .notify(Notification::destructive("Download failed", err.to_string()));
            if let Some(active) = self.active.as_mut() {
                active.view.last_error = Some(err.to_string());
            }
        }
        result
    }

    /// User-initiated cancel of the active job.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if let Some(poller) = active.poller.as_mut() {
                poller.cancel();
            }
            if active.view.phase.is_busy() {
                active.view.phase = JobPhase::Cancelled;
                engine_info!("Cancelled submission {}", active.generation);
            }
        }
    }

    /// The user changed the link, format or quality: drop the current job and
    /// its result without submitting anything. The view returns to `Idle`.
    pub fn reset(&mut self) {
        self.supersede();
    }

    fn supersede(&mut self) {
        if let Some(mut previous) = self.active.take() {
            match previous.poller.as_mut() {
                Some(poller) => {
                    poller.cancel();
                    engine_info!(
                        "Superseding submission {} (job {})",
                        previous.generation,
                        poller.job()
                    );
                }
                None => engine_info!("Superseding submission {}", previous.generation),
            }
        }
        // Anything still queued belongs to the old job.
        while self.events_rx.try_recv().is_ok() {}
    }
}

fn finish(
    active: &mut ActiveJob,
    job: &JobHandle,
    end: PollEnd,
    notifier: &dyn Notifier,
) -> JobUpdate {
    let snapshot = end.snapshot();
    active.view.latest = Some(snapshot.clone());

    if let PollEnd::Reported(reported) = &end {
        if reported.status == JobStatus::Completed {
            active.view.phase = JobPhase::Completed;
            active.view.can_download = true;
            active.flags = notify_once(
                active.flags,
                NotificationKind::Completed,
                completed_notification(job, reported.filename.as_deref()),
                notifier,
            );
            return JobUpdate::Completed(snapshot);
        }
    }

    let error = match end {
        PollEnd::Reported(reported) => ConvertError::Remote(if reported.message.is_empty() {
            "conversion failed".to_string()
        } else {
            reported.message
        }),
        PollEnd::Exhausted {
            attempts,
            last_error,
        } => {
            engine_warn!(
                "Giving up on job={} after {} failed queries, last error: {}",
                job,
                attempts,
                last_error
            );
            ConvertError::PollExhausted { attempts }
        }
    };
    let message = match &error {
        ConvertError::PollExhausted { .. } => STATUS_UNAVAILABLE.to_string(),
        other => other.to_string(),
    };
    active.view.phase = JobPhase::Failed;
    active.view.last_error = Some(message.clone());
    active.flags = notify_once(
        active.flags,
        NotificationKind::Error,
        failure_notification(&message),
        notifier,
    );
    JobUpdate::Failed { snapshot, error }
}
