#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use convert_core::{
    ConversionRequest, ConvertError, JobHandle, JobStatus, MediaInfo, Notification, Notifier,
    ProgressSnapshot,
};
use convert_engine::{
    Artifact, ArtifactSink, SinkError, PollEnd, PollObserver, RawArtifact, RemoteJobService,
};
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn sample_info() -> MediaInfo {
    MediaInfo {
        title: "Example Song - Artist Name".to_string(),
        thumbnail_url: "https://img.example.com/vi/abc/mqdefault.jpg".to_string(),
        duration_seconds: 212,
        uploader: "Artist Name".to_string(),
        view_count: 1_000,
    }
}

pub fn downloading(progress: f64) -> Result<ProgressSnapshot, ConvertError> {
    Ok(ProgressSnapshot::new(
        JobStatus::Downloading,
        progress,
        "converting",
        None,
    ))
}

pub fn completed(filename: &str) -> Result<ProgressSnapshot, ConvertError> {
    Ok(ProgressSnapshot::new(
        JobStatus::Completed,
        100.0,
        "done",
        Some(filename.to_string()),
    ))
}

pub fn transport_error() -> Result<ProgressSnapshot, ConvertError> {
    Err(ConvertError::Network("connection refused".to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Info(String),
    Start(ConversionRequest),
    Progress { job: String, at: Instant },
    Artifact(String),
}

/// Scripted stand-in for the remote service. Jobs are handed out as
/// `job-1`, `job-2`, ...; a job whose progress script runs dry reports a
/// transport failure.
#[derive(Default)]
pub struct FakeService {
    pub info_error: Mutex<Option<ConvertError>>,
    pub start_error: Mutex<Option<ConvertError>>,
    pub info_delay: Mutex<Duration>,
    pub progress_delay: Mutex<Duration>,
    pub artifact: Mutex<Option<RawArtifact>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<ProgressSnapshot, ConvertError>>>>,
    calls: Mutex<Vec<Call>>,
    started: Mutex<u32>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, job: &str, steps: Vec<Result<ProgressSnapshot, ConvertError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job.to_string(), steps.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn progress_times(&self, job: &str) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Progress { job: id, at } if id == job => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn progress_calls(&self, job: &str) -> usize {
        self.progress_times(job).len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl RemoteJobService for FakeService {
    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ConvertError> {
        self.record(Call::Info(url.to_string()));
        let delay = *self.info_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.info_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(sample_info()),
        }
    }

    async fn start_job(&self, request: &ConversionRequest) -> Result<JobHandle, ConvertError> {
        self.record(Call::Start(request.clone()));
        if let Some(err) = self.start_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut started = self.started.lock().unwrap();
        *started += 1;
        Ok(JobHandle::new(format!("job-{started}")))
    }

    async fn query_progress(
        &self,
        job: &JobHandle,
        _bound: Duration,
    ) -> Result<ProgressSnapshot, ConvertError> {
        self.record(Call::Progress {
            job: job.to_string(),
            at: Instant::now(),
        });
        let delay = *self.progress_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(job.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(transport_error)
    }

    async fn fetch_artifact(&self, job: &JobHandle) -> Result<RawArtifact, ConvertError> {
        self.record(Call::Artifact(job.to_string()));
        self.artifact
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConvertError::Network("no artifact scripted".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn titled(&self, title: &str) -> Vec<Notification> {
        self.seen()
            .into_iter()
            .filter(|notification| notification.title == title)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub snapshots: Mutex<Vec<ProgressSnapshot>>,
    pub terminals: Mutex<Vec<PollEnd>>,
}

impl RecordingObserver {
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn terminals(&self) -> Vec<PollEnd> {
        self.terminals.lock().unwrap().clone()
    }
}

impl PollObserver for RecordingObserver {
    fn on_snapshot(&self, _job: &JobHandle, snapshot: ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    fn on_terminal(&self, _job: &JobHandle, end: PollEnd) {
        self.terminals.lock().unwrap().push(end);
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub saved: Mutex<Vec<Artifact>>,
}

impl ArtifactSink for MemorySink {
    fn save(&self, artifact: &Artifact) -> Result<PathBuf, SinkError> {
        self.saved.lock().unwrap().push(artifact.clone());
        Ok(PathBuf::from(&artifact.filename))
    }
}
