//! Progress polling for a single remote job.
//!
//! A [`ProgressPoller`] owns everything that can outlive a tick: the spawned
//! task, its cancellation token and the gate every callback passes through.
//! [`ProgressPoller::cancel`] closes the gate while holding the same lock the
//! task holds around callbacks, so once it returns no callback can fire.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use convert_core::{
    ConvertError, JobHandle, JobStatus, PollPolicy, PollState, PollStep, ProgressSnapshot,
    RequestStage,
};
use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::service::RemoteJobService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerPhase {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl PollerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollerPhase::Completed | PollerPhase::Failed | PollerPhase::Cancelled
        )
    }
}

/// How polling ended, handed to [`PollObserver::on_terminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEnd {
    /// The service reported a terminal status.
    Reported(ProgressSnapshot),
    /// The consecutive failure cap was hit; `last_error` is the final failure.
    Exhausted { attempts: u32, last_error: ConvertError },
}

impl PollEnd {
    pub fn snapshot(&self) -> ProgressSnapshot {
        match self {
            PollEnd::Reported(snapshot) => snapshot.clone(),
            PollEnd::Exhausted { .. } => ProgressSnapshot::status_unavailable(),
        }
    }
}

/// Receives poll results. Called from the polling task; implementations must
/// not block and must not call back into the poller.
pub trait PollObserver: Send + Sync {
    fn on_snapshot(&self, job: &JobHandle, snapshot: ProgressSnapshot);

    fn on_terminal(&self, job: &JobHandle, end: PollEnd);
}

#[derive(Debug, Default)]
struct Shared {
    phase: PollerPhase,
    poll: Option<PollState>,
    queries: u64,
}

pub struct ProgressPoller {
    job: JobHandle,
    shared: Arc<Mutex<Shared>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressPoller {
    /// Start polling `job` right away. Must be called from within a Tokio runtime.
    pub fn start(
        service: Arc<dyn RemoteJobService>,
        policy: PollPolicy,
        job: JobHandle,
        observer: Arc<dyn PollObserver>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            phase: PollerPhase::Polling,
            poll: Some(PollState::new(&policy)),
            queries: 0,
        }));
        let token = CancellationToken::new();
        let task = tokio::spawn(run(PollTask {
            service,
            policy,
            job: job.clone(),
            observer,
            shared: shared.clone(),
            token: token.clone(),
        }));
        engine_info!("Polling started job={}", job);
        Self {
            job,
            shared,
            token,
            task: Some(task),
        }
    }

    pub fn job(&self) -> &JobHandle {
        &self.job
    }

    pub fn phase(&self) -> PollerPhase {
        lock(&self.shared).phase
    }

    /// Backoff state after the most recent query.
    pub fn poll_state(&self) -> Option<PollState> {
        lock(&self.shared).poll
    }

    /// Number of status queries issued so far.
    pub fn queries(&self) -> u64 {
        lock(&self.shared).queries
    }

    /// Abort the in-flight query and any pending sleep. No callback fires once
    /// this returns. Terminal phases are left as they are.
    pub fn cancel(&mut self) {
        self.token.cancel();
        {
            let mut shared = lock(&self.shared);
            if !shared.phase.is_terminal() {
                shared.phase = PollerPhase::Cancelled;
                engine_info!("Polling cancelled job={}", self.job);
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PollTask {
    service: Arc<dyn RemoteJobService>,
    policy: PollPolicy,
    job: JobHandle,
    observer: Arc<dyn PollObserver>,
    shared: Arc<Mutex<Shared>>,
    token: CancellationToken,
}

impl PollTask {
    /// Run `f` under the gate unless the poller was cancelled. Returns false when cancelled.
    fn deliver(&self, f: impl FnOnce(&mut Shared)) -> bool {
        let mut shared = lock(&self.shared);
        if self.token.is_cancelled() {
            return false;
        }
        f(&mut shared);
        true
    }

    async fn query(&self, state: &PollState) -> Option<Result<ProgressSnapshot, ConvertError>> {
        let bound = state.request_bound();
        if !self.deliver(|shared| shared.queries += 1) {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            result = tokio::time::timeout(bound, self.service.query_progress(&self.job, bound)) => {
                Some(result.unwrap_or(Err(ConvertError::Timeout {
                    stage: RequestStage::Progress,
                })))
            }
        }
    }
}

async fn run(task: PollTask) {
    let mut state = PollState::new(&task.policy);
    loop {
        let Some(result) = task.query(&state).await else {
            return;
        };

        let (next, step, snapshot, last_error) = match result {
            Ok(snapshot) => {
                let (next, step) = state.on_response(&task.policy, snapshot.status);
                engine_trace!(
                    "Progress job={} status={:?} progress={}",
                    task.job,
                    snapshot.status,
                    snapshot.progress()
                );
                (next, step, Some(snapshot), None)
            }
            Err(err) => {
                let (next, step) = state.on_failure(&task.policy);
                engine_warn!(
                    "Progress query failed job={} attempt={}: {}",
                    task.job,
                    next.consecutive_failures(),
                    err
                );
                (next, step, None, Some(err))
            }
        };
        state = next;

        let delay = match step {
            PollStep::Continue { delay } => {
                let delivered = task.deliver(|shared| {
                    shared.poll = Some(state);
                    if let Some(snapshot) = snapshot {
                        task.observer.on_snapshot(&task.job, snapshot);
                    }
                });
                if !delivered {
                    return;
                }
                delay
            }
            PollStep::Finished(status) => {
                let Some(snapshot) = snapshot else {
                    return;
                };
                task.deliver(|shared| {
                    shared.poll = Some(state);
                    shared.phase = match status {
                        JobStatus::Completed => PollerPhase::Completed,
                        _ => PollerPhase::Failed,
                    };
                    engine_info!("Polling finished job={} status={:?}", task.job, status);
                    task.observer.on_terminal(&task.job, PollEnd::Reported(snapshot));
                });
                return;
            }
            PollStep::Exhausted { attempts } => {
                let last_error = last_error.unwrap_or(ConvertError::PollExhausted { attempts });
                task.deliver(|shared| {
                    shared.poll = Some(state);
                    shared.phase = PollerPhase::Failed;
                    engine_warn!(
                        "Polling gave up job={} after {} consecutive failures",
                        task.job,
                        attempts
                    );
                    task.observer.on_terminal(
                        &task.job,
                        PollEnd::Exhausted {
                            attempts,
                            last_error,
                        },
                    );
                });
                return;
            }
        };

        engine_debug!("Next progress query job={} in {:?}", task.job, delay);
        tokio::select! {
            biased;
            _ = task.token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
