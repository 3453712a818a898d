use crate::{MediaInfo, ProgressSnapshot};

/// Where the active job is in its lifecycle, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl JobPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, JobPhase::Submitting | JobPhase::Polling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobView {
    pub phase: JobPhase,
    pub info: Option<MediaInfo>,
    /// Latest snapshot only; earlier ones are not merged in.
    pub latest: Option<ProgressSnapshot>,
    pub last_error: Option<String>,
    pub can_download: bool,
}

impl JobView {
    pub fn progress(&self) -> u8 {
        self.latest.as_ref().map_or(0, ProgressSnapshot::progress)
    }
}
