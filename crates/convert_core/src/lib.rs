//! Conversion core: data model, validation and the pure pieces of job tracking.
mod error;
mod filename;
mod media;
mod notify;
mod poll;
mod request;
mod snapshot;
mod view_model;

pub use error::{ConvertError, RequestStage};
pub use filename::{
    artifact_filename, fallback_filename, filename_from_content_disposition, sanitize_filename,
};
pub use media::MediaInfo;
pub use notify::{
    completed_notification, failure_notification, notify_once, Notification, NotificationFlags,
    NotificationKind, Notifier, Severity,
};
pub use poll::{PollPolicy, PollState, PollStep};
pub use request::{ConversionRequest, OutputFormat, VideoQuality};
pub use snapshot::{JobHandle, JobStatus, ProgressSnapshot, STATUS_UNAVAILABLE};
pub use view_model::{JobPhase, JobView};
