use engine_logging::engine_debug;

use crate::JobHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Destructive,
}

/// A user-visible message, rendered by whatever [`Notifier`] the caller injects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }
}

/// The "notify user" capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Completed,
    Error,
}

/// Which terminal notifications were already shown for the active job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationFlags {
    pub completed_notified: bool,
    pub error_notified: bool,
}

impl NotificationFlags {
    pub fn is_notified(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Completed => self.completed_notified,
            NotificationKind::Error => self.error_notified,
        }
    }

    fn with(mut self, kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Completed => self.completed_notified = true,
            NotificationKind::Error => self.error_notified = true,
        }
        self
    }
}

/// Show `notification` unless a notification of `kind` was already shown for
/// this job. The caller stores the returned flags.
pub fn notify_once(
    flags: NotificationFlags,
    kind: NotificationKind,
    notification: Notification,
    notifier: &dyn Notifier,
) -> NotificationFlags {
    if flags.is_notified(kind) {
        engine_debug!("Suppressing duplicate {:?} notification", kind);
        return flags;
    }
    notifier.notify(notification);
    flags.with(kind)
}

/// Notification for a job that finished successfully.
pub fn completed_notification(job: &JobHandle, filename: Option<&str>) -> Notification {
    let description = match filename {
        Some(name) => format!("{name} is ready to download"),
        None => format!("job {job} is ready to download"),
    };
    Notification::info("Done!", description)
}

/// Notification for a job that ended in failure.
pub fn failure_notification(message: &str) -> Notification {
    let description = if message.trim().is_empty() {
        "conversion failed".to_string()
    } else {
        message.to_string()
    };
    Notification::destructive("Error", description)
}
