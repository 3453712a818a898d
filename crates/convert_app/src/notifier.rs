use convert_core::{Notification, Notifier, Severity};
use engine_logging::{engine_info, engine_warn};

/// Prints notifications as one-line messages: info on stdout, failures on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => {
                engine_info!("Notify: {} - {}", notification.title, notification.description);
                println!("\n{}: {}", notification.title, notification.description);
            }
            Severity::Destructive => {
                engine_warn!("Notify: {} - {}", notification.title, notification.description);
                eprintln!("\n{}: {}", notification.title, notification.description);
            }
        }
    }
}
