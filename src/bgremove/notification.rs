use std::cell::RefCell;
use std::fmt;

/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// Fire-and-forget receiver for user-facing messages
pub trait NotificationSink {
    fn notify(&self, message: &str, severity: Severity);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity);
    }
}

/// Forwards notifications to the `log` facade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => log::error!("{message}"),
            Severity::Info | Severity::Success => log::info!("[{severity}] {message}"),
        }
    }
}

/// A notification captured by [`NotificationLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Sink that records every notification in order
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: RefCell<Vec<Notification>>,
}

impl NotificationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.entries.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl NotificationSink for NotificationLog {
    fn notify(&self, message: &str, severity: Severity) {
        self.entries.borrow_mut().push(Notification {
            message: message.to_owned(),
            severity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify_through<N: NotificationSink>(sink: N, message: &str) {
        sink.notify(message, Severity::Error);
    }

    #[test]
    fn test_notification_log_records_in_order() {
        let log = NotificationLog::new();
        log.notify("first", Severity::Info);
        notify_through(&log, "second");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].severity, Severity::Error);
        assert_eq!(log.last().map(|n| n.message), Some("second".to_owned()));

        log.clear();
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Success.to_string(), "success");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn test_log_notifier_does_not_panic_without_logger() {
        LogNotifier.notify("hello", Severity::Success);
        LogNotifier.notify("oops", Severity::Error);
    }
}
