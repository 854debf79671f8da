//! User-facing notification sink

use std::cell::RefCell;
use tracing::{error, info};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Run finished normally
    Info,
    /// Run aborted
    Error,
}

/// Receives the human-readable outcome of a run
pub trait Notifier {
    /// Deliver a message to the user
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Sends notices to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => info!("{}", message),
            NoticeLevel::Error => error!("{}", message),
        }
    }
}

/// Keeps every notice in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RefCell<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.borrow_mut().push((level, message.to_string()));
    }
}
