//! Import progress observers.

use std::sync::Arc;

use parking_lot::Mutex;

/// Receives progress notifications from a module manager.
pub trait StatusReporter: Send {
    fn on_import_started(&mut self, _path: &str) {}
    fn on_import_failed(&mut self, _path: &str) {}
    fn on_import_completed(&mut self, _path: &str) {}
}

/// Reports imports through the terminal logger.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn on_import_started(&mut self, path: &str) {
        crate::debug!("import"; "importing {}...", path);
    }

    fn on_import_failed(&mut self, path: &str) {
        crate::log!("import"; "importing {} failed", path);
    }

    fn on_import_completed(&mut self, path: &str) {
        crate::debug!("import"; "importing {} succeeded", path);
    }
}

/// One observed status notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Started(String),
    Failed(String),
    Completed(String),
}

/// Records notifications into a shared list.
///
/// Clone the reporter before handing it to a manager to keep a handle on
/// the recorded events.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<StatusEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    /// Paths of every `Started` notification, in order.
    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StatusEvent::Started(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StatusReporter for RecordingReporter {
    fn on_import_started(&mut self, path: &str) {
        self.events.lock().push(StatusEvent::Started(path.to_string()));
    }

    fn on_import_failed(&mut self, path: &str) {
        self.events.lock().push(StatusEvent::Failed(path.to_string()));
    }

    fn on_import_completed(&mut self, path: &str) {
        self.events
            .lock()
            .push(StatusEvent::Completed(path.to_string()));
    }
}
