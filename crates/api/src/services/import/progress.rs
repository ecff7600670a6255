//! Progress events forwarded to streaming clients.

use axum::response::sse::Event;
use domain::models::{FileStatus, ImportLogLevel, ImportReport};
use domain::services::ImportProgress;
use serde::Serialize;
use tokio::sync::mpsc;

/// One server-sent event of a streaming import.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ImportEvent {
    Log {
        message: String,
        level: ImportLogLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Progress {
        file: String,
        progress: u8,
    },
    FileStatus {
        file: String,
        status: FileStatus,
    },
    Complete(ImportReport),
    Error {
        message: String,
    },
}

impl ImportEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ImportEvent::Log { .. } => "log",
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::FileStatus { .. } => "file-status",
            ImportEvent::Complete(_) => "complete",
            ImportEvent::Error { .. } => "error",
        }
    }

    pub fn to_sse(&self) -> Event {
        let payload = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Event::default().event(self.name()).data(payload)
    }
}

/// Forwards progress callbacks into a channel.
///
/// Sends never block; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ImportEvent>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::UnboundedSender<ImportEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }
}

impl ImportProgress for ChannelProgress {
    fn on_log(&self, message: &str, level: ImportLogLevel, file: Option<&str>) {
        self.send(ImportEvent::Log {
            message: message.to_string(),
            level,
            file: file.map(str::to_string),
        });
    }

    fn on_progress(&self, file: &str, percent: u8) {
        self.send(ImportEvent::Progress {
            file: file.to_string(),
            progress: percent,
        });
    }

    fn on_file_status(&self, file: &str, status: FileStatus) {
        self.send(ImportEvent::FileStatus {
            file: file.to_string(),
            status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_progress_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = ChannelProgress::new(tx);
        progress.on_log("Processing", ImportLogLevel::Info, Some("a.xlsx"));
        progress.on_progress("a.xlsx", 40);
        progress.on_file_status("a.xlsx", FileStatus::Success);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.name(), "log");
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::json!({"message": "Processing", "level": "info", "file": "a.xlsx"})
        );
        assert_eq!(rx.try_recv().unwrap().name(), "progress");
        assert_eq!(
            serde_json::to_value(rx.try_recv().unwrap()).unwrap(),
            serde_json::json!({"file": "a.xlsx", "status": "success"})
        );
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelProgress::new(tx).on_progress("a.xlsx", 10);
    }
}
