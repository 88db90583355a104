//! User-visible status for one mode switch
//!
//! A presenter owns at most one indicator. The first message opens it; every
//! later message updates the same indicator until it is closed.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::mode::Mode;

/// Handle of an indicator opened on a [`StatusSink`]
pub type IndicatorId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Success,
    Failure,
}

/// Content of an indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub title: String,
    pub message: Option<String>,
}

/// Surface that displays status indicators
pub trait StatusSink: Send + Sync {
    /// Display a new indicator
    fn open(&self, status: &Status) -> IndicatorId;
    /// Replace the content of an indicator
    fn update(&self, id: IndicatorId, status: &Status);
}

/// Why a switch failed, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure<'a> {
    NotConnected,
    ModifierKeysHeld,
    Channel(&'a str),
    Unexpected(&'a str),
}

/// Presenter lifecycle for one orchestration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    NotStarted,
    Showing(IndicatorId),
    Closed,
}

pub struct NotificationPresenter {
    sink: Arc<dyn StatusSink>,
    state: PresenterState,
    mode: Option<Mode>,
}

impl NotificationPresenter {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            sink,
            state: PresenterState::NotStarted,
            mode: None,
        }
    }

    pub fn state(&self) -> PresenterState {
        self.state
    }

    /// Show the pending indicator for `mode`
    pub fn begin(&mut self, mode: Mode) {
        self.mode = Some(mode);
        let status = Status {
            kind: StatusKind::Pending,
            title: format!("Setting AirPods to {}...", mode.label()),
            message: None,
        };
        if let Some(id) = self.show(&status) {
            self.state = PresenterState::Showing(id);
        }
    }

    /// Turn the indicator into a success message and close it
    pub fn succeed(&mut self, detail: Option<&str>) {
        let title = match self.mode {
            Some(mode) => format!("AirPods set to {}", mode.label()),
            None => "AirPods mode set".to_string(),
        };
        self.close(Status {
            kind: StatusKind::Success,
            title,
            message: detail.map(str::to_string),
        });
    }

    /// Turn the indicator into a failure message and close it
    pub fn fail(&mut self, failure: Failure<'_>) {
        let generic_title = match self.mode {
            Some(mode) => format!("Failed to set AirPods to {}", mode.label()),
            None => "Failed to set AirPods mode".to_string(),
        };

        let (title, message) = match failure {
            Failure::NotConnected => (
                "AirPods not connected".to_string(),
                "Connect your AirPods to your Mac and try again.".to_string(),
            ),
            Failure::ModifierKeysHeld => (
                generic_title,
                "Release the modifier keys and try again.".to_string(),
            ),
            Failure::Channel(detail) | Failure::Unexpected(detail) => (generic_title, detail.to_string()),
        };

        self.close(Status {
            kind: StatusKind::Failure,
            title,
            message: Some(message),
        });
    }

    fn close(&mut self, status: Status) {
        if self.show(&status).is_some() {
            self.state = PresenterState::Closed;
        }
    }

    /// Open or update the single indicator; `None` once closed
    fn show(&mut self, status: &Status) -> Option<IndicatorId> {
        match self.state {
            PresenterState::NotStarted => Some(self.sink.open(status)),
            PresenterState::Showing(id) => {
                self.sink.update(id, status);
                Some(id)
            }
            PresenterState::Closed => {
                debug!(title = %status.title, "indicator already closed, dropping status");
                None
            }
        }
    }
}

/// Prints indicators as lines, on stdout unless another writer is given
pub struct TerminalSink {
    out: Mutex<Box<dyn Write + Send>>,
    next_id: AtomicU64,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            next_id: AtomicU64::new(0),
        }
    }

    fn print(&self, status: &Status) {
        let marker = match status.kind {
            StatusKind::Pending => "…",
            StatusKind::Success => "✓",
            StatusKind::Failure => "✗",
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let written = match &status.message {
            Some(message) => writeln!(out, "{marker} {}: {message}", status.title),
            None => writeln!(out, "{marker} {}", status.title),
        }
        .and_then(|()| out.flush());
        if let Err(e) = written {
            debug!(?e, title = %status.title, "failed to print status line");
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TerminalSink {
    fn open(&self, status: &Status) -> IndicatorId {
        self.print(status);
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn update(&self, _id: IndicatorId, status: &Status) {
        self.print(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct RecordingSink {
        shown: Mutex<Vec<(IndicatorId, Status)>>,
        opened: AtomicU64,
    }

    impl StatusSink for RecordingSink {
        fn open(&self, status: &Status) -> IndicatorId {
            let id = self.opened.fetch_add(1, Ordering::SeqCst) + 100;
            self.shown.lock().unwrap().push((id, status.clone()));
            id
        }

        fn update(&self, id: IndicatorId, status: &Status) {
            self.shown.lock().unwrap().push((id, status.clone()));
        }
    }

    fn presenter() -> (NotificationPresenter, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (NotificationPresenter::new(sink.clone()), sink)
    }

    #[test]
    fn test_begin_then_succeed_uses_one_indicator() {
        let (mut presenter, sink) = presenter();
        presenter.begin(Mode::Transparency);
        assert_eq!(presenter.state(), PresenterState::Showing(100));

        presenter.succeed(None);
        assert_eq!(presenter.state(), PresenterState::Closed);

        let shown = sink.shown.lock().unwrap();
        assert_eq!(sink.opened.load(Ordering::SeqCst), 1);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].1.title, "Setting AirPods to Transparency...");
        assert_eq!(shown[1].0, 100);
        assert_eq!(shown[1].1.kind, StatusKind::Success);
        assert_eq!(shown[1].1.title, "AirPods set to Transparency");
    }

    #[test]
    fn test_fail_after_close_is_ignored() {
        let (mut presenter, sink) = presenter();
        presenter.begin(Mode::Adaptive);
        presenter.fail(Failure::Channel("Siri not open. Please try again."));
        presenter.succeed(None);
        presenter.fail(Failure::ModifierKeysHeld);

        let shown = sink.shown.lock().unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].1.title, "Failed to set AirPods to Adaptive");
        assert_eq!(
            shown[1].1.message.as_deref(),
            Some("Siri not open. Please try again.")
        );
    }

    #[test]
    fn test_fail_without_begin_opens_single_indicator() {
        let (mut presenter, sink) = presenter();
        presenter.fail(Failure::NotConnected);

        assert_eq!(presenter.state(), PresenterState::Closed);
        let shown = sink.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].1.title, "AirPods not connected");
        assert_eq!(shown[0].1.kind, StatusKind::Failure);
    }

    #[test]
    fn test_repeated_begin_updates_same_indicator() {
        let (mut presenter, sink) = presenter();
        presenter.begin(Mode::NoiseCancellation);
        presenter.begin(Mode::NoiseCancellation);
        presenter.succeed(Some("Mocked device data"));

        assert_eq!(sink.opened.load(Ordering::SeqCst), 1);
        let shown = sink.shown.lock().unwrap();
        assert!(shown.iter().all(|(id, _)| *id == 100));
        assert_eq!(shown[2].1.message.as_deref(), Some("Mocked device data"));
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_terminal_sink_lines() {
        let buffer = SharedBuffer::default();
        let mut presenter = NotificationPresenter::new(Arc::new(TerminalSink::with_writer(buffer.clone())));
        presenter.begin(Mode::Adaptive);
        presenter.fail(Failure::ModifierKeysHeld);

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "… Setting AirPods to Adaptive...\n\
             ✗ Failed to set AirPods to Adaptive: Release the modifier keys and try again.\n"
        );
    }

    #[test]
    fn test_terminal_sink_survives_write_errors() {
        let sink = TerminalSink::with_writer(ClosedPipe);
        let status = Status {
            kind: StatusKind::Pending,
            title: "Setting AirPods to Transparency...".into(),
            message: None,
        };

        assert_eq!(sink.open(&status), 0);
        sink.update(0, &status);
        assert_eq!(sink.open(&status), 1);
    }
}
