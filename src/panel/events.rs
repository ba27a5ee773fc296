use crate::converter::{ConverterRun, Diagnostic};
use crate::engine::EngineEvent;
use crate::source::FileId;
use serde::Serialize;

/// Everything a panel reacts to. Host requests and subprocess callbacks
/// share one queue, so they are handled strictly one at a time.
#[derive(Debug)]
pub enum PanelEvent {
    /// Unsaved editor text for one of the panel's files.
    Edit { file: FileId, text: String },
    Visibility(bool),
    /// Start a code-execution run.
    Execute,
    ScrollEditor { file: FileId, line: usize },
    ScrollPreview { line: usize },
    BuildFinished {
        build: u64,
        result: Result<ConverterRun, String>,
    },
    EngineOutput { run: u64, event: EngineEvent },
    Close,
}

/// What a panel reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    Rendered {
        html: String,
    },
    Diagnostic(Diagnostic),
    /// The converter failed outright; the preview is blank and scroll sync
    /// is off until the next successful build.
    BuildFailed {
        message: String,
    },
    Status {
        running: bool,
        processing: Vec<String>,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
    /// Scroll target: a preview line when `file` is `None`, else an
    /// editor position.
    Scroll {
        file: Option<FileId>,
        line: usize,
    },
}
