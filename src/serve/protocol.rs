use crate::panel::PanelEvent;
use crate::source::FileId;
use serde::Deserialize;
use std::path::PathBuf;

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Open { files: Vec<PathBuf> },
    Edit { file: FileId, text: String },
    Visible { visible: bool },
    Execute,
    ScrollEditor { file: FileId, line: usize },
    ScrollPreview { line: usize },
    Close,
}

impl Request {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// The panel event for requests that go straight to an open panel.
    /// `Open` is handled by the server itself.
    pub fn into_panel_event(self) -> Option<PanelEvent> {
        match self {
            Request::Open { .. } => None,
            Request::Edit { file, text } => Some(PanelEvent::Edit { file, text }),
            Request::Visible { visible } => Some(PanelEvent::Visibility(visible)),
            Request::Execute => Some(PanelEvent::Execute),
            Request::ScrollEditor { file, line } => Some(PanelEvent::ScrollEditor { file, line }),
            Request::ScrollPreview { line } => Some(PanelEvent::ScrollPreview { line }),
            Request::Close => Some(PanelEvent::Close),
        }
    }
}
