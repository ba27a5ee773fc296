//! Live preview for documents with executable code.
//!
//! Sources are assembled into one stream, converted by an external
//! document converter, and kept in sync with the editor. Code execution
//! runs in a separate engine process whose results stream back into a
//! two-generation cache and are injected into later builds.

pub mod cache;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod linemap;
pub mod panel;
pub mod render;
pub mod scheduler;
pub mod serve;
pub mod source;

pub use cache::{CodeCollectionKey, ExecutionCache, OutputSlot};
pub use config::PreviewConfig;
pub use error::{PreviewError, ProtocolError, Result};
pub use linemap::LineMapIndex;
pub use panel::{Notification, PanelEvent, PanelHandle};
pub use render::{render_document, RenderReport};
pub use source::{AssembledStream, FileId, Source, SourceAssembler};
