use super::format::InputFormat;
use super::markers::has_execution_marker;
use super::types::{AssembledStream, FileId, Source};
use crate::error::{PreviewError, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Count lines the way an editor does: a final line without a newline
/// still counts.
pub fn count_content_lines(text: &str) -> usize {
    let newlines = text.bytes().filter(|&b| b == b'\n').count();
    if !text.is_empty() && !text.ends_with('\n') {
        newlines + 1
    } else {
        newlines
    }
}

/// Blank lines needed so the next source starts after an empty line.
pub fn padding_lines(text: &str) -> usize {
    if text.ends_with("\n\n") {
        0
    } else if text.ends_with('\n') {
        1
    } else {
        2
    }
}

/// Builds one `AssembledStream` per build. Lives as long as the panel so
/// code-execution detection stays on once it has been seen.
#[derive(Debug, Clone)]
pub struct SourceAssembler {
    format: InputFormat,
    uses_execution: bool,
}

impl SourceAssembler {
    pub fn new(format: InputFormat) -> Self {
        Self {
            format,
            uses_execution: false,
        }
    }

    pub fn format(&self) -> &InputFormat {
        &self.format
    }

    pub fn uses_execution(&self) -> bool {
        self.uses_execution
    }

    /// Assemble already-loaded texts, in order.
    pub fn assemble(&mut self, inputs: Vec<(FileId, String)>) -> AssembledStream {
        let mut sources = Vec::with_capacity(inputs.len());

        for (ordinal, (identity, text)) in inputs.into_iter().enumerate() {
            if !self.uses_execution && has_execution_marker(&text, self.format.is_commonmark()) {
                info!("code execution markers found in {}", identity);
                self.uses_execution = true;
            }

            let content_line_count = count_content_lines(&text);
            let trailing_padding_lines = padding_lines(&text);
            sources.push(Source {
                ordinal,
                identity,
                text,
                content_line_count,
                trailing_padding_lines,
                total_line_count: content_line_count + trailing_padding_lines,
            });
        }

        AssembledStream {
            sources,
            leading_offset: 0,
            uses_execution: self.uses_execution,
        }
    }

    /// Read every file (preferring unsaved editor text from `overrides`)
    /// and assemble them. Any unreadable file aborts the whole assembly.
    pub fn assemble_files(
        &mut self,
        paths: &[PathBuf],
        overrides: &HashMap<FileId, String>,
    ) -> Result<AssembledStream> {
        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let identity = FileId::from_path(path);
            let text = match overrides.get(&identity) {
                Some(text) => text.clone(),
                None => fs::read_to_string(path).map_err(|e| {
                    debug!("failed to read {}: {}", path.display(), e);
                    PreviewError::MissingInput(path.display().to_string())
                })?,
            };
            inputs.push((identity, text));
        }
        Ok(self.assemble(inputs))
    }
}
