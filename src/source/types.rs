use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Identity of one input file. Paths are compared as given by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One input file's contribution to a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub ordinal: usize,
    pub identity: FileId,
    pub text: String,
    pub content_line_count: usize,
    pub trailing_padding_lines: usize,
    pub total_line_count: usize,
}

impl Source {
    /// Text exactly as written into the assembled stream, padding included.
    pub fn padded_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + 3);
        out.push_str(&self.text);
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            out.push('\n');
        }
        for _ in 0..self.trailing_padding_lines {
            out.push('\n');
        }
        out
    }
}

/// Ordered sources of one build plus the lines injected ahead of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledStream {
    pub sources: Vec<Source>,
    pub leading_offset: usize,
    pub uses_execution: bool,
}

impl AssembledStream {
    pub fn text(&self) -> String {
        self.sources.iter().map(Source::padded_text).collect()
    }

    pub fn total_lines(&self) -> usize {
        self.sources.iter().map(|s| s.total_line_count).sum()
    }

    pub fn with_leading_offset(mut self, leading_offset: usize) -> Self {
        self.leading_offset = leading_offset;
        self
    }
}
