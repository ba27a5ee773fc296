//! Two-way line mapping between per-file editor lines and lines of the
//! assembled converter input.
//!
//! Assembled lines are 1-indexed and do not include the leading offset;
//! output lines reported by the converter do. `forward` adds the offset,
//! `inverse` expects it to be removed already, `inverse_output` removes it.

use crate::source::{AssembledStream, FileId, Source};

/// Inclusive 1-indexed window a file occupies in the assembled stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Line windows for one completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMapIndex {
    ranges: Vec<(FileId, LineRange)>,
    offset: usize,
}

impl LineMapIndex {
    pub fn build(sources: &[Source], leading_offset: usize) -> Self {
        let mut ranges: Vec<(FileId, LineRange)> = Vec::with_capacity(sources.len());
        let mut previous_end = 0usize;

        for source in sources {
            let start = previous_end + 1;
            let end = start + source.total_line_count - 1;
            previous_end = end;

            // A file included twice keeps its first window.
            if !ranges.iter().any(|(id, _)| *id == source.identity) {
                ranges.push((source.identity.clone(), LineRange { start, end }));
            }
        }

        Self {
            ranges,
            offset: leading_offset,
        }
    }

    pub fn from_stream(stream: &AssembledStream) -> Self {
        Self::build(&stream.sources, stream.leading_offset)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn range(&self, identity: &FileId) -> Option<LineRange> {
        self.ranges
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, range)| *range)
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileId, LineRange)> {
        self.ranges.iter().map(|(id, range)| (id, *range))
    }

    /// File-local line → converter output line.
    pub fn forward(&self, identity: &FileId, local_line: usize) -> Option<usize> {
        let range = self.range(identity)?;
        if local_line == 0 || local_line > range.len() {
            return None;
        }
        Some(local_line + range.start - 1 + self.offset)
    }

    /// Assembled line (offset already removed) → file-local line.
    pub fn inverse(&self, assembled_line: usize) -> Option<(&FileId, usize)> {
        self.ranges
            .iter()
            .find(|(_, range)| range.contains(assembled_line))
            .map(|(id, range)| (id, assembled_line - range.start + 1))
    }

    /// Converter output line → file-local line. Lines inside the injected
    /// prefix have no source.
    pub fn inverse_output(&self, output_line: usize) -> Option<(&FileId, usize)> {
        let assembled = output_line.checked_sub(self.offset)?;
        self.inverse(assembled)
    }
}
