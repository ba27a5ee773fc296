mod assembler;
mod format;
mod markers;
mod types;

pub use assembler::{count_content_lines, padding_lines, SourceAssembler};
pub use format::{format_for_path, InputFormat, WRAPPED_FORMATS};
pub use markers::has_execution_marker;
pub use types::{AssembledStream, FileId, Source};
