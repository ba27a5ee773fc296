mod diagnostics;
mod input;
mod meta;
mod process;

pub use diagnostics::{classify, find_position, ConverterOutcome, ConverterRun, Diagnostic};
pub use input::{ConverterInput, ExecutionMeta, SourceEntry, SourcesHeader};
pub use meta::{codebraid_yaml, split_leading_metadata, LeadingMetadata};
pub use process::run_converter;
