use crate::linemap::LineMapIndex;
use crate::source::FileId;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Raw result of one converter process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterRun {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// A parse error, attributed to a source file when its line maps back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: Option<FileId>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterOutcome {
    Rendered(String),
    ParseError(Diagnostic),
    /// Anything unrecognised. Scroll sync is disabled for this build.
    Fatal(String),
}

static POSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(line (\d+),\s*column (\d+)\)|\bat line (\d+),\s*column (\d+)")
        .expect("valid position regex")
});

/// Extract the first `line N, column M` position from converter stderr.
pub fn find_position(stderr: &str) -> Option<(usize, usize)> {
    let caps = POSITION.captures(stderr)?;
    let line = caps.get(1).or_else(|| caps.get(3))?.as_str().parse().ok()?;
    let column = caps.get(2).or_else(|| caps.get(4))?.as_str().parse().ok()?;
    Some((line, column))
}

/// Classify a finished converter run. `map` is the index built for the
/// same input, used to attribute parse errors.
pub fn classify(run: ConverterRun, map: &LineMapIndex) -> ConverterOutcome {
    let message = run.stderr.trim().to_string();

    if run.success {
        if !message.is_empty() {
            warn!("converter: {}", message);
        }
        return ConverterOutcome::Rendered(run.stdout);
    }

    let Some((output_line, column)) = find_position(&run.stderr) else {
        return ConverterOutcome::Fatal(message);
    };

    let diagnostic = match map.inverse_output(output_line) {
        Some((file, line)) => {
            debug!(
                "parse error at input line {} -> {}:{}",
                output_line, file, line
            );
            Diagnostic {
                file: Some(file.clone()),
                line: Some(line),
                column: Some(column),
                message,
            }
        }
        None => Diagnostic {
            file: None,
            line: None,
            column: None,
            message,
        },
    };
    ConverterOutcome::ParseError(diagnostic)
}
