use crate::error::{PreviewError, Result};
use crate::source::{format_for_path, InputFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Preview settings, loaded from TOML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Converter executable, optionally with leading arguments
    pub converter_command: String,

    /// Extra converter arguments appended after the format options
    pub converter_args: String,

    /// Directory holding `<format>.lua` readers that accept the sources header
    pub reader_dir: Option<PathBuf>,

    /// Code-execution engine executable
    pub engine_command: String,

    /// Input format; guessed from the first file's extension when unset
    pub from_format: Option<String>,

    /// Output format
    pub to_format: String,

    /// Minimum time between the starts of two builds
    pub min_build_interval_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            converter_command: "pandoc".to_string(),
            converter_args: String::new(),
            reader_dir: None,
            engine_command: "codebraid".to_string(),
            from_format: None,
            to_format: "html".to_string(),
            min_build_interval_ms: 1000,
        }
    }
}

fn split_command(line: &str) -> Result<Vec<String>> {
    shlex::split(line).ok_or_else(|| PreviewError::InvalidCommand(line.to_string()))
}

/// Like `split_command`, but the line must name a program.
fn split_program(line: &str) -> Result<Vec<String>> {
    let argv = split_command(line)?;
    if argv.is_empty() {
        return Err(PreviewError::InvalidCommand(line.to_string()));
    }
    Ok(argv)
}

impl PreviewConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn min_build_interval(&self) -> Duration {
        Duration::from_millis(self.min_build_interval_ms)
    }

    /// Configured format, else a guess from `first_file`, else markdown.
    pub fn input_format(&self, first_file: Option<&Path>) -> InputFormat {
        if let Some(name) = &self.from_format {
            return InputFormat::new(name.clone());
        }
        first_file.and_then(format_for_path).unwrap_or_default()
    }

    /// Whether the stream is read through a custom reader that expects
    /// the JSON sources header.
    pub fn uses_wrapped_reader(&self, format: &InputFormat) -> bool {
        self.reader_dir.is_some() && format.is_wrapped()
    }

    pub fn converter_argv(&self, format: &InputFormat) -> Result<Vec<String>> {
        let mut argv = split_program(&self.converter_command)?;
        let from = match (&self.reader_dir, format.is_wrapped()) {
            (Some(dir), true) => format!(
                "{}{}",
                dir.join(format!("{}.lua", format.base_name())).display(),
                format.extensions()
            ),
            _ => format.name().to_string(),
        };
        argv.extend(["--from".to_string(), from]);
        argv.extend(["--to".to_string(), self.to_format.clone()]);
        argv.extend(split_command(&self.converter_args)?);
        Ok(argv)
    }

    pub fn engine_argv(&self, format: &InputFormat) -> Result<Vec<String>> {
        let mut argv = split_program(&self.engine_command)?;
        argv.extend(
            [
                "pandoc",
                "--only-code-output",
                "codebraid_preview",
                "--stdin-json-header",
                "--from",
                format.name(),
                "--to",
                self.to_format.as_str(),
            ]
            .map(String::from),
        );
        Ok(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(PreviewConfig::from_toml_str("").unwrap(), PreviewConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = PreviewConfig::from_toml_str(
            r#"
            converter_command = "/opt/pandoc/bin/pandoc --quiet"
            min_build_interval_ms = 250
            reader_dir = "/usr/share/preview/readers"
            "#,
        )
        .unwrap();
        assert_eq!(config.min_build_interval(), Duration::from_millis(250));

        let argv = config
            .converter_argv(&InputFormat::new("commonmark_x+sourcepos"))
            .unwrap();
        assert_eq!(
            argv,
            vec![
                "/opt/pandoc/bin/pandoc",
                "--quiet",
                "--from",
                "/usr/share/preview/readers/commonmark_x.lua+sourcepos",
                "--to",
                "html",
            ]
        );
    }

    #[test]
    fn unwrapped_format_is_passed_through() {
        let config = PreviewConfig {
            converter_args: "--mathjax --metadata 'title=My Doc'".to_string(),
            ..Default::default()
        };
        let fmt = InputFormat::new("docbook");
        assert!(!config.uses_wrapped_reader(&fmt));
        let argv = config.converter_argv(&fmt).unwrap();
        assert_eq!(&argv[1..3], &["--from", "docbook"]);
        assert_eq!(&argv[5..], &["--mathjax", "--metadata", "title=My Doc"]);
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let config = PreviewConfig {
            engine_command: "codebraid 'oops".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.engine_argv(&InputFormat::default()),
            Err(PreviewError::InvalidCommand(_))
        ));
    }

    #[test]
    fn empty_converter_command_is_rejected() {
        let config = PreviewConfig {
            converter_command: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.converter_argv(&InputFormat::default()),
            Err(PreviewError::InvalidCommand(_))
        ));
    }

    #[test]
    fn format_falls_back_to_extension() {
        let config = PreviewConfig::default();
        assert_eq!(
            config.input_format(Some(Path::new("doc.rst"))),
            InputFormat::new("rst")
        );
        assert_eq!(config.input_format(None), InputFormat::new("markdown"));
    }
}
