use std::path::Path;

/// Formats in the CommonMark family. These only accept hyphenated
/// attribute classes, so code-execution markers are matched more strictly.
const COMMONMARK_FAMILY: &[&str] = &["commonmark", "commonmark_x", "gfm"];

/// Formats read through a bundled custom reader that expects a JSON
/// `{"sources": [...]}` header line ahead of the content.
pub const WRAPPED_FORMATS: &[&str] = &[
    "commonmark",
    "commonmark_x",
    "gfm",
    "markdown",
    "markdown_mmd",
    "markdown_phpextra",
    "markdown_strict",
    "latex",
    "org",
    "rst",
    "textile",
];

/// A converter input format, optionally carrying `+ext`/`-ext` modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFormat {
    name: String,
}

impl InputFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Full format string including extension modifiers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format name with extension modifiers stripped.
    pub fn base_name(&self) -> &str {
        self.name
            .split(['+', '-'])
            .next()
            .unwrap_or(self.name.as_str())
    }

    /// Extension modifiers (`+smart-raw_html`), if any.
    pub fn extensions(&self) -> &str {
        &self.name[self.base_name().len()..]
    }

    pub fn is_commonmark(&self) -> bool {
        COMMONMARK_FAMILY.contains(&self.base_name())
    }

    pub fn is_wrapped(&self) -> bool {
        WRAPPED_FORMATS.contains(&self.base_name())
    }
}

impl Default for InputFormat {
    fn default() -> Self {
        Self::new("markdown")
    }
}

/// Guess an input format from a file extension.
pub fn format_for_path(path: &Path) -> Option<InputFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let name = match ext.as_str() {
        "md" | "markdown" | "cbmd" => "markdown",
        "org" => "org",
        "rst" => "rst",
        "tex" | "latex" => "latex",
        "textile" => "textile",
        _ => return None,
    };
    Some(InputFormat::new(name))
}
