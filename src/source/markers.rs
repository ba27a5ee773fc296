use once_cell::sync::Lazy;
use regex::Regex;

const COMMANDS: &str = "code|expr|nb|outside_main|paste|run";

static COMMONMARK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\{{[^}}\n]*\.cb-(?:{COMMANDS})\b[^}}\n]*\}}"))
        .expect("valid marker regex")
});

static PANDOC_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\{{[^}}\n]*\.cb[.\-](?:{COMMANDS})\b[^}}\n]*\}}"))
        .expect("valid marker regex")
});

/// Check whether `text` contains a code-execution attribute such as
/// `{.python .cb-run}`. CommonMark formats only accept the hyphenated form.
pub fn has_execution_marker(text: &str, commonmark: bool) -> bool {
    if commonmark {
        COMMONMARK_MARKER.is_match(text)
    } else {
        PANDOC_MARKER.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_marker_matches_everywhere() {
        let text = "```{.python .cb-run}\nprint(1)\n```\n";
        assert!(has_execution_marker(text, true));
        assert!(has_execution_marker(text, false));
    }

    #[test]
    fn dotted_marker_is_pandoc_only() {
        let text = "`1+1`{.python .cb.expr}";
        assert!(!has_execution_marker(text, true));
        assert!(has_execution_marker(text, false));
    }

    #[test]
    fn marker_outside_attributes_is_ignored() {
        assert!(!has_execution_marker("use .cb-run to execute", false));
        assert!(!has_execution_marker("{.python .cb-running}", false));
        assert!(!has_execution_marker("{.python\n.cb-run}", false));
    }
}
