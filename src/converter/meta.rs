//! YAML metadata block carrying execution results to the converter.

use crate::cache::{ExecutionCache, FragmentOutput, OutputSlot};
use std::fmt::Write as _;

/// A `---` ... `---`/`...` block at the very start of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingMetadata<'a> {
    /// Lines between the delimiters, newline-terminated.
    pub body: &'a str,
    /// Lines taken by the whole block, delimiters included.
    pub line_count: usize,
    /// Everything after the closing delimiter line.
    pub rest: &'a str,
}

pub fn split_leading_metadata(text: &str) -> Option<LeadingMetadata<'_>> {
    let mut lines = text.split_inclusive('\n');
    let opening = lines.next()?;
    if opening.trim_end() != "---" {
        return None;
    }
    let body_start = opening.len();
    let mut pos = body_start;
    let mut line_count = 1;

    for (i, line) in lines.enumerate() {
        // `---` followed by a blank line is a horizontal rule, not metadata.
        if i == 0 && line.trim().is_empty() {
            return None;
        }
        line_count += 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            if !line.ends_with('\n') {
                return None;
            }
            return Some(LeadingMetadata {
                body: &text[body_start..pos],
                line_count,
                rest: &text[pos + line.len()..],
            });
        }
        pos += line.len();
    }
    None
}

fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Value wrapped in backticks so the converter keeps it verbatim.
fn code_quoted(s: &str) -> String {
    quoted(&format!("`{s}`"))
}

/// Emit one output string as a list item at `indent`. Strings a literal
/// block cannot reproduce exactly fall back to a quoted scalar.
fn push_output_item(yaml: &mut String, indent: &str, text: &str) {
    // Block indentation is detected from the first non-empty line.
    let first_content = text.split('\n').find(|line| !line.is_empty());
    let literal_safe = first_content.is_some_and(|line| !line.starts_with([' ', '\t']))
        && !text.ends_with("\n\n")
        && !text.contains('\r');

    if !literal_safe {
        let _ = writeln!(yaml, "{indent}- {}", quoted(text));
        return;
    }

    let (body, indicator) = match text.strip_suffix('\n') {
        Some(body) => (body, "|"),
        None => (text, "|-"),
    };
    let _ = writeln!(yaml, "{indent}- {indicator}");
    for line in body.split('\n') {
        if line.is_empty() {
            yaml.push('\n');
        } else {
            let _ = writeln!(yaml, "{indent}  {line}");
        }
    }
}

fn push_fragment(yaml: &mut String, out: &FragmentOutput, stale: bool) {
    let _ = writeln!(yaml, "  - inline: {}", out.inline);
    let _ = writeln!(yaml, "    attr_hash: {}", code_quoted(&out.attr_hash));
    let _ = writeln!(yaml, "    code_hash: {}", code_quoted(&out.code_hash));
    if stale {
        yaml.push_str("    stale: true\n");
    }
    if out.output.is_empty() {
        yaml.push_str("    output: []\n");
    } else {
        yaml.push_str("    output:\n");
        for text in &out.output {
            push_output_item(yaml, "    ", text);
        }
    }
}

/// The `codebraid_meta` and `codebraid_output` keys, without delimiters.
pub fn codebraid_yaml(cache: &ExecutionCache, commonmark: bool, running: bool) -> String {
    let mut yaml = String::new();
    yaml.push_str("codebraid_meta:\n");
    let _ = writeln!(yaml, "  commonmark: {commonmark}");
    let _ = writeln!(yaml, "  running: {running}");

    if cache.processing().is_empty() {
        yaml.push_str("  collection_processing: {}\n");
    } else {
        yaml.push_str("  collection_processing:\n");
        for (key, processing) in cache.processing() {
            let _ = writeln!(yaml, "    {}: {}", quoted(&key.to_string()), processing);
        }
    }

    if cache.placeholder_langs().is_empty() {
        yaml.push_str("  placeholder_langs: {}\n");
    } else {
        yaml.push_str("  placeholder_langs:\n");
        for (lang, display) in cache.placeholder_langs() {
            let _ = writeln!(yaml, "    {}: {}", quoted(lang), code_quoted(display));
        }
    }

    let keys = cache.keys();
    if keys.is_empty() {
        yaml.push_str("codebraid_output: {}\n");
        return yaml;
    }
    yaml.push_str("codebraid_output:\n");
    for key in keys {
        let slots = cache.render(key);
        if slots.is_empty() {
            let _ = writeln!(yaml, "  {}: []", quoted(&key.to_string()));
            continue;
        }
        let _ = writeln!(yaml, "  {}:", quoted(&key.to_string()));
        for slot in slots {
            match slot {
                OutputSlot::Fresh(out) => push_fragment(&mut yaml, out, false),
                OutputSlot::Stale(out) => push_fragment(&mut yaml, out, true),
                OutputSlot::Placeholder => yaml.push_str("  - placeholder: true\n"),
            }
        }
    }
    yaml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AnnouncedCollection, CodeCollectionKey};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn splits_leading_block() {
        let text = "---\ntitle: Demo\nauthor: Me\n...\n# Body\n";
        let block = split_leading_metadata(text).unwrap();
        assert_eq!(block.body, "title: Demo\nauthor: Me\n");
        assert_eq!(block.line_count, 4);
        assert_eq!(block.rest, "# Body\n");
    }

    #[test]
    fn horizontal_rule_is_not_metadata() {
        assert_eq!(split_leading_metadata("---\n\ntext\n---\n"), None);
        assert_eq!(split_leading_metadata("# Title\n---\na: b\n---\n"), None);
        assert_eq!(split_leading_metadata("---\na: b\n"), None);
    }

    #[test]
    fn renders_placeholders_stale_and_fresh_slots() {
        let key = CodeCollectionKey::new("code", "python", "main");
        let mut cache = ExecutionCache::new();
        cache.begin_run();
        cache.on_index_announcement(
            &[AnnouncedCollection {
                key: key.clone(),
                length: 2,
            }],
            BTreeMap::from([("python".to_string(), "python".to_string())]),
        );
        cache
            .on_output_fragment(
                &key,
                1,
                2,
                FragmentOutput {
                    inline: true,
                    attr_hash: "ah".into(),
                    code_hash: "ch".into(),
                    output: vec!["line 1\nline 2\n".into(), "".into()],
                },
            )
            .unwrap();

        let yaml = codebraid_yaml(&cache, false, true);
        assert_eq!(
            yaml,
            r#"codebraid_meta:
  commonmark: false
  running: true
  collection_processing:
    "code.python.main": true
  placeholder_langs:
    "python": "`python`"
codebraid_output:
  "code.python.main":
  - inline: true
    attr_hash: "`ah`"
    code_hash: "`ch`"
    output:
    - |
      line 1
      line 2
    - ""
  - placeholder: true
"#
        );
    }

    #[test]
    fn empty_cache_still_produces_valid_keys() {
        let yaml = codebraid_yaml(&ExecutionCache::new(), true, false);
        assert!(yaml.contains("collection_processing: {}\n"));
        assert!(yaml.ends_with("codebraid_output: {}\n"));
    }

    #[test]
    fn output_without_newline_uses_strip_chomping() {
        let mut yaml = String::new();
        push_output_item(&mut yaml, "    ", "a\n\nb");
        assert_eq!(yaml, "    - |-\n      a\n\n      b\n");

        let mut yaml = String::new();
        push_output_item(&mut yaml, "    ", "  indented");
        assert_eq!(yaml, "    - \"  indented\"\n");
    }

    #[test]
    fn indentation_after_leading_blank_lines_is_preserved() {
        let mut yaml = String::new();
        push_output_item(&mut yaml, "    ", "\n  <div>x</div>\n");
        assert_eq!(yaml, "    - \"\\n  <div>x</div>\\n\"\n");

        let mut yaml = String::new();
        push_output_item(&mut yaml, "    ", "\n<div>x</div>\n");
        assert_eq!(yaml, "    - |\n\n      <div>x</div>\n");
    }

    #[test]
    fn newline_only_output_is_quoted() {
        for text in ["\n", "\n\n\n", "   \n"] {
            let mut yaml = String::new();
            push_output_item(&mut yaml, "    ", text);
            assert_eq!(yaml, format!("    - {}\n", quoted(text)));
        }
    }
}
