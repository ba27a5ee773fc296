use super::meta::{codebraid_yaml, split_leading_metadata};
use crate::cache::ExecutionCache;
use crate::source::AssembledStream;
use serde::{Deserialize, Serialize};

/// Header line read by the custom readers to split the stream per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesHeader {
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub lines: usize,
}

/// Execution state to inline as metadata.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionMeta<'a> {
    pub cache: &'a ExecutionCache,
    pub commonmark: bool,
    pub running: bool,
}

/// Converter stdin plus the number of lines it injects ahead of user
/// content (not counting the sources header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterInput {
    pub payload: String,
    pub leading_offset: usize,
}

impl ConverterInput {
    pub fn prepare(
        stream: &AssembledStream,
        wrapped: bool,
        execution: Option<ExecutionMeta<'_>>,
    ) -> serde_json::Result<Self> {
        let (content, leading_offset) = match execution {
            Some(meta) => with_metadata(stream, meta),
            None => (stream.text(), 0),
        };

        let mut payload = String::with_capacity(content.len() + 128);
        if wrapped {
            let header = SourcesHeader {
                sources: stream
                    .sources
                    .iter()
                    .enumerate()
                    .map(|(i, s)| SourceEntry {
                        name: s.identity.to_string(),
                        lines: if i == 0 {
                            s.total_line_count + leading_offset
                        } else {
                            s.total_line_count
                        },
                    })
                    .collect(),
            };
            payload.push_str(&serde_json::to_string(&header)?);
            payload.push('\n');
        }
        payload.push_str(&content);

        Ok(Self {
            payload,
            leading_offset,
        })
    }
}

/// Put the synthesized block ahead of the content. A metadata block already
/// opening the first source is merged into it rather than repeated.
fn with_metadata(stream: &AssembledStream, meta: ExecutionMeta<'_>) -> (String, usize) {
    let yaml = codebraid_yaml(meta.cache, meta.commonmark, meta.running);
    let yaml_lines = yaml.matches('\n').count();

    let mut sources = stream.sources.iter();
    let first = match sources.next() {
        Some(first) => first.padded_text(),
        None => return (format!("---\n{yaml}---\n"), yaml_lines + 2),
    };

    let mut out = String::with_capacity(first.len() + yaml.len() + 64);
    out.push_str("---\n");
    let leading_offset = match split_leading_metadata(&first) {
        // Generated keys go first so every user line shifts by the same amount.
        Some(block) => {
            out.push_str(&yaml);
            out.push_str(block.body);
            out.push_str("---\n");
            out.push_str(block.rest);
            yaml_lines
        }
        None => {
            out.push_str(&yaml);
            out.push_str("---\n");
            out.push_str(&first);
            yaml_lines + 2
        }
    };
    for source in sources {
        out.push_str(&source.padded_text());
    }
    (out, leading_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{classify, ConverterOutcome, ConverterRun};
    use crate::linemap::LineMapIndex;
    use crate::source::{FileId, InputFormat, SourceAssembler};
    use pretty_assertions::assert_eq;

    fn stream(texts: &[(&str, &str)]) -> AssembledStream {
        SourceAssembler::new(InputFormat::default()).assemble(
            texts
                .iter()
                .map(|(id, text)| (FileId::from(*id), text.to_string()))
                .collect(),
        )
    }

    fn line_of(payload: &str, needle: &str) -> usize {
        payload
            .lines()
            .position(|l| l == needle)
            .map(|i| i + 1)
            .unwrap()
    }

    #[test]
    fn plain_stream_has_no_prefix() {
        let s = stream(&[("a.md", "# A\n")]);
        let input = ConverterInput::prepare(&s, false, None).unwrap();
        assert_eq!(input.payload, "# A\n\n");
        assert_eq!(input.leading_offset, 0);
    }

    #[test]
    fn wrapped_formats_get_sources_header() {
        let s = stream(&[("a.md", "a"), ("b.md", "b\n\n")]);
        let input = ConverterInput::prepare(&s, true, None).unwrap();
        let (header, body) = input.payload.split_once('\n').unwrap();
        assert_eq!(
            header,
            r#"{"sources":[{"name":"a.md","lines":3},{"name":"b.md","lines":2}]}"#
        );
        assert_eq!(body, "a\n\n\nb\n\n");
    }

    #[test]
    fn synthesized_block_offset_matches_injected_lines() {
        let cache = ExecutionCache::new();
        let s = stream(&[("a.md", "first\nsecond\n"), ("b.md", "third\n")]);
        let meta = ExecutionMeta {
            cache: &cache,
            commonmark: false,
            running: false,
        };
        let input = ConverterInput::prepare(&s, false, Some(meta)).unwrap();
        let map = LineMapIndex::from_stream(&s.clone().with_leading_offset(input.leading_offset));

        assert!(input.payload.starts_with("---\ncodebraid_meta:\n"));
        let a = FileId::from("a.md");
        let b = FileId::from("b.md");
        assert_eq!(map.forward(&a, 2), Some(line_of(&input.payload, "second")));
        assert_eq!(map.forward(&b, 1), Some(line_of(&input.payload, "third")));
    }

    #[test]
    fn existing_metadata_block_is_reused() {
        let cache = ExecutionCache::new();
        let s = stream(&[("a.md", "---\ntitle: T\n---\nbody\n")]);
        let meta = ExecutionMeta {
            cache: &cache,
            commonmark: true,
            running: true,
        };
        let input = ConverterInput::prepare(&s, true, Some(meta)).unwrap();
        let (header, body) = input.payload.split_once('\n').unwrap();

        assert!(body.starts_with("---\ncodebraid_meta:\n"));
        assert_eq!(body.matches("---\n").count(), 2);
        let map = LineMapIndex::from_stream(&s.clone().with_leading_offset(input.leading_offset));
        assert_eq!(map.forward(&FileId::from("a.md"), 2), Some(line_of(body, "title: T")));
        assert_eq!(map.forward(&FileId::from("a.md"), 4), Some(line_of(body, "body")));

        let expected_lines = s.sources[0].total_line_count + input.leading_offset;
        assert_eq!(
            header,
            format!(r#"{{"sources":[{{"name":"a.md","lines":{expected_lines}}}]}}"#)
        );
        assert_eq!(body.matches('\n').count(), expected_lines);
    }

    #[test]
    fn front_matter_lines_map_to_themselves() {
        let cache = ExecutionCache::new();
        let mut text = String::from("---\n");
        for i in 1..=10 {
            text.push_str(&format!("k{i}: {i}\n"));
        }
        text.push_str("bad: [\n---\nbody\n");
        let s = stream(&[("doc.md", text.as_str())]);
        let meta = ExecutionMeta {
            cache: &cache,
            commonmark: false,
            running: false,
        };
        let input = ConverterInput::prepare(&s, false, Some(meta)).unwrap();
        let map = LineMapIndex::from_stream(&s.clone().with_leading_offset(input.leading_offset));
        let doc = FileId::from("doc.md");

        for local in 2..=14 {
            let target = map.forward(&doc, local).unwrap();
            let source_line = text.lines().nth(local - 1).unwrap();
            assert_eq!(input.payload.lines().nth(target - 1), Some(source_line));
            assert_eq!(map.inverse_output(target), Some((&doc, local)));
        }

        let bad_line = line_of(&input.payload, "bad: [");
        let run = ConverterRun {
            success: false,
            stdout: String::new(),
            stderr: format!("YAML parse exception at line {bad_line}, column 6"),
        };
        match classify(run, &map) {
            ConverterOutcome::ParseError(diagnostic) => {
                assert_eq!(diagnostic.file, Some(doc.clone()));
                assert_eq!(diagnostic.line, Some(12));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
