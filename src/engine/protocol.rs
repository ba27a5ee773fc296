use crate::cache::{AnnouncedCollection, CodeCollectionKey, FragmentOutput};
use crate::error::ProtocolError;
use crate::source::AssembledStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// First stdin line sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginManifest {
    pub origins: Vec<Origin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub path: String,
    pub lines: usize,
}

impl OriginManifest {
    pub fn for_stream(stream: &AssembledStream) -> Self {
        Self {
            origins: stream
                .sources
                .iter()
                .map(|s| Origin {
                    path: s.identity.to_string(),
                    lines: s.total_line_count,
                })
                .collect(),
        }
    }
}

/// Full engine stdin: manifest line followed by the padded sources.
pub fn engine_stdin(stream: &AssembledStream) -> serde_json::Result<String> {
    let mut payload = serde_json::to_string(&OriginManifest::for_stream(stream))?;
    payload.push('\n');
    payload.push_str(&stream.text());
    Ok(payload)
}

#[derive(Debug, Clone, Deserialize)]
struct WireCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lang: Option<String>,
    name: String,
    #[serde(default)]
    length: usize,
}

impl WireCollection {
    fn key(&self) -> CodeCollectionKey {
        CodeCollectionKey::new(
            self.kind.clone(),
            self.lang.clone().unwrap_or_default(),
            self.name.clone(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IndexBody {
    code_collections: Vec<WireCollection>,
    #[serde(default)]
    placeholder_langs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputBody {
    code_collection: WireCollection,
    number: String,
    #[serde(default)]
    inline: bool,
    #[serde(default)]
    attr_hash: String,
    #[serde(default)]
    code_hash: String,
    #[serde(default)]
    output: Vec<String>,
}

/// One decoded line of engine stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    Index {
        collections: Vec<AnnouncedCollection>,
        placeholder_langs: BTreeMap<String, String>,
    },
    Output {
        key: CodeCollectionKey,
        position: usize,
        declared_length: usize,
        output: FragmentOutput,
    },
}

/// Parse `"i/n"` into its 1-indexed position and collection length.
pub fn parse_number(number: &str) -> Result<(usize, usize), ProtocolError> {
    let bad = || ProtocolError::BadNumber(number.to_string());
    let (position, length) = number.split_once('/').ok_or_else(bad)?;
    let position = position.trim().parse().map_err(|_| bad())?;
    let length = length.trim().parse().map_err(|_| bad())?;
    Ok((position, length))
}

impl EngineMessage {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let malformed = |reason: String| ProtocolError::MalformedLine {
            line: line.to_string(),
            reason,
        };

        let value: Value = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
        let message_type = value
            .get("message_type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing message_type".to_string()))?
            .to_string();

        match message_type.as_str() {
            "index" => {
                let body: IndexBody =
                    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
                Ok(EngineMessage::Index {
                    collections: body
                        .code_collections
                        .iter()
                        .map(|c| AnnouncedCollection {
                            key: c.key(),
                            length: c.length,
                        })
                        .collect(),
                    placeholder_langs: body.placeholder_langs,
                })
            }
            "output" => {
                let body: OutputBody =
                    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
                let (position, declared_length) = parse_number(&body.number)?;
                Ok(EngineMessage::Output {
                    key: body.code_collection.key(),
                    position,
                    declared_length,
                    output: FragmentOutput {
                        inline: body.inline,
                        attr_hash: body.attr_hash,
                        code_hash: body.code_hash,
                        output: body.output,
                    },
                })
            }
            other => Err(ProtocolError::UnknownMessageType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FileId, InputFormat, SourceAssembler};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_index_message() {
        let line = r#"{"message_type": "index", "code_collections": [{"type": "session", "lang": "python", "name": "", "length": 2}], "placeholder_langs": {"python": "python"}}"#;
        let msg = EngineMessage::parse(line).unwrap();
        assert_eq!(
            msg,
            EngineMessage::Index {
                collections: vec![AnnouncedCollection {
                    key: CodeCollectionKey::new("session", "python", ""),
                    length: 2,
                }],
                placeholder_langs: [("python".to_string(), "python".to_string())]
                    .into_iter()
                    .collect(),
            }
        );
    }

    #[test]
    fn parses_output_message() {
        let line = r#"{"message_type": "output", "code_collection": {"type": "session", "lang": "python", "name": ""}, "number": "2/3", "inline": true, "attr_hash": "ah", "code_hash": "ch", "output": ["<p>4</p>"]}"#;
        match EngineMessage::parse(line).unwrap() {
            EngineMessage::Output {
                key,
                position,
                declared_length,
                output,
            } => {
                assert_eq!(key.to_string(), "session.python.");
                assert_eq!((position, declared_length), (2, 3));
                assert!(output.inline);
                assert_eq!(output.output, vec!["<p>4</p>".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(
            EngineMessage::parse("{not json"),
            Err(ProtocolError::MalformedLine { .. })
        ));
        assert!(matches!(
            EngineMessage::parse(r#"{"message_type": "progress"}"#),
            Err(ProtocolError::UnknownMessageType(t)) if t == "progress"
        ));
        assert_eq!(parse_number("3"), Err(ProtocolError::BadNumber("3".into())));
        assert_eq!(parse_number(" 1 / 4"), Ok((1, 4)));
    }

    #[test]
    fn stdin_starts_with_origin_manifest() {
        let stream = SourceAssembler::new(InputFormat::default()).assemble(vec![
            (FileId::from("a.md"), "a".to_string()),
            (FileId::from("b.md"), "b\n".to_string()),
        ]);
        let payload = engine_stdin(&stream).unwrap();
        let (first, rest) = payload.split_once('\n').unwrap();
        assert_eq!(
            first,
            r#"{"origins":[{"path":"a.md","lines":3},{"path":"b.md","lines":2}]}"#
        );
        assert_eq!(rest, "a\n\n\nb\n\n");
    }
}
