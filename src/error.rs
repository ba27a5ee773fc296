use crate::cache::CodeCollectionKey;
use thiserror::Error;

/// Result type for preview operations
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Errors that abort a build, a run, or startup
#[derive(Error, Debug)]
pub enum PreviewError {
    /// A declared source file could not be read
    #[error("missing input file `{0}`")]
    MissingInput(String),

    /// A panel was opened without any files
    #[error("no input files")]
    NoInputFiles,

    /// An external program could not be started
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A configured command line could not be split into arguments
    #[error("invalid command line: {0}")]
    InvalidCommand(String),

    /// A second execution run was requested while one is active
    #[error("code execution is already running")]
    EngineBusy,

    /// Configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems in the execution engine's output stream.
///
/// These never abort a run: the offending line is dropped, logged, and
/// counted, and decoding continues with the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed message line ({reason}): {line}")]
    MalformedLine { line: String, reason: String },

    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),

    #[error("invalid fragment number `{0}`")]
    BadNumber(String),

    #[error("output for unannounced code collection `{0}`")]
    UnknownCollection(CodeCollectionKey),

    #[error("fragment {position} is outside `{key}` (length {length})")]
    PositionOutOfRange {
        key: CodeCollectionKey,
        position: usize,
        length: usize,
    },

    #[error("`{key}` announced with length {announced} but fragment declares {declared}")]
    LengthMismatch {
        key: CodeCollectionKey,
        announced: usize,
        declared: usize,
    },
}
