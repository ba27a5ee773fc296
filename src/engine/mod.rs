mod decoder;
mod driver;
mod protocol;
mod session;

pub use decoder::LineDecoder;
pub use driver::{classify_exit, spawn_engine, EngineEvent, EngineExit};
pub use protocol::{engine_stdin, parse_number, EngineMessage, Origin, OriginManifest};
pub use session::{EngineSession, RunOutcome, SessionUpdate};
