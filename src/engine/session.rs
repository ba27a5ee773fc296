use super::decoder::LineDecoder;
use super::driver::EngineExit;
use super::protocol::EngineMessage;
use crate::cache::ExecutionCache;
use crate::error::ProtocolError;
use log::{info, warn};

/// What a batch of engine output changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    /// New output or placeholders are available; the preview should rebuild.
    pub needs_rebuild: bool,
    pub finished_collections: usize,
}

impl SessionUpdate {
    fn merge(&mut self, other: SessionUpdate) {
        self.needs_rebuild |= other.needs_rebuild;
        self.finished_collections += other.finished_collections;
    }
}

/// How a run ended, after the cache has been settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Previous generation restored; the message is shown as a warning.
    RolledBack(String),
    /// Previous generation restored; the message is shown as an error.
    Failed(String),
}

/// Per-run decoding state: feeds engine stdout into the cache in arrival
/// order and keeps the protocol errors it ran into.
#[derive(Debug, Default)]
pub struct EngineSession {
    decoder: LineDecoder,
    errors: Vec<ProtocolError>,
}

impl EngineSession {
    /// Swap cache generations and start decoding a fresh run.
    pub fn start(cache: &mut ExecutionCache) -> Self {
        cache.begin_run();
        Self::default()
    }

    pub fn errors(&self) -> &[ProtocolError] {
        &self.errors
    }

    pub fn feed(&mut self, chunk: &[u8], cache: &mut ExecutionCache) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        for line in self.decoder.feed(chunk) {
            update.merge(self.apply_line(&line, cache));
        }
        update
    }

    /// Flush the decoder and settle the cache according to the exit status.
    pub fn finish(
        &mut self,
        exit: &EngineExit,
        cache: &mut ExecutionCache,
    ) -> (SessionUpdate, RunOutcome) {
        let mut update = SessionUpdate::default();
        if let Some(line) = self.decoder.finish() {
            update.merge(self.apply_line(&line, cache));
        }

        let outcome = match exit {
            EngineExit::Success => {
                cache.finish_run();
                RunOutcome::Completed
            }
            EngineExit::Recoverable { code, stderr } => {
                cache.rollback();
                RunOutcome::RolledBack(format!(
                    "code execution failed (exit code {code}); showing previous output\n{stderr}"
                ))
            }
            EngineExit::Fatal(message) => {
                cache.rollback();
                RunOutcome::Failed(message.clone())
            }
        };
        if !self.errors.is_empty() {
            warn!("run finished with {} protocol errors", self.errors.len());
        }
        update.needs_rebuild = true;
        (update, outcome)
    }

    fn apply_line(&mut self, line: &str, cache: &mut ExecutionCache) -> SessionUpdate {
        let applied = EngineMessage::parse(line).and_then(|message| match message {
            EngineMessage::Index {
                collections,
                placeholder_langs,
            } => {
                info!("engine announced {} code collections", collections.len());
                cache.on_index_announcement(&collections, placeholder_langs);
                Ok(SessionUpdate {
                    needs_rebuild: true,
                    finished_collections: 0,
                })
            }
            EngineMessage::Output {
                key,
                position,
                declared_length,
                output,
            } => {
                let finished = cache.on_output_fragment(&key, position, declared_length, output)?;
                if finished {
                    info!("finished processing {}", key);
                }
                Ok(SessionUpdate {
                    needs_rebuild: true,
                    finished_collections: usize::from(finished),
                })
            }
        });

        applied.unwrap_or_else(|err| {
            warn!("dropping engine output line: {}", err);
            self.errors.push(err);
            SessionUpdate::default()
        })
    }
}
