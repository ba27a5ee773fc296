//! One-shot, blocking render of a document, optionally after a full
//! code-execution run.

use crate::cache::ExecutionCache;
use crate::config::PreviewConfig;
use crate::converter::{classify, run_converter, ConverterInput, ConverterOutcome, ExecutionMeta};
use crate::engine::{engine_stdin, spawn_engine, EngineEvent, EngineSession, RunOutcome};
use crate::error::Result;
use crate::linemap::LineMapIndex;
use crate::source::{AssembledStream, InputFormat, SourceAssembler};
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::channel;

#[derive(Debug)]
pub struct RenderReport {
    pub outcome: ConverterOutcome,
    /// `None` when no execution was requested or the document has no code.
    pub run: Option<RunOutcome>,
    pub map: LineMapIndex,
}

pub fn render_document(config: &PreviewConfig, files: &[PathBuf], execute: bool) -> Result<RenderReport> {
    let format = config.input_format(files.first().map(PathBuf::as_path));
    let mut assembler = SourceAssembler::new(format.clone());
    let stream = assembler.assemble_files(files, &HashMap::new())?;

    let mut cache = ExecutionCache::new();
    let run = if execute && stream.uses_execution {
        Some(execute_blocking(config, &format, &stream, &mut cache)?)
    } else {
        if execute {
            warn!("no code to execute in this document");
        }
        None
    };

    let execution = stream.uses_execution.then(|| ExecutionMeta {
        cache: &cache,
        commonmark: format.is_commonmark(),
        running: false,
    });
    let input = ConverterInput::prepare(&stream, config.uses_wrapped_reader(&format), execution)?;
    let map = LineMapIndex::build(&stream.sources, input.leading_offset);

    let argv = config.converter_argv(&format)?;
    info!("converting {} line(s) with {}", stream.total_lines(), argv[0]);
    let converted = run_converter(&argv, input.payload)?;

    Ok(RenderReport {
        outcome: classify(converted, &map),
        run,
        map,
    })
}

fn execute_blocking(
    config: &PreviewConfig,
    format: &InputFormat,
    stream: &AssembledStream,
    cache: &mut ExecutionCache,
) -> Result<RunOutcome> {
    let argv = config.engine_argv(format)?;
    let mut session = EngineSession::start(cache);

    let (tx, rx) = channel();
    if let Err(e) = spawn_engine(&argv, engine_stdin(stream)?, move |event| {
        let _ = tx.send(event);
    }) {
        cache.rollback();
        return Err(e);
    }

    for event in rx {
        match event {
            EngineEvent::Chunk(bytes) => {
                session.feed(&bytes, cache);
            }
            EngineEvent::Exited(exit) => {
                let (_, outcome) = session.finish(&exit, cache);
                if !session.errors().is_empty() {
                    warn!("{} malformed engine message(s) skipped", session.errors().len());
                }
                return Ok(outcome);
            }
        }
    }
    // The driver always sends `Exited` before dropping the sender.
    cache.rollback();
    Ok(RunOutcome::Failed("code execution ended without an exit status".to_string()))
}
