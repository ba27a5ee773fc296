use super::events::{Notification, PanelEvent};
use super::launcher::Launcher;
use crate::cache::ExecutionCache;
use crate::config::PreviewConfig;
use crate::converter::{classify, ConverterInput, ConverterOutcome, ConverterRun, ExecutionMeta};
use crate::engine::{engine_stdin, EngineEvent, EngineSession, RunOutcome};
use crate::error::{PreviewError, Result};
use crate::linemap::LineMapIndex;
use crate::scheduler::{BuildScheduler, SchedulerAction, SchedulerEvent};
use crate::source::{FileId, SourceAssembler};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::Instant;

/// All state for one previewed document. Only ever touched from the
/// panel's own thread.
pub struct Panel<L: Launcher> {
    config: PreviewConfig,
    files: Vec<PathBuf>,
    overrides: HashMap<FileId, String>,
    assembler: SourceAssembler,
    scheduler: BuildScheduler,
    cache: ExecutionCache,
    engine: Option<(u64, EngineSession)>,
    building: Option<u64>,
    pending_map: Option<LineMapIndex>,
    published_map: Option<LineMapIndex>,
    sync_enabled: bool,
    builds_started: u64,
    runs_started: u64,
    alive: bool,
    events: Sender<PanelEvent>,
    notify: Sender<Notification>,
    launcher: L,
}

impl<L: Launcher> Panel<L> {
    pub fn new(
        config: PreviewConfig,
        files: Vec<PathBuf>,
        launcher: L,
        events: Sender<PanelEvent>,
        notify: Sender<Notification>,
    ) -> Result<Self> {
        if files.is_empty() {
            return Err(PreviewError::NoInputFiles);
        }
        let format = config.input_format(files.first().map(PathBuf::as_path));
        info!("opening preview for {} file(s) as {}", files.len(), format.name());

        Ok(Self {
            scheduler: BuildScheduler::new(config.min_build_interval()),
            assembler: SourceAssembler::new(format),
            config,
            files,
            overrides: HashMap::new(),
            cache: ExecutionCache::new(),
            engine: None,
            building: None,
            pending_map: None,
            published_map: None,
            sync_enabled: false,
            builds_started: 0,
            runs_started: 0,
            alive: true,
            events,
            notify,
            launcher,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn cache(&self) -> &ExecutionCache {
        &self.cache
    }

    pub fn published_map(&self) -> Option<&LineMapIndex> {
        self.published_map.as_ref()
    }

    pub fn is_building(&self) -> bool {
        self.building.is_some()
    }

    pub fn is_executing(&self) -> bool {
        self.engine.is_some()
    }

    /// Handle one event. Returns `false` once the panel has been closed.
    pub fn handle(&mut self, event: PanelEvent, now: Instant) -> bool {
        if !self.alive {
            return false;
        }

        match event {
            PanelEvent::Edit { file, text } => {
                self.overrides.insert(file, text);
                self.request_build(now);
            }
            PanelEvent::Visibility(visible) => {
                let action = self
                    .scheduler
                    .handle(SchedulerEvent::VisibilityChanged(visible), now);
                self.drive(action, now);
            }
            PanelEvent::Execute => match self.start_run(now) {
                Ok(()) => {}
                Err(PreviewError::EngineBusy) => {
                    self.send(Notification::Warning {
                        message: PreviewError::EngineBusy.to_string(),
                    });
                }
                Err(e) => {
                    warn!("could not start code execution: {}", e);
                    self.send(Notification::Error {
                        message: e.to_string(),
                    });
                }
            },
            PanelEvent::ScrollEditor { file, line } => {
                if let Some(target) = self.editor_to_preview(&file, line) {
                    self.send(Notification::Scroll {
                        file: None,
                        line: target,
                    });
                }
            }
            PanelEvent::ScrollPreview { line } => {
                if let Some((file, local)) = self.preview_to_editor(line) {
                    self.send(Notification::Scroll {
                        file: Some(file),
                        line: local,
                    });
                }
            }
            PanelEvent::BuildFinished { build, result } => self.finish_build(build, result, now),
            PanelEvent::EngineOutput { run, event } => self.engine_output(run, event, now),
            PanelEvent::Close => {
                info!("closing preview");
                self.alive = false;
            }
        }
        self.alive
    }

    pub fn on_timer(&mut self, now: Instant) {
        if !self.alive {
            return;
        }
        let action = self.scheduler.handle(SchedulerEvent::TimerFired, now);
        self.drive(action, now);
    }

    pub fn request_build(&mut self, now: Instant) {
        let action = self.scheduler.request_build(now);
        self.drive(action, now);
    }

    fn send(&self, notification: Notification) {
        if self.notify.send(notification).is_err() {
            debug!("notification dropped, host is gone");
        }
    }

    fn send_status(&self) {
        let processing = self
            .cache
            .processing()
            .iter()
            .filter(|(_, busy)| **busy)
            .map(|(key, _)| key.to_string())
            .collect();
        self.send(Notification::Status {
            running: self.engine.is_some(),
            processing,
        });
    }

    fn drive(&mut self, mut action: Option<SchedulerAction>, now: Instant) {
        while let Some(next) = action.take() {
            match next {
                // The run loop waits on `deadline()`.
                SchedulerAction::ArmTimer(due) => debug!("build deferred until {:?}", due),
                SchedulerAction::StartBuild => {
                    if let Err(e) = self.start_build() {
                        warn!("build aborted: {}", e);
                        self.send(Notification::Error {
                            message: e.to_string(),
                        });
                        self.building = None;
                        action = self.scheduler.handle(SchedulerEvent::BuildFinished, now);
                    }
                }
            }
        }
    }

    fn start_build(&mut self) -> Result<()> {
        self.builds_started += 1;
        let build = self.builds_started;

        let stream = self.assembler.assemble_files(&self.files, &self.overrides)?;
        let format = self.assembler.format().clone();
        let execution = stream.uses_execution.then(|| ExecutionMeta {
            cache: &self.cache,
            commonmark: format.is_commonmark(),
            running: self.engine.is_some(),
        });
        let input = ConverterInput::prepare(
            &stream,
            self.config.uses_wrapped_reader(&format),
            execution,
        )?;
        let argv = self.config.converter_argv(&format)?;

        debug!(
            "build {} with {} lines, offset {}",
            build,
            stream.total_lines(),
            input.leading_offset
        );
        self.pending_map = Some(LineMapIndex::build(&stream.sources, input.leading_offset));
        self.building = Some(build);

        let events = self.events.clone();
        self.launcher.convert(
            argv,
            input.payload,
            Box::new(move |result| {
                let _ = events.send(PanelEvent::BuildFinished { build, result });
            }),
        );
        Ok(())
    }

    fn finish_build(
        &mut self,
        build: u64,
        result: std::result::Result<ConverterRun, String>,
        now: Instant,
    ) {
        if self.building != Some(build) {
            debug!("ignoring completion of superseded build {}", build);
            return;
        }
        self.building = None;
        let map = self.pending_map.take().unwrap_or_default();

        let outcome = match result {
            Ok(run) => classify(run, &map),
            Err(message) => ConverterOutcome::Fatal(message),
        };
        match outcome {
            ConverterOutcome::Rendered(output) => {
                info!("build {} rendered", build);
                self.published_map = Some(map);
                self.sync_enabled = true;
                self.send(Notification::Rendered { html: output });
            }
            ConverterOutcome::ParseError(diagnostic) => {
                warn!("build {} failed to parse: {}", build, diagnostic.message);
                self.send(Notification::Diagnostic(diagnostic));
            }
            ConverterOutcome::Fatal(message) => {
                warn!("build {} failed: {}", build, message);
                self.sync_enabled = false;
                self.send(Notification::BuildFailed { message });
            }
        }

        let action = self.scheduler.handle(SchedulerEvent::BuildFinished, now);
        self.drive(action, now);
    }

    fn start_run(&mut self, now: Instant) -> Result<()> {
        if self.engine.is_some() {
            return Err(PreviewError::EngineBusy);
        }

        let stream = self.assembler.assemble_files(&self.files, &self.overrides)?;
        if !stream.uses_execution {
            self.send(Notification::Warning {
                message: "no code to execute in this document".to_string(),
            });
            return Ok(());
        }
        let format = self.assembler.format().clone();
        let argv = self.config.engine_argv(&format)?;
        let payload = engine_stdin(&stream)?;

        self.runs_started += 1;
        let run = self.runs_started;
        let session = EngineSession::start(&mut self.cache);

        let events = self.events.clone();
        let started = self.launcher.execute(
            argv,
            payload,
            Box::new(move |event| {
                let _ = events.send(PanelEvent::EngineOutput { run, event });
            }),
        );
        if let Err(e) = started {
            self.cache.rollback();
            return Err(e);
        }

        info!("code execution run {} started", run);
        self.engine = Some((run, session));
        self.send_status();
        self.request_build(now);
        Ok(())
    }

    fn engine_output(&mut self, run: u64, event: EngineEvent, now: Instant) {
        let session = match self.engine.as_mut() {
            Some((active, session)) if *active == run => session,
            _ => {
                debug!("ignoring output from finished run {}", run);
                return;
            }
        };

        match event {
            EngineEvent::Chunk(bytes) => {
                let update = session.feed(&bytes, &mut self.cache);
                if update.finished_collections > 0 {
                    self.send_status();
                }
                if update.needs_rebuild {
                    self.request_build(now);
                }
            }
            EngineEvent::Exited(exit) => {
                let (update, outcome) = session.finish(&exit, &mut self.cache);
                self.engine = None;
                match outcome {
                    RunOutcome::Completed => info!("code execution run {} completed", run),
                    RunOutcome::RolledBack(message) => {
                        warn!("code execution run {} rolled back", run);
                        self.send(Notification::Warning { message });
                    }
                    RunOutcome::Failed(message) => {
                        warn!("code execution run {} failed", run);
                        self.send(Notification::Error { message });
                    }
                }
                self.send_status();
                if update.needs_rebuild {
                    self.request_build(now);
                }
            }
        }
    }

    /// Preview line for an editor position, from the last published build.
    pub fn editor_to_preview(&self, file: &FileId, line: usize) -> Option<usize> {
        if !self.sync_enabled {
            return None;
        }
        self.published_map.as_ref()?.forward(file, line)
    }

    /// Editor position for a preview line, from the last published build.
    pub fn preview_to_editor(&self, line: usize) -> Option<(FileId, usize)> {
        if !self.sync_enabled {
            return None;
        }
        let (file, local) = self.published_map.as_ref()?.inverse_output(line)?;
        Some((file.clone(), local))
    }
}
