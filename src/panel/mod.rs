//! One preview per document, run as a single-threaded actor.
//!
//! Host requests, converter completions, engine output chunks and the
//! build timer all arrive on one channel and are handled in order on the
//! panel's thread, so no panel state is ever shared or locked.

mod events;
mod launcher;
mod state;

pub use events::{Notification, PanelEvent};
pub use launcher::{BuildCallback, EngineCallback, Launcher, ProcessLauncher};
pub use state::Panel;

use crate::config::PreviewConfig;
use crate::error::Result;
use log::debug;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Drive `panel` until it is closed or every sender is gone.
pub fn run_panel<L: Launcher>(mut panel: Panel<L>, events: Receiver<PanelEvent>) {
    panel.request_build(Instant::now());

    loop {
        let event = match panel.deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match events.recv_timeout(timeout) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => {
                        panel.on_timer(Instant::now());
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match events.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        if !panel.handle(event, Instant::now()) {
            break;
        }
    }
    debug!("panel loop finished");
}

/// Owner-side handle of a running panel thread.
pub struct PanelHandle {
    events: Sender<PanelEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PanelHandle {
    pub fn spawn(
        config: PreviewConfig,
        files: Vec<PathBuf>,
        notify: Sender<Notification>,
    ) -> Result<Self> {
        Self::spawn_with(config, files, notify, ProcessLauncher)
    }

    pub fn spawn_with<L: Launcher>(
        config: PreviewConfig,
        files: Vec<PathBuf>,
        notify: Sender<Notification>,
        launcher: L,
    ) -> Result<Self> {
        let (tx, rx) = channel();
        let panel = Panel::new(config, files, launcher, tx.clone(), notify)?;
        let thread = thread::Builder::new()
            .name("preview-panel".to_string())
            .spawn(move || run_panel(panel, rx))?;

        Ok(Self {
            events: tx,
            thread: Some(thread),
        })
    }

    /// Queue an event. Returns `false` if the panel has already stopped.
    pub fn send(&self, event: PanelEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.events.send(PanelEvent::Close);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PanelHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
