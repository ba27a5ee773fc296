//! Newline-delimited JSON host protocol over stdio.

mod protocol;

pub use protocol::Request;

use crate::config::PreviewConfig;
use crate::panel::{Launcher, Notification, PanelHandle, ProcessLauncher};
use log::{debug, info, warn};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

/// Host session: at most one open panel at a time.
pub struct Server<L: Launcher + Clone> {
    config: PreviewConfig,
    launcher: L,
    panel: Option<PanelHandle>,
    notify: Sender<Notification>,
}

impl<L: Launcher + Clone> Server<L> {
    pub fn new(config: PreviewConfig, launcher: L, notify: Sender<Notification>) -> Self {
        Self {
            config,
            launcher,
            panel: None,
            notify,
        }
    }

    pub fn has_panel(&self) -> bool {
        self.panel.is_some()
    }

    fn report(&self, message: String) {
        let _ = self.notify.send(Notification::Error { message });
    }

    /// Handle one input line. Returns `false` when the host asked to stop.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("bad request: {}", e);
                self.report(format!("invalid request: {e}"));
                return true;
            }
        };
        debug!("request: {:?}", request);

        match request {
            Request::Open { files } => {
                if let Some(old) = self.panel.take() {
                    old.close();
                }
                match PanelHandle::spawn_with(
                    self.config.clone(),
                    files,
                    self.notify.clone(),
                    self.launcher.clone(),
                ) {
                    Ok(handle) => self.panel = Some(handle),
                    Err(e) => self.report(e.to_string()),
                }
                true
            }
            Request::Close => {
                if let Some(panel) = self.panel.take() {
                    panel.close();
                }
                false
            }
            other => {
                let Some(event) = other.into_panel_event() else {
                    return true;
                };
                let delivered = self.panel.as_ref().map(|p| p.send(event)).unwrap_or(false);
                if !delivered {
                    self.report("no preview is open".to_string());
                }
                true
            }
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(panel) = self.panel.take() {
            panel.close();
        }
    }
}

/// Print notifications as JSON lines until every sender is gone.
pub fn write_notifications<W: Write>(events: Receiver<Notification>, mut out: W) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(&event)?;
        writeln!(out, "{json}")?;
        out.flush()?;
    }
    Ok(())
}

/// Serve requests from `input` until `close` or end of input.
pub fn serve_with<L, R, W>(config: PreviewConfig, launcher: L, input: R, output: W) -> anyhow::Result<()>
where
    L: Launcher + Clone,
    R: BufRead,
    W: Write + Send + 'static,
{
    let (notify, events) = channel();
    let writer = thread::Builder::new()
        .name("preview-writer".to_string())
        .spawn(move || write_notifications(events, output))?;

    let mut server = Server::new(config, launcher, notify);
    for line in input.lines() {
        if !server.handle_line(&line?) {
            break;
        }
    }
    server.shutdown();
    drop(server);

    match writer.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("notification writer panicked"),
    }
    info!("serve session ended");
    Ok(())
}

pub fn serve(config: PreviewConfig) -> anyhow::Result<()> {
    info!("serving on stdio");
    serve_with(config, ProcessLauncher, io::stdin().lock(), io::stdout())
}
