use crate::converter::{run_converter, ConverterRun};
use crate::engine::{spawn_engine, EngineEvent};
use crate::error::Result;
use std::thread;

pub type BuildCallback = Box<dyn FnOnce(std::result::Result<ConverterRun, String>) + Send>;
pub type EngineCallback = Box<dyn Fn(EngineEvent) + Send>;

/// Starts the external programs for a panel. Both calls return at once;
/// results arrive through the callbacks from other threads.
pub trait Launcher: Send + 'static {
    fn convert(&self, argv: Vec<String>, payload: String, done: BuildCallback);

    /// Fails only when the engine cannot be started at all.
    fn execute(&self, argv: Vec<String>, payload: String, on_event: EngineCallback) -> Result<()>;
}

/// Runs real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn convert(&self, argv: Vec<String>, payload: String, done: BuildCallback) {
        thread::spawn(move || {
            let result = run_converter(&argv, payload).map_err(|e| e.to_string());
            done(result);
        });
    }

    fn execute(&self, argv: Vec<String>, payload: String, on_event: EngineCallback) -> Result<()> {
        spawn_engine(&argv, payload, on_event)
    }
}
