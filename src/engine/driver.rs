use crate::error::{PreviewError, Result};
use log::{debug, info};
use std::io::{Read, Write};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread;

const READ_CHUNK: usize = 8192;

/// Exit classification for an engine process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineExit {
    Success,
    /// Exit codes 1–3: the previous generation is kept and a warning shown.
    Recoverable { code: i32, stderr: String },
    /// Any other exit, a signal, or an I/O failure while talking to it.
    Fatal(String),
}

/// Callbacks from an engine run, delivered from helper threads in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Chunk(Vec<u8>),
    Exited(EngineExit),
}

pub fn classify_exit(status: ExitStatus, stderr: String) -> EngineExit {
    match status.code() {
        Some(0) => EngineExit::Success,
        Some(code @ 1..=3) => EngineExit::Recoverable { code, stderr },
        Some(code) => EngineExit::Fatal(format!(
            "code execution failed with exit code {code}\n{stderr}"
        )),
        None => EngineExit::Fatal(format!("code execution was terminated\n{stderr}")),
    }
}

/// Spawn `argv`, write `payload` to its stdin, and stream its stdout to
/// `on_event`. The last event is always `EngineEvent::Exited`.
///
/// A spawn failure is returned directly and no events are delivered.
pub fn spawn_engine<F>(argv: &[String], payload: String, on_event: F) -> Result<()>
where
    F: Fn(EngineEvent) + Send + 'static,
{
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PreviewError::InvalidCommand("empty engine command".to_string()))?;

    info!("starting code execution: {}", argv.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PreviewError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdin = child.stdin.take();
    thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                debug!("engine stdin closed early: {}", e);
            }
        }
    });

    thread::spawn(move || pump_stdout(child, on_event));
    Ok(())
}

fn collect_stderr(stderr: Option<ChildStderr>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut text);
        }
        text
    })
}

fn pump_stdout<F>(mut child: Child, on_event: F)
where
    F: Fn(EngineEvent),
{
    let stderr = collect_stderr(child.stderr.take());
    let mut read_error = None;

    if let Some(mut stdout) = child.stdout.take() {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stdout.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => on_event(EngineEvent::Chunk(buf[..n].to_vec())),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }
    }

    let stderr_text = stderr.join().unwrap_or_default();
    let exit = match (child.wait(), read_error) {
        (Ok(status), None) => classify_exit(status, stderr_text),
        (Ok(_), Some(e)) | (Err(e), _) => {
            EngineExit::Fatal(format!("lost contact with code execution: {e}"))
        }
    };
    debug!("engine exited: {:?}", exit);
    on_event(EngineEvent::Exited(exit));
}
