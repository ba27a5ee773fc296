use super::diagnostics::ConverterRun;
use crate::error::{PreviewError, Result};
use log::{debug, info};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

/// Run the converter to completion, feeding `payload` on stdin.
///
/// Blocks the calling thread; the panel calls it from a helper thread.
pub fn run_converter(argv: &[String], payload: String) -> Result<ConverterRun> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| PreviewError::InvalidCommand("empty converter command".to_string()))?;

    info!("running converter: {}", argv.join(" "));
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

    // Written from a separate thread so a large payload cannot deadlock
    // against a converter that is already filling its stdout pipe.
    let stdin = child.stdin.take();
    let writer = thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                debug!("converter stdin closed early: {}", e);
            }
        }
    });

    let output = child.wait_with_output()?;
    let _ = writer.join();

    debug!("converter exited with {}", output.status);
    Ok(ConverterRun {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
