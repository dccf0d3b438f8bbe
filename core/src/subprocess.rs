//! Running external helper programs.
//!
//! Every invocation, successful or not, yields a [`ProgramOutput`] record on
//! the drainer channel; see [`crate::pollers::subprocess_log`].

use std::io;
use std::io::Write;
use std::process::Command;
use std::process::Stdio;
use std::sync::mpsc::Sender;

/// Exit code recorded when the program could not be started or was killed by
/// a signal.
pub const NO_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    pub program: String,
    pub args: Vec<String>,
    pub stdout: String,
    /// Whether output on stdout is part of normal operation (a spell checker
    /// always prints; most helpers should stay quiet).
    pub stdout_ok: bool,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProgramOutput {
    /// Nothing worth reporting: the program exited 0 and printed nothing
    /// unexpected.
    pub fn is_clean(&self) -> bool {
        self.exit_code == 0
            && self.stderr.trim().is_empty()
            && (self.stdout_ok || self.stdout.trim().is_empty())
    }
}

/// Run `program` with `args`, feed it `stdin`, and wait for it to exit.
///
/// The record is always pushed to `log_tx`. A program that cannot be spawned
/// is reported there with [`NO_EXIT_CODE`] and the spawn error as its stderr,
/// and the error is also returned.
pub fn run_helper(
    program: &str,
    args: &[String],
    stdin: &str,
    stdout_ok: bool,
    log_tx: &Sender<ProgramOutput>,
) -> io::Result<String> {
    let mut record = ProgramOutput {
        program: program.to_string(),
        args: args.to_vec(),
        stdout: String::new(),
        stdout_ok,
        stderr: String::new(),
        exit_code: NO_EXIT_CODE,
    };

    let result = capture(program, args, stdin);
    let outcome = match result {
        Ok((stdout, stderr, code)) => {
            record.stdout = stdout.clone();
            record.stderr = stderr;
            record.exit_code = code.unwrap_or(NO_EXIT_CODE);
            Ok(stdout)
        }
        Err(e) => {
            tracing::warn!("failed to run {program}: {e}");
            record.stderr = e.to_string();
            Err(e)
        }
    };

    if log_tx.send(record).is_err() {
        tracing::debug!("subprocess log drainer gone; dropping record for {program}");
    }
    outcome
}

fn capture(program: &str, args: &[String], stdin: &str) -> io::Result<(String, String, Option<i32>)> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // stdin is written from its own thread while both output pipes drain.
    let writer = child.stdin.take().map(|mut pipe| {
        let input = stdin.to_string();
        std::thread::spawn(move || {
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                tracing::debug!("helper closed stdin early: {e}");
            }
        })
    });

    let output = child.wait_with_output()?;
    if let Some(writer) = writer
        && writer.join().is_err()
    {
        tracing::error!("stdin writer thread panicked");
    }

    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code(),
    ))
}
