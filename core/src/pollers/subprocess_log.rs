//! Drains [`ProgramOutput`] records and persists the ones worth a look.
//!
//! Clean runs are dropped. For anything else the drainer appends a record to
//! one temporary log file, created on the first failure and kept open for the
//! rest of the process, and posts a short error pointing at it.

use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::state::ChatState;
use crate::subprocess::ProgramOutput;
use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::work_queue::Mutation;
use crate::work_queue::WorkSender;
use crate::work_queue::mutation;

const LOG_PREFIX: &str = "chatterm-subprocess-";
const LOG_SUFFIX: &str = ".log";
const RECORD_SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, Default)]
pub struct SubprocessLogger {
    /// Directory for the log file; the system temp dir when `None`.
    dir: Option<PathBuf>,
    log: Option<(PathBuf, File)>,
}

impl SubprocessLogger {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir, log: None }
    }

    /// Path of the log file, once the first failure has created it.
    pub fn path(&self) -> Option<&Path> {
        self.log.as_ref().map(|(path, _)| path.as_path())
    }

    /// Returns the mutation that tells the user about `record`, or `None`
    /// when the run was clean.
    pub fn handle(&mut self, record: &ProgramOutput) -> Option<Mutation<ChatState>> {
        if record.is_clean() {
            return None;
        }
        let message = match self.append(record) {
            Ok(path) => format!(
                "{} exited abnormally; output logged to {}",
                record.program,
                path.display()
            ),
            Err(e) => {
                tracing::error!("failed to write subprocess log: {e}");
                format!(
                    "{} exited abnormally and its output could not be logged: {e}",
                    record.program
                )
            }
        };
        Some(mutation(move |state: &mut ChatState| {
            state.post_error(message);
            Ok(())
        }))
    }

    fn append(&mut self, record: &ProgramOutput) -> io::Result<PathBuf> {
        let (path, file) = match &mut self.log {
            Some((path, file)) => (path, file),
            log @ None => {
                let opened = open_log(self.dir.as_deref())?;
                tracing::info!("logging failed helper output to {}", opened.0.display());
                let (path, file) = log.insert(opened);
                (path, file)
            }
        };
        write_record(file, record)?;
        Ok(path.clone())
    }
}

fn open_log(dir: Option<&Path>) -> io::Result<(PathBuf, File)> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(LOG_PREFIX).suffix(LOG_SUFFIX);
    let named = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    let (file, path) = named.keep()?;
    Ok((path, file))
}

fn write_record(out: &mut impl Write, record: &ProgramOutput) -> io::Result<()> {
    writeln!(out, "Program: {}", record.program)?;
    writeln!(out, "Arguments: {}", record.args.join(" "))?;
    writeln!(out, "Exit code: {}", record.exit_code)?;
    writeln!(out, "Stdout:")?;
    writeln!(out, "{}", record.stdout.trim_end())?;
    writeln!(out, "Stderr:")?;
    writeln!(out, "{}", record.stderr.trim_end())?;
    writeln!(out, "{RECORD_SEPARATOR}")?;
    out.flush()
}

pub fn spawn_subprocess_log_drainer(
    records: Receiver<ProgramOutput>,
    mut logger: SubprocessLogger,
    work: WorkSender<ChatState>,
) -> io::Result<TaskHandle> {
    spawn_task("subprocess-log-drainer", move || {
        while let Ok(record) = records.recv() {
            if let Some(notice) = logger.handle(&record)
                && !work.try_submit(notice)
            {
                tracing::debug!("work queue closed; subprocess log drainer exiting");
                return;
            }
        }
        tracing::debug!("subprocess record channel closed; drainer exiting");
    })
}
