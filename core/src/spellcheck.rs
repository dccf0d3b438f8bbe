use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::Sender;

use crate::config::SpellCheckConfig;
use crate::state::ChatState;
use crate::subprocess::ProgramOutput;
use crate::subprocess::run_helper;
use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::work_queue::WorkSender;

/// Checks editor text with `aspell` in pipe mode (`-a`).
#[derive(Debug, Clone)]
pub struct SpellChecker {
    program: String,
    args: Vec<String>,
    log_tx: Sender<ProgramOutput>,
}

impl SpellChecker {
    pub fn new(config: &SpellCheckConfig, log_tx: Sender<ProgramOutput>) -> Self {
        let mut args = vec!["-a".to_string()];
        if let Some(dictionary) = &config.dictionary {
            args.push("-d".to_string());
            args.push(dictionary.clone());
        }
        Self {
            program: config.aspell_path.clone(),
            args,
            log_tx,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Words aspell does not recognize in `text`. Blocks until aspell exits.
    pub fn check(&self, text: &str) -> io::Result<BTreeSet<String>> {
        // `^` keeps aspell from reading a line as one of its pipe commands.
        let input: String = text.lines().map(|line| format!("^{line}\n")).collect();
        let output = run_helper(&self.program, &self.args, &input, true, &self.log_tx)?;
        Ok(parse_aspell_output(&output))
    }

    /// Check a snapshot of the editor on a background thread and submit the
    /// result. The result is dropped by [`ChatState::set_misspellings`] if the
    /// editor has changed in the meantime.
    pub fn spawn_check(&self, text: String, work: WorkSender<ChatState>) -> io::Result<TaskHandle> {
        let checker = self.clone();
        spawn_task("spell-check", move || match checker.check(&text) {
            Ok(words) => work.submit(move |state: &mut ChatState| {
                state.set_misspellings(&text, words);
                Ok(())
            }),
            Err(e) => tracing::warn!("spell check failed: {e}"),
        })
    }
}

/// `& word count offset: suggestions` and `# word offset` both name a
/// misspelled word; every other line is ignored.
pub fn parse_aspell_output(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter(|line| line.starts_with('&') || line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn parses_misses_and_ignores_the_rest() {
        let output = "@(#) International Ispell Version 3.1.20 (but really Aspell 0.60.8)\n\
                      *\n\
                      & helo 5 0: hello, halo, hell\n\
                      *\n\
                      # wrld 6\n\
                      \n";
        let words = parse_aspell_output(output);
        assert_eq!(
            words.into_iter().collect::<Vec<_>>(),
            vec!["helo".to_string(), "wrld".to_string()]
        );
    }

    #[test]
    fn dictionary_is_passed_through() {
        let (tx, _rx) = channel();
        let config = SpellCheckConfig {
            enabled: true,
            aspell_path: "aspell".to_string(),
            dictionary: Some("en_GB".to_string()),
            delay: Duration::from_millis(500),
        };
        let checker = SpellChecker::new(&config, tx);
        assert_eq!(checker.args(), ["-a", "-d", "en_GB"]);
    }
}
