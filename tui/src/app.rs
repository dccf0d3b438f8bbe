use std::collections::BTreeSet;
use std::io;
use std::io::BufRead;
use std::io::Write;

use chatterm_core::ChatState;
use chatterm_core::Runtime;
use chatterm_core::api::ChannelId;
use chatterm_core::dispatch::LoopItem;
use chatterm_core::event::AppEvent;
use chatterm_core::event::AppEventSender;
use chatterm_core::message_log::ClientMessageKind;
use chatterm_core::state::TranscriptLine;
use chatterm_core::task::TaskHandle;
use chatterm_core::task::spawn_task;
use chatterm_core::work_queue::apply;
use chrono::Local;

use crate::session_log;

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Next,
    Prev,
    Go(String),
    Send,
    Quit,
    /// Anything that is not a command replaces the editor contents.
    Edit(String),
}

impl Command {
    pub(crate) fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.split_once(' ') {
            Some(("/go", name)) if !name.trim().is_empty() => Self::Go(name.trim().to_string()),
            _ => match trimmed {
                "/next" => Self::Next,
                "/prev" => Self::Prev,
                "/send" => Self::Send,
                "/quit" => Self::Quit,
                _ => Self::Edit(line.to_string()),
            },
        }
    }
}

/// What has already been written for the focused channel.
#[derive(Debug, Default)]
struct Printed {
    channel: Option<ChannelId>,
    lines: usize,
    misspellings: BTreeSet<String>,
}

/// The owning loop: the only place [`ChatState`] is mutated.
pub struct App<W: Write> {
    state: ChatState,
    runtime: Runtime,
    out: W,
    printed: Printed,
}

impl<W: Write> App<W> {
    pub fn new(state: ChatState, runtime: Runtime, out: W) -> Self {
        Self {
            state,
            runtime,
            out,
            printed: Printed::default(),
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Apply events and mutations until `/quit`, end of input, or both
    /// queues close.
    pub fn run(&mut self) -> io::Result<()> {
        self.print_transcript()?;
        while let Some(item) = self.runtime.next_item() {
            let keep_going = match item {
                LoopItem::Event(event) => {
                    session_log::log_inbound_app_event(&event);
                    self.handle_event(event)
                }
                LoopItem::Work(mutation) => {
                    let ok = apply(&mut self.state, mutation);
                    session_log::log_applied_mutation(ok);
                    true
                }
            };
            self.print_transcript()?;
            if !keep_going {
                break;
            }
        }
        tracing::debug!(
            "owning loop done; tasks still running: {:?}",
            self.runtime.running_tasks()
        );
        self.out.flush()
    }

    fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Input(line) => return self.handle_command(Command::parse(&line)),
            AppEvent::RunSpellCheck => self.runtime.start_spell_check(&self.state),
            AppEvent::ExitRequest => return false,
        }
        true
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Next => self.state.next_channel(),
            Command::Prev => self.state.prev_channel(),
            Command::Go(name) => {
                self.state.focus_channel_by_name(&name);
            }
            Command::Send => {
                if self.state.send_editor().is_none() {
                    self.state
                        .post_client_message("Nothing to send", ClientMessageKind::Info);
                }
            }
            Command::Quit => return false,
            Command::Edit(text) => {
                self.state.set_editor_text(text);
                self.runtime.content_changed();
            }
        }
        true
    }

    /// Write whatever part of the focused transcript has not been written
    /// yet. Switching channels (or a shrinking log) reprints it in full.
    fn print_transcript(&mut self) -> io::Result<()> {
        let focused = self.state.focused_channel_id().clone();
        let lines = self.state.render_focused();

        if self.printed.channel.as_ref() != Some(&focused) || lines.len() < self.printed.lines {
            let name = self
                .state
                .focused_channel()
                .map(|c| c.info.display_name.clone())
                .unwrap_or_else(|| focused.to_string());
            writeln!(self.out, "== {name} ==")?;
            self.printed = Printed {
                channel: Some(focused),
                ..Printed::default()
            };
        }

        for line in &lines[self.printed.lines..] {
            writeln!(self.out, "{}", format_line(line))?;
        }
        self.printed.lines = lines.len();

        let misspellings = self.state.misspellings();
        if *misspellings != self.printed.misspellings {
            if !misspellings.is_empty() {
                let words: Vec<&str> = misspellings.iter().map(String::as_str).collect();
                writeln!(self.out, "?? possible misspellings: {}", words.join(", "))?;
            }
            self.printed.misspellings = misspellings.clone();
        }
        self.out.flush()
    }
}

fn format_line(line: &TranscriptLine) -> String {
    let message = &line.message;
    let ts = message.timestamp.with_timezone(&Local).format("%H:%M");
    let flag = if line.flagged { " [flagged]" } else { "" };
    format!("{ts} {}: {}{flag}", message.author, message.text)
}

/// Forward each line of `input` to the owning loop, then ask it to exit.
pub fn spawn_input_reader<R>(input: R, events: AppEventSender) -> io::Result<TaskHandle>
where
    R: BufRead + Send + 'static,
{
    spawn_task("input-reader", move || {
        for line in input.lines() {
            match line {
                Ok(line) => events.send(AppEvent::Input(line)),
                Err(e) => {
                    tracing::warn!("failed to read input: {e}");
                    break;
                }
            }
        }
        events.send(AppEvent::ExitRequest);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/next"), Command::Next);
        assert_eq!(Command::parse(" /prev "), Command::Prev);
        assert_eq!(Command::parse("/go town-square"), Command::Go("town-square".to_string()));
        assert_eq!(Command::parse("/send"), Command::Send);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/go"), Command::Edit("/go".to_string()));
        assert_eq!(
            Command::parse("hello /next"),
            Command::Edit("hello /next".to_string())
        );
    }
}
