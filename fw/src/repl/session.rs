//! REPL session: command parsing and dispatch

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::remote::LastItemClient;
use crate::store::Store;

/// Prompt shown before every read
pub const PROMPT: &str = ">>> ";

/// Commands accepted by the session, in help order
pub const COMMANDS: &[&str] = &["last", "history", "remote", "help", "exit"];

/// Errors that end a session
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("Failed to read operator input: {0}")]
    InputRead(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Last,
    History,
    Remote,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl Command {
    /// Parse a raw input line; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "last" => Self::Last,
            "history" => Self::History,
            "remote" => Self::Remote,
            "help" => Self::Help,
            "exit" => Self::Exit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Result of one read from the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Input stream closed (Ctrl-D)
    Eof,
}

/// Source of operator lines
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ReplError>;
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ReplError> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(e) => Err(ReplError::InputRead(e.to_string())),
        }
    }
}

/// Pre-recorded operator input, ending in EOF
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<Result<Input, String>>,
    /// Every prompt shown, in order
    pub prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| Ok(Input::Line(l.into()))).collect(),
            prompts: Vec::new(),
        }
    }

    /// Queue a raw input event (e.g. an interrupt)
    pub fn push(&mut self, input: Input) {
        self.lines.push_back(Ok(input));
    }

    /// Queue a read failure
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.lines.push_back(Err(reason.into()));
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ReplError> {
        self.prompts.push(prompt.to_string());
        match self.lines.pop_front() {
            Some(Ok(input)) => Ok(input),
            Some(Err(reason)) => Err(ReplError::InputRead(reason)),
            None => Ok(Input::Eof),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Operator typed `exit`
    Exit,
    /// Input stream closed
    Eof,
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive command session over the shared store
pub struct ReplSession<W: Write> {
    store: Arc<Store>,
    remote: Option<LastItemClient>,
    out: W,
}

impl<W: Write> ReplSession<W> {
    pub fn new(store: Arc<Store>, remote: Option<LastItemClient>, out: W) -> Self {
        Self { store, remote, out }
    }

    /// Give back the output sink
    pub fn into_output(self) -> W {
        self.out
    }

    /// Print the greeting shown before the first prompt
    pub fn print_welcome(&mut self, source: &str) -> Result<(), ReplError> {
        writeln!(self.out, "{} {}", "Subscribed to".bright_cyan().bold(), source)?;
        writeln!(
            self.out,
            "Type {} for the latest record or {} to quit",
            "last".yellow(),
            "exit".yellow()
        )?;
        Ok(())
    }

    /// Read and dispatch commands until `exit` or end of input
    pub async fn run<L: LineSource>(&mut self, input: &mut L) -> Result<SessionEnd, ReplError> {
        loop {
            let line = match input.read_line(PROMPT)? {
                Input::Line(line) => line,
                Input::Interrupted => {
                    writeln!(self.out, "^C")?;
                    continue;
                }
                Input::Eof => {
                    info!("Operator input closed");
                    writeln!(self.out)?;
                    return Ok(SessionEnd::Eof);
                }
            };

            let command = Command::parse(&line);
            debug!(?command, "ReplSession::run: dispatching");
            if let Flow::Quit = self.dispatch(command).await? {
                return Ok(SessionEnd::Exit);
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Flow, ReplError> {
        match command {
            Command::Empty => {}
            Command::Last => self.print_last()?,
            Command::History => self.print_history()?,
            Command::Remote => self.print_remote().await?,
            Command::Help => self.print_help()?,
            Command::Exit => {
                writeln!(self.out, "Bye.")?;
                return Ok(Flow::Quit);
            }
            Command::Unknown(cmd) => {
                writeln!(
                    self.out,
                    "{} unknown command: {}. Available: {}",
                    "?".yellow(),
                    cmd,
                    COMMANDS.join(", ")
                )?;
            }
        }
        Ok(Flow::Continue)
    }

    fn print_last(&mut self) -> Result<(), ReplError> {
        match self.store.read_latest() {
            Some(record) => {
                writeln!(self.out, "{}", "Last message:".bright_cyan())?;
                writeln!(self.out, "{}", record)?;
            }
            None => writeln!(self.out, "{}", "no messages yet".dimmed())?,
        }
        Ok(())
    }

    fn print_history(&mut self) -> Result<(), ReplError> {
        if !self.store.options().keep_history {
            writeln!(self.out, "{}", "history is disabled".dimmed())?;
            return Ok(());
        }

        let history = self.store.read_history();
        if history.is_empty() {
            writeln!(self.out, "{}", "no messages yet".dimmed())?;
            return Ok(());
        }

        writeln!(self.out, "{}", format!("{} message(s):", history.len()).bright_cyan())?;
        for (i, record) in history.iter().enumerate() {
            writeln!(self.out, "  {}. {}", i + 1, record.summary())?;
        }
        Ok(())
    }

    async fn print_remote(&mut self) -> Result<(), ReplError> {
        let Some(remote) = &self.remote else {
            writeln!(self.out, "{}", "remote lookup is not configured".dimmed())?;
            return Ok(());
        };

        match remote.fetch_last().await {
            Ok(record) => {
                writeln!(self.out, "{}", "Remote last record:".bright_cyan())?;
                writeln!(self.out, "{}", record)?;
            }
            Err(e) => {
                warn!(error = %e, "Remote lookup failed");
                writeln!(self.out, "{} {}", "remote lookup failed:".red(), e)?;
            }
        }
        Ok(())
    }

    fn print_help(&mut self) -> Result<(), ReplError> {
        writeln!(self.out, "{}", "Available Commands:".bright_cyan())?;
        writeln!(self.out, "  {:10} Show the most recent record", "last".yellow())?;
        writeln!(self.out, "  {:10} List records received so far", "history".yellow())?;
        writeln!(self.out, "  {:10} Query the remote last-item endpoint", "remote".yellow())?;
        writeln!(self.out, "  {:10} Show this help", "help".yellow())?;
        writeln!(self.out, "  {:10} Quit", "exit".yellow())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Record;
    use crate::store::StoreOptions;

    fn session(store: Arc<Store>) -> ReplSession<Vec<u8>> {
        colored::control::set_override(false);
        ReplSession::new(store, None, Vec::new())
    }

    fn output(session: ReplSession<Vec<u8>>) -> String {
        String::from_utf8(session.into_output()).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("last"), Command::Last);
        assert_eq!(Command::parse("  exit \n"), Command::Exit);
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("LAST"), Command::Unknown("LAST".to_string()));
        assert_eq!(Command::parse("foo"), Command::Unknown("foo".to_string()));
    }

    #[tokio::test]
    async fn test_last_with_no_records() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["last"]);

        s.run(&mut input).await.unwrap();

        assert!(output(s).contains("no messages yet"));
    }

    #[tokio::test]
    async fn test_last_renders_record() {
        let store = Arc::new(Store::default());
        store.write(Record {
            indicator_id: "NY.GDP".to_string(),
            country_iso3_code: "BRA".to_string(),
            value: 42,
            unit: "USD".to_string(),
            ..Default::default()
        });
        let mut s = session(store);
        let mut input = ScriptedInput::new(["last", "exit"]);

        assert_eq!(s.run(&mut input).await.unwrap(), SessionEnd::Exit);

        let out = output(s);
        assert!(out.contains("42 USD"));
        assert!(out.contains("BRA"));
        assert!(out.contains("NY.GDP"));
    }

    #[tokio::test]
    async fn test_exit_stops_prompting() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["exit", "last"]);

        assert_eq!(s.run(&mut input).await.unwrap(), SessionEnd::Exit);

        assert_eq!(input.prompts, vec![PROMPT.to_string()]);
        assert_eq!(input.remaining(), 1);
        let out = output(s);
        assert!(out.ends_with("Bye.\n"));
        assert!(!out.contains("no messages yet"));
    }

    #[tokio::test]
    async fn test_unknown_command_reprompts() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["foo", "exit"]);

        s.run(&mut input).await.unwrap();

        assert_eq!(input.prompts.len(), 2);
        let out = output(s);
        assert!(out.contains("unknown command: foo. Available: last, history, remote, help, exit"));
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["", "last"]);

        assert_eq!(s.run(&mut input).await.unwrap(), SessionEnd::Eof);
        assert_eq!(input.prompts.len(), 3);
        assert!(!output(s).contains("Bye."));
    }

    #[tokio::test]
    async fn test_read_failure_ends_session_with_error() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["last"]);
        input.push_failure("stdin unreadable");
        input.push(Input::Line("exit".to_string()));

        let result = s.run(&mut input).await;

        assert!(matches!(result, Err(ReplError::InputRead(ref reason)) if reason == "stdin unreadable"));
        assert_eq!(input.prompts.len(), 2);
        assert_eq!(input.remaining(), 1);
        let out = output(s);
        assert!(out.contains("no messages yet"));
        assert!(!out.contains("Bye."));
    }

    #[tokio::test]
    async fn test_interrupt_reprompts() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::default();
        input.push(Input::Interrupted);
        input.push(Input::Line("exit".to_string()));

        assert_eq!(s.run(&mut input).await.unwrap(), SessionEnd::Exit);
        assert!(output(s).contains("^C"));
    }

    #[tokio::test]
    async fn test_repeated_last_is_stable() {
        let store = Arc::new(Store::default());
        store.write(Record {
            value: 3,
            unit: "t".to_string(),
            ..Default::default()
        });
        let mut s = session(store);
        let mut input = ScriptedInput::new(["last", "last"]);

        s.run(&mut input).await.unwrap();

        let out = output(s);
        let blocks: Vec<&str> = out.split("Last message:").skip(1).map(str::trim).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], blocks[1]);
    }

    #[tokio::test]
    async fn test_history_lists_in_order() {
        let store = Arc::new(Store::default());
        for v in [10, 20, 30] {
            store.write(Record {
                value: v,
                unit: "kg".to_string(),
                ..Default::default()
            });
        }
        let mut s = session(store);
        let mut input = ScriptedInput::new(["history"]);

        s.run(&mut input).await.unwrap();

        let out = output(s);
        assert!(out.contains("3 message(s):"));
        let first = out.find("10 kg").unwrap();
        let second = out.find("20 kg").unwrap();
        let third = out.find("30 kg").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_history_disabled() {
        let store = Arc::new(Store::new(StoreOptions {
            keep_history: false,
            history_limit: None,
        }));
        let mut s = session(store);
        let mut input = ScriptedInput::new(["history"]);

        s.run(&mut input).await.unwrap();

        assert!(output(s).contains("history is disabled"));
    }

    #[tokio::test]
    async fn test_remote_not_configured() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["remote"]);

        s.run(&mut input).await.unwrap();

        assert!(output(s).contains("remote lookup is not configured"));
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let mut s = session(Arc::new(Store::default()));
        let mut input = ScriptedInput::new(["help"]);

        s.run(&mut input).await.unwrap();

        let out = output(s);
        for cmd in COMMANDS {
            assert!(out.contains(cmd), "help should mention {}", cmd);
        }
    }
}
