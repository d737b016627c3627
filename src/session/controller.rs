use std::io::{BufRead, ErrorKind, Write};

use crate::{
    engine::{Assistant, TextGenerator},
    error::{ErrorExt, Result},
    types::GenerationResult,
};

use super::command::Command;

const RULE_WIDTH: usize = 70;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// Where the controller is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built, nothing run yet
    Idle,
    /// Waiting for the next line
    AwaitingInput,
    /// Generating a reply
    Processing,
    /// Exit command, end of input or one-shot done
    Terminated,
}

/// Drives one-shot queries and the interactive chat loop
#[derive(Debug)]
pub struct SessionController<G> {
    assistant: Assistant<G>,
    state: SessionState,
    turns: usize,
}

impl<G: TextGenerator> SessionController<G> {
    /// Start in `Idle`
    pub fn new(assistant: Assistant<G>) -> Self {
        Self {
            assistant,
            state: SessionState::Idle,
            turns: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of processing steps run so far
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Assistant answering each turn
    pub fn assistant(&self) -> &Assistant<G> {
        &self.assistant
    }

    /// Message printed when the session ends
    pub fn farewell(&self) -> String {
        farewell(self.assistant.name())
    }

    /// Answer a single question and terminate
    pub fn run_once<W: Write>(&mut self, question: &str, out: &mut W) -> Result<GenerationResult> {
        writeln!(out, "Question: {question}\n")?;

        self.state = SessionState::Processing;
        let result = self.assistant.respond(question);
        self.turns += 1;
        self.state = SessionState::Terminated;

        let result = result?;
        writeln!(out, "{}: {}", self.assistant.name(), result.extracted_reply)?;
        out.flush()?;
        Ok(result)
    }

    /// Read lines from `input` until an exit command or end of input
    pub fn run_interactive<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        self.print_banner(out)?;
        self.state = SessionState::AwaitingInput;
        tracing::info!("Starting interactive session.");

        let mut lines = input.lines();
        while self.state != SessionState::Terminated {
            write!(out, "You: ")?;
            out.flush()?;

            match lines.next() {
                Some(Ok(line)) => {
                    self.handle_line(&line, out)?;
                }
                Some(Err(e)) if e.kind() == ErrorKind::InvalidData => {
                    tracing::debug!("Ignoring unreadable input line: {}", e);
                    writeln!(out)?;
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    writeln!(out, "\n\n{}", self.farewell())?;
                    self.state = SessionState::Terminated;
                }
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Apply one line of input in the `AwaitingInput` state
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<SessionState> {
        self.state = SessionState::AwaitingInput;

        match Command::parse(line) {
            None => {}
            Some(Command::Exit) => {
                writeln!(out, "\n{}", self.farewell())?;
                self.state = SessionState::Terminated;
            }
            Some(Command::ClearScreen) => {
                write!(out, "{CLEAR_SCREEN}")?;
                out.flush()?;
            }
            Some(Command::Ordinary(message)) => {
                self.state = SessionState::Processing;
                write!(out, "\n{}: ", self.assistant.name())?;
                out.flush()?;

                match self.assistant.respond(&message) {
                    Ok(result) => {
                        writeln!(out, "{}", result.extracted_reply)?;
                        writeln!(out, "\n{}\n", "-".repeat(RULE_WIDTH))?;
                    }
                    Err(e) => {
                        tracing::warn!(recoverable = e.is_recoverable(), "Turn failed: {}", e);
                        writeln!(out, "\n❌ Error: {e}\n")?;
                    }
                }

                self.turns += 1;
                self.state = SessionState::AwaitingInput;
            }
        }

        Ok(self.state)
    }

    fn print_banner<W: Write>(&self, out: &mut W) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        let name = self.assistant.name();
        writeln!(out, "{rule}")?;
        writeln!(out, "🩺 {name} Health Assistant - Interactive Mode")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Ask me any medical questions!")?;
        writeln!(out, "Commands: 'quit' or 'exit' to stop, 'clear' to clear screen")?;
        writeln!(
            out,
            "⚠️  Disclaimer: For educational purposes only. Consult a doctor for medical advice."
        )?;
        writeln!(out, "{rule}\n")?;
        Ok(())
    }
}

/// Goodbye line for `assistant_name`
pub fn farewell(assistant_name: &str) -> String {
    format!("👋 Thank you for using {assistant_name} Health Assistant!")
}
