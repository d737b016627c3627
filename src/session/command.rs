/// Words that end the session
pub const EXIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

/// Word that clears the terminal
pub const CLEAR_COMMAND: &str = "clear";

/// What one line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `quit`, `exit` or `q`
    Exit,
    /// `clear`
    ClearScreen,
    /// A question for the assistant, trimmed
    Ordinary(String),
}

impl Command {
    /// Classify a raw input line; `None` for empty or whitespace-only input.
    ///
    /// Commands match the whole trimmed line, ignoring case.
    pub fn parse(line: &str) -> Option<Self> {
        let input = line.trim();
        if input.is_empty() {
            return None;
        }

        let lowered = input.to_lowercase();
        if EXIT_COMMANDS.contains(&lowered.as_str()) {
            Some(Command::Exit)
        } else if lowered == CLEAR_COMMAND {
            Some(Command::ClearScreen)
        } else {
            Some(Command::Ordinary(input.to_string()))
        }
    }
}
