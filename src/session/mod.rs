//! Session control: one-shot questions and the interactive chat loop

mod command;
mod controller;

pub use command::{Command, CLEAR_COMMAND, EXIT_COMMANDS};
pub use controller::{farewell, SessionController, SessionState};
