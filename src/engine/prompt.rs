//! Chat template the adapter was trained on

/// Opens the system instruction
pub const SYSTEM_OPEN: &str = "<|system|>";
/// Closes the system instruction
pub const SYSTEM_CLOSE: &str = "</|system|>";
/// Opens the user turn
pub const USER_OPEN: &str = "<|user|>";
/// Closes the user turn
pub const USER_CLOSE: &str = "</|user|>";
/// Left open in the prompt; the model continues from here
pub const ASSISTANT_OPEN: &str = "<|assistant|>";

/// Render the system and user turns followed by an open assistant turn.
///
/// `user_message` is inserted verbatim, including any text that looks like a
/// role delimiter.
pub fn format_prompt(system_prompt: &str, user_message: &str) -> String {
    format!(
        "{SYSTEM_OPEN}\n{system_prompt}{SYSTEM_CLOSE}\n{USER_OPEN}\n{user_message}{USER_CLOSE}\n{ASSISTANT_OPEN}\n"
    )
}
