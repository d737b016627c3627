use super::prompt::ASSISTANT_OPEN;

/// Reply text after the last assistant marker, trimmed.
///
/// Without a marker the decoded text is returned untouched, prompt included.
pub fn extract_reply(raw_decoded_text: &str) -> String {
    match raw_decoded_text.rsplit_once(ASSISTANT_OPEN) {
        Some((_, reply)) => reply.trim().to_string(),
        None => raw_decoded_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prompt::format_prompt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reply_after_marker() {
        let raw = format!(
            "{}Hypertension is persistently high blood pressure.  \n",
            format_prompt("sys", "What is hypertension?")
        );
        assert_eq!(
            extract_reply(&raw),
            "Hypertension is persistently high blood pressure."
        );
    }

    #[test]
    fn test_last_marker_wins() {
        let raw = "<|assistant|>\nfirst\n<|assistant|>\n second ";
        assert_eq!(extract_reply(raw), "second");
    }

    #[test]
    fn test_marker_at_end_gives_empty_reply() {
        assert_eq!(extract_reply("prompt <|assistant|>\n"), "");
    }

    #[test]
    fn test_fallback_returns_input_unchanged() {
        for raw in ["", "  padded reply  ", "<|user|>\nquestion</|user|>\nanswer"] {
            assert_eq!(extract_reply(raw), raw);
            // idempotent without a marker
            assert_eq!(extract_reply(&extract_reply(raw)), raw);
        }
    }
}
