//! Unclear and uncooperative driver responses

/// Transcription markers for audio the recognizer could not make out.
pub const UNCLEAR_MARKERS: [&str; 4] = ["[inaudible]", "[unclear]", "...", "[noise]"];

/// One-word answers that carry no status information.
pub const LOW_INFORMATION_WORDS: [&str; 9] = [
    "yes", "no", "yeah", "nah", "ok", "okay", "fine", "whatever", "sure",
];

/// Asked in order as the driver keeps giving minimal answers; the last one
/// repeats once the list runs out.
pub const PROBING_QUESTIONS: [&str; 3] = [
    "Can you give me a bit more detail about your current status?",
    "I need a bit more information for our records. Where are you right now?",
    "Just to confirm - are you still en route or have you arrived at the destination?",
];

pub const REPEAT_PROMPT: &str = "I'm sorry, I didn't catch that. Could you please repeat?";
pub const HUMAN_HANDOFF_MESSAGE: &str =
    "I'm having trouble hearing you. Let me connect you with a human dispatcher.";
pub const CALLBACK_CLOSE_MESSAGE: &str =
    "I understand you're busy. I'll try calling back later. Have a safe drive.";

/// Result of handling an unclear response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnclearOutcome {
    /// Re-prompt the driver
    AskToRepeat { message: &'static str },
    /// Too many repeats; hand off to a human
    Escalate { message: &'static str },
}

impl UnclearOutcome {
    pub fn should_escalate(&self) -> bool {
        matches!(self, UnclearOutcome::Escalate { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            UnclearOutcome::AskToRepeat { message } | UnclearOutcome::Escalate { message } => {
                message
            }
        }
    }
}

/// Result of handling an uncooperative response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UncooperativeOutcome {
    /// Ask a follow-up question
    Probe { question: &'static str },
    /// Retries exhausted; close the call politely
    EndCall { message: &'static str },
}

impl UncooperativeOutcome {
    pub fn should_end_call(&self) -> bool {
        matches!(self, UncooperativeOutcome::EndCall { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            UncooperativeOutcome::Probe { question } => question,
            UncooperativeOutcome::EndCall { message } => message,
        }
    }
}

pub fn is_unclear_response(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNCLEAR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Two words or fewer, at least one of them a low-information word.
pub fn is_uncooperative_response(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();

    words.len() <= 2
        && words
            .iter()
            .any(|word| LOW_INFORMATION_WORDS.contains(&word.to_lowercase().as_str()))
}

/// Probe index for the `count`-th uncooperative answer (1-based).
pub(crate) fn probe_index(count: u32) -> usize {
    (count.saturating_sub(1) as usize).min(PROBING_QUESTIONS.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclear_markers() {
        assert!(is_unclear_response("[inaudible] on the highway"));
        assert!(is_unclear_response("I'm at... uh"));
        assert!(is_unclear_response("[NOISE]"));
        assert!(!is_unclear_response("I'm at the dock"));
    }

    #[test]
    fn test_uncooperative_detection() {
        assert!(is_uncooperative_response("yes"));
        assert!(is_uncooperative_response("  Fine "));
        assert!(is_uncooperative_response("ok whatever"));
        assert!(!is_uncooperative_response("yes I am driving"));
        assert!(!is_uncooperative_response("Houston"));
        assert!(!is_uncooperative_response(""));
        // punctuation sticks to the token
        assert!(!is_uncooperative_response("yes."));
    }

    #[test]
    fn test_probe_index_saturates() {
        assert_eq!(probe_index(1), 0);
        assert_eq!(probe_index(2), 1);
        assert_eq!(probe_index(3), 2);
        assert_eq!(probe_index(10), 2);
        assert_eq!(probe_index(0), 0);
    }
}
