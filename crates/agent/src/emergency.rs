//! Live emergency detection
//!
//! Shallow and lexical: a case-insensitive substring match against a fixed
//! keyword set, then a first-match classification of the type.

use dispatch_agent_core::EmergencyType;

/// Any of these anywhere in an utterance flags an emergency.
pub const EMERGENCY_KEYWORDS: [&str; 13] = [
    "blowout",
    "accident",
    "medical",
    "help",
    "emergency",
    "fire",
    "crash",
    "injured",
    "ambulance",
    "police",
    "911",
    "hurt",
    "bleeding",
];

const ACCIDENT_CUES: &[&str] = &["accident", "crash", "collision", "hit"];
const BREAKDOWN_CUES: &[&str] = &["blowout", "tire", "breakdown", "engine", "broke"];
const MEDICAL_CUES: &[&str] = &["medical", "ambulance", "hurt", "injured", "bleeding", "sick"];

/// Check `text` for emergency keywords and classify on a hit.
pub fn detect_emergency(text: &str) -> (bool, Option<EmergencyType>) {
    let lower = text.to_lowercase();

    if EMERGENCY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        (true, Some(classify_emergency(&lower)))
    } else {
        (false, None)
    }
}

/// Priority order: accident, breakdown, medical, then other.
/// Expects lower-cased input.
fn classify_emergency(lower: &str) -> EmergencyType {
    let has = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));

    if has(ACCIDENT_CUES) {
        EmergencyType::Accident
    } else if has(BREAKDOWN_CUES) {
        EmergencyType::Breakdown
    } else if has(MEDICAL_CUES) {
        EmergencyType::Medical
    } else {
        EmergencyType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_detected() {
        for keyword in EMERGENCY_KEYWORDS {
            let (hit, kind) = detect_emergency(keyword);
            assert!(hit, "keyword {keyword} not detected");
            assert!(kind.is_some());
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            detect_emergency("I had an ACCIDENT on the ramp"),
            (true, Some(EmergencyType::Accident))
        );
    }

    #[test]
    fn test_accident_beats_medical() {
        let (_, kind) = detect_emergency("there was a crash and I'm bleeding");
        assert_eq!(kind, Some(EmergencyType::Accident));
    }

    #[test]
    fn test_classification() {
        assert_eq!(detect_emergency("tire blowout").1, Some(EmergencyType::Breakdown));
        assert_eq!(detect_emergency("call an ambulance").1, Some(EmergencyType::Medical));
        assert_eq!(detect_emergency("there's a fire").1, Some(EmergencyType::Other));
        assert_eq!(detect_emergency("police pulled me over").1, Some(EmergencyType::Other));
    }

    #[test]
    fn test_classifier_cues_alone_do_not_trigger() {
        // "tire" and "sick" classify but are not detection keywords
        assert_eq!(detect_emergency("my tire pressure is fine"), (false, None));
        assert_eq!(detect_emergency("feeling a bit sick of traffic"), (false, None));
    }

    #[test]
    fn test_substring_matching() {
        // "helpful" contains "help"
        assert!(detect_emergency("dispatch was helpful").0);
    }
}
