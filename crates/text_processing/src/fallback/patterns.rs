//! Compiled cue patterns for the fallback classifiers
//!
//! Patterns run against lower-cased transcript text. Order inside each list
//! is the match priority.

use once_cell::sync::Lazy;
use regex::Regex;

use dispatch_agent_core::{DriverStatus, EmergencyType};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// Driver status cues: arrival, unloading, delay, then driving
pub static DRIVER_STATUS_PATTERNS: Lazy<Vec<(DriverStatus, Regex)>> = Lazy::new(|| {
    vec![
        (
            DriverStatus::Arrived,
            compile(r"\b(arrived|just got here|pulled in|at the destination|made it here)\b"),
        ),
        (
            DriverStatus::Unloading,
            compile(r"\b(unloading|in door|at the dock|unloading now)\b"),
        ),
        (
            DriverStatus::Delayed,
            compile(r"\b(delayed|running late|behind schedule|running behind)\b"),
        ),
        (
            DriverStatus::Driving,
            compile(r"\b(driving|on the road|still driving|en route|on the way)\b"),
        ),
    ]
});

/// Emergency type cues. Tuned separately from the live detector's keywords.
pub static EMERGENCY_TYPE_PATTERNS: Lazy<Vec<(EmergencyType, Regex)>> = Lazy::new(|| {
    vec![
        (
            EmergencyType::Accident,
            compile(r"\b(accident|crash|collision|wreck|hit something)\b"),
        ),
        (
            EmergencyType::Breakdown,
            compile(r"\b(breakdown|broke down|blowout|tire|mechanical issue|engine problem)\b"),
        ),
        (
            EmergencyType::Medical,
            compile(r"\b(medical|sick|ambulance|need medical|having a medical)\b"),
        ),
        (
            EmergencyType::Other,
            compile(r"\b(emergency|need help|something wrong|pulling over|stopping)\b"),
        ),
    ]
});

pub static ESCALATION_CUES: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(emergency|accident|breakdown|medical|help|escalat)\b"));

pub static ARRIVAL_CUES: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(arrived|just got here|pulled in|at the destination|made it)\b"));

pub static TRANSIT_CUES: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(driving|in transit|on the way|en route|still driving)\b"));

/// Checked before [`LOAD_SECURE_POSITIVE`] so "not secure" never reads as secure
pub static LOAD_SECURE_NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"\b(load\s+(?:is\s+)?not\s+secure|load\s+(?:is\s+)?loose|load\s+shifted|load\s+(?:is\s+)?moving|not\s+secure)\b",
    )
});

pub static LOAD_SECURE_POSITIVE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"\b(load\s+(?:is\s+)?secure\b|load\s+(?:is\s+)?fine|load\s+(?:is\s+)?good|no\s+(?:problem|issue))\b",
    )
});

pub static POD_MENTION: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(pod|proof of delivery|remember to get|don't forget.*pod)\b"));

pub static POD_ACK_POSITIVE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(yes|got it|will do|sure|okay|ok|i will|absolutely|definitely)\b"));

pub static POD_ACK_NEGATIVE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(no|forgot|didn't|won't|can't)\b"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert_eq!(DRIVER_STATUS_PATTERNS.len(), 4);
        assert_eq!(EMERGENCY_TYPE_PATTERNS.len(), 4);
        assert!(ESCALATION_CUES.is_match("i need help"));
        assert!(LOAD_SECURE_NEGATIVE.is_match("the load is not secure"));
        assert!(POD_MENTION.is_match("grab the proof of delivery"));
    }

    #[test]
    fn test_word_boundaries() {
        // "pod" inside another word is not a mention
        assert!(!POD_MENTION.is_match("tripod"));
        assert!(!ARRIVAL_CUES.is_match("arrives"));
    }
}
