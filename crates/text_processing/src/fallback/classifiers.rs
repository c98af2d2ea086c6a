//! Lexical classifiers for categorical summary fields
//!
//! Each classifier returns `None` when no cue matches. `None` is never
//! coerced to a default.

use dispatch_agent_core::{CallOutcome, DriverStatus, EmergencyType, ScenarioType};

use super::patterns::*;

pub fn classify_driver_status(transcript: &str) -> Option<DriverStatus> {
    let lower = transcript.to_lowercase();
    DRIVER_STATUS_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(status, _)| *status)
}

pub fn classify_emergency_type(transcript: &str) -> Option<EmergencyType> {
    let lower = transcript.to_lowercase();
    EMERGENCY_TYPE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(kind, _)| *kind)
}

/// Emergency calls only ever resolve to `Emergency Escalation`; dispatch
/// calls check arrival before transit.
pub fn classify_call_outcome(transcript: &str, scenario: ScenarioType) -> Option<CallOutcome> {
    let lower = transcript.to_lowercase();

    match scenario {
        ScenarioType::Emergency => ESCALATION_CUES
            .is_match(&lower)
            .then_some(CallOutcome::EmergencyEscalation),
        ScenarioType::DispatchCheckIn => {
            if ARRIVAL_CUES.is_match(&lower) {
                Some(CallOutcome::ArrivalConfirmation)
            } else if TRANSIT_CUES.is_match(&lower) {
                Some(CallOutcome::InTransitUpdate)
            } else {
                None
            }
        }
    }
}

pub fn classify_load_secure(transcript: &str) -> Option<bool> {
    let lower = transcript.to_lowercase();

    if LOAD_SECURE_NEGATIVE.is_match(&lower) {
        Some(false)
    } else if LOAD_SECURE_POSITIVE.is_match(&lower) {
        Some(true)
    } else {
        None
    }
}

/// Only answers when proof of delivery came up at all.
pub fn classify_pod_acknowledged(transcript: &str) -> Option<bool> {
    let lower = transcript.to_lowercase();

    if !POD_MENTION.is_match(&lower) {
        return None;
    }

    if POD_ACK_POSITIVE.is_match(&lower) {
        Some(true)
    } else if POD_ACK_NEGATIVE.is_match(&lower) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_status() {
        assert_eq!(
            classify_driver_status("I'm still driving on I-10. Should be there soon."),
            Some(DriverStatus::Driving)
        );
        assert_eq!(
            classify_driver_status("I just got here at the destination."),
            Some(DriverStatus::Arrived)
        );
        assert_eq!(
            classify_driver_status("I'm unloading now, in door 42."),
            Some(DriverStatus::Unloading)
        );
        assert_eq!(
            classify_driver_status("I'm running behind schedule due to traffic."),
            Some(DriverStatus::Delayed)
        );
        assert_eq!(classify_driver_status("The weather is nice today."), None);
    }

    #[test]
    fn test_driver_status_priority() {
        // arrival wins over driving
        assert_eq!(
            classify_driver_status("Was driving all night but just arrived"),
            Some(DriverStatus::Arrived)
        );
    }

    #[test]
    fn test_emergency_type() {
        assert_eq!(
            classify_emergency_type("I just had an accident! I'm pulling over."),
            Some(EmergencyType::Accident)
        );
        assert_eq!(
            classify_emergency_type("I had a blowout and the truck broke down."),
            Some(EmergencyType::Breakdown)
        );
        assert_eq!(
            classify_emergency_type("I'm having a medical issue. Need an ambulance."),
            Some(EmergencyType::Medical)
        );
        assert_eq!(
            classify_emergency_type("Something's wrong, I need to pull over. This is an emergency."),
            Some(EmergencyType::Other)
        );
        assert_eq!(classify_emergency_type("All good out here"), None);
    }

    #[test]
    fn test_call_outcome() {
        assert_eq!(
            classify_call_outcome("I'm still driving, en route to the destination.", ScenarioType::DispatchCheckIn),
            Some(CallOutcome::InTransitUpdate)
        );
        assert_eq!(
            classify_call_outcome("I just arrived at the destination.", ScenarioType::DispatchCheckIn),
            Some(CallOutcome::ArrivalConfirmation)
        );
        assert_eq!(
            classify_call_outcome("I just had an accident! This is an emergency!", ScenarioType::Emergency),
            Some(CallOutcome::EmergencyEscalation)
        );
        // transit cues mean nothing on an emergency call
        assert_eq!(classify_call_outcome("still driving", ScenarioType::Emergency), None);
        assert_eq!(classify_call_outcome("hello there", ScenarioType::DispatchCheckIn), None);
    }

    #[test]
    fn test_load_secure() {
        assert_eq!(classify_load_secure("The load is secure, no problem there."), Some(true));
        assert_eq!(classify_load_secure("The load shifted and is not secure."), Some(false));
        assert_eq!(classify_load_secure("I'm driving on the highway."), None);
    }

    #[test]
    fn test_load_secure_negative_first() {
        assert_eq!(classify_load_secure("load is not secure"), Some(false));
        assert_eq!(classify_load_secure("the load is loose but no problem otherwise"), Some(false));
    }

    #[test]
    fn test_pod_acknowledged() {
        assert_eq!(
            classify_pod_acknowledged("Agent: Don't forget to get your POD. Driver: Yes, got it."),
            Some(true)
        );
        assert_eq!(
            classify_pod_acknowledged("Agent: Remember the POD. Driver: I forgot it last time."),
            Some(false)
        );
        assert_eq!(classify_pod_acknowledged("I'm driving on the highway."), None);
        assert_eq!(classify_pod_acknowledged("Yes, got it."), None);
    }
}
