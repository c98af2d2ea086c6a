//! Integration tests for the conversation state tracker
//!
//! These tests replay driver conversations through the tracker and the
//! registry the way the webhook handlers do.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use dispatch_agent_agent::{
    ConversationState, StateTracker, TrackerEvent, TrackerRegistry, TurnOutcome, EMERGENCY_KEYWORDS,
};
use dispatch_agent_config::TrackerConfig;
use dispatch_agent_core::{DriverStatus, EmergencyType, UtteranceRole};

/// Every keyword on its own is detected and classified
#[test]
fn test_each_keyword_triggers_emergency() {
    let tracker = StateTracker::default();
    for keyword in EMERGENCY_KEYWORDS {
        let (hit, kind) = tracker.detect_emergency(keyword);
        assert!(hit, "{keyword}");
        assert!(kind.is_some(), "{keyword}");
    }
}

/// Invalid destinations never change state, for every state
#[test]
fn test_rejected_transitions_leave_state() {
    for from in ConversationState::ALL {
        for to in ConversationState::ALL {
            let snapshot = serde_json::json!({ "state": from.as_str() });
            let mut tracker = StateTracker::from_snapshot(snapshot, TrackerConfig::default()).unwrap();

            let allowed = from.valid_transitions().contains(&to);
            assert_eq!(tracker.can_transition(to), allowed);
            assert_eq!(tracker.transition(to), allowed);
            assert_eq!(tracker.state(), if allowed { to } else { from });
        }
    }
}

/// Emergency override from in_transit, then the normal escalation path
#[test]
fn test_emergency_mid_call_escalates() {
    let mut tracker = StateTracker::default();
    assert!(tracker.transition(ConversationState::GatheringStatus));
    assert!(tracker.transition(ConversationState::InTransit));

    tracker.on_utterance(UtteranceRole::Agent, "How's the drive going?");
    let outcome = tracker.on_utterance(UtteranceRole::User, "I hit a deer, there's been an accident");
    assert_eq!(
        outcome,
        TurnOutcome::EmergencyDetected { emergency_type: EmergencyType::Accident }
    );
    assert_eq!(tracker.state(), ConversationState::EmergencyDetected);

    assert!(!tracker.transition(ConversationState::Completed));
    assert!(tracker.transition(ConversationState::Escalation));
    assert!(tracker.transition(ConversationState::Completed));
    assert!(tracker.context().is_emergency);
}

/// Noisy line: two re-prompts, then hand off
#[test]
fn test_noisy_line_hands_off() {
    let mut tracker = StateTracker::default();
    let outcomes: Vec<_> = ["[noise]", "I'm at [inaudible]", "..."]
        .iter()
        .map(|text| tracker.on_utterance(UtteranceRole::User, text))
        .collect();

    assert!(matches!(outcomes[0], TurnOutcome::AskToRepeat { .. }));
    assert!(matches!(outcomes[1], TurnOutcome::AskToRepeat { .. }));
    assert!(matches!(outcomes[2], TurnOutcome::EscalateToHuman { .. }));
    assert_eq!(tracker.context().repeat_request_count, 3);
}

/// One-word answers: probes, then end call from the max onwards
#[test]
fn test_one_word_answers_end_call() {
    let mut tracker = StateTracker::default();
    let outcomes: Vec<_> = ["yes", "fine", "sure", "ok"]
        .iter()
        .map(|text| tracker.on_utterance(UtteranceRole::User, text))
        .collect();

    assert!(matches!(outcomes[0], TurnOutcome::Probe { .. }));
    assert!(matches!(outcomes[1], TurnOutcome::Probe { .. }));
    assert!(matches!(outcomes[2], TurnOutcome::EndCall { .. }));
    assert!(matches!(outcomes[3], TurnOutcome::EndCall { .. }));
}

/// Snapshot round trip keeps state, counters, fields and utterance order
#[test]
fn test_snapshot_roundtrip() {
    let mut tracker = StateTracker::default();
    tracker.transition(ConversationState::GatheringStatus);
    tracker.on_utterance(UtteranceRole::Agent, "Where are you?");
    tracker.on_utterance(UtteranceRole::User, "yeah");
    tracker.on_utterance(UtteranceRole::User, "[unclear]");
    tracker.on_utterance(UtteranceRole::User, "Driving on I-40 near Amarillo");

    let fields = serde_json::json!({
        "driver_status": "Driving",
        "current_location": "I-40 near Amarillo",
        "eta": "6 PM",
        "pod_reminder_acknowledged": false
    });
    tracker.apply_fields(fields.as_object().unwrap());

    let snapshot = tracker.to_snapshot().unwrap();
    let restored = StateTracker::from_snapshot(snapshot, TrackerConfig::default()).unwrap();

    assert_eq!(restored.context(), tracker.context());
    assert_eq!(restored.context().driver_status, Some(DriverStatus::Driving));
    assert_eq!(restored.context().utterances[1].content, "yeah");
}

/// Old snapshots without newer keys still load
#[test]
fn test_snapshot_defaults() {
    let snapshot = serde_json::json!({ "state": "arrived", "uncooperative_count": 1 });
    let tracker = StateTracker::from_snapshot(snapshot, TrackerConfig::default()).unwrap();
    assert_eq!(tracker.state(), ConversationState::Arrived);
    assert_eq!(tracker.context().uncooperative_count, 1);
    assert_eq!(tracker.context().repeat_request_count, 0);
    assert!(!tracker.context().is_emergency);

    let bad = serde_json::json!({ "state": "on_fire" });
    assert!(StateTracker::from_snapshot(bad, TrackerConfig::default()).is_err());
}

/// Concurrent deliveries for the same call share one tracker
#[tokio::test]
async fn test_registry_serializes_per_call() {
    let registry = Arc::new(TrackerRegistry::default());

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let tracker = registry.open("call-42");
            let mut guard = tracker.lock();
            guard.on_utterance(UtteranceRole::User, &format!("update number {i}"));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let tracker = registry.open("call-42");
    assert_eq!(tracker.lock().context().utterances.len(), 8);
    assert_eq!(registry.count(), 1);
}

/// Emergency events reach subscribers
#[tokio::test]
async fn test_emergency_event_delivered() {
    let mut tracker = StateTracker::default();
    let mut rx = tracker.subscribe();

    tracker.on_utterance(UtteranceRole::User, "I need an ambulance");

    let mut saw_emergency = false;
    while let Ok(Ok(event)) = timeout(Duration::from_millis(100), rx.recv()).await {
        if let TrackerEvent::EmergencyDetected { emergency_type } = event {
            assert_eq!(emergency_type, EmergencyType::Medical);
            saw_emergency = true;
        }
    }
    assert!(saw_emergency);
}
