//! Conversation State Tracker
//!
//! Owns one call's [`ConversationContext`], enforces the transition table
//! and reacts to driver utterances: emergency override first, then the
//! bounded-retry policies for unclear and uncooperative speech.

use tokio::sync::broadcast;

use dispatch_agent_config::TrackerConfig;
use dispatch_agent_core::{
    DelayReason, DriverStatus, EmergencyType, FieldMap, UnloadingStatus, Utterance, UtteranceRole,
};

use crate::context::ConversationContext;
use crate::edge_cases::{
    self, UnclearOutcome, UncooperativeOutcome, CALLBACK_CLOSE_MESSAGE, HUMAN_HANDOFF_MESSAGE,
    PROBING_QUESTIONS, REPEAT_PROMPT,
};
use crate::emergency;
use crate::state::ConversationState;
use crate::AgentError;

/// Tracker event
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Utterance appended to the history
    UtteranceAdded { role: UtteranceRole },
    /// State changed; `forced` marks the emergency override
    StateChanged {
        from: ConversationState,
        to: ConversationState,
        forced: bool,
    },
    /// Emergency keywords heard
    EmergencyDetected { emergency_type: EmergencyType },
}

/// What the agent should do after a driver utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing special; carry on with the script
    Continue,
    /// State forced to `emergency_detected`
    EmergencyDetected { emergency_type: EmergencyType },
    AskToRepeat { message: &'static str },
    EscalateToHuman { message: &'static str },
    Probe { question: &'static str },
    EndCall { message: &'static str },
    /// Context is terminal; the utterance was not recorded
    CallClosed,
}

impl TurnOutcome {
    /// Prompt the agent should speak next, if any
    pub fn agent_message(&self) -> Option<&'static str> {
        match self {
            TurnOutcome::AskToRepeat { message }
            | TurnOutcome::EscalateToHuman { message }
            | TurnOutcome::EndCall { message } => Some(message),
            TurnOutcome::Probe { question } => Some(question),
            _ => None,
        }
    }
}

/// Per-call state tracker. Single writer: callers sharing one across tasks
/// go through [`crate::TrackerRegistry`].
pub struct StateTracker {
    call_id: Option<String>,
    context: ConversationContext,
    limits: TrackerConfig,
    event_tx: broadcast::Sender<TrackerEvent>,
}

impl StateTracker {
    /// Create a tracker with a fresh context
    pub fn new(limits: TrackerConfig) -> Self {
        Self::from_context(ConversationContext::new(), limits)
    }

    /// Resume tracking an existing context
    pub fn from_context(context: ConversationContext, limits: TrackerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            call_id: None,
            context,
            limits,
            event_tx,
        }
    }

    /// Tag log lines with the call id
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// Subscribe to tracker events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_tx.subscribe()
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn into_context(self) -> ConversationContext {
        self.context
    }

    pub fn state(&self) -> ConversationState {
        self.context.state
    }

    pub fn is_terminal(&self) -> bool {
        self.context.is_terminal()
    }

    fn call_id(&self) -> &str {
        self.call_id.as_deref().unwrap_or("-")
    }

    fn emit(&self, event: TrackerEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Read-only check against the transition table
    pub fn can_transition(&self, to: ConversationState) -> bool {
        self.context.state.can_transition_to(to)
    }

    /// Checked transition. Returns `false` and leaves the state untouched
    /// when `to` is not allowed from the current state.
    pub fn transition(&mut self, to: ConversationState) -> bool {
        let from = self.context.state;
        if !self.can_transition(to) {
            tracing::debug!(call_id = %self.call_id(), %from, %to, "Rejected state transition");
            return false;
        }

        self.context.state = to;
        self.emit(TrackerEvent::StateChanged { from, to, forced: false });
        true
    }

    /// Emergency override: sets `emergency_detected` from any state without
    /// consulting the transition table. `is_emergency` never resets.
    pub fn force_emergency(&mut self, emergency_type: EmergencyType) {
        let from = self.context.state;

        self.context.is_emergency = true;
        self.context.emergency_type = Some(emergency_type);
        self.context.state = ConversationState::EmergencyDetected;

        tracing::warn!(
            call_id = %self.call_id(),
            %from,
            emergency_type = %emergency_type,
            "Emergency detected, forcing escalation state"
        );

        self.emit(TrackerEvent::EmergencyDetected { emergency_type });
        if from != ConversationState::EmergencyDetected {
            self.emit(TrackerEvent::StateChanged {
                from,
                to: ConversationState::EmergencyDetected,
                forced: true,
            });
        }
    }

    /// Keyword check without side effects
    pub fn detect_emergency(&self, text: &str) -> (bool, Option<EmergencyType>) {
        emergency::detect_emergency(text)
    }

    /// Detect and, on a hit, force the emergency state. Returns whether an
    /// emergency was found.
    pub fn handle_emergency(&mut self, text: &str) -> bool {
        match self.detect_emergency(text) {
            (true, Some(emergency_type)) => {
                self.force_emergency(emergency_type);
                true
            }
            _ => false,
        }
    }

    /// Count a repeat request. Escalates once the count exceeds
    /// `max_repeat_requests`.
    pub fn handle_unclear_response(&mut self) -> UnclearOutcome {
        self.context.repeat_request_count += 1;

        if self.context.repeat_request_count > self.limits.max_repeat_requests {
            tracing::info!(
                call_id = %self.call_id(),
                repeats = self.context.repeat_request_count,
                "Repeat limit exceeded, escalating to human"
            );
            UnclearOutcome::Escalate { message: HUMAN_HANDOFF_MESSAGE }
        } else {
            UnclearOutcome::AskToRepeat { message: REPEAT_PROMPT }
        }
    }

    /// Count an uncooperative answer. Ends the call once the count reaches
    /// `max_uncooperative_retries`; before that, returns the next probe.
    pub fn handle_uncooperative_response(&mut self) -> UncooperativeOutcome {
        self.context.uncooperative_count += 1;
        let count = self.context.uncooperative_count;

        if count >= self.limits.max_uncooperative_retries {
            tracing::info!(call_id = %self.call_id(), count, "Driver uncooperative, ending call");
            UncooperativeOutcome::EndCall { message: CALLBACK_CLOSE_MESSAGE }
        } else {
            UncooperativeOutcome::Probe {
                question: PROBING_QUESTIONS[edge_cases::probe_index(count)],
            }
        }
    }

    /// Append to the history without any checks
    pub fn add_utterance(&mut self, role: UtteranceRole, content: impl Into<String>) {
        self.context.utterances.push(Utterance::new(role, content));
        self.emit(TrackerEvent::UtteranceAdded { role });
    }

    /// Record an utterance and, for the driver's turns, run emergency,
    /// unclear and uncooperative checks in that order.
    pub fn on_utterance(&mut self, role: UtteranceRole, text: &str) -> TurnOutcome {
        if self.is_terminal() {
            tracing::debug!(call_id = %self.call_id(), state = %self.state(), "Ignoring utterance on closed call");
            return TurnOutcome::CallClosed;
        }

        self.add_utterance(role, text);

        if role != UtteranceRole::User {
            return TurnOutcome::Continue;
        }

        if let (true, Some(emergency_type)) = self.detect_emergency(text) {
            self.force_emergency(emergency_type);
            return TurnOutcome::EmergencyDetected { emergency_type };
        }

        if edge_cases::is_unclear_response(text) {
            return match self.handle_unclear_response() {
                UnclearOutcome::AskToRepeat { message } => TurnOutcome::AskToRepeat { message },
                UnclearOutcome::Escalate { message } => TurnOutcome::EscalateToHuman { message },
            };
        }

        if edge_cases::is_uncooperative_response(text) {
            return match self.handle_uncooperative_response() {
                UncooperativeOutcome::Probe { question } => TurnOutcome::Probe { question },
                UncooperativeOutcome::EndCall { message } => TurnOutcome::EndCall { message },
            };
        }

        TurnOutcome::Continue
    }

    /// Copy recognized values from an extraction field map into the
    /// context. Values that do not fit the field's type are skipped.
    pub fn apply_fields(&mut self, fields: &FieldMap) {
        let text = |key: &str| fields.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let flag = |key: &str| fields.get(key).and_then(|v| v.as_bool());
        let ctx = &mut self.context;

        if let Some(status) = text("driver_status").as_deref().and_then(DriverStatus::parse) {
            ctx.driver_status = Some(status);
        }
        if let Some(reason) = text("delay_reason").as_deref().and_then(DelayReason::parse) {
            ctx.delay_reason = Some(reason);
        }
        if let Some(status) = text("unloading_status").as_deref().and_then(UnloadingStatus::parse) {
            ctx.unloading_status = Some(status);
        }
        if let Some(kind) = text("emergency_type").as_deref().and_then(EmergencyType::parse) {
            ctx.emergency_type = Some(kind);
        }
        if let Some(ack) = flag("pod_reminder_acknowledged") {
            ctx.pod_acknowledged = Some(ack);
        }
        if let Some(secure) = flag("load_secure") {
            ctx.load_secure = Some(secure);
        }

        for (key, slot) in [
            ("current_location", &mut ctx.current_location),
            ("eta", &mut ctx.eta),
            ("safety_status", &mut ctx.safety_status),
            ("injury_status", &mut ctx.injury_status),
            ("emergency_location", &mut ctx.emergency_location),
        ] {
            if let Some(value) = text(key) {
                *slot = Some(value);
            }
        }
    }

    /// Serialize the context for storage
    pub fn to_snapshot(&self) -> Result<serde_json::Value, AgentError> {
        Ok(serde_json::to_value(&self.context)?)
    }

    /// Rebuild a tracker from a stored snapshot. Missing keys take their
    /// defaults.
    pub fn from_snapshot(snapshot: serde_json::Value, limits: TrackerConfig) -> Result<Self, AgentError> {
        let context: ConversationContext = serde_json::from_value(snapshot)?;
        Ok(Self::from_context(context, limits))
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracker() -> StateTracker {
        StateTracker::default()
    }

    #[test]
    fn test_checked_transition() {
        let mut t = tracker();
        assert!(t.transition(ConversationState::GatheringStatus));
        assert!(t.transition(ConversationState::InTransit));
        assert!(!t.transition(ConversationState::Arrived));
        assert_eq!(t.state(), ConversationState::InTransit);
        assert!(t.transition(ConversationState::Completed));
        assert!(t.is_terminal());
    }

    #[test]
    fn test_terminal_rejects_everything() {
        let mut t = tracker();
        t.transition(ConversationState::GatheringStatus);
        t.transition(ConversationState::Failed);
        for state in ConversationState::ALL {
            assert!(!t.transition(state));
            assert_eq!(t.state(), ConversationState::Failed);
        }
    }

    #[test]
    fn test_emergency_override_from_in_transit() {
        let mut t = tracker();
        t.transition(ConversationState::GatheringStatus);
        t.transition(ConversationState::InTransit);

        assert!(t.handle_emergency("I just had a tire blowout"));
        assert_eq!(t.state(), ConversationState::EmergencyDetected);
        assert!(t.context().is_emergency);
        assert_eq!(t.context().emergency_type, Some(EmergencyType::Breakdown));
    }

    #[test]
    fn test_force_emergency_bypasses_table() {
        let mut t = tracker();
        t.transition(ConversationState::GatheringStatus);
        t.transition(ConversationState::Arrived);
        t.transition(ConversationState::Completed);
        assert!(!t.can_transition(ConversationState::EmergencyDetected));

        t.force_emergency(EmergencyType::Medical);
        assert_eq!(t.state(), ConversationState::EmergencyDetected);
    }

    #[test]
    fn test_unclear_escalates_on_third() {
        let mut t = tracker();
        assert!(!t.handle_unclear_response().should_escalate());
        assert!(!t.handle_unclear_response().should_escalate());
        let third = t.handle_unclear_response();
        assert!(third.should_escalate());
        assert_eq!(third.message(), HUMAN_HANDOFF_MESSAGE);
    }

    #[test]
    fn test_uncooperative_probes_then_ends() {
        let mut t = tracker();
        assert_eq!(
            t.handle_uncooperative_response(),
            UncooperativeOutcome::Probe { question: PROBING_QUESTIONS[0] }
        );
        assert_eq!(
            t.handle_uncooperative_response(),
            UncooperativeOutcome::Probe { question: PROBING_QUESTIONS[1] }
        );
        for _ in 0..5 {
            assert!(t.handle_uncooperative_response().should_end_call());
        }
        assert_eq!(t.context().uncooperative_count, 7);
    }

    #[test]
    fn test_probe_list_exhausted_repeats_last() {
        let limits = TrackerConfig {
            max_uncooperative_retries: 10,
            ..TrackerConfig::default()
        };
        let mut t = StateTracker::new(limits);
        let questions: Vec<_> = (0..6).map(|_| t.handle_uncooperative_response().message()).collect();
        assert_eq!(questions[2], PROBING_QUESTIONS[2]);
        assert_eq!(questions[5], PROBING_QUESTIONS[2]);
    }

    #[test]
    fn test_on_utterance_order() {
        let mut t = tracker();
        assert_eq!(t.on_utterance(UtteranceRole::Agent, "Any emergency?"), TurnOutcome::Continue);
        assert_eq!(
            t.on_utterance(UtteranceRole::User, "[inaudible]"),
            TurnOutcome::AskToRepeat { message: REPEAT_PROMPT }
        );
        assert_eq!(
            t.on_utterance(UtteranceRole::User, "yeah"),
            TurnOutcome::Probe { question: PROBING_QUESTIONS[0] }
        );
        // emergency wins over the short-answer check
        assert_eq!(
            t.on_utterance(UtteranceRole::User, "help"),
            TurnOutcome::EmergencyDetected { emergency_type: EmergencyType::Other }
        );
        assert_eq!(t.context().utterances.len(), 4);
        assert_eq!(t.context().uncooperative_count, 1);
    }

    #[test]
    fn test_agent_utterances_not_checked() {
        let mut t = tracker();
        t.on_utterance(UtteranceRole::Agent, "Is this an emergency?");
        assert!(!t.context().is_emergency);
        assert_eq!(t.state(), ConversationState::Initial);
    }

    #[test]
    fn test_closed_call_ignores_utterances() {
        let mut t = tracker();
        t.transition(ConversationState::GatheringStatus);
        t.transition(ConversationState::Failed);
        assert_eq!(t.on_utterance(UtteranceRole::User, "accident"), TurnOutcome::CallClosed);
        assert!(t.context().utterances.is_empty());
        assert!(!t.context().is_emergency);
    }

    #[test]
    fn test_apply_fields() {
        let mut t = tracker();
        let fields = json!({
            "driver_status": "Delayed",
            "delay_reason": "Weather",
            "current_location": "I-10 near Phoenix",
            "pod_reminder_acknowledged": true,
            "unloading_status": "Door 7",
            "load_secure": "yes"
        });
        t.apply_fields(fields.as_object().unwrap());

        let ctx = t.context();
        assert_eq!(ctx.driver_status, Some(DriverStatus::Delayed));
        assert_eq!(ctx.delay_reason, Some(DelayReason::Weather));
        assert_eq!(ctx.current_location.as_deref(), Some("I-10 near Phoenix"));
        assert_eq!(ctx.pod_acknowledged, Some(true));
        assert_eq!(ctx.unloading_status, None);
        assert_eq!(ctx.load_secure, None);
    }

    #[tokio::test]
    async fn test_events() {
        let mut t = tracker();
        let mut rx = t.subscribe();

        t.on_utterance(UtteranceRole::User, "there was a crash");

        assert_eq!(rx.recv().await.unwrap(), TrackerEvent::UtteranceAdded { role: UtteranceRole::User });
        assert_eq!(
            rx.recv().await.unwrap(),
            TrackerEvent::EmergencyDetected { emergency_type: EmergencyType::Accident }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            TrackerEvent::StateChanged {
                from: ConversationState::Initial,
                to: ConversationState::EmergencyDetected,
                forced: true,
            }
        );
    }
}
