//! Scenario and categorical field types
//!
//! Wire strings match the values stored in summaries and the values the
//! extraction provider is instructed to emit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Which extraction contract governs a call.
///
/// Fixed per call by its agent configuration, never inferred from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// Routine dispatch check-in
    #[serde(rename = "dispatch_checkin")]
    DispatchCheckIn,
    /// Emergency escalation
    Emergency,
}

impl ScenarioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DispatchCheckIn => "dispatch_checkin",
            Self::Emergency => "emergency",
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency)
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dispatch_checkin" => Ok(Self::DispatchCheckIn),
            "emergency" => Ok(Self::Emergency),
            other => Err(Error::UnknownScenario(other.to_string())),
        }
    }
}

/// Top-level classification of what a call accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallOutcome {
    #[serde(rename = "In-Transit Update")]
    InTransitUpdate,
    #[serde(rename = "Arrival Confirmation")]
    ArrivalConfirmation,
    #[serde(rename = "Emergency Escalation")]
    EmergencyEscalation,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InTransitUpdate => "In-Transit Update",
            Self::ArrivalConfirmation => "Arrival Confirmation",
            Self::EmergencyEscalation => "Emergency Escalation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In-Transit Update" => Some(Self::InTransitUpdate),
            "Arrival Confirmation" => Some(Self::ArrivalConfirmation),
            "Emergency Escalation" => Some(Self::EmergencyEscalation),
            _ => None,
        }
    }
}

/// Driver status reported on a dispatch check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverStatus {
    Driving,
    Delayed,
    Arrived,
    Unloading,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "Driving",
            Self::Delayed => "Delayed",
            Self::Arrived => "Arrived",
            Self::Unloading => "Unloading",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Driving" => Some(Self::Driving),
            "Delayed" => Some(Self::Delayed),
            "Arrived" => Some(Self::Arrived),
            "Unloading" => Some(Self::Unloading),
            _ => None,
        }
    }
}

/// Emergency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    Accident,
    Breakdown,
    Medical,
    Other,
}

impl EmergencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accident => "Accident",
            Self::Breakdown => "Breakdown",
            Self::Medical => "Medical",
            Self::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Accident" => Some(Self::Accident),
            "Breakdown" => Some(Self::Breakdown),
            "Medical" => Some(Self::Medical),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason given for a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayReason {
    #[serde(rename = "Heavy Traffic")]
    HeavyTraffic,
    Weather,
    None,
}

impl DelayReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeavyTraffic => "Heavy Traffic",
            Self::Weather => "Weather",
            Self::None => "None",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Heavy Traffic" => Some(Self::HeavyTraffic),
            "Weather" => Some(Self::Weather),
            "None" => Some(Self::None),
            _ => None,
        }
    }
}

/// Unloading progress at the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnloadingStatus {
    #[serde(rename = "In Door 42")]
    InDoor42,
    #[serde(rename = "Waiting for Lumper")]
    WaitingForLumper,
    Detention,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl UnloadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InDoor42 => "In Door 42",
            Self::WaitingForLumper => "Waiting for Lumper",
            Self::Detention => "Detention",
            Self::NotApplicable => "N/A",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In Door 42" => Some(Self::InDoor42),
            "Waiting for Lumper" => Some(Self::WaitingForLumper),
            "Detention" => Some(Self::Detention),
            "N/A" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Escalation status on emergency calls; only one value exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EscalationStatus {
    #[default]
    #[serde(rename = "Connected to Human Dispatcher")]
    ConnectedToHumanDispatcher,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        "Connected to Human Dispatcher"
    }
}
