//! Lead status lifecycle.
//!
//! Automatic tracking events only ever move a lead forward in engagement
//! (gray → yellow → green). Unsubscribe jumps to red from any non-terminal
//! state. Red and blue absorb every automatic event; blue is reachable only
//! through the operator override.
//!
//! The store is the only caller that persists the result of these functions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Triage status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    /// Imported, possibly emailed, no engagement yet
    Gray,
    /// Opened the email or clicked a generic link
    Yellow,
    /// Clicked "interested"; sales-ready
    Green,
    /// Unsubscribed; terminal
    Red,
    /// Taken over manually by the operator
    Blue,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::Gray,
        LeadStatus::Yellow,
        LeadStatus::Green,
        LeadStatus::Red,
        LeadStatus::Blue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Gray => "gray",
            LeadStatus::Yellow => "yellow",
            LeadStatus::Green => "green",
            LeadStatus::Red => "red",
            LeadStatus::Blue => "blue",
        }
    }

    /// Red and blue ignore automatic events.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, LeadStatus::Red | LeadStatus::Blue)
    }

    /// Position on the gray → yellow → green engagement ladder.
    fn engagement(&self) -> Option<u8> {
        match self {
            LeadStatus::Gray => Some(0),
            LeadStatus::Yellow => Some(1),
            LeadStatus::Green => Some(2),
            LeadStatus::Red | LeadStatus::Blue => None,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for LeadStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" => Ok(LeadStatus::Gray),
            "yellow" => Ok(LeadStatus::Yellow),
            "green" => Ok(LeadStatus::Green),
            "red" => Ok(LeadStatus::Red),
            "blue" => Ok(LeadStatus::Blue),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// An engagement signal arriving through the tracking endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingEvent {
    Open,
    Click,
    Interested,
    Unsubscribe,
}

impl TrackingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEvent::Open => "open",
            TrackingEvent::Click => "click",
            TrackingEvent::Interested => "interested",
            TrackingEvent::Unsubscribe => "unsubscribe",
        }
    }

    /// Lead column holding the first time this event was seen.
    pub(crate) fn timestamp_column(&self) -> &'static str {
        match self {
            TrackingEvent::Open => "opened_at",
            TrackingEvent::Click => "clicked_at",
            TrackingEvent::Interested => "interested_at",
            TrackingEvent::Unsubscribe => "unsubscribed_at",
        }
    }

    fn target(&self) -> LeadStatus {
        match self {
            TrackingEvent::Open | TrackingEvent::Click => LeadStatus::Yellow,
            TrackingEvent::Interested => LeadStatus::Green,
            TrackingEvent::Unsubscribe => LeadStatus::Red,
        }
    }
}

/// Link kinds embedded in outgoing email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    Generic,
    Interested,
    Unsubscribe,
}

impl ClickKind {
    pub const ALL: [ClickKind; 3] = [ClickKind::Generic, ClickKind::Interested, ClickKind::Unsubscribe];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClickKind::Generic => "generic",
            ClickKind::Interested => "interested",
            ClickKind::Unsubscribe => "unsubscribe",
        }
    }

    pub fn event(&self) -> TrackingEvent {
        match self {
            ClickKind::Generic => TrackingEvent::Click,
            ClickKind::Interested => TrackingEvent::Interested,
            ClickKind::Unsubscribe => TrackingEvent::Unsubscribe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClickKindError(pub String);

impl fmt::Display for ParseClickKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown link kind: {}", self.0)
    }
}

impl std::error::Error for ParseClickKindError {}

impl FromStr for ClickKind {
    type Err = ParseClickKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(ClickKind::Generic),
            "interested" => Ok(ClickKind::Interested),
            "unsubscribe" => Ok(ClickKind::Unsubscribe),
            other => Err(ParseClickKindError(other.to_string())),
        }
    }
}

/// Status a lead moves to when `event` arrives while it is `current`.
pub fn next_status(current: LeadStatus, event: TrackingEvent) -> LeadStatus {
    if current.is_absorbing() {
        return current;
    }
    let target = event.target();
    match (current.engagement(), target.engagement()) {
        (Some(from), Some(to)) if to > from => target,
        (Some(_), Some(_)) => current,
        // unsubscribe
        _ => target,
    }
}

/// Status after the operator takes a lead over manually.
///
/// Red stays red: an unsubscribed lead is never reactivated.
pub fn manual_override(current: LeadStatus) -> Option<LeadStatus> {
    match current {
        LeadStatus::Red => None,
        _ => Some(LeadStatus::Blue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_moves_gray_to_yellow_only() {
        assert_eq!(next_status(LeadStatus::Gray, TrackingEvent::Open), LeadStatus::Yellow);
        assert_eq!(next_status(LeadStatus::Yellow, TrackingEvent::Open), LeadStatus::Yellow);
        assert_eq!(next_status(LeadStatus::Green, TrackingEvent::Open), LeadStatus::Green);
    }

    #[test]
    fn test_generic_click() {
        assert_eq!(next_status(LeadStatus::Gray, TrackingEvent::Click), LeadStatus::Yellow);
        assert_eq!(next_status(LeadStatus::Yellow, TrackingEvent::Click), LeadStatus::Yellow);
        assert_eq!(next_status(LeadStatus::Green, TrackingEvent::Click), LeadStatus::Green);
    }

    #[test]
    fn test_interested_reaches_green_from_gray_and_yellow() {
        assert_eq!(next_status(LeadStatus::Gray, TrackingEvent::Interested), LeadStatus::Green);
        assert_eq!(next_status(LeadStatus::Yellow, TrackingEvent::Interested), LeadStatus::Green);
        assert_eq!(next_status(LeadStatus::Green, TrackingEvent::Interested), LeadStatus::Green);
    }

    #[test]
    fn test_unsubscribe_from_every_engagement_state() {
        for from in [LeadStatus::Gray, LeadStatus::Yellow, LeadStatus::Green] {
            assert_eq!(next_status(from, TrackingEvent::Unsubscribe), LeadStatus::Red);
        }
    }

    #[test]
    fn test_red_and_blue_absorb_automatic_events() {
        let events = [
            TrackingEvent::Open,
            TrackingEvent::Click,
            TrackingEvent::Interested,
            TrackingEvent::Unsubscribe,
        ];
        for event in events {
            assert_eq!(next_status(LeadStatus::Red, event), LeadStatus::Red);
            assert_eq!(next_status(LeadStatus::Blue, event), LeadStatus::Blue);
        }
    }

    #[test]
    fn test_manual_override() {
        assert_eq!(manual_override(LeadStatus::Gray), Some(LeadStatus::Blue));
        assert_eq!(manual_override(LeadStatus::Green), Some(LeadStatus::Blue));
        assert_eq!(manual_override(LeadStatus::Blue), Some(LeadStatus::Blue));
        assert_eq!(manual_override(LeadStatus::Red), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("GREEN".parse::<LeadStatus>(), Ok(LeadStatus::Green));
        assert_eq!(" grey ".parse::<LeadStatus>(), Ok(LeadStatus::Gray));
        assert!("purple".parse::<LeadStatus>().is_err());
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_click_kind_parse() {
        assert_eq!("interested".parse::<ClickKind>(), Ok(ClickKind::Interested));
        assert!("Interested".parse::<ClickKind>().is_err());
        assert!("../etc".parse::<ClickKind>().is_err());
        assert_eq!(
            "bogus".parse::<ClickKind>().unwrap_err().to_string(),
            "unknown link kind: bogus"
        );
        assert_eq!(ClickKind::Unsubscribe.event(), TrackingEvent::Unsubscribe);
    }
}
