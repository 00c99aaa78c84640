//! Requests handed to the session engine by its callers

use chrono::{DateTime, Utc};
use oarlog_util::{BoatId, RouteId, RowerId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BoatRef, Route, Rower};

/// A proposed session, not persisted until it passes validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToStart {
    pub boat_id: BoatId,
    pub rower_ids: Vec<RowerId>,
    pub start_datetime: DateTime<Utc>,
    pub estimated_end_datetime: Option<DateTime<Utc>>,
    pub route_id: Option<RouteId>,
    pub comment: String,
}

/// Class of start-session error the caller may consciously override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    SeatCountMismatch,
    RowerDoubleBooking,
    EligibilityLevel,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverrideKind::SeatCountMismatch => "seat count mismatch",
            OverrideKind::RowerDoubleBooking => "rower double booking",
            OverrideKind::EligibilityLevel => "eligibility level",
        };
        f.write_str(s)
    }
}

/// Per-call switches suppressing overridable error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverrideFlags {
    pub ignore_seat_count_mismatch: bool,
    pub ignore_rower_double_booking: bool,
    pub ignore_eligibility_level: bool,
}

impl OverrideFlags {
    /// No override: every check applies
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ignores(&self, kind: OverrideKind) -> bool {
        match kind {
            OverrideKind::SeatCountMismatch => self.ignore_seat_count_mismatch,
            OverrideKind::RowerDoubleBooking => self.ignore_rower_double_booking,
            OverrideKind::EligibilityLevel => self.ignore_eligibility_level,
        }
    }

    /// Same flags with `kind` additionally overridden
    pub fn allowing(mut self, kind: OverrideKind) -> Self {
        match kind {
            OverrideKind::SeatCountMismatch => self.ignore_seat_count_mismatch = true,
            OverrideKind::RowerDoubleBooking => self.ignore_rower_double_booking = true,
            OverrideKind::EligibilityLevel => self.ignore_eligibility_level = true,
        }
        self
    }
}

/// Everything the repository needs to persist a new in-progress session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSessionPayload {
    pub boat: BoatRef,
    pub route: Option<Route>,
    pub rowers: Vec<Rower>,
    pub start_datetime: DateTime<Utc>,
    pub estimated_end_datetime: Option<DateTime<Utc>>,
    pub comment: String,
}

/// Incident checkbox and free-text message from the stop form
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncidentReport {
    pub checked: bool,
    pub message: Option<String>,
}

impl IncidentReport {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            checked: true,
            message: Some(message.into()),
        }
    }
}

/// Request to close an in-progress session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSession {
    pub session_id: SessionId,
    pub end_datetime: DateTime<Utc>,
    /// `None` keeps the comment given when the session started
    pub comment: Option<String>,
    pub incident: IncidentReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowing_sets_exactly_one_flag() {
        let flags = OverrideFlags::none().allowing(OverrideKind::RowerDoubleBooking);

        assert!(flags.ignores(OverrideKind::RowerDoubleBooking));
        assert!(!flags.ignores(OverrideKind::SeatCountMismatch));
        assert!(!flags.ignores(OverrideKind::EligibilityLevel));
    }

    #[test]
    fn allowing_keeps_previous_overrides() {
        let flags = OverrideFlags::none()
            .allowing(OverrideKind::SeatCountMismatch)
            .allowing(OverrideKind::EligibilityLevel);

        assert_eq!(
            flags,
            OverrideFlags {
                ignore_seat_count_mismatch: true,
                ignore_rower_double_booking: false,
                ignore_eligibility_level: true,
            }
        );
    }
}
