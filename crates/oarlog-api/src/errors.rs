//! Typed business errors returned by the start and stop workflows
//!
//! Overridability is carried by the type: only [`StartSessionError::Overridable`]
//! maps to an [`OverrideKind`], every other start error has to be fixed by the
//! caller.

use chrono::{DateTime, Utc};
use oarlog_util::{BoatId, RouteId, SessionId};
use thiserror::Error;

use crate::{LevelAction, OverrideKind, Rower};

/// Policy warnings the caller may override on a retry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverridableError {
    #[error("{boat_name} seats {boat_rowers_quantity} rowers, {nb_of_rowers} given")]
    BadAmountOfRowers {
        nb_of_rowers: usize,
        boat_rowers_quantity: u32,
        boat_name: String,
    },

    #[error("{} rower(s) already on a started session", .already_on_session_rowers.len())]
    RowersAlreadyOnStartedSession { already_on_session_rowers: Vec<Rower> },

    #[error("{nb_of_invalid_rowers} rower(s) below the boat level ({what_to_do})")]
    InvalidRowersLevel {
        nb_of_invalid_rowers: u32,
        what_to_do: LevelAction,
    },
}

impl OverridableError {
    /// The override flag that suppresses this error
    pub fn kind(&self) -> OverrideKind {
        match self {
            OverridableError::BadAmountOfRowers { .. } => OverrideKind::SeatCountMismatch,
            OverridableError::RowersAlreadyOnStartedSession { .. } => {
                OverrideKind::RowerDoubleBooking
            }
            OverridableError::InvalidRowersLevel { .. } => OverrideKind::EligibilityLevel,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OverridableError::BadAmountOfRowers { .. } => "BAD_AMOUNT_OF_ROWERS",
            OverridableError::RowersAlreadyOnStartedSession { .. } => {
                "ROWERS_ALREADY_ON_STARTED_SESSION"
            }
            OverridableError::InvalidRowersLevel { .. } => "INVALID_ROWERS_LEVEL",
        }
    }
}

/// Why a session could not be started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartSessionError {
    #[error("estimated end {estimated_end_datetime} is before start {start_datetime}")]
    InvalidDatetime {
        start_datetime: DateTime<Utc>,
        estimated_end_datetime: DateTime<Utc>,
    },

    #[error(transparent)]
    Overridable(#[from] OverridableError),

    #[error("could not find rowers")]
    NoRowers,

    #[error("boat not found: {0}")]
    BoatNotFound(BoatId),

    #[error("route not found: {0}")]
    RouteNotFound(RouteId),

    #[error("technical error: {0}")]
    Technical(String),
}

impl StartSessionError {
    pub fn technical(cause: impl std::fmt::Display) -> Self {
        Self::Technical(cause.to_string())
    }

    /// The override flag that would suppress this error, if any
    pub fn override_kind(&self) -> Option<OverrideKind> {
        match self {
            StartSessionError::Overridable(e) => Some(e.kind()),
            StartSessionError::InvalidDatetime { .. }
            | StartSessionError::NoRowers
            | StartSessionError::BoatNotFound(_)
            | StartSessionError::RouteNotFound(_)
            | StartSessionError::Technical(_) => None,
        }
    }

    pub fn is_overridable(&self) -> bool {
        self.override_kind().is_some()
    }

    pub fn code(&self) -> &'static str {
        match self {
            StartSessionError::InvalidDatetime { .. } => "INVALID_DATETIME",
            StartSessionError::Overridable(e) => e.code(),
            StartSessionError::NoRowers => "NO_ROWERS",
            StartSessionError::BoatNotFound(_) => "BOAT_NOT_FOUND",
            StartSessionError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            StartSessionError::Technical(_) => "TECHNICAL_ERROR",
        }
    }
}

/// Why a session could not be closed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopSessionError {
    #[error("failed to get session {session_id}: {reason}")]
    FailedToGetSession { session_id: SessionId, reason: String },

    #[error("end {end_datetime} is before start {start_datetime}")]
    EndDateBeforeStartDate {
        start_datetime: DateTime<Utc>,
        end_datetime: DateTime<Utc>,
    },

    #[error("failed to save incident: {0}")]
    FailedToSaveIncident(String),

    #[error("failed to save session: {0}")]
    FailedToSaveSession(String),

    #[error("failed to remove session: {0}")]
    FailedToRemoveSession(String),
}

impl StopSessionError {
    pub fn code(&self) -> &'static str {
        match self {
            StopSessionError::FailedToGetSession { .. } => "FAILED_TO_GET_SESSION",
            StopSessionError::EndDateBeforeStartDate { .. } => "END_DATE_BEFORE_START_DATE",
            StopSessionError::FailedToSaveIncident(_) => "FAILED_TO_SAVE_INCIDENT",
            StopSessionError::FailedToSaveSession(_) => "FAILED_TO_SAVE_SESSION",
            StopSessionError::FailedToRemoveSession(_) => "FAILED_TO_REMOVE_SESSION",
        }
    }
}
