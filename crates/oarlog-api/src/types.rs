//! Shared domain types for oarlog

use chrono::{DateTime, Utc};
use oarlog_util::{BoatId, IncidentId, RouteId, RowerId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a classification label cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Boat class. Fixes the number of seats, except for `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoatType {
    /// 1x
    OneRowerCoxless,
    /// 2x / 2-
    TwoRowersCoxless,
    /// 2+
    TwoRowersCoxed,
    /// 4x / 4-
    FourRowersCoxless,
    /// 4+
    FourRowersCoxed,
    /// 8x / 8+
    EightRowersCoxed,
    /// Anything else; no fixed seat count
    Other,
}

impl BoatType {
    /// All boat types in display order
    pub const ALL: [BoatType; 7] = [
        BoatType::OneRowerCoxless,
        BoatType::TwoRowersCoxless,
        BoatType::TwoRowersCoxed,
        BoatType::FourRowersCoxless,
        BoatType::FourRowersCoxed,
        BoatType::EightRowersCoxed,
        BoatType::Other,
    ];

    /// Boat types that carry a level configuration (everything but `Other`)
    pub const CONFIGURABLE: [BoatType; 6] = [
        BoatType::OneRowerCoxless,
        BoatType::TwoRowersCoxless,
        BoatType::TwoRowersCoxed,
        BoatType::FourRowersCoxless,
        BoatType::FourRowersCoxed,
        BoatType::EightRowersCoxed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoatType::OneRowerCoxless => "one_rower_coxless",
            BoatType::TwoRowersCoxless => "two_rowers_coxless",
            BoatType::TwoRowersCoxed => "two_rowers_coxed",
            BoatType::FourRowersCoxless => "four_rowers_coxless",
            BoatType::FourRowersCoxed => "four_rowers_coxed",
            BoatType::EightRowersCoxed => "eight_rowers_coxed",
            BoatType::Other => "other",
        }
    }

    /// Short rowing notation
    pub fn label(&self) -> &'static str {
        match self {
            BoatType::OneRowerCoxless => "1x",
            BoatType::TwoRowersCoxless => "2x / 2-",
            BoatType::TwoRowersCoxed => "2+",
            BoatType::FourRowersCoxless => "4x / 4-",
            BoatType::FourRowersCoxed => "4+",
            BoatType::EightRowersCoxed => "8x / 8+",
            BoatType::Other => "other",
        }
    }
}

impl fmt::Display for BoatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoatType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        BoatType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized || t.label() == normalized)
            .ok_or_else(|| ParseLabelError::new("boat type", s))
    }
}

/// Age / experience category of a rower, youngest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeCategory {
    J10,
    J12,
    J14,
    J16,
    J18,
    Senior,
}

impl AgeCategory {
    pub const ALL: [AgeCategory; 6] = [
        AgeCategory::J10,
        AgeCategory::J12,
        AgeCategory::J14,
        AgeCategory::J16,
        AgeCategory::J18,
        AgeCategory::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::J10 => "J10",
            AgeCategory::J12 => "J12",
            AgeCategory::J14 => "J14",
            AgeCategory::J16 => "J16",
            AgeCategory::J18 => "J18",
            AgeCategory::Senior => "Senior",
        }
    }
}

impl fmt::Display for AgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgeCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLabelError::new("age category", s))
    }
}

/// How seriously a rower practices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriousnessCategory {
    Recreational,
    Competitor,
}

impl SeriousnessCategory {
    pub const ALL: [SeriousnessCategory; 2] =
        [SeriousnessCategory::Recreational, SeriousnessCategory::Competitor];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriousnessCategory::Recreational => "recreational",
            SeriousnessCategory::Competitor => "competitor",
        }
    }
}

impl fmt::Display for SeriousnessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriousnessCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriousnessCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLabelError::new("seriousness category", s))
    }
}

/// A boat of the club fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boat {
    pub id: BoatId,
    pub name: String,
    /// `None` when the boat was never classified
    pub boat_type: Option<BoatType>,
    #[serde(default)]
    pub in_maintenance: bool,
}

impl Boat {
    pub fn to_ref(&self) -> BoatRef {
        BoatRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Minimal boat reference carried by sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatRef {
    pub id: BoatId,
    pub name: String,
}

/// A club rower (member or guest)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rower {
    pub id: RowerId,
    pub name: String,
    pub category: Option<AgeCategory>,
    pub seriousness: Option<SeriousnessCategory>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Rower {
    /// Unclassified rower
    pub fn new(id: impl Into<RowerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
            seriousness: None,
            archived_at: None,
        }
    }

    pub fn with_category(mut self, category: AgeCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_seriousness(mut self, seriousness: SeriousnessCategory) -> Self {
        self.seriousness = Some(seriousness);
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A rowing route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
}

/// A session currently on the water
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSession {
    pub id: SessionId,
    pub boat: BoatRef,
    pub route: Option<Route>,
    pub rowers: Vec<Rower>,
    pub start_datetime: DateTime<Utc>,
    pub estimated_end_datetime: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl StartedSession {
    pub fn has_rower(&self, rower_id: &RowerId) -> bool {
        self.rowers.iter().any(|r| &r.id == rower_id)
    }
}

/// A finished session, as recorded in the logbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedSession {
    pub id: SessionId,
    pub boat: BoatRef,
    pub route: Option<Route>,
    pub rowers: Vec<Rower>,
    pub start_datetime: DateTime<Utc>,
    pub estimated_end_datetime: Option<DateTime<Utc>>,
    pub end_datetime: DateTime<Utc>,
    pub comment: Option<String>,
    pub incident_id: Option<IncidentId>,
}

/// Incident reported when a session was closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub message: String,
    pub session_id: SessionId,
    pub datetime: DateTime<Utc>,
}

/// Per-boat minimal rower level. `None` on an axis means no restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatLevelConfig {
    pub boat_id: BoatId,
    pub minimal_rower_category: Option<AgeCategory>,
    pub minimal_rower_type: Option<SeriousnessCategory>,
}

impl BoatLevelConfig {
    /// True when neither axis restricts anything
    pub fn is_unrestricted(&self) -> bool {
        self.minimal_rower_category.is_none() && self.minimal_rower_type.is_none()
    }
}

/// Per-boat-type thresholds, read as "alert / block when at least N rowers on
/// the boat fail the level check". `None` disables a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoatTypeLevelConfig {
    pub alert_from: Option<u32>,
    pub block_from: Option<u32>,
}

impl BoatTypeLevelConfig {
    /// Never alert, never block
    pub const NON_RESTRICTIVE: BoatTypeLevelConfig = BoatTypeLevelConfig {
        alert_from: None,
        block_from: None,
    };

    /// Alert on the first ineligible rower, never block
    pub const DEFAULT: BoatTypeLevelConfig = BoatTypeLevelConfig {
        alert_from: Some(1),
        block_from: None,
    };
}

/// Outcome of the level policy for a proposed crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelAction {
    Nothing,
    Alert,
    Block,
}

impl fmt::Display for LevelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LevelAction::Nothing => "nothing",
            LevelAction::Alert => "alert",
            LevelAction::Block => "block",
        };
        f.write_str(s)
    }
}
