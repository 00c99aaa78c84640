//! Store trait definitions

use chrono::{DateTime, Utc};
use oarlog_api::{
    Boat, BoatLevelConfig, BoatType, BoatTypeLevelConfig, ClosedSession, Incident, Route, Rower,
    SaveSessionPayload, StartedSession,
};
use oarlog_util::{BoatId, IncidentId, RouteId, RowerId, SessionId};

use crate::StoreResult;

/// Reads and writes needed to validate and start a session
pub trait StartSessionRepository: Send + Sync {
    fn get_boat(&self, boat_id: &BoatId) -> StoreResult<Option<Boat>>;

    fn get_route(&self, route_id: &RouteId) -> StoreResult<Option<Route>>;

    /// Resolve rowers, silently omitting ids that match nobody
    fn get_rowers_by_id(&self, rower_ids: &[RowerId]) -> StoreResult<Vec<Rower>>;

    /// All sessions currently on the water
    fn get_started_sessions(&self) -> StoreResult<Vec<StartedSession>>;

    /// Persist a new in-progress session
    fn save_session(&self, payload: SaveSessionPayload) -> StoreResult<()>;
}

/// Reads and writes needed to close a session
pub trait StopSessionRepository: Send + Sync {
    fn get_ongoing_session(&self, session_id: &SessionId) -> StoreResult<Option<StartedSession>>;

    /// Remove a session from the in-progress set
    fn remove_session(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Record a finished session in the logbook
    fn save_closed_session(&self, session: &ClosedSession) -> StoreResult<()>;

    fn add_incident(&self, incident: &Incident) -> StoreResult<()>;

    /// Undo [`Self::add_incident`] when the session it belongs to failed to save
    fn remove_incident(&self, incident_id: &IncidentId) -> StoreResult<()>;
}

/// Persistence for boat and boat-type level configuration
pub trait LevelConfigStore: Send + Sync {
    fn load_boat_level_configs(&self) -> StoreResult<Vec<BoatLevelConfig>>;

    fn upsert_boat_level_config(&self, config: &BoatLevelConfig) -> StoreResult<()>;

    fn delete_boat_level_config(&self, boat_id: &BoatId) -> StoreResult<()>;

    fn load_boat_type_level_configs(&self) -> StoreResult<Vec<(BoatType, BoatTypeLevelConfig)>>;

    fn save_boat_type_level_config(
        &self,
        boat_type: BoatType,
        config: &BoatTypeLevelConfig,
    ) -> StoreResult<()>;

    /// Drop every persisted level override
    fn clear_level_configs(&self) -> StoreResult<()>;
}

/// Boats, rowers and routes of the club
pub trait ClubRegistry: Send + Sync {
    fn add_boat(&self, boat: &Boat) -> StoreResult<()>;

    fn list_boats(&self) -> StoreResult<Vec<Boat>>;

    fn add_rower(&self, rower: &Rower) -> StoreResult<()>;

    /// All rowers, archived ones included
    fn list_rowers(&self) -> StoreResult<Vec<Rower>>;

    fn archive_rower(&self, rower_id: &RowerId, at: DateTime<Utc>) -> StoreResult<()>;

    fn add_route(&self, route: &Route) -> StoreResult<()>;

    fn list_routes(&self) -> StoreResult<Vec<Route>>;
}

/// History of closed sessions and incidents
pub trait Logbook: Send + Sync {
    /// Closed sessions, most recent start first
    fn list_closed_sessions(&self) -> StoreResult<Vec<ClosedSession>>;

    fn delete_closed_session(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Incidents, most recent first
    fn list_incidents(&self) -> StoreResult<Vec<Incident>>;
}
