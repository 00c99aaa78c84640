//! In-memory store for tests
//!
//! Behaves like [`crate::SqliteStore`] and additionally records the writes it
//! receives and can be told to fail specific operations.

use chrono::{DateTime, Utc};
use oarlog_api::{
    Boat, BoatLevelConfig, BoatType, BoatTypeLevelConfig, ClosedSession, Incident, Route, Rower,
    SaveSessionPayload, StartedSession,
};
use oarlog_util::{BoatId, IncidentId, RouteId, RowerId, SessionId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::{
    ClubRegistry, LevelConfigStore, Logbook, StartSessionRepository, StopSessionRepository,
    StoreError, StoreResult,
};

/// Store operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    GetBoat,
    GetStartedSessions,
    SaveSession,
    GetOngoingSession,
    AddIncident,
    SaveClosedSession,
    RemoveSession,
    RemoveIncident,
}

#[derive(Default)]
struct MemoryState {
    boats: Vec<Boat>,
    rowers: Vec<Rower>,
    routes: Vec<Route>,
    started: Vec<StartedSession>,
    closed: Vec<ClosedSession>,
    incidents: Vec<Incident>,
    boat_level_configs: Vec<BoatLevelConfig>,
    boat_type_level_configs: Vec<(BoatType, BoatTypeLevelConfig)>,
    saved_payloads: Vec<SaveSessionPayload>,
    removed_incidents: Vec<IncidentId>,
    failures: HashSet<FailPoint>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boats(self, boats: impl IntoIterator<Item = Boat>) -> Self {
        self.with_state(|s| s.boats.extend(boats))
    }

    pub fn with_rowers(self, rowers: impl IntoIterator<Item = Rower>) -> Self {
        self.with_state(|s| s.rowers.extend(rowers))
    }

    pub fn with_routes(self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.with_state(|s| s.routes.extend(routes))
    }

    pub fn with_started_sessions(self, sessions: impl IntoIterator<Item = StartedSession>) -> Self {
        self.with_state(|s| s.started.extend(sessions))
    }

    pub fn with_boat_level_configs(
        self,
        configs: impl IntoIterator<Item = BoatLevelConfig>,
    ) -> Self {
        self.with_state(|s| s.boat_level_configs.extend(configs))
    }

    fn with_state(self, f: impl FnOnce(&mut MemoryState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut *state);
        }
        self
    }

    /// Make every later call to `point` fail
    pub fn fail(&self, point: FailPoint) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.insert(point);
        }
    }

    /// Let `point` succeed again
    pub fn recover(&self, point: FailPoint) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.remove(&point);
        }
    }

    /// Payloads received by `save_session`, in call order
    pub fn saved_payloads(&self) -> Vec<SaveSessionPayload> {
        self.read(|s| s.saved_payloads.clone())
    }

    pub fn started_sessions(&self) -> Vec<StartedSession> {
        self.read(|s| s.started.clone())
    }

    pub fn closed_sessions(&self) -> Vec<ClosedSession> {
        self.read(|s| s.closed.clone())
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.read(|s| s.incidents.clone())
    }

    /// Incident ids passed to `remove_incident`
    pub fn removed_incidents(&self) -> Vec<IncidentId> {
        self.read(|s| s.removed_incidents.clone())
    }

    fn read<T: Default>(&self, f: impl FnOnce(&MemoryState) -> T) -> T {
        self.state.lock().map(|s| f(&*s)).unwrap_or_default()
    }

    /// Lock the state, failing with an injected error when `point` is armed
    fn state_for(&self, point: Option<FailPoint>) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))?;

        if let Some(point) = point.filter(|p| state.failures.contains(p)) {
            return Err(StoreError::Database(format!("injected failure: {point:?}")));
        }

        Ok(state)
    }
}

impl StartSessionRepository for MemoryStore {
    fn get_boat(&self, boat_id: &BoatId) -> StoreResult<Option<Boat>> {
        let state = self.state_for(Some(FailPoint::GetBoat))?;
        Ok(state.boats.iter().find(|b| &b.id == boat_id).cloned())
    }

    fn get_route(&self, route_id: &RouteId) -> StoreResult<Option<Route>> {
        let state = self.state_for(None)?;
        Ok(state.routes.iter().find(|r| &r.id == route_id).cloned())
    }

    fn get_rowers_by_id(&self, rower_ids: &[RowerId]) -> StoreResult<Vec<Rower>> {
        let state = self.state_for(None)?;
        let mut rowers: Vec<Rower> = Vec::new();
        for rower_id in rower_ids {
            if rowers.iter().any(|r| &r.id == rower_id) {
                continue;
            }
            if let Some(rower) = state.rowers.iter().find(|r| &r.id == rower_id) {
                rowers.push(rower.clone());
            }
        }
        Ok(rowers)
    }

    fn get_started_sessions(&self) -> StoreResult<Vec<StartedSession>> {
        let state = self.state_for(Some(FailPoint::GetStartedSessions))?;
        Ok(state.started.clone())
    }

    fn save_session(&self, payload: SaveSessionPayload) -> StoreResult<()> {
        let mut state = self.state_for(Some(FailPoint::SaveSession))?;
        state.started.push(StartedSession {
            id: SessionId::generate(),
            boat: payload.boat.clone(),
            route: payload.route.clone(),
            rowers: payload.rowers.clone(),
            start_datetime: payload.start_datetime,
            estimated_end_datetime: payload.estimated_end_datetime,
            comment: Some(payload.comment.clone()),
        });
        state.saved_payloads.push(payload);
        Ok(())
    }
}

impl StopSessionRepository for MemoryStore {
    fn get_ongoing_session(&self, session_id: &SessionId) -> StoreResult<Option<StartedSession>> {
        let state = self.state_for(Some(FailPoint::GetOngoingSession))?;
        Ok(state.started.iter().find(|s| &s.id == session_id).cloned())
    }

    fn remove_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let mut state = self.state_for(Some(FailPoint::RemoveSession))?;
        let before = state.started.len();
        state.started.retain(|s| &s.id != session_id);
        if state.started.len() == before {
            return Err(StoreError::NotFound(format!("session {session_id}")));
        }
        Ok(())
    }

    fn save_closed_session(&self, session: &ClosedSession) -> StoreResult<()> {
        let mut state = self.state_for(Some(FailPoint::SaveClosedSession))?;
        match state.closed.iter().position(|s| s.id == session.id) {
            Some(index) => state.closed[index] = session.clone(),
            None => state.closed.push(session.clone()),
        }
        Ok(())
    }

    fn add_incident(&self, incident: &Incident) -> StoreResult<()> {
        let mut state = self.state_for(Some(FailPoint::AddIncident))?;
        state.incidents.push(incident.clone());
        Ok(())
    }

    fn remove_incident(&self, incident_id: &IncidentId) -> StoreResult<()> {
        let mut state = self.state_for(Some(FailPoint::RemoveIncident))?;
        state.incidents.retain(|i| &i.id != incident_id);
        state.removed_incidents.push(incident_id.clone());
        Ok(())
    }
}

impl LevelConfigStore for MemoryStore {
    fn load_boat_level_configs(&self) -> StoreResult<Vec<BoatLevelConfig>> {
        Ok(self.state_for(None)?.boat_level_configs.clone())
    }

    fn upsert_boat_level_config(&self, config: &BoatLevelConfig) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        state.boat_level_configs.retain(|c| c.boat_id != config.boat_id);
        state.boat_level_configs.push(config.clone());
        Ok(())
    }

    fn delete_boat_level_config(&self, boat_id: &BoatId) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        state.boat_level_configs.retain(|c| &c.boat_id != boat_id);
        Ok(())
    }

    fn load_boat_type_level_configs(&self) -> StoreResult<Vec<(BoatType, BoatTypeLevelConfig)>> {
        Ok(self.state_for(None)?.boat_type_level_configs.clone())
    }

    fn save_boat_type_level_config(
        &self,
        boat_type: BoatType,
        config: &BoatTypeLevelConfig,
    ) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        state.boat_type_level_configs.retain(|(t, _)| *t != boat_type);
        state.boat_type_level_configs.push((boat_type, *config));
        Ok(())
    }

    fn clear_level_configs(&self) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        state.boat_level_configs.clear();
        state.boat_type_level_configs.clear();
        Ok(())
    }
}

impl ClubRegistry for MemoryStore {
    fn add_boat(&self, boat: &Boat) -> StoreResult<()> {
        self.state_for(None)?.boats.push(boat.clone());
        Ok(())
    }

    fn list_boats(&self) -> StoreResult<Vec<Boat>> {
        Ok(self.state_for(None)?.boats.clone())
    }

    fn add_rower(&self, rower: &Rower) -> StoreResult<()> {
        self.state_for(None)?.rowers.push(rower.clone());
        Ok(())
    }

    fn list_rowers(&self) -> StoreResult<Vec<Rower>> {
        Ok(self.state_for(None)?.rowers.clone())
    }

    fn archive_rower(&self, rower_id: &RowerId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        let rower = state
            .rowers
            .iter_mut()
            .find(|r| &r.id == rower_id)
            .ok_or_else(|| StoreError::NotFound(format!("rower {rower_id}")))?;
        rower.archived_at = Some(at);
        Ok(())
    }

    fn add_route(&self, route: &Route) -> StoreResult<()> {
        self.state_for(None)?.routes.push(route.clone());
        Ok(())
    }

    fn list_routes(&self) -> StoreResult<Vec<Route>> {
        Ok(self.state_for(None)?.routes.clone())
    }
}

impl Logbook for MemoryStore {
    fn list_closed_sessions(&self) -> StoreResult<Vec<ClosedSession>> {
        let mut sessions = self.state_for(None)?.closed.clone();
        sessions.sort_by(|a, b| b.start_datetime.cmp(&a.start_datetime));
        Ok(sessions)
    }

    fn delete_closed_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let mut state = self.state_for(None)?;
        let before = state.closed.len();
        state.closed.retain(|s| &s.id != session_id);
        if state.closed.len() == before {
            return Err(StoreError::NotFound(format!("session {session_id}")));
        }
        Ok(())
    }

    fn list_incidents(&self) -> StoreResult<Vec<Incident>> {
        let mut incidents = self.state_for(None)?.incidents.clone();
        incidents.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        Ok(incidents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        assert!(store.get_started_sessions().unwrap().is_empty());

        store.fail(FailPoint::GetStartedSessions);
        assert!(matches!(
            store.get_started_sessions(),
            Err(StoreError::Database(_))
        ));
        // Other operations are unaffected
        assert!(store.list_boats().unwrap().is_empty());

        store.recover(FailPoint::GetStartedSessions);
        assert!(store.get_started_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_remove_incident_is_recorded() {
        let store = MemoryStore::new();
        let id = IncidentId::new("incident-1");
        store.remove_incident(&id).unwrap();
        assert_eq!(store.removed_incidents(), vec![id]);
    }

    #[test]
    fn test_get_rowers_by_id_dedupes() {
        let store = MemoryStore::new().with_rowers([Rower::new("rower-1", "Alice")]);
        let rowers = store
            .get_rowers_by_id(&[RowerId::new("rower-1"), RowerId::new("rower-1")])
            .unwrap();
        assert_eq!(rowers.len(), 1);
    }
}
