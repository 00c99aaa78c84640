//! Start-session validation engine
//!
//! Checks run in a fixed order and the first failing one wins:
//! 1. date sanity
//! 2. seat count (overridable)
//! 3. rower double booking (overridable)
//! 4. eligibility level (overridable)
//! 5. no resolvable rower
//!
//! The engine holds no per-call state. A caller that wants to go past an
//! overridable error re-invokes [`StartSessionUsecase::execute`] with the
//! matching flag set.

use oarlog_api::{
    Boat, LevelAction, OverridableError, OverrideFlags, OverrideKind, Rower, SaveSessionPayload,
    SessionToStart, StartSessionError, StartedSession,
};
use oarlog_store::StartSessionRepository;
use oarlog_util::RowerId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::levels::{count_ineligible, decide_action, LevelPolicyStore};
use crate::rules::seat_count;

/// Validates and persists new sessions
pub struct StartSessionUsecase {
    repository: Arc<dyn StartSessionRepository>,
    levels: Arc<LevelPolicyStore>,
}

impl StartSessionUsecase {
    pub fn new(repository: Arc<dyn StartSessionRepository>, levels: Arc<LevelPolicyStore>) -> Self {
        Self { repository, levels }
    }

    /// Validate `session` and save it on success
    pub fn execute(
        &self,
        session: &SessionToStart,
        flags: OverrideFlags,
    ) -> Result<(), StartSessionError> {
        let result = self.try_execute(session, flags);

        match &result {
            Ok(()) => info!(
                boat_id = %session.boat_id,
                rowers = session.rower_ids.len(),
                "Session started"
            ),
            Err(e) if e.is_overridable() => info!(
                boat_id = %session.boat_id,
                code = e.code(),
                "Session start needs confirmation"
            ),
            Err(e) => warn!(
                boat_id = %session.boat_id,
                code = e.code(),
                error = %e,
                "Session start refused"
            ),
        }

        result
    }

    fn try_execute(
        &self,
        session: &SessionToStart,
        flags: OverrideFlags,
    ) -> Result<(), StartSessionError> {
        if is_invalid_start_session_date(session) {
            return Err(StartSessionError::InvalidDatetime {
                start_datetime: session.start_datetime,
                estimated_end_datetime: session
                    .estimated_end_datetime
                    .unwrap_or(session.start_datetime),
            });
        }

        let boat = self
            .repository
            .get_boat(&session.boat_id)
            .map_err(StartSessionError::technical)?
            .ok_or_else(|| StartSessionError::BoatNotFound(session.boat_id.clone()))?;

        let nb_of_rowers = distinct_rower_count(&session.rower_ids);
        if has_seat_count_mismatch(nb_of_rowers, &boat) {
            let error = OverridableError::BadAmountOfRowers {
                nb_of_rowers,
                boat_rowers_quantity: seat_count(boat.boat_type).unwrap_or_default(),
                boat_name: boat.name.clone(),
            };
            check_overridable(error, flags)?;
        }

        let started_sessions = self
            .repository
            .get_started_sessions()
            .map_err(StartSessionError::technical)?;
        let already_on_session =
            already_on_started_session_rower_ids(&session.rower_ids, &started_sessions);
        if !already_on_session.is_empty() && !flags.ignores(OverrideKind::RowerDoubleBooking) {
            let already_on_session_rowers = self
                .repository
                .get_rowers_by_id(&already_on_session)
                .map_err(StartSessionError::technical)?;
            return Err(OverridableError::RowersAlreadyOnStartedSession {
                already_on_session_rowers,
            }
            .into());
        }

        let rowers = self
            .repository
            .get_rowers_by_id(&session.rower_ids)
            .map_err(StartSessionError::technical)?;

        self.check_eligibility(&boat, &rowers, flags)?;

        if rowers.is_empty() {
            return Err(StartSessionError::NoRowers);
        }

        let route = match &session.route_id {
            Some(route_id) => Some(
                self.repository
                    .get_route(route_id)
                    .map_err(StartSessionError::technical)?
                    .ok_or_else(|| StartSessionError::RouteNotFound(route_id.clone()))?,
            ),
            None => None,
        };

        self.repository
            .save_session(SaveSessionPayload {
                boat: boat.to_ref(),
                route,
                rowers,
                start_datetime: session.start_datetime,
                estimated_end_datetime: session.estimated_end_datetime,
                comment: session.comment.clone(),
            })
            .map_err(StartSessionError::technical)
    }

    /// Only boats with a per-boat level config are restricted
    fn check_eligibility(
        &self,
        boat: &Boat,
        rowers: &[Rower],
        flags: OverrideFlags,
    ) -> Result<(), StartSessionError> {
        let Some(config) = self.levels.boat_level_config(&boat.id) else {
            return Ok(());
        };

        let ineligible = count_ineligible(&config, boat.boat_type, rowers);
        let thresholds = self.levels.effective_boat_type_config(boat.boat_type);

        match decide_action(ineligible, &thresholds) {
            LevelAction::Nothing => Ok(()),
            what_to_do @ (LevelAction::Alert | LevelAction::Block) => check_overridable(
                OverridableError::InvalidRowersLevel {
                    nb_of_invalid_rowers: ineligible,
                    what_to_do,
                },
                flags,
            ),
        }
    }
}

/// Fail with `error` unless `flags` override its kind
fn check_overridable(error: OverridableError, flags: OverrideFlags) -> Result<(), StartSessionError> {
    if flags.ignores(error.kind()) {
        debug!(code = error.code(), "Overridden by caller");
        return Ok(());
    }
    Err(error.into())
}

/// True when the boat has a seat count and the crew does not fill it exactly
pub fn has_seat_count_mismatch(nb_of_rowers: usize, boat: &Boat) -> bool {
    match seat_count(boat.boat_type) {
        Some(seats) => usize::try_from(seats).ok() != Some(nb_of_rowers),
        None => false,
    }
}

/// Number of distinct rowers in a request; a repeated id takes one seat
pub fn distinct_rower_count(rower_ids: &[RowerId]) -> usize {
    rower_ids.iter().collect::<HashSet<_>>().len()
}

/// True when an estimated end is given and precedes the start
pub fn is_invalid_start_session_date(session: &SessionToStart) -> bool {
    session
        .estimated_end_datetime
        .is_some_and(|end| session.start_datetime > end)
}

/// Requested rowers already on the water, in request order
pub fn already_on_started_session_rower_ids(
    rower_ids: &[RowerId],
    started_sessions: &[StartedSession],
) -> Vec<RowerId> {
    rower_ids
        .iter()
        .filter(|id| started_sessions.iter().any(|s| s.has_rower(id)))
        .cloned()
        .collect()
}
