//! Stop-session workflow

use oarlog_api::{ClosedSession, Incident, IncidentReport, StopSession, StopSessionError};
use oarlog_store::StopSessionRepository;
use oarlog_util::{IncidentId, SessionId};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Message stored when an incident is reported without details
pub const NO_INCIDENT_DETAIL: &str = "No detail provided";

/// Closes in-progress sessions into the logbook
pub struct StopSessionUsecase {
    repository: Arc<dyn StopSessionRepository>,
}

impl StopSessionUsecase {
    pub fn new(repository: Arc<dyn StopSessionRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(&self, request: StopSession) -> Result<(), StopSessionError> {
        let session_id = request.session_id.clone();

        let session = self
            .repository
            .get_ongoing_session(&session_id)
            .map_err(|e| StopSessionError::FailedToGetSession {
                session_id: session_id.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| StopSessionError::FailedToGetSession {
                session_id: session_id.clone(),
                reason: "no ongoing session with this id".into(),
            })?;

        if request.end_datetime < session.start_datetime {
            return Err(StopSessionError::EndDateBeforeStartDate {
                start_datetime: session.start_datetime,
                end_datetime: request.end_datetime,
            });
        }

        let incident_id = if request.incident.checked {
            let incident = Incident {
                id: IncidentId::generate(),
                message: incident_message(&request.incident),
                session_id: session_id.clone(),
                datetime: request.end_datetime,
            };
            self.repository
                .add_incident(&incident)
                .map_err(|e| StopSessionError::FailedToSaveIncident(e.to_string()))?;
            info!(
                session_id = %session_id,
                incident_id = %incident.id,
                "Incident recorded"
            );
            Some(incident.id)
        } else {
            None
        };

        let closed = ClosedSession {
            id: session.id,
            boat: session.boat,
            route: session.route,
            rowers: session.rowers,
            start_datetime: session.start_datetime,
            estimated_end_datetime: session.estimated_end_datetime,
            end_datetime: request.end_datetime,
            comment: request.comment.or(session.comment),
            incident_id: incident_id.clone(),
        };

        if let Err(e) = self.repository.save_closed_session(&closed) {
            if let Some(incident_id) = &incident_id {
                self.compensate_incident(&session_id, incident_id);
            }
            return Err(StopSessionError::FailedToSaveSession(e.to_string()));
        }

        self.repository.remove_session(&session_id).map_err(|e| {
            error!(
                session_id = %session_id,
                error = %e,
                "Closed session saved but still listed as ongoing"
            );
            StopSessionError::FailedToRemoveSession(e.to_string())
        })?;

        info!(
            session_id = %session_id,
            boat_id = %closed.boat.id,
            incident = incident_id.is_some(),
            "Session closed"
        );
        Ok(())
    }

    fn compensate_incident(&self, session_id: &SessionId, incident_id: &IncidentId) {
        warn!(
            session_id = %session_id,
            incident_id = %incident_id,
            "Session save failed, removing its incident"
        );
        if let Err(e) = self.repository.remove_incident(incident_id) {
            error!(
                incident_id = %incident_id,
                error = %e,
                "Failed to remove orphaned incident"
            );
        }
    }
}

/// Reported message, or [`NO_INCIDENT_DETAIL`] when it carries nothing
fn incident_message(report: &IncidentReport) -> String {
    match report.message.as_deref().map(str::trim) {
        Some(message) if !is_blank(message) => message.to_string(),
        _ => NO_INCIDENT_DETAIL.to_string(),
    }
}

fn is_blank(message: &str) -> bool {
    message.is_empty() || message == "undefined" || message == "null"
}
