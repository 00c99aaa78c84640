//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use oarlog_api::{
    Boat, BoatLevelConfig, BoatRef, BoatType, BoatTypeLevelConfig, ClosedSession, Incident, Route,
    Rower, SaveSessionPayload, StartedSession,
};
use oarlog_util::{parse_iso, to_iso, BoatId, IncidentId, RouteId, RowerId, SessionId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{
    ClubRegistry, LevelConfigStore, Logbook, StartSessionRepository, StopSessionRepository,
    StoreError, StoreResult,
};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Club registry
            CREATE TABLE IF NOT EXISTS boats (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                boat_type TEXT,
                in_maintenance INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS rowers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT,
                seriousness TEXT,
                archived_at TEXT
            );

            CREATE TABLE IF NOT EXISTS routes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            -- Sessions on the water; crew and route are snapshotted as JSON
            CREATE TABLE IF NOT EXISTS started_sessions (
                id TEXT PRIMARY KEY,
                boat_id TEXT NOT NULL,
                boat_name TEXT NOT NULL,
                route_json TEXT,
                rowers_json TEXT NOT NULL,
                start_date_time TEXT NOT NULL,
                estimated_end_date_time TEXT,
                comment TEXT
            );

            -- Logbook
            CREATE TABLE IF NOT EXISTS closed_sessions (
                id TEXT PRIMARY KEY,
                boat_id TEXT NOT NULL,
                boat_name TEXT NOT NULL,
                route_json TEXT,
                rowers_json TEXT NOT NULL,
                start_date_time TEXT NOT NULL,
                estimated_end_date_time TEXT,
                end_date_time TEXT NOT NULL,
                comment TEXT,
                incident_id TEXT
            );

            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                message TEXT NOT NULL,
                session_id TEXT NOT NULL,
                datetime TEXT NOT NULL
            );

            -- Level policy overrides
            CREATE TABLE IF NOT EXISTS boat_level_configs (
                boat_id TEXT PRIMARY KEY,
                minimal_rower_category TEXT,
                minimal_rower_type TEXT
            );

            CREATE TABLE IF NOT EXISTS boat_type_level_configs (
                boat_type TEXT PRIMARY KEY,
                alert_from INTEGER,
                block_from INTEGER
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_closed_sessions_start ON closed_sessions(start_date_time);
            CREATE INDEX IF NOT EXISTS idx_incidents_datetime ON incidents(datetime);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    /// Check if the database answers queries
    pub fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    parse_iso(value)
        .map_err(|e| StoreError::Serialization(format!("invalid timestamp '{value}': {e}")))
}

fn parse_opt_time(value: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_time).transpose()
}

fn parse_opt_label<T>(value: Option<String>) -> StoreResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|s| s.parse::<T>().map_err(|e| StoreError::Serialization(e.to_string())))
        .transpose()
}

struct BoatRow {
    id: String,
    name: String,
    boat_type: Option<String>,
    in_maintenance: bool,
}

impl BoatRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            boat_type: row.get(2)?,
            in_maintenance: row.get(3)?,
        })
    }

    fn into_boat(self) -> StoreResult<Boat> {
        Ok(Boat {
            id: BoatId::new(self.id),
            name: self.name,
            boat_type: parse_opt_label(self.boat_type)?,
            in_maintenance: self.in_maintenance,
        })
    }
}

struct RowerRow {
    id: String,
    name: String,
    category: Option<String>,
    seriousness: Option<String>,
    archived_at: Option<String>,
}

impl RowerRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            seriousness: row.get(3)?,
            archived_at: row.get(4)?,
        })
    }

    fn into_rower(self) -> StoreResult<Rower> {
        Ok(Rower {
            id: RowerId::new(self.id),
            name: self.name,
            category: parse_opt_label(self.category)?,
            seriousness: parse_opt_label(self.seriousness)?,
            archived_at: parse_opt_time(self.archived_at)?,
        })
    }
}

/// Columns shared by `started_sessions` and `closed_sessions`
struct SessionRow {
    id: String,
    boat_id: String,
    boat_name: String,
    route_json: Option<String>,
    rowers_json: String,
    start_date_time: String,
    estimated_end_date_time: Option<String>,
    comment: Option<String>,
}

const SESSION_COLUMNS: &str = "id, boat_id, boat_name, route_json, rowers_json, \
     start_date_time, estimated_end_date_time, comment";

impl SessionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            boat_id: row.get(1)?,
            boat_name: row.get(2)?,
            route_json: row.get(3)?,
            rowers_json: row.get(4)?,
            start_date_time: row.get(5)?,
            estimated_end_date_time: row.get(6)?,
            comment: row.get(7)?,
        })
    }

    fn into_started(self) -> StoreResult<StartedSession> {
        let route = match self.route_json {
            Some(json) => Some(serde_json::from_str::<Route>(&json)?),
            None => None,
        };

        Ok(StartedSession {
            id: SessionId::new(self.id),
            boat: BoatRef {
                id: BoatId::new(self.boat_id),
                name: self.boat_name,
            },
            route,
            rowers: serde_json::from_str(&self.rowers_json)?,
            start_datetime: parse_time(&self.start_date_time)?,
            estimated_end_datetime: parse_opt_time(self.estimated_end_date_time)?,
            comment: self.comment,
        })
    }
}

fn route_json(route: Option<&Route>) -> StoreResult<Option<String>> {
    Ok(route.map(serde_json::to_string).transpose()?)
}

impl StartSessionRepository for SqliteStore {
    fn get_boat(&self, boat_id: &BoatId) -> StoreResult<Option<Boat>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT id, name, boat_type, in_maintenance FROM boats WHERE id = ?",
                [boat_id.as_str()],
                BoatRow::read,
            )
            .optional()?;

        row.map(BoatRow::into_boat).transpose()
    }

    fn get_route(&self, route_id: &RouteId) -> StoreResult<Option<Route>> {
        let conn = self.conn()?;

        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM routes WHERE id = ?",
                [route_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(name.map(|name| Route {
            id: route_id.clone(),
            name,
        }))
    }

    fn get_rowers_by_id(&self, rower_ids: &[RowerId]) -> StoreResult<Vec<Rower>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, seriousness, archived_at FROM rowers WHERE id = ?",
        )?;

        let mut rowers: Vec<Rower> = Vec::with_capacity(rower_ids.len());
        for rower_id in rower_ids {
            if rowers.iter().any(|r| &r.id == rower_id) {
                continue;
            }
            let row = stmt
                .query_row([rower_id.as_str()], RowerRow::read)
                .optional()?;
            if let Some(row) = row {
                rowers.push(row.into_rower()?);
            }
        }

        Ok(rowers)
    }

    fn get_started_sessions(&self) -> StoreResult<Vec<StartedSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM started_sessions ORDER BY start_date_time"
        ))?;

        let rows = stmt.query_map([], SessionRow::read)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_started()?);
        }

        Ok(sessions)
    }

    fn save_session(&self, payload: SaveSessionPayload) -> StoreResult<()> {
        let conn = self.conn()?;
        let session_id = SessionId::generate();

        conn.execute(
            r#"
            INSERT INTO started_sessions (
                id, boat_id, boat_name, route_json, rowers_json,
                start_date_time, estimated_end_date_time, comment
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                session_id.as_str(),
                payload.boat.id.as_str(),
                payload.boat.name,
                route_json(payload.route.as_ref())?,
                serde_json::to_string(&payload.rowers)?,
                to_iso(&payload.start_datetime),
                payload.estimated_end_datetime.as_ref().map(to_iso),
                payload.comment,
            ],
        )?;

        debug!(session_id = %session_id, boat_id = %payload.boat.id, "Session saved");
        Ok(())
    }
}

impl StopSessionRepository for SqliteStore {
    fn get_ongoing_session(&self, session_id: &SessionId) -> StoreResult<Option<StartedSession>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM started_sessions WHERE id = ?"),
                [session_id.as_str()],
                SessionRow::read,
            )
            .optional()?;

        row.map(SessionRow::into_started).transpose()
    }

    fn remove_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM started_sessions WHERE id = ?",
            [session_id.as_str()],
        )?;

        if removed == 0 {
            return Err(StoreError::NotFound(format!("session {session_id}")));
        }

        debug!(session_id = %session_id, "Session removed from started sessions");
        Ok(())
    }

    fn save_closed_session(&self, session: &ClosedSession) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO closed_sessions (
                id, boat_id, boat_name, route_json, rowers_json, start_date_time,
                estimated_end_date_time, end_date_time, comment, incident_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                boat_id = excluded.boat_id,
                boat_name = excluded.boat_name,
                route_json = excluded.route_json,
                rowers_json = excluded.rowers_json,
                start_date_time = excluded.start_date_time,
                estimated_end_date_time = excluded.estimated_end_date_time,
                end_date_time = excluded.end_date_time,
                comment = excluded.comment,
                incident_id = excluded.incident_id
            "#,
            params![
                session.id.as_str(),
                session.boat.id.as_str(),
                session.boat.name,
                route_json(session.route.as_ref())?,
                serde_json::to_string(&session.rowers)?,
                to_iso(&session.start_datetime),
                session.estimated_end_datetime.as_ref().map(to_iso),
                to_iso(&session.end_datetime),
                session.comment,
                session.incident_id.as_ref().map(|id| id.as_str()),
            ],
        )?;

        debug!(session_id = %session.id, "Closed session saved");
        Ok(())
    }

    fn add_incident(&self, incident: &Incident) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO incidents (id, message, session_id, datetime) VALUES (?, ?, ?, ?)",
            params![
                incident.id.as_str(),
                incident.message,
                incident.session_id.as_str(),
                to_iso(&incident.datetime),
            ],
        )?;

        debug!(incident_id = %incident.id, session_id = %incident.session_id, "Incident added");
        Ok(())
    }

    fn remove_incident(&self, incident_id: &IncidentId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM incidents WHERE id = ?", [incident_id.as_str()])?;
        Ok(())
    }
}

impl LevelConfigStore for SqliteStore {
    fn load_boat_level_configs(&self) -> StoreResult<Vec<BoatLevelConfig>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT boat_id, minimal_rower_category, minimal_rower_type FROM boat_level_configs",
        )?;

        let rows = stmt.query_map([], |row| {
            let boat_id: String = row.get(0)?;
            let category: Option<String> = row.get(1)?;
            let rower_type: Option<String> = row.get(2)?;
            Ok((boat_id, category, rower_type))
        })?;

        let mut configs = Vec::new();
        for row in rows {
            let (boat_id, category, rower_type) = row?;
            configs.push(BoatLevelConfig {
                boat_id: BoatId::new(boat_id),
                minimal_rower_category: parse_opt_label(category)?,
                minimal_rower_type: parse_opt_label(rower_type)?,
            });
        }

        Ok(configs)
    }

    fn upsert_boat_level_config(&self, config: &BoatLevelConfig) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO boat_level_configs (boat_id, minimal_rower_category, minimal_rower_type)
            VALUES (?, ?, ?)
            ON CONFLICT(boat_id)
            DO UPDATE SET
                minimal_rower_category = excluded.minimal_rower_category,
                minimal_rower_type = excluded.minimal_rower_type
            "#,
            params![
                config.boat_id.as_str(),
                config.minimal_rower_category.map(|c| c.as_str()),
                config.minimal_rower_type.map(|t| t.as_str()),
            ],
        )?;

        debug!(boat_id = %config.boat_id, "Boat level config saved");
        Ok(())
    }

    fn delete_boat_level_config(&self, boat_id: &BoatId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM boat_level_configs WHERE boat_id = ?",
            [boat_id.as_str()],
        )?;
        Ok(())
    }

    fn load_boat_type_level_configs(&self) -> StoreResult<Vec<(BoatType, BoatTypeLevelConfig)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT boat_type, alert_from, block_from FROM boat_type_level_configs")?;

        let rows = stmt.query_map([], |row| {
            let boat_type: String = row.get(0)?;
            let alert_from: Option<u32> = row.get(1)?;
            let block_from: Option<u32> = row.get(2)?;
            Ok((boat_type, alert_from, block_from))
        })?;

        let mut configs = Vec::new();
        for row in rows {
            let (boat_type, alert_from, block_from) = row?;
            let boat_type = boat_type
                .parse::<BoatType>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            configs.push((
                boat_type,
                BoatTypeLevelConfig {
                    alert_from,
                    block_from,
                },
            ));
        }

        Ok(configs)
    }

    fn save_boat_type_level_config(
        &self,
        boat_type: BoatType,
        config: &BoatTypeLevelConfig,
    ) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO boat_type_level_configs (boat_type, alert_from, block_from)
            VALUES (?, ?, ?)
            ON CONFLICT(boat_type)
            DO UPDATE SET alert_from = excluded.alert_from, block_from = excluded.block_from
            "#,
            params![boat_type.as_str(), config.alert_from, config.block_from],
        )?;

        debug!(boat_type = %boat_type, "Boat type level config saved");
        Ok(())
    }

    fn clear_level_configs(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "DELETE FROM boat_level_configs; DELETE FROM boat_type_level_configs;",
        )?;
        debug!("Level configs cleared");
        Ok(())
    }
}

impl ClubRegistry for SqliteStore {
    fn add_boat(&self, boat: &Boat) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO boats (id, name, boat_type, in_maintenance) VALUES (?, ?, ?, ?)",
            params![
                boat.id.as_str(),
                boat.name,
                boat.boat_type.map(|t| t.as_str()),
                boat.in_maintenance,
            ],
        )?;

        debug!(boat_id = %boat.id, "Boat added");
        Ok(())
    }

    fn list_boats(&self) -> StoreResult<Vec<Boat>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, boat_type, in_maintenance FROM boats ORDER BY name")?;

        let rows = stmt.query_map([], BoatRow::read)?;

        let mut boats = Vec::new();
        for row in rows {
            boats.push(row?.into_boat()?);
        }

        Ok(boats)
    }

    fn add_rower(&self, rower: &Rower) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO rowers (id, name, category, seriousness, archived_at) VALUES (?, ?, ?, ?, ?)",
            params![
                rower.id.as_str(),
                rower.name,
                rower.category.map(|c| c.as_str()),
                rower.seriousness.map(|s| s.as_str()),
                rower.archived_at.as_ref().map(to_iso),
            ],
        )?;

        debug!(rower_id = %rower.id, "Rower added");
        Ok(())
    }

    fn list_rowers(&self) -> StoreResult<Vec<Rower>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, seriousness, archived_at FROM rowers ORDER BY name",
        )?;

        let rows = stmt.query_map([], RowerRow::read)?;

        let mut rowers = Vec::new();
        for row in rows {
            rowers.push(row?.into_rower()?);
        }

        Ok(rowers)
    }

    fn archive_rower(&self, rower_id: &RowerId, at: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE rowers SET archived_at = ? WHERE id = ?",
            params![to_iso(&at), rower_id.as_str()],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("rower {rower_id}")));
        }

        debug!(rower_id = %rower_id, "Rower archived");
        Ok(())
    }

    fn add_route(&self, route: &Route) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO routes (id, name) VALUES (?, ?)",
            params![route.id.as_str(), route.name],
        )?;
        debug!(route_id = %route.id, "Route added");
        Ok(())
    }

    fn list_routes(&self) -> StoreResult<Vec<Route>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM routes ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(Route {
                id: RouteId::new(id),
                name,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Logbook for SqliteStore {
    fn list_closed_sessions(&self) -> StoreResult<Vec<ClosedSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS}, end_date_time, incident_id FROM closed_sessions \
             ORDER BY start_date_time DESC"
        ))?;

        let rows = stmt.query_map([], |row| {
            let session = SessionRow::read(row)?;
            let end_date_time: String = row.get(8)?;
            let incident_id: Option<String> = row.get(9)?;
            Ok((session, end_date_time, incident_id))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session, end_date_time, incident_id) = row?;
            let started = session.into_started()?;
            sessions.push(ClosedSession {
                id: started.id,
                boat: started.boat,
                route: started.route,
                rowers: started.rowers,
                start_datetime: started.start_datetime,
                estimated_end_datetime: started.estimated_end_datetime,
                end_datetime: parse_time(&end_date_time)?,
                comment: started.comment,
                incident_id: incident_id.map(IncidentId::new),
            });
        }

        Ok(sessions)
    }

    fn delete_closed_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM closed_sessions WHERE id = ?",
            [session_id.as_str()],
        )?;

        if removed == 0 {
            return Err(StoreError::NotFound(format!("session {session_id}")));
        }

        debug!(session_id = %session_id, "Closed session deleted");
        Ok(())
    }

    fn list_incidents(&self) -> StoreResult<Vec<Incident>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, message, session_id, datetime FROM incidents ORDER BY datetime DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let message: String = row.get(1)?;
            let session_id: String = row.get(2)?;
            let datetime: String = row.get(3)?;
            Ok((id, message, session_id, datetime))
        })?;

        let mut incidents = Vec::new();
        for row in rows {
            let (id, message, session_id, datetime) = row?;
            incidents.push(Incident {
                id: IncidentId::new(id),
                message,
                session_id: SessionId::new(session_id),
                datetime: parse_time(&datetime)?,
            });
        }

        Ok(incidents)
    }
}
