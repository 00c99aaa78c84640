//! Integration tests for oarlog
//!
//! These tests drive the start/stop workflows end to end over an on-disk
//! SQLite store and a level policy loaded from a TOML config.

use chrono::{DateTime, Duration, TimeZone, Utc};
use oarlog_api::{
    AgeCategory, Boat, BoatLevelConfig, BoatType, ClosedSession, IncidentReport, LevelAction, OverridableError,
    OverrideFlags, OverrideKind, Rower, SessionToStart, StartSessionError, StopSession,
    StopSessionError,
};
use oarlog_config::parse_config;
use oarlog_core::{LevelPolicyStore, StartSessionUsecase, StopSessionUsecase};
use oarlog_store::{
    ClubRegistry, Logbook, SqliteStore, StartSessionRepository, StopSessionRepository,
};
use oarlog_util::{BoatId, RowerId};
use std::sync::Arc;
use tempfile::TempDir;

const CLUB_CONFIG: &str = r#"
config_version = 1

[levels.boat_types.four_rowers_coxless]
alert_from = 1
block_from = 3
"#;

struct Club {
    _dir: TempDir,
    store: Arc<SqliteStore>,
    levels: Arc<LevelPolicyStore>,
    start: StartSessionUsecase,
    stop: StopSessionUsecase,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
}

fn setup() -> Club {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("oarlog.db")).unwrap());
    let policy = parse_config(CLUB_CONFIG).unwrap();
    let levels = Arc::new(LevelPolicyStore::from_policy(&policy, store.clone()).unwrap());

    for (id, name, boat_type) in [
        ("quad", "Marie-Jo", BoatType::FourRowersCoxless),
        ("single-1", "Zephyr", BoatType::OneRowerCoxless),
        ("single-2", "Mistral", BoatType::OneRowerCoxless),
    ] {
        store
            .add_boat(&Boat {
                id: BoatId::new(id),
                name: name.into(),
                boat_type: Some(boat_type),
                in_maintenance: false,
            })
            .unwrap();
    }

    for (id, category) in [
        ("alice", AgeCategory::Senior),
        ("bob", AgeCategory::Senior),
        ("chloe", AgeCategory::J18),
        ("dan", AgeCategory::J10),
    ] {
        store
            .add_rower(&Rower::new(id, id).with_category(category))
            .unwrap();
    }

    Club {
        start: StartSessionUsecase::new(store.clone(), levels.clone()),
        stop: StopSessionUsecase::new(store.clone()),
        _dir: dir,
        store,
        levels,
    }
}

fn session(boat: &str, rowers: &[&str]) -> SessionToStart {
    SessionToStart {
        boat_id: BoatId::new(boat),
        rower_ids: rowers.iter().map(|id| RowerId::new(*id)).collect(),
        start_datetime: t0(),
        estimated_end_datetime: Some(t0() + Duration::hours(2)),
        route_id: None,
        comment: String::new(),
    }
}

#[test]
fn test_scenario_a_seat_count_then_override() {
    let club = setup();
    let request = session("quad", &["alice", "bob", "chloe"]);

    let result = club.start.execute(&request, OverrideFlags::none());
    assert_eq!(
        result,
        Err(OverridableError::BadAmountOfRowers {
            nb_of_rowers: 3,
            boat_rowers_quantity: 4,
            boat_name: "Marie-Jo".into(),
        }
        .into())
    );
    assert!(club.store.get_started_sessions().unwrap().is_empty());

    let flags = OverrideFlags::none().allowing(OverrideKind::SeatCountMismatch);
    club.start.execute(&request, flags).unwrap();

    let started = club.store.get_started_sessions().unwrap();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].rowers.len(), 3);
}

#[test]
fn test_scenario_b_double_booking_then_override() {
    let club = setup();

    club.start
        .execute(&session("single-1", &["alice"]), OverrideFlags::none())
        .unwrap();

    let request = session("single-2", &["alice"]);
    match club.start.execute(&request, OverrideFlags::none()) {
        Err(StartSessionError::Overridable(OverridableError::RowersAlreadyOnStartedSession {
            already_on_session_rowers,
        })) => {
            assert_eq!(already_on_session_rowers.len(), 1);
            assert_eq!(already_on_session_rowers[0].id, RowerId::new("alice"));
        }
        other => panic!("expected double booking, got {other:?}"),
    }

    let flags = OverrideFlags::none().allowing(OverrideKind::RowerDoubleBooking);
    club.start.execute(&request, flags).unwrap();
    assert_eq!(club.store.get_started_sessions().unwrap().len(), 2);
}

#[test]
fn test_scenario_c_level_alert() {
    let club = setup();
    club.levels
        .upsert_boat_level_config(BoatLevelConfig {
            boat_id: BoatId::new("quad"),
            minimal_rower_category: Some(AgeCategory::J14),
            minimal_rower_type: None,
        })
        .unwrap();

    let request = session("quad", &["alice", "bob", "chloe", "dan"]);
    let result = club.start.execute(&request, OverrideFlags::none());

    assert_eq!(
        result,
        Err(OverridableError::InvalidRowersLevel {
            nb_of_invalid_rowers: 1,
            what_to_do: LevelAction::Alert,
        }
        .into())
    );
}

#[test]
fn test_level_block_with_missing_seats() {
    let club = setup();
    club.levels
        .upsert_boat_level_config(BoatLevelConfig {
            boat_id: BoatId::new("quad"),
            minimal_rower_category: Some(AgeCategory::J14),
            minimal_rower_type: None,
        })
        .unwrap();

    // dan is too young and two seats stay empty
    let request = session("quad", &["alice", "dan"]);
    let flags = OverrideFlags::none().allowing(OverrideKind::SeatCountMismatch);
    let result = club.start.execute(&request, flags);

    assert_eq!(
        result,
        Err(OverridableError::InvalidRowersLevel {
            nb_of_invalid_rowers: 3,
            what_to_do: LevelAction::Block,
        }
        .into())
    );
}

#[test]
fn test_scenario_d_invalid_date_never_overridable() {
    let club = setup();
    let mut request = session("quad", &["alice"]);
    request.estimated_end_datetime = Some(t0() - Duration::days(1));

    for mask in 0u8..8 {
        let flags = OverrideFlags {
            ignore_seat_count_mismatch: mask & 1 != 0,
            ignore_rower_double_booking: mask & 2 != 0,
            ignore_eligibility_level: mask & 4 != 0,
        };
        let result = club.start.execute(&request, flags);
        assert!(
            matches!(result, Err(StartSessionError::InvalidDatetime { .. })),
            "flags {flags:?} gave {result:?}"
        );
    }
    assert!(club.store.get_started_sessions().unwrap().is_empty());
}

#[test]
fn test_scenario_e_stop_before_start_has_no_side_effects() {
    let club = setup();
    club.start
        .execute(&session("single-1", &["alice"]), OverrideFlags::none())
        .unwrap();
    let ongoing = club.store.get_started_sessions().unwrap().remove(0);

    let result = club.stop.execute(StopSession {
        session_id: ongoing.id.clone(),
        end_datetime: t0() - Duration::minutes(5),
        comment: Some("back early".into()),
        incident: IncidentReport::with_message("scratched hull"),
    });

    assert!(matches!(
        result,
        Err(StopSessionError::EndDateBeforeStartDate { .. })
    ));
    assert_eq!(club.store.get_started_sessions().unwrap().len(), 1);
    assert!(club.store.list_closed_sessions().unwrap().is_empty());
    assert!(club.store.list_incidents().unwrap().is_empty());
}

#[test]
fn test_full_outing_with_incident() {
    let club = setup();
    club.start
        .execute(&session("single-1", &["bob"]), OverrideFlags::none())
        .unwrap();
    let ongoing = club.store.get_started_sessions().unwrap().remove(0);

    club.stop
        .execute(StopSession {
            session_id: ongoing.id.clone(),
            end_datetime: t0() + Duration::minutes(75),
            comment: None,
            incident: IncidentReport {
                checked: true,
                message: Some("undefined".into()),
            },
        })
        .unwrap();

    assert!(club.store.get_started_sessions().unwrap().is_empty());

    let logbook = club.store.list_closed_sessions().unwrap();
    assert_eq!(logbook.len(), 1);
    assert_eq!(logbook[0].id, ongoing.id);

    let incidents = club.store.list_incidents().unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].message, oarlog_core::NO_INCIDENT_DETAIL);
    assert_eq!(logbook[0].incident_id.as_ref(), Some(&incidents[0].id));

    // The rower is free again
    club.start
        .execute(&session("single-2", &["bob"]), OverrideFlags::none())
        .unwrap();
}

#[test]
fn test_stop_retry_after_half_finished_stop() {
    let club = setup();
    club.start
        .execute(&session("single-1", &["bob"]), OverrideFlags::none())
        .unwrap();
    let ongoing = club.store.get_started_sessions().unwrap().remove(0);

    // A previous stop wrote the logbook entry but left the session ongoing
    club.store
        .save_closed_session(&ClosedSession {
            id: ongoing.id.clone(),
            boat: ongoing.boat.clone(),
            route: None,
            rowers: ongoing.rowers.clone(),
            start_datetime: ongoing.start_datetime,
            estimated_end_datetime: ongoing.estimated_end_datetime,
            end_datetime: t0() + Duration::minutes(30),
            comment: None,
            incident_id: None,
        })
        .unwrap();

    club.stop
        .execute(StopSession {
            session_id: ongoing.id.clone(),
            end_datetime: t0() + Duration::minutes(45),
            comment: None,
            incident: IncidentReport::with_message("rigger bent"),
        })
        .unwrap();

    assert!(club.store.get_started_sessions().unwrap().is_empty());
    let logbook = club.store.list_closed_sessions().unwrap();
    assert_eq!(logbook.len(), 1);
    assert_eq!(logbook[0].end_datetime, t0() + Duration::minutes(45));
    assert_eq!(club.store.list_incidents().unwrap().len(), 1);

    club.start
        .execute(&session("single-2", &["bob"]), OverrideFlags::none())
        .unwrap();
}

#[test]
fn test_idempotent_failure() {
    let club = setup();
    let request = session("quad", &["alice", "bob"]);

    let first = club.start.execute(&request, OverrideFlags::none());
    let second = club.start.execute(&request, OverrideFlags::none());

    assert!(first.is_err());
    assert_eq!(first, second);
}

#[test]
fn test_override_monotonicity() {
    let club = setup();
    club.levels
        .upsert_boat_level_config(BoatLevelConfig {
            boat_id: BoatId::new("quad"),
            minimal_rower_category: Some(AgeCategory::Senior),
            minimal_rower_type: None,
        })
        .unwrap();
    club.start
        .execute(&session("single-1", &["chloe"]), OverrideFlags::none())
        .unwrap();

    let request = session("quad", &["alice", "chloe", "dan"]);
    let mut flags = OverrideFlags::none();

    for _ in 0..3 {
        let kind = match club.start.execute(&request, flags) {
            Err(e) => e.override_kind().unwrap(),
            Ok(()) => panic!("expected an overridable error with flags {flags:?}"),
        };
        flags = flags.allowing(kind);

        if let Err(e) = club.start.execute(&request, flags) {
            assert_ne!(e.override_kind(), Some(kind));
        }
    }

    // All three overridden: the session goes through
    assert_eq!(club.store.get_started_sessions().unwrap().len(), 2);
}

#[test]
fn test_level_overrides_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("oarlog.db");
    let policy = parse_config(CLUB_CONFIG).unwrap();

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let levels = LevelPolicyStore::from_policy(&policy, store).unwrap();
        levels
            .upsert_boat_level_config(BoatLevelConfig {
                boat_id: BoatId::new("quad"),
                minimal_rower_category: Some(AgeCategory::J16),
                minimal_rower_type: None,
            })
            .unwrap();
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let levels = LevelPolicyStore::from_policy(&policy, store).unwrap();
    assert_eq!(
        levels
            .boat_level_config(&BoatId::new("quad"))
            .and_then(|c| c.minimal_rower_category),
        Some(AgeCategory::J16)
    );
}
