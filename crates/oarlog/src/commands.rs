//! Subcommands and their handlers

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use oarlog_api::{
    AgeCategory, Boat, BoatLevelConfig, BoatType, BoatTypeLevelConfig, IncidentReport,
    OverridableError, OverrideFlags, OverrideKind, Route, Rower, SeriousnessCategory,
    SessionToStart, StartSessionError, StopSession,
};
use oarlog_core::{
    LevelPolicyStore, StartSessionUsecase, StopSessionUsecase, is_boat_available,
    minimum_valid_rowers_needed, seat_count, sort_boats_by_type_and_name,
};
use oarlog_store::{ClubRegistry, Logbook, SqliteStore, StartSessionRepository};
use oarlog_util::{
    BoatId, RouteId, RowerId, SessionId, format_datetime_local, now, parse_user_datetime,
};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

/// Exit code for a start that needs an explicit override
pub const EXIT_NEEDS_OVERRIDE: u8 = 2;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the fleet
    #[command(subcommand)]
    Boat(BoatCommand),

    /// Manage club rowers
    #[command(subcommand)]
    Rower(RowerCommand),

    /// Manage routes
    #[command(subcommand)]
    Route(RouteCommand),

    /// Boat level policy
    #[command(subcommand)]
    Level(LevelCommand),

    /// Start a session
    Start {
        #[arg(long)]
        boat: BoatId,

        /// Rower id, repeat for each crew member
        #[arg(long = "rower", required = true)]
        rowers: Vec<RowerId>,

        #[arg(long)]
        route: Option<RouteId>,

        /// Start time (default: now)
        #[arg(long, value_parser = parse_datetime)]
        start: Option<DateTime<Utc>>,

        /// Estimated end time
        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,

        #[arg(long, default_value = "")]
        comment: String,

        /// Go ahead although the crew does not fill the boat
        #[arg(long)]
        ignore_seat_count: bool,

        /// Go ahead although a rower is already on the water
        #[arg(long)]
        ignore_double_booking: bool,

        /// Go ahead although rowers are below the boat level
        #[arg(long)]
        ignore_level: bool,
    },

    /// Close a session
    Stop {
        session: SessionId,

        /// End time (default: now)
        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,

        /// Replace the comment given at start
        #[arg(long)]
        comment: Option<String>,

        /// Report an incident, optionally with a description
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        incident: Option<String>,
    },

    /// Sessions currently on the water
    Sessions,

    /// Closed sessions, most recent first
    Logbook,

    /// Reported incidents, most recent first
    Incidents,
}

#[derive(Subcommand, Debug)]
pub enum BoatCommand {
    Add {
        #[arg(long)]
        name: String,

        /// Boat type (e.g. four_rowers_coxless or 4x)
        #[arg(long = "type")]
        boat_type: Option<BoatType>,

        #[arg(long)]
        in_maintenance: bool,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum RowerCommand {
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: Option<AgeCategory>,

        #[arg(long)]
        seriousness: Option<SeriousnessCategory>,
    },
    List {
        /// Include archived rowers
        #[arg(long)]
        all: bool,
    },
    Archive {
        rower: RowerId,
    },
}

#[derive(Subcommand, Debug)]
pub enum RouteCommand {
    Add {
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum LevelCommand {
    /// Show boat-type thresholds and per-boat minimums
    Show,

    /// Set the minimum level of a boat
    Set {
        boat: BoatId,

        #[arg(long)]
        category: Option<AgeCategory>,

        #[arg(long)]
        seriousness: Option<SeriousnessCategory>,
    },

    /// Remove the minimum level of a boat
    Clear { boat: BoatId },

    /// Set alert/block thresholds of a boat type
    Type {
        boat_type: BoatType,

        /// Number of ineligible rowers from which to alert, or "none"
        #[arg(long)]
        alert_from: Threshold,

        /// Number of ineligible rowers from which to block, or "none"
        #[arg(long)]
        block_from: Threshold,
    },

    /// Drop every level override
    Reset,
}

/// Threshold argument: a positive count or `none`
#[derive(Debug, Clone, Copy)]
pub struct Threshold(Option<u32>);

impl FromStr for Threshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Threshold(None));
        }
        s.parse::<u32>()
            .map(|n| Threshold(Some(n)))
            .map_err(|_| format!("expected a number or 'none', got '{s}'"))
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    parse_user_datetime(s)
        .ok_or_else(|| format!("expected 'YYYY-MM-DD HH:MM' or RFC 3339, got '{s}'"))
}

fn threshold_str(threshold: Option<u32>) -> String {
    threshold.map_or_else(|| "never".to_string(), |n| n.to_string())
}

fn opt_str(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Command line front end over the store and the session engine
pub struct App {
    store: Arc<SqliteStore>,
    levels: Arc<LevelPolicyStore>,
}

impl App {
    pub fn new(store: Arc<SqliteStore>, levels: Arc<LevelPolicyStore>) -> Self {
        Self { store, levels }
    }

    pub fn run(&self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Boat(cmd) => self.boat(cmd)?,
            Command::Rower(cmd) => self.rower(cmd)?,
            Command::Route(cmd) => self.route(cmd)?,
            Command::Level(cmd) => self.level(cmd)?,
            Command::Start {
                boat,
                rowers,
                route,
                start,
                end,
                comment,
                ignore_seat_count,
                ignore_double_booking,
                ignore_level,
            } => {
                let session = SessionToStart {
                    boat_id: boat,
                    rower_ids: rowers,
                    start_datetime: start.unwrap_or_else(now),
                    estimated_end_datetime: end,
                    route_id: route,
                    comment,
                };
                let flags = OverrideFlags {
                    ignore_seat_count_mismatch: ignore_seat_count,
                    ignore_rower_double_booking: ignore_double_booking,
                    ignore_eligibility_level: ignore_level,
                };
                return self.start(&session, flags);
            }
            Command::Stop {
                session,
                end,
                comment,
                incident,
            } => self.stop(StopSession {
                session_id: session,
                end_datetime: end.unwrap_or_else(now),
                comment,
                incident: IncidentReport {
                    checked: incident.is_some(),
                    message: incident.filter(|m| !m.is_empty()),
                },
            })?,
            Command::Sessions => self.sessions()?,
            Command::Logbook => self.logbook()?,
            Command::Incidents => self.incidents()?,
        }

        Ok(ExitCode::SUCCESS)
    }

    fn boat(&self, cmd: BoatCommand) -> Result<()> {
        match cmd {
            BoatCommand::Add {
                name,
                boat_type,
                in_maintenance,
            } => {
                let boat = Boat {
                    id: BoatId::generate(),
                    name,
                    boat_type,
                    in_maintenance,
                };
                self.store.add_boat(&boat).context("Failed to add boat")?;
                println!("{}", boat.id);
            }
            BoatCommand::List => {
                let mut boats = self.store.list_boats().context("Failed to list boats")?;
                sort_boats_by_type_and_name(&mut boats);
                let started = self
                    .store
                    .get_started_sessions()
                    .context("Failed to list started sessions")?;

                for boat in &boats {
                    let status = if boat.in_maintenance {
                        "maintenance"
                    } else if is_boat_available(boat, &started) {
                        "available"
                    } else {
                        "on the water"
                    };
                    println!(
                        "{}  {}  [{}]  {}",
                        boat.id,
                        boat.name,
                        opt_str(boat.boat_type.map(|t| t.label())),
                        status
                    );
                }
            }
        }
        Ok(())
    }

    fn rower(&self, cmd: RowerCommand) -> Result<()> {
        match cmd {
            RowerCommand::Add {
                name,
                category,
                seriousness,
            } => {
                let rower = Rower {
                    id: RowerId::generate(),
                    name,
                    category,
                    seriousness,
                    archived_at: None,
                };
                self.store.add_rower(&rower).context("Failed to add rower")?;
                println!("{}", rower.id);
            }
            RowerCommand::List { all } => {
                let rowers = self.store.list_rowers().context("Failed to list rowers")?;
                for rower in rowers.iter().filter(|r| all || !r.is_archived()) {
                    println!(
                        "{}  {}  {}  {}{}",
                        rower.id,
                        rower.name,
                        opt_str(rower.category.map(|c| c.as_str())),
                        opt_str(rower.seriousness.map(|s| s.as_str())),
                        if rower.is_archived() { "  (archived)" } else { "" }
                    );
                }
            }
            RowerCommand::Archive { rower } => {
                self.store
                    .archive_rower(&rower, now())
                    .with_context(|| format!("Failed to archive rower {rower}"))?;
            }
        }
        Ok(())
    }

    fn route(&self, cmd: RouteCommand) -> Result<()> {
        match cmd {
            RouteCommand::Add { name } => {
                let route = Route {
                    id: RouteId::generate(),
                    name,
                };
                self.store.add_route(&route).context("Failed to add route")?;
                println!("{}", route.id);
            }
            RouteCommand::List => {
                for route in self.store.list_routes().context("Failed to list routes")? {
                    println!("{}  {}", route.id, route.name);
                }
            }
        }
        Ok(())
    }

    fn level(&self, cmd: LevelCommand) -> Result<()> {
        match cmd {
            LevelCommand::Show => {
                println!("Boat types:");
                for boat_type in BoatType::CONFIGURABLE {
                    let config = self.levels.effective_boat_type_config(Some(boat_type));
                    println!(
                        "  {:<20} alert from {:<6} block from {:<6} (needs {} eligible)",
                        boat_type.as_str(),
                        threshold_str(config.alert_from),
                        threshold_str(config.block_from),
                        minimum_valid_rowers_needed(config.block_from, seat_count(Some(boat_type))),
                    );
                }

                let configs = self.levels.boat_level_configs();
                if !configs.is_empty() {
                    println!();
                    println!("Boats:");
                    for config in configs {
                        println!(
                            "  {}  category >= {}  seriousness >= {}",
                            config.boat_id,
                            opt_str(config.minimal_rower_category.map(|c| c.as_str())),
                            opt_str(config.minimal_rower_type.map(|t| t.as_str())),
                        );
                    }
                }
            }
            LevelCommand::Set {
                boat,
                category,
                seriousness,
            } => {
                if self
                    .store
                    .get_boat(&boat)
                    .context("Failed to read boat")?
                    .is_none()
                {
                    bail!("Unknown boat {boat}");
                }
                self.levels
                    .upsert_boat_level_config(BoatLevelConfig {
                        boat_id: boat,
                        minimal_rower_category: category,
                        minimal_rower_type: seriousness,
                    })
                    .context("Failed to save boat level")?;
            }
            LevelCommand::Clear { boat } => {
                self.levels
                    .delete_boat_level_config(&boat)
                    .context("Failed to remove boat level")?;
            }
            LevelCommand::Type {
                boat_type,
                alert_from,
                block_from,
            } => {
                let config = BoatTypeLevelConfig {
                    alert_from: alert_from.0,
                    block_from: block_from.0,
                };
                self.levels
                    .set_boat_type_level_config(boat_type, config)
                    .with_context(|| format!("Failed to set thresholds of {boat_type}"))?;
            }
            LevelCommand::Reset => {
                self.levels.reset().context("Failed to reset level policy")?;
            }
        }
        Ok(())
    }

    fn start(&self, session: &SessionToStart, flags: OverrideFlags) -> Result<ExitCode> {
        let usecase = StartSessionUsecase::new(self.store.clone(), self.levels.clone());

        match usecase.execute(session, flags) {
            Ok(()) => {
                println!("Session started");
                Ok(ExitCode::SUCCESS)
            }
            Err(StartSessionError::Overridable(e)) => {
                eprintln!("{}", describe_overridable(&e));
                eprintln!("Run again with {} to go ahead.", override_flag(e.kind()));
                Ok(ExitCode::from(EXIT_NEEDS_OVERRIDE))
            }
            Err(e) => Err(e).context("Cannot start session"),
        }
    }

    fn stop(&self, request: StopSession) -> Result<()> {
        let session_id = request.session_id.clone();
        StopSessionUsecase::new(self.store.clone())
            .execute(request)
            .with_context(|| format!("Cannot stop session {session_id}"))?;
        println!("Session closed");
        Ok(())
    }

    fn sessions(&self) -> Result<()> {
        let sessions = self
            .store
            .get_started_sessions()
            .context("Failed to list started sessions")?;

        for session in sessions {
            let crew: Vec<_> = session.rowers.iter().map(|r| r.name.as_str()).collect();
            println!(
                "{}  {}  since {}  until {}  [{}]",
                session.id,
                session.boat.name,
                format_datetime_local(&session.start_datetime),
                opt_str(
                    session
                        .estimated_end_datetime
                        .map(|d| format_datetime_local(&d))
                        .as_deref()
                ),
                crew.join(", ")
            );
        }
        Ok(())
    }

    fn logbook(&self) -> Result<()> {
        let sessions = self
            .store
            .list_closed_sessions()
            .context("Failed to read logbook")?;

        for session in sessions {
            let crew: Vec<_> = session.rowers.iter().map(|r| r.name.as_str()).collect();
            println!(
                "{}  {}  {} -> {}  {}  [{}]{}",
                session.id,
                session.boat.name,
                format_datetime_local(&session.start_datetime),
                format_datetime_local(&session.end_datetime),
                opt_str(session.route.as_ref().map(|r| r.name.as_str())),
                crew.join(", "),
                if session.incident_id.is_some() { "  (incident)" } else { "" }
            );
        }
        Ok(())
    }

    fn incidents(&self) -> Result<()> {
        for incident in self.store.list_incidents().context("Failed to read incidents")? {
            println!(
                "{}  {}  session {}  {}",
                incident.id,
                format_datetime_local(&incident.datetime),
                incident.session_id,
                incident.message
            );
        }
        Ok(())
    }
}

/// Command line switch overriding `kind`
pub fn override_flag(kind: OverrideKind) -> &'static str {
    match kind {
        OverrideKind::SeatCountMismatch => "--ignore-seat-count",
        OverrideKind::RowerDoubleBooking => "--ignore-double-booking",
        OverrideKind::EligibilityLevel => "--ignore-level",
    }
}

fn describe_overridable(error: &OverridableError) -> String {
    match error {
        OverridableError::BadAmountOfRowers { .. } | OverridableError::InvalidRowersLevel { .. } => {
            error.to_string()
        }
        OverridableError::RowersAlreadyOnStartedSession {
            already_on_session_rowers,
        } => {
            let names: Vec<_> = already_on_session_rowers
                .iter()
                .map(|r| r.name.as_str())
                .collect();
            format!("Already on the water: {}", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_parsing() {
        assert_eq!("3".parse::<Threshold>().unwrap().0, Some(3));
        assert_eq!("None".parse::<Threshold>().unwrap().0, None);
        assert!("-1".parse::<Threshold>().is_err());
    }

    #[test]
    fn every_override_has_a_flag() {
        for kind in [
            OverrideKind::SeatCountMismatch,
            OverrideKind::RowerDoubleBooking,
            OverrideKind::EligibilityLevel,
        ] {
            assert!(override_flag(kind).starts_with("--ignore-"));
        }
    }
}
