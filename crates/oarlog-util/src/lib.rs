//! Shared utilities for oarlog
//!
//! This crate provides:
//! - ID types (BoatId, RowerId, RouteId, SessionId, IncidentId)
//! - UTC time utilities (mockable `now`, ISO-8601 formatting and parsing)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
