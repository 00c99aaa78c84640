//! Session start/stop eligibility engine for oarlog
//!
//! This crate is the heart of oarlog, containing:
//! - Rule tables (category ranks, seat counts)
//! - The boat-level policy (per-boat minimums, per-type alert/block thresholds)
//! - The start-session validation engine with caller-driven overrides
//! - The stop-session workflow writing the logbook and incidents

mod levels;
mod rules;
mod start;
mod stop;

pub use levels::*;
pub use rules::*;
pub use start::*;
pub use stop::*;
