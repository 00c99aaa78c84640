//! Domain types shared by the oarlog engine, store and front ends
//!
//! This crate defines:
//! - Fleet, rower and route records and their classification enums
//! - Session records (in progress and closed) and incidents
//! - Start/stop requests and override flags
//! - Typed start/stop errors

mod commands;
mod errors;
mod types;

pub use commands::*;
pub use errors::*;
pub use types::*;
