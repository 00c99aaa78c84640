//! Rule tables: category ranks, seat counts, boat helpers
//!
//! Categories compare by rank, never by label. An unset category ranks 0, so
//! it sits below every real value.

use oarlog_api::{AgeCategory, Boat, BoatType, Rower, SeriousnessCategory, StartedSession};
use std::cmp::Reverse;

pub fn age_category_rank(category: Option<AgeCategory>) -> u8 {
    match category {
        None => 0,
        Some(AgeCategory::J10) => 1,
        Some(AgeCategory::J12) => 2,
        Some(AgeCategory::J14) => 3,
        Some(AgeCategory::J16) => 4,
        Some(AgeCategory::J18) => 5,
        Some(AgeCategory::Senior) => 7,
    }
}

pub fn seriousness_rank(seriousness: Option<SeriousnessCategory>) -> u8 {
    match seriousness {
        None => 0,
        Some(SeriousnessCategory::Recreational) => 1,
        Some(SeriousnessCategory::Competitor) => 2,
    }
}

/// Rank difference `a - b`; positive when `a` is the higher category
pub fn compare_age_categories(a: Option<AgeCategory>, b: Option<AgeCategory>) -> i16 {
    i16::from(age_category_rank(a)) - i16::from(age_category_rank(b))
}

/// Rank difference `a - b`; positive when `a` is the higher category
pub fn compare_seriousness(a: Option<SeriousnessCategory>, b: Option<SeriousnessCategory>) -> i16 {
    i16::from(seriousness_rank(a)) - i16::from(seriousness_rank(b))
}

/// Highest age category first; ties keep their order
pub fn sort_by_age_category_desc(rowers: &mut [Rower]) {
    rowers.sort_by_key(|r| Reverse(age_category_rank(r.category)));
}

/// Highest seriousness first; ties keep their order
pub fn sort_by_seriousness_desc(rowers: &mut [Rower]) {
    rowers.sort_by_key(|r| Reverse(seriousness_rank(r.seriousness)));
}

/// Number of seats, cox included. `None` for `Other` and untyped boats.
pub fn seat_count(boat_type: Option<BoatType>) -> Option<u32> {
    match boat_type? {
        BoatType::OneRowerCoxless => Some(1),
        BoatType::TwoRowersCoxless => Some(2),
        BoatType::TwoRowersCoxed => Some(2),
        BoatType::FourRowersCoxless => Some(4),
        BoatType::FourRowersCoxed => Some(4),
        BoatType::EightRowersCoxed => Some(9),
        BoatType::Other => None,
    }
}

/// A boat is available when no session on the water uses it
pub fn is_boat_available(boat: &Boat, started_sessions: &[StartedSession]) -> bool {
    !started_sessions.iter().any(|s| s.boat.id == boat.id)
}

/// Boat types in declaration order, untyped boats with `Other`, then by name
pub fn sort_boats_by_type_and_name(boats: &mut [Boat]) {
    boats.sort_by(|a, b| {
        let a_type = a.boat_type.unwrap_or(BoatType::Other);
        let b_type = b.boat_type.unwrap_or(BoatType::Other);
        a_type.cmp(&b_type).then_with(|| a.name.cmp(&b.name))
    });
}
