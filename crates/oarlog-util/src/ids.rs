//! Strongly-typed identifiers for oarlog
//!
//! Every identifier is an opaque string. Freshly generated ids take the form
//! `<prefix>-<uuid v4>` so they stay readable in the database and in logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used by [`Self::generate`]
            pub const PREFIX: &'static str = $prefix;

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh, unique identifier
            pub fn generate() -> Self {
                Self(format!("{}-{}", Self::PREFIX, Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a boat in the club fleet
    BoatId,
    "boat"
);

string_id!(
    /// Unique identifier for a club rower (members and guests)
    RowerId,
    "rower"
);

string_id!(
    /// Unique identifier for a rowing route
    RouteId,
    "route"
);

string_id!(
    /// Unique identifier for a rowing session, in progress or closed
    SessionId,
    "session"
);

string_id!(
    /// Unique identifier for an incident reported when closing a session
    IncidentId,
    "incident"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boat_id_equality() {
        let id1 = BoatId::new("boat-1");
        let id2 = BoatId::new("boat-1");
        let id3 = BoatId::new("boat-2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let s1 = SessionId::generate();
        let s2 = SessionId::generate();
        assert_ne!(s1, s2);
        assert!(s1.as_str().starts_with("session-"));
        assert!(IncidentId::generate().as_str().starts_with("incident-"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let rower_id = RowerId::new("rower-42");
        let json = serde_json::to_string(&rower_id).unwrap();
        assert_eq!(json, "\"rower-42\"");

        let parsed: RowerId = serde_json::from_str(&json).unwrap();
        assert_eq!(rower_id, parsed);
    }
}
