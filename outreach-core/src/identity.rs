//! Identity types for outreach entities
//!
//! The campaign service hands out integer primary keys. Each one gets its own
//! newtype so a contact id can never be passed where an email id is expected.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` for optional service timestamps, offset or not.
pub fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw))),
    }
}

/// Common behaviour shared by every integer-backed identifier.
pub trait EntityIdType: Copy + Eq + Ord + fmt::Display {
    /// Wrap a raw integer key.
    fn new(raw: i64) -> Self;

    /// The raw integer key as sent on the wire.
    fn as_i64(&self) -> i64;
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl EntityIdType for $name {
            fn new(raw: i64) -> Self {
                Self(raw)
            }

            fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

define_entity_id!(
    /// Identifier assigned by the service when a campaign is confirmed.
    CampaignId
);
define_entity_id!(
    /// Server-side contact key.
    ContactId
);
define_entity_id!(
    /// Server-side email instance key. Immutable for the life of a draft.
    EmailId
);
define_entity_id!(
    /// Server-side sequence step key.
    StepId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_id_round_trips_through_text() {
        let id = CampaignId::new(42);
        let text = id.to_string();
        assert_eq!(text, "42");
        assert_eq!(text.parse::<CampaignId>().unwrap(), id);
    }

    #[test]
    fn id_parse_tolerates_whitespace() {
        assert_eq!(" 7\n".parse::<EmailId>().unwrap().as_i64(), 7);
        assert!("seven".parse::<EmailId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&ContactId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: ContactId = serde_json::from_str("3").unwrap();
        assert_eq!(back, ContactId::new(3));
    }

    #[test]
    fn timestamps_without_offset_read_as_utc() {
        let naive = parse_timestamp("2026-10-18T09:30:00.123456").unwrap();
        let zulu = parse_timestamp("2026-10-18T09:30:00.123456Z").unwrap();
        assert_eq!(naive, zulu);
        assert_eq!(
            parse_timestamp("2026-10-18T11:30:00+02:00"),
            parse_timestamp("2026-10-18T09:30:00")
        );
        assert!(parse_timestamp("yesterday").is_none());
    }
}
