//! Parsing of the timestamp shapes the e-POD API hands out.
//!
//! The API mostly emits RFC 3339 strings (`2024-03-10T02:00:00.000Z`). Older
//! rows and the TimeZoneDB clock use a bare date, a zone-less ISO value or a
//! Manila wall-clock `YYYY-MM-DD HH:MM:SS`; all of those are read as
//! Asia/Manila local time.

use super::clock::manila_offset;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const MANILA_LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ZONELESS_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(parsed) = parse_manila_local(raw) {
        return Some(parsed);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, ZONELESS_ISO_FORMAT) {
        return from_manila_naive(naive);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(from_manila_naive)
}

/// Reads a `YYYY-MM-DD HH:MM:SS` string as Manila wall-clock time.
pub fn parse_manila_local(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), MANILA_LOCAL_FORMAT)
        .ok()
        .and_then(from_manila_naive)
}

fn from_manila_naive(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    naive
        .and_local_timezone(manila_offset())
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- Serde helpers ---

/// For fields that may be missing, null, empty or garbage. Unreadable values become `None`.
pub mod optional {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(|s| {
            let parsed = parse_timestamp(s);
            if parsed.is_none() && !s.trim().is_empty() {
                log::warn!("Ignoring unreadable timestamp: {:?}", s);
            }
            parsed
        }))
    }
}

pub mod required {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}
