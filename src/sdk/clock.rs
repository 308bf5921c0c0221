use super::timestamp::parse_manila_local;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use reqwest::Client;
use serde::Deserialize;

/// Asia/Manila has sat at UTC+08:00 without DST since 1978.
pub const MANILA_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub fn manila_offset() -> FixedOffset {
    FixedOffset::east_opt(MANILA_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// The Manila calendar day a UTC instant falls on.
pub fn manila_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&manila_offset()).date_naive()
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon in Manila on `date`, well clear of either day boundary.
    pub fn at_manila_date(date: NaiveDate) -> Option<Self> {
        date.and_hms_opt(12, 0, 0)?
            .and_local_timezone(manila_offset())
            .single()
            .map(|local| FixedClock(local.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn manila_today(clock: &dyn Clock) -> NaiveDate {
    manila_date(clock.now())
}

pub const TIMEZONEDB_BASE_URL: &str = "https://api.timezonedb.com";

#[derive(Debug, Deserialize)]
struct TimeZoneDbResponse {
    status: String,
    #[serde(default)]
    message: String,
    formatted: Option<String>,
}

/// Asks TimeZoneDB for the current Manila time so a skewed local clock can't
/// move the "today" boundary. Any failure is logged and yields `None`.
pub async fn fetch_manila_time(client: &Client, base_url: &str, api_key: &str) -> Option<DateTime<Utc>> {
    let url = format!("{}/v2.1/get-time-zone", base_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[
            ("key", api_key),
            ("format", "json"),
            ("by", "zone"),
            ("zone", "Asia/Manila"),
        ])
        .send()
        .await;

    let body: TimeZoneDbResponse = match response {
        Ok(resp) => match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to parse TimeZoneDB response: {}", e);
                return None;
            }
        },
        Err(e) => {
            log::error!("Error fetching time from TimeZoneDB: {}", e);
            return None;
        }
    };

    if body.status != "OK" {
        log::warn!("TimeZoneDB returned status {}: {}", body.status, body.message);
        return None;
    }

    let formatted = body.formatted?;
    let parsed = parse_manila_local(&formatted);
    if parsed.is_none() {
        log::warn!("TimeZoneDB sent an unreadable time: {:?}", formatted);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn late_utc_evening_is_next_manila_day() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 16, 30, 0).unwrap();
        assert_eq!(manila_date(ts), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn fixed_clock_lands_on_requested_day() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let clock = FixedClock::at_manila_date(date).unwrap();
        assert_eq!(manila_today(&clock), date);
    }
}
