use super::clock::manila_date;
use super::timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

/// Rows with a status outside the three the board knows keep it verbatim in
/// `Other`; they still block the plate and sort after Completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Pending,
    InProgress,
    Completed,
    Other(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown appointment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match squashed.as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "inprogress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl From<String> for AppointmentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|UnknownStatus(raw)| {
            log::debug!("Keeping unrecognised appointment status {:?}", raw);
            AppointmentStatus::Other(raw.trim().to_string())
        })
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::InProgress => "In Progress",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Other(raw) => raw.as_str(),
        })
    }
}

impl AppointmentStatus {
    fn board_priority(&self) -> u8 {
        match self {
            AppointmentStatus::Pending => 1,
            AppointmentStatus::InProgress => 2,
            AppointmentStatus::Completed => 3,
            AppointmentStatus::Other(_) => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub appointment_id: String,
    pub plate_no: String,
    #[serde(with = "timestamp::required")]
    pub appointment_date: DateTime<Utc>,
    /// Booked time slot; only the board's ordering looks at it.
    #[serde(default, with = "timestamp::optional")]
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: AppointmentStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppointmentRecord {
    pub fn new(
        appointment_id: impl Into<String>,
        plate_no: impl Into<String>,
        appointment_date: DateTime<Utc>,
        status: AppointmentStatus,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            plate_no: plate_no.into(),
            appointment_date,
            appointment_time: None,
            status,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, appointment_time: DateTime<Utc>) -> Self {
        self.appointment_time = Some(appointment_time);
        self
    }
}

/// Whether booking `plate_no` on `proposed` would double-book the truck.
///
/// Days are compared in Asia/Manila. Completed appointments never conflict,
/// and `exclude_appointment_id` lets an edit ignore the row being edited.
pub fn has_conflict(
    existing: &[AppointmentRecord],
    plate_no: &str,
    proposed: DateTime<Utc>,
    exclude_appointment_id: Option<&str>,
) -> bool {
    find_conflict(existing, plate_no, proposed, exclude_appointment_id).is_some()
}

fn find_conflict<'a>(
    existing: &'a [AppointmentRecord],
    plate_no: &str,
    proposed: DateTime<Utc>,
    exclude_appointment_id: Option<&str>,
) -> Option<&'a AppointmentRecord> {
    let day = manila_date(proposed);
    existing.iter().find(|appt| {
        appt.plate_no == plate_no
            && manila_date(appt.appointment_date) == day
            && appt.status != AppointmentStatus::Completed
            && exclude_appointment_id != Some(appt.appointment_id.as_str())
    })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Plate No. {plate_no} already has an appointment on the {}.", long_date(.date))]
pub struct AppointmentConflict {
    pub plate_no: String,
    pub date: NaiveDate,
    pub existing_appointment_id: String,
}

fn long_date(date: &NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Pre-submission gate for the create and edit forms.
pub fn check_appointment(
    existing: &[AppointmentRecord],
    plate_no: &str,
    proposed: DateTime<Utc>,
    exclude_appointment_id: Option<&str>,
) -> Result<(), AppointmentConflict> {
    match find_conflict(existing, plate_no, proposed, exclude_appointment_id) {
        Some(found) => Err(AppointmentConflict {
            plate_no: plate_no.to_string(),
            date: manila_date(proposed),
            existing_appointment_id: found.appointment_id.clone(),
        }),
        None => Ok(()),
    }
}

/// Today's appointments, Pending first, then In Progress, then Completed,
/// then anything else.
/// Within a status the earliest slot leads; rows without a slot trail.
pub fn todays_board(existing: &[AppointmentRecord], today: NaiveDate) -> Vec<&AppointmentRecord> {
    let mut board: Vec<&AppointmentRecord> = existing
        .iter()
        .filter(|appt| manila_date(appt.appointment_date) == today)
        .collect();

    board.sort_by(|a, b| {
        a.status
            .board_priority()
            .cmp(&b.status.board_priority())
            .then_with(|| match (a.appointment_time, b.appointment_time) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::timestamp::parse_timestamp;
    use chrono::TimeZone;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    fn pending(id: &str, plate: &str, date: &str) -> AppointmentRecord {
        AppointmentRecord::new(id, plate, ts(date), AppointmentStatus::Pending)
    }

    #[test]
    fn same_plate_same_day_conflicts() {
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-10")];
        assert!(has_conflict(&existing, "ABC123", ts("2024-03-10"), None));
    }

    #[test]
    fn time_of_day_is_ignored() {
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-10T00:30:00Z")];
        assert!(has_conflict(&existing, "ABC123", ts("2024-03-10T09:45:00Z"), None));
    }

    #[test]
    fn day_boundary_follows_manila() {
        // 2024-03-09T17:00Z is 01:00 on the 10th in Manila
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-09T17:00:00Z")];
        assert!(has_conflict(&existing, "ABC123", ts("2024-03-10"), None));
        assert!(!has_conflict(&existing, "ABC123", ts("2024-03-09"), None));
    }

    #[test]
    fn completed_never_conflicts() {
        let mut existing = vec![pending("APPT-1", "ABC123", "2024-03-10")];
        existing[0].status = AppointmentStatus::Completed;
        assert!(!has_conflict(&existing, "ABC123", ts("2024-03-10"), None));
    }

    #[test]
    fn editing_excludes_itself() {
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-10")];
        assert!(!has_conflict(&existing, "ABC123", ts("2024-03-10"), Some("APPT-1")));
        assert!(has_conflict(&existing, "ABC123", ts("2024-03-10"), Some("APPT-2")));
    }

    #[test]
    fn different_plate_or_day_is_fine() {
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-10")];
        assert!(!has_conflict(&existing, "XYZ789", ts("2024-03-10"), None));
        assert!(!has_conflict(&existing, "ABC123", ts("2024-03-11"), None));
        assert!(!has_conflict(&[], "ABC123", ts("2024-03-10"), None));
    }

    #[test]
    fn gate_reports_the_warning_text() {
        let existing = vec![pending("APPT-1", "ABC123", "2024-03-10")];
        let err = check_appointment(&existing, "ABC123", ts("2024-03-10T03:00:00Z"), None).unwrap_err();

        assert_eq!(err.existing_appointment_id, "APPT-1");
        assert_eq!(
            err.to_string(),
            "Plate No. ABC123 already has an appointment on the March 10, 2024."
        );
        assert_eq!(check_appointment(&existing, "ABC123", ts("2024-03-11"), None), Ok(()));
    }

    #[test]
    fn status_parsing_is_lenient() {
        assert_eq!("In Progress".parse::<AppointmentStatus>(), Ok(AppointmentStatus::InProgress));
        assert_eq!("in_progress".parse::<AppointmentStatus>(), Ok(AppointmentStatus::InProgress));
        assert_eq!("COMPLETED".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Completed));
        assert!("cancelled".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn deserializes_api_row() {
        let row = serde_json::json!({
            "appointment_id": "APPT-9",
            "plate_no": "NBC 1234",
            "appointment_date": "2024-03-10T00:00:00.000Z",
            "appointment_time": "2024-03-10T06:30:00.000Z",
            "status": "in progress",
            "dock": "D2"
        });
        let appt: AppointmentRecord = serde_json::from_value(row).unwrap();
        assert_eq!(appt.status, AppointmentStatus::InProgress);
        assert_eq!(appt.appointment_time, Some(Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap()));
        assert_eq!(appt.extra.get("dock"), Some(&serde_json::json!("D2")));

        let back = serde_json::to_value(&appt).unwrap();
        assert_eq!(back["status"], "In Progress");
    }

    #[test]
    fn unknown_status_is_kept_and_still_blocks() {
        let row = serde_json::json!({
            "appointment_id": "APPT-7",
            "plate_no": "ABC123",
            "appointment_date": "2024-03-10T00:00:00.000Z",
            "status": "Cancelled"
        });
        let appt: AppointmentRecord = serde_json::from_value(row).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Other("Cancelled".to_string()));
        assert_eq!(serde_json::to_value(&appt).unwrap()["status"], "Cancelled");

        let existing = vec![appt];
        assert!(has_conflict(&existing, "ABC123", ts("2024-03-10"), None));
    }

    #[test]
    fn board_orders_by_status_then_time() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let existing = vec![
            AppointmentRecord::new("done", "P1", ts("2024-03-10"), AppointmentStatus::Completed)
                .at(ts("2024-03-10T00:00:00Z")),
            pending("late", "P2", "2024-03-10").at(ts("2024-03-10T08:00:00Z")),
            AppointmentRecord::new("busy", "P3", ts("2024-03-10"), AppointmentStatus::InProgress),
            pending("no-slot", "P4", "2024-03-10"),
            pending("early", "P5", "2024-03-10").at(ts("2024-03-10T01:00:00Z")),
            pending("tomorrow", "P6", "2024-03-11").at(ts("2024-03-11T01:00:00Z")),
            AppointmentRecord::new(
                "odd",
                "P7",
                ts("2024-03-10"),
                AppointmentStatus::Other("Rescheduled".to_string()),
            )
            .at(ts("2024-03-10T00:00:00Z")),
        ];

        let ids: Vec<_> = todays_board(&existing, today)
            .iter()
            .map(|a| a.appointment_id.as_str())
            .collect();
        assert_eq!(ids, ["early", "late", "no-slot", "busy", "done", "odd"]);
    }
}
