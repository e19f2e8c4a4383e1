use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How often an activity is meant to be performed. Recorded with the
/// activity but not consulted when deciding what to show on a given day;
/// activities appear every day regardless of schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    Daily,
    Weekly {
        #[serde(rename = "daysOfWeek")]
        days_of_week: BTreeSet<u8>,
    },
    Custom {
        #[serde(rename = "customDays")]
        custom_days: u32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub schedule: Option<Schedule>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityMarker {
    pub id: i64,
    pub activity_id: i64,
    pub label: String,
    pub is_default: bool,
    pub target: Option<u32>,
    pub created_at: i64,
}

/// One completion event ("breadcrumb") for a marker on a calendar date.
/// `target` is a snapshot of the marker's target at creation time and is
/// never rewritten afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    pub id: i64,
    pub user_id: i64,
    pub activity_marker_id: i64,
    pub date: String,
    pub completed: bool,
    pub target: Option<u32>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
}

pub fn serialize_schedule(schedule: &Schedule) -> Result<String> {
    serde_json::to_string(schedule).context("Failed to serialize schedule")
}

pub fn parse_schedule(raw: &str) -> Result<Schedule> {
    serde_json::from_str(raw).with_context(|| format!("Failed to parse schedule: {raw}"))
}

/// Formats a date as its local calendar form `YYYY-MM-DD`. All date
/// comparisons in the store and the aggregation engine use this string
/// form, never an instant, so time-of-day and timezone never shift a
/// record to a neighbouring day.
pub fn format_date_local(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

#[cfg(test)]
mod tests {
    use super::{format_date_local, parse_date, parse_schedule, serialize_schedule, Schedule};
    use std::collections::BTreeSet;

    #[test]
    fn schedule_round_trip_all_variants() {
        let variants = [
            Schedule::Daily,
            Schedule::Weekly {
                days_of_week: BTreeSet::from([0, 3, 6]),
            },
            Schedule::Custom { custom_days: 14 },
        ];

        for schedule in variants {
            let encoded = serialize_schedule(&schedule).expect("serialize");
            let decoded = parse_schedule(&encoded).expect("parse");
            assert_eq!(decoded, schedule);
        }
    }

    #[test]
    fn schedule_wire_shape_uses_tagged_json() {
        let encoded = serialize_schedule(&Schedule::Custom { custom_days: 3 }).expect("serialize");
        assert_eq!(encoded, r#"{"type":"custom","customDays":3}"#);
    }

    #[test]
    fn date_string_round_trip() {
        let date = parse_date("2026-02-18").expect("parse");
        assert_eq!(format_date_local(date), "2026-02-18");
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse_date("02/18/2026").is_err());
        assert!(parse_date("2026-2-18").is_err());
    }
}
