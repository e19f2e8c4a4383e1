use crate::model::{Activity, ActivityMarker, DailyRecord};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Progress of one marker on one date within the window.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerDay {
    pub count: u64,
    /// Target in force for this date: the snapshot stored on the day's
    /// records when present, otherwise the marker's current target.
    pub effective_target: Option<u32>,
    pub target_met: bool,
    /// `round(count / effective_target * 100)`; absent without a target.
    pub percentage: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerStats {
    pub marker_id: i64,
    pub label: String,
    pub target: Option<u32>,
    pub completions: u64,
    pub days_target_met: u64,
    pub daily: BTreeMap<String, MarkerDay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub activity_id: i64,
    pub name: String,
    pub completions: u64,
    /// Distinct dates with any completed record for the activity.
    pub active_days: u64,
    /// Distinct dates where at least one marker had an effective target.
    pub days_with_target: u64,
    /// Distinct dates where every marker with an effective target met it.
    pub days_target_met: u64,
    pub overall_percentage: u32,
    pub markers: Vec<MarkerStats>,
}

/// Derives reporting statistics for one activity from records already
/// restricted to the caller's date window. Records of other activities'
/// markers are ignored; nothing is mutated.
pub fn activity_stats(
    activity: &Activity,
    markers: &[ActivityMarker],
    records: &[DailyRecord],
) -> ActivityStats {
    let marker_ids = markers.iter().map(|m| m.id).collect::<HashSet<_>>();
    let completed = records
        .iter()
        .filter(|r| r.completed && marker_ids.contains(&r.activity_marker_id))
        .collect::<Vec<_>>();

    let marker_stats = markers
        .iter()
        .map(|marker| marker_stats(marker, &completed))
        .collect::<Vec<_>>();

    let active_dates = completed
        .iter()
        .map(|r| r.date.as_str())
        .collect::<BTreeSet<_>>();

    let mut days_with_target = 0_u64;
    let mut days_target_met = 0_u64;
    for date in &active_dates {
        let mut any_target = false;
        let mut all_met = true;

        for (marker, stats) in markers.iter().zip(&marker_stats) {
            let (count, effective_target) = match stats.daily.get(*date) {
                Some(day) => (day.count, day.effective_target),
                None => (0, marker.target),
            };

            if let Some(target) = effective_target {
                any_target = true;
                if count < u64::from(target) {
                    all_met = false;
                }
            }
        }

        if any_target {
            days_with_target += 1;
            if all_met {
                days_target_met += 1;
            }
        }
    }

    // The ratio only covers markers carrying a current target: completions
    // achieved over (target x days the marker was used).
    let mut achieved = 0_u64;
    let mut expected = 0_u64;
    for (marker, stats) in markers.iter().zip(&marker_stats) {
        if let Some(target) = marker.target {
            achieved += stats.completions;
            expected += u64::from(target) * stats.daily.len() as u64;
        }
    }

    ActivityStats {
        activity_id: activity.id,
        name: activity.name.clone(),
        completions: completed.len() as u64,
        active_days: active_dates.len() as u64,
        days_with_target,
        days_target_met,
        overall_percentage: ratio_percentage(achieved, expected),
        markers: marker_stats,
    }
}

fn marker_stats(marker: &ActivityMarker, completed: &[&DailyRecord]) -> MarkerStats {
    let mut by_date: HashMap<&str, Vec<&DailyRecord>> = HashMap::new();
    for &record in completed {
        if record.activity_marker_id == marker.id {
            by_date.entry(record.date.as_str()).or_default().push(record);
        }
    }

    let mut daily = BTreeMap::new();
    let mut completions = 0_u64;
    let mut days_target_met = 0_u64;

    for (date, mut day_records) in by_date {
        day_records.sort_by_key(|r| (r.created_at, r.id));
        let count = day_records.len() as u64;
        completions += count;

        // Snapshots on the day's records take precedence over the
        // marker's current target so later edits never rewrite history.
        let effective_target = day_records
            .iter()
            .find_map(|r| r.target)
            .or(marker.target);

        let target_met = effective_target
            .map(|target| count >= u64::from(target))
            .unwrap_or(false);
        if target_met {
            days_target_met += 1;
        }

        daily.insert(
            date.to_string(),
            MarkerDay {
                count,
                effective_target,
                target_met,
                percentage: effective_target.map(|target| ratio_percentage(count, u64::from(target))),
            },
        );
    }

    MarkerStats {
        marker_id: marker.id,
        label: marker.label.clone(),
        target: marker.target,
        completions,
        days_target_met,
        daily,
    }
}

/// `round(achieved / expected * 100)`, with an empty denominator reading
/// as 0% rather than NaN or a panic.
fn ratio_percentage(achieved: u64, expected: u64) -> u32 {
    if expected == 0 {
        return 0;
    }

    ((achieved as f64 / expected as f64) * 100.0).round() as u32
}

/// 7-day window starting on the Sunday of `date`'s week.
pub fn week_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.week(Weekday::Sun).first_day();
    (start, start + Duration::days(6))
}

pub fn month_window(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("Invalid month: {year}-{month:02}"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .context("Failed to compute end of month")?;

    Ok((start, next - Duration::days(1)))
}

pub fn year_window(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("Invalid year: {year}"))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .with_context(|| format!("Invalid year: {year}"))?;

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::{activity_stats, month_window, week_window};
    use crate::model::{Activity, ActivityMarker, DailyRecord};
    use chrono::NaiveDate;

    fn activity() -> Activity {
        Activity {
            id: 1,
            user_id: 1,
            name: "Exercise".to_string(),
            schedule: None,
            created_at: 0,
        }
    }

    fn marker(id: i64, target: Option<u32>) -> ActivityMarker {
        ActivityMarker {
            id,
            activity_id: 1,
            label: format!("marker-{id}"),
            is_default: false,
            target,
            created_at: 0,
        }
    }

    fn record(id: i64, marker_id: i64, date: &str, target: Option<u32>) -> DailyRecord {
        DailyRecord {
            id,
            user_id: 1,
            activity_marker_id: marker_id,
            date: date.to_string(),
            completed: true,
            target,
            completed_at: None,
            created_at: id,
        }
    }

    #[test]
    fn target_met_depends_only_on_count() {
        let markers = vec![marker(7, Some(5))];
        let records = (0..5)
            .map(|i| record(i, 7, "2026-02-10", Some(5)))
            .collect::<Vec<_>>();

        let stats = activity_stats(&activity(), &markers, &records);
        let day = &stats.markers[0].daily["2026-02-10"];
        assert!(day.target_met);
        assert_eq!(day.percentage, Some(100));
        assert_eq!(stats.days_target_met, 1);
        assert_eq!(stats.overall_percentage, 100);
    }

    #[test]
    fn exceeding_the_target_goes_past_100_percent() {
        let markers = vec![marker(7, Some(5))];
        let records = (0..6)
            .map(|i| record(i, 7, "2026-02-10", Some(5)))
            .collect::<Vec<_>>();

        let stats = activity_stats(&activity(), &markers, &records);
        let day = &stats.markers[0].daily["2026-02-10"];
        assert!(day.target_met);
        assert_eq!(day.percentage, Some(120));
    }

    #[test]
    fn snapshot_target_beats_current_target_for_past_dates() {
        // Five records snapshotted at target=5, then the marker was
        // raised to 10. The past date still reads as met.
        let markers = vec![marker(7, Some(10))];
        let records = (0..5)
            .map(|i| record(i, 7, "2026-02-10", Some(5)))
            .collect::<Vec<_>>();

        let stats = activity_stats(&activity(), &markers, &records);
        let day = &stats.markers[0].daily["2026-02-10"];
        assert_eq!(day.effective_target, Some(5));
        assert!(day.target_met);
        assert_eq!(stats.days_target_met, 1);
    }

    #[test]
    fn records_without_snapshot_fall_back_to_current_target() {
        let markers = vec![marker(7, Some(2))];
        let records = vec![record(0, 7, "2026-02-10", None)];

        let stats = activity_stats(&activity(), &markers, &records);
        let day = &stats.markers[0].daily["2026-02-10"];
        assert_eq!(day.effective_target, Some(2));
        assert!(!day.target_met);
        assert_eq!(day.percentage, Some(50));
    }

    #[test]
    fn day_counts_only_when_every_targeted_marker_met() {
        let markers = vec![marker(1, Some(2)), marker(2, Some(3))];
        let mut records = Vec::new();
        // 2026-02-10: both markers hit their targets.
        records.push(record(1, 1, "2026-02-10", Some(2)));
        records.push(record(2, 1, "2026-02-10", Some(2)));
        for i in 3..6 {
            records.push(record(i, 2, "2026-02-10", Some(3)));
        }
        // 2026-02-11: marker 1 met, marker 2 untouched (still targeted).
        records.push(record(6, 1, "2026-02-11", Some(2)));
        records.push(record(7, 1, "2026-02-11", Some(2)));

        let stats = activity_stats(&activity(), &markers, &records);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.days_with_target, 2);
        assert_eq!(stats.days_target_met, 1);
    }

    #[test]
    fn untargeted_markers_count_completions_but_not_percentages() {
        let markers = vec![marker(1, None), marker(2, Some(2))];
        let records = vec![
            record(1, 1, "2026-02-10", None),
            record(2, 1, "2026-02-10", None),
            record(3, 2, "2026-02-10", Some(2)),
            record(4, 2, "2026-02-10", Some(2)),
        ];

        let stats = activity_stats(&activity(), &markers, &records);
        assert_eq!(stats.completions, 4);
        assert_eq!(stats.markers[0].completions, 2);
        assert!(stats.markers[0].daily["2026-02-10"].percentage.is_none());
        // Denominator covers only the targeted marker: 2 of 2 expected.
        assert_eq!(stats.overall_percentage, 100);
    }

    #[test]
    fn no_targeted_markers_yields_zero_percent_not_nan() {
        let markers = vec![marker(1, None)];
        let records = vec![record(1, 1, "2026-02-10", None)];

        let stats = activity_stats(&activity(), &markers, &records);
        assert_eq!(stats.overall_percentage, 0);
        assert_eq!(stats.days_with_target, 0);
        assert_eq!(stats.days_target_met, 0);
        assert_eq!(stats.active_days, 1);
    }

    #[test]
    fn empty_window_is_all_zeroes() {
        let markers = vec![marker(1, Some(3))];
        let stats = activity_stats(&activity(), &markers, &[]);

        assert_eq!(stats.completions, 0);
        assert_eq!(stats.active_days, 0);
        assert_eq!(stats.overall_percentage, 0);
        assert!(stats.markers[0].daily.is_empty());
    }

    #[test]
    fn incomplete_records_never_count() {
        let markers = vec![marker(1, Some(1))];
        let mut incomplete = record(1, 1, "2026-02-10", Some(1));
        incomplete.completed = false;

        let stats = activity_stats(&activity(), &markers, &[incomplete]);
        assert_eq!(stats.completions, 0);
        assert_eq!(stats.active_days, 0);
    }

    #[test]
    fn overall_percentage_uses_current_target_and_days_used() {
        // 3 completions on each of 2 days against current target 5:
        // 6 / (5 * 2) = 60%.
        let markers = vec![marker(1, Some(5))];
        let mut records = Vec::new();
        for i in 0..3 {
            records.push(record(i, 1, "2026-02-10", Some(5)));
        }
        for i in 3..6 {
            records.push(record(i, 1, "2026-02-11", Some(5)));
        }

        let stats = activity_stats(&activity(), &markers, &records);
        assert_eq!(stats.overall_percentage, 60);
    }

    #[test]
    fn week_window_starts_on_sunday() {
        // 2026-02-18 is a Wednesday.
        let (start, end) = week_window(NaiveDate::from_ymd_opt(2026, 2, 18).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 2, 21).unwrap());
    }

    #[test]
    fn month_window_covers_whole_month() {
        let (start, end) = month_window(2026, 2).expect("window");
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());

        let (_, december_end) = month_window(2025, 12).expect("window");
        assert_eq!(december_end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }
}
