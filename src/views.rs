use crate::analytics::{self, ActivityStats};
use crate::checklist;
use crate::model::{format_date_local, Activity, ActivityMarker};
use crate::service::Tracker;
use crate::state::StateStore;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Daily dashboard: one cell per marker, checked when the marker's first
/// record of the day is completed. This is the single-toggle view; the
/// checkbox grid lives in the per-activity checklist view.
#[derive(Debug, Serialize)]
pub struct DailyView {
    pub date: String,
    pub activities: Vec<DailyActivityView>,
}

#[derive(Debug, Serialize)]
pub struct DailyActivityView {
    pub activity: Activity,
    pub markers: Vec<DailyMarkerView>,
}

#[derive(Debug, Serialize)]
pub struct DailyMarkerView {
    pub marker: ActivityMarker,
    pub record_id: Option<i64>,
    pub completed: bool,
    pub completed_count: u64,
}

pub fn daily_view(tracker: &Tracker, user_id: i64, date: NaiveDate) -> Result<DailyView> {
    let date_string = format_date_local(date);
    let records = tracker.get_daily_records(user_id, date)?;

    let mut activities = Vec::new();
    for activity in tracker.get_activities(user_id)? {
        let markers = tracker
            .get_activity_markers(activity.id)?
            .into_iter()
            .map(|marker| {
                let first = records
                    .iter()
                    .filter(|r| r.activity_marker_id == marker.id)
                    .min_by_key(|r| (r.created_at, r.id));
                let completed_count =
                    checklist::checked_count(&records, marker.id, &date_string) as u64;

                DailyMarkerView {
                    record_id: first.map(|r| r.id),
                    completed: first.map(|r| r.completed).unwrap_or(false),
                    completed_count,
                    marker,
                }
            })
            .collect();

        activities.push(DailyActivityView { activity, markers });
    }

    Ok(DailyView {
        date: date_string,
        activities,
    })
}

/// Weekly grid: 7 cells per marker starting on the Sunday of the
/// requested date's week. Cells with no records render empty.
#[derive(Debug, Serialize)]
pub struct WeeklyView {
    pub start: String,
    pub end: String,
    pub activities: Vec<WeeklyActivityView>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyActivityView {
    pub activity: Activity,
    pub markers: Vec<WeeklyMarkerRow>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyMarkerRow {
    pub marker: ActivityMarker,
    pub cells: Vec<WeeklyCell>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyCell {
    pub date: String,
    pub completed: bool,
    pub count: u64,
}

pub fn weekly_view(tracker: &Tracker, user_id: i64, date: NaiveDate) -> Result<WeeklyView> {
    let (start, end) = analytics::week_window(date);
    let records = tracker.get_daily_records_for_activity(user_id, start, end)?;
    let week_dates = (0..7)
        .map(|offset| format_date_local(start + chrono::Duration::days(offset)))
        .collect::<Vec<_>>();

    let mut activities = Vec::new();
    for activity in tracker.get_activities(user_id)? {
        let markers = tracker
            .get_activity_markers(activity.id)?
            .into_iter()
            .map(|marker| {
                let cells = week_dates
                    .iter()
                    .map(|date| {
                        let count = checklist::checked_count(&records, marker.id, date) as u64;
                        WeeklyCell {
                            date: date.clone(),
                            completed: count > 0,
                            count,
                        }
                    })
                    .collect();

                WeeklyMarkerRow { marker, cells }
            })
            .collect();

        activities.push(WeeklyActivityView { activity, markers });
    }

    Ok(WeeklyView {
        start: format_date_local(start),
        end: format_date_local(end),
        activities,
    })
}

/// Per-activity checklist: each visible marker renders as a row of N
/// checkboxes filled left to right in record creation order.
#[derive(Debug, Serialize)]
pub struct ChecklistView {
    pub activity: Activity,
    pub date: String,
    pub markers: Vec<ChecklistMarkerView>,
    pub hidden_markers: Vec<ActivityMarker>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistMarkerView {
    pub marker: ActivityMarker,
    pub checkbox_count: u32,
    pub checked: Vec<bool>,
    pub completed_count: u64,
    pub target_met: Option<bool>,
}

pub fn checklist_view(
    tracker: &Tracker,
    state: &StateStore,
    default_checkbox_count: u32,
    user_id: i64,
    activity_id: i64,
    date: NaiveDate,
) -> Result<Option<ChecklistView>> {
    let Some(activity) = tracker.get_activity(activity_id)? else {
        return Ok(None);
    };

    let date_string = format_date_local(date);
    let markers = tracker.get_activity_markers(activity_id)?;
    let records = tracker.get_daily_records(user_id, date)?;
    let visible = state.visible_markers(
        activity_id,
        &date_string,
        markers.first().map(|marker| marker.id),
    );

    let mut rows = Vec::new();
    let mut hidden = Vec::new();
    for marker in markers {
        if !visible.contains(&marker.id) {
            hidden.push(marker);
            continue;
        }

        let completed_count = checklist::checked_count(&records, marker.id, &date_string) as u64;
        let checkbox_count = state.checkbox_count(marker.id, default_checkbox_count);
        let checked = (0..checkbox_count as usize)
            .map(|index| checklist::is_checked(&records, marker.id, &date_string, index))
            .collect();

        rows.push(ChecklistMarkerView {
            checkbox_count,
            checked,
            completed_count,
            target_met: marker.target.map(|target| completed_count >= u64::from(target)),
            marker,
        });
    }

    Ok(Some(ChecklistView {
        activity,
        date: date_string,
        markers: rows,
        hidden_markers: hidden,
    }))
}

/// Hidden markers whose label matches the query, for the add-marker
/// autocomplete. An empty query lists every hidden marker.
pub fn marker_suggestions<'a>(
    markers: &'a [ActivityMarker],
    visible: &BTreeSet<i64>,
    query: &str,
) -> Vec<&'a ActivityMarker> {
    let query = query.trim().to_lowercase();

    markers
        .iter()
        .filter(|marker| !visible.contains(&marker.id))
        .filter(|marker| query.is_empty() || marker.label.to_lowercase().contains(&query))
        .collect()
}

/// Analytics dashboard over an inclusive window: summary cards plus
/// per-activity roll-ups from the aggregation engine.
#[derive(Debug, Serialize)]
pub struct AnalyticsView {
    pub start: String,
    pub end: String,
    pub active_days: u64,
    pub activity_count: usize,
    /// Completed records over all fetched records, rounded; 0 when empty.
    pub completion_percentage: u32,
    pub activities: Vec<ActivityStats>,
}

pub fn analytics_view(
    tracker: &Tracker,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<AnalyticsView> {
    let records = tracker.get_daily_records_for_activity(user_id, start, end)?;
    let activities = tracker.get_activities(user_id)?;

    let active_days = records
        .iter()
        .map(|record| record.date.as_str())
        .collect::<BTreeSet<_>>()
        .len() as u64;

    let completed = records.iter().filter(|record| record.completed).count();
    let completion_percentage = if records.is_empty() {
        0
    } else {
        ((completed as f64 / records.len() as f64) * 100.0).round() as u32
    };

    let mut stats = Vec::new();
    for activity in &activities {
        let markers = tracker.get_activity_markers(activity.id)?;
        stats.push(analytics::activity_stats(activity, &markers, &records));
    }

    Ok(AnalyticsView {
        start: format_date_local(start),
        end: format_date_local(end),
        active_days,
        activity_count: activities.len(),
        completion_percentage,
        activities: stats,
    })
}
