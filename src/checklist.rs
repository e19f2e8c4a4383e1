use crate::model::{ActivityMarker, DailyRecord};

/// What a checkbox toggle should do to the store. Checkboxes carry no
/// record identity of their own; box `i` maps to the `i`-th completed
/// record in creation order, so toggling one box either removes that
/// positional record or appends a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleAction {
    Remove { record_id: i64 },
    Add { target_snapshot: Option<u32> },
}

/// Completed records of one marker on one date as an explicitly ordered
/// sequence: creation time ascending, record id as tie-breaker. Every
/// positional rule below is defined against this ordering.
pub fn ordered_marker_records<'a>(
    records: &'a [DailyRecord],
    marker_id: i64,
    date: &str,
) -> Vec<&'a DailyRecord> {
    let mut matching = records
        .iter()
        .filter(|record| {
            record.activity_marker_id == marker_id && record.date == date && record.completed
        })
        .collect::<Vec<_>>();

    matching.sort_by_key(|record| (record.created_at, record.id));
    matching
}

pub fn checked_count(records: &[DailyRecord], marker_id: i64, date: &str) -> usize {
    ordered_marker_records(records, marker_id, date).len()
}

/// Box `index` is checked iff at least `index + 1` completed records
/// exist; boxes fill left to right regardless of which records they were.
pub fn is_checked(records: &[DailyRecord], marker_id: i64, date: &str, index: usize) -> bool {
    checked_count(records, marker_id, date) > index
}

/// Decides the store mutation for a click on box `index`. A checked box
/// removes the record at that position; an unchecked box appends a new
/// record snapshotting the marker's current target.
pub fn toggle_action(
    records: &[DailyRecord],
    marker: &ActivityMarker,
    date: &str,
    index: usize,
) -> ToggleAction {
    let ordered = ordered_marker_records(records, marker.id, date);

    match ordered.get(index) {
        Some(record) => ToggleAction::Remove {
            record_id: record.id,
        },
        None => ToggleAction::Add {
            target_snapshot: marker.target,
        },
    }
}

/// Record ids to delete when clearing a marker's day, in order. The
/// caller issues one delete per id sequentially; a mid-sequence failure
/// leaves a partially cleared set and is surfaced as-is.
pub fn clear_record_ids(records: &[DailyRecord], marker_id: i64, date: &str) -> Vec<i64> {
    ordered_marker_records(records, marker_id, date)
        .into_iter()
        .map(|record| record.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{checked_count, clear_record_ids, is_checked, toggle_action, ToggleAction};
    use crate::model::{ActivityMarker, DailyRecord};

    fn record(id: i64, created_at: i64, completed: bool) -> DailyRecord {
        DailyRecord {
            id,
            user_id: 1,
            activity_marker_id: 7,
            date: "2026-02-18".to_string(),
            completed,
            target: None,
            completed_at: None,
            created_at,
        }
    }

    fn marker(target: Option<u32>) -> ActivityMarker {
        ActivityMarker {
            id: 7,
            activity_id: 3,
            label: "Pushups".to_string(),
            is_default: true,
            target,
            created_at: 0,
        }
    }

    #[test]
    fn boxes_fill_left_to_right() {
        let records = vec![record(10, 100, true), record(11, 200, true)];

        assert!(is_checked(&records, 7, "2026-02-18", 0));
        assert!(is_checked(&records, 7, "2026-02-18", 1));
        assert!(!is_checked(&records, 7, "2026-02-18", 2));
        assert_eq!(checked_count(&records, 7, "2026-02-18"), 2);
    }

    #[test]
    fn incomplete_and_foreign_records_are_ignored() {
        let records = vec![
            record(10, 100, true),
            record(11, 200, false),
            DailyRecord {
                activity_marker_id: 99,
                ..record(12, 300, true)
            },
            DailyRecord {
                date: "2026-02-17".to_string(),
                ..record(13, 50, true)
            },
        ];

        assert_eq!(checked_count(&records, 7, "2026-02-18"), 1);
    }

    #[test]
    fn toggle_off_removes_the_positional_record_not_the_newest() {
        // Insertion order in the slice does not matter; creation order does.
        let records = vec![record(12, 300, true), record(10, 100, true), record(11, 200, true)];
        let m = marker(None);

        assert_eq!(
            toggle_action(&records, &m, "2026-02-18", 0),
            ToggleAction::Remove { record_id: 10 }
        );
        assert_eq!(
            toggle_action(&records, &m, "2026-02-18", 1),
            ToggleAction::Remove { record_id: 11 }
        );
    }

    #[test]
    fn same_timestamp_falls_back_to_id_order() {
        let records = vec![record(21, 100, true), record(20, 100, true)];
        let m = marker(None);

        assert_eq!(
            toggle_action(&records, &m, "2026-02-18", 0),
            ToggleAction::Remove { record_id: 20 }
        );
    }

    #[test]
    fn toggle_beyond_count_adds_with_current_target_snapshot() {
        let records = vec![record(10, 100, true)];
        let m = marker(Some(5));

        // Clicking any unchecked box, even far past the count, appends one.
        assert_eq!(
            toggle_action(&records, &m, "2026-02-18", 6),
            ToggleAction::Add {
                target_snapshot: Some(5)
            }
        );
    }

    #[test]
    fn clear_lists_every_record_in_order() {
        let records = vec![record(12, 300, true), record(10, 100, true), record(11, 200, true)];
        assert_eq!(clear_record_ids(&records, 7, "2026-02-18"), vec![10, 11, 12]);
        assert!(clear_record_ids(&records, 8, "2026-02-18").is_empty());
    }
}
