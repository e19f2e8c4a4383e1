pub mod queries;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub schedule: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct MarkerRow {
    pub id: i64,
    pub activity_id: i64,
    pub label: String,
    pub is_default: Option<bool>,
    pub target: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct DailyRecordRow {
    pub id: i64,
    pub user_id: i64,
    pub activity_marker_id: i64,
    pub date: String,
    pub completed: bool,
    pub target: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn insert_user(&self, username: &str, created_at: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
                params![username, created_at],
            )
            .with_context(|| format!("Failed to insert user: {username}"))?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                map_user_row,
            )
            .optional()
            .context("Failed to query user by username")
    }

    pub fn user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![id],
                map_user_row,
            )
            .optional()
            .context("Failed to query user by id")
    }

    pub fn insert_activity(
        &self,
        user_id: i64,
        name: &str,
        schedule: Option<&str>,
        created_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO activities (user_id, name, schedule, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, name, schedule, created_at],
            )
            .context("Failed to insert activity")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn activity_by_id(&self, id: i64) -> Result<Option<ActivityRow>> {
        self.conn
            .query_row(
                "SELECT id, user_id, name, schedule, created_at FROM activities WHERE id = ?1",
                params![id],
                map_activity_row,
            )
            .optional()
            .context("Failed to query activity by id")
    }

    pub fn activities_for_user(&self, user_id: i64) -> Result<Vec<ActivityRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, name, schedule, created_at
             FROM activities
             WHERE user_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![user_id], map_activity_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query activities")?;

        Ok(rows)
    }

    pub fn insert_marker(
        &self,
        activity_id: i64,
        label: &str,
        is_default: Option<bool>,
        target: Option<i64>,
        created_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO activity_markers (activity_id, label, is_default, target, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![activity_id, label, is_default, target, created_at],
            )
            .context("Failed to insert activity marker")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn marker_by_id(&self, id: i64) -> Result<Option<MarkerRow>> {
        self.conn
            .query_row(
                "SELECT id, activity_id, label, is_default, target, created_at
                 FROM activity_markers WHERE id = ?1",
                params![id],
                map_marker_row,
            )
            .optional()
            .context("Failed to query marker by id")
    }

    pub fn markers_for_activity(&self, activity_id: i64) -> Result<Vec<MarkerRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, activity_id, label, is_default, target, created_at
             FROM activity_markers
             WHERE activity_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![activity_id], map_marker_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query activity markers")?;

        Ok(rows)
    }

    pub fn set_marker_target(&self, marker_id: i64, target: Option<i64>) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE activity_markers SET target = ?2 WHERE id = ?1",
                params![marker_id, target],
            )
            .context("Failed to update marker target")
    }

    pub fn insert_daily_record(
        &self,
        user_id: i64,
        activity_marker_id: i64,
        date: &str,
        completed: bool,
        target: Option<i64>,
        completed_at: Option<i64>,
        created_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO daily_records
                   (user_id, activity_marker_id, date, completed, target, completed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    activity_marker_id,
                    date,
                    completed,
                    target,
                    completed_at,
                    created_at
                ],
            )
            .context("Failed to insert daily record")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn record_by_id(&self, id: i64) -> Result<Option<DailyRecordRow>> {
        self.conn
            .query_row(
                "SELECT id, user_id, activity_marker_id, date, completed, target, completed_at, created_at
                 FROM daily_records WHERE id = ?1",
                params![id],
                map_record_row,
            )
            .optional()
            .context("Failed to query daily record by id")
    }

    pub fn set_record_completed(
        &self,
        record_id: i64,
        completed: bool,
        completed_at: Option<i64>,
    ) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE daily_records SET completed = ?2, completed_at = ?3 WHERE id = ?1",
                params![record_id, completed, completed_at],
            )
            .context("Failed to update daily record")
    }

    pub fn delete_daily_record(&self, record_id: i64) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM daily_records WHERE id = ?1",
                params![record_id],
            )
            .context("Failed to delete daily record")
    }

    pub fn records_for_user_date(&self, user_id: i64, date: &str) -> Result<Vec<DailyRecordRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, activity_marker_id, date, completed, target, completed_at, created_at
             FROM daily_records
             WHERE user_id = ?1 AND date = ?2
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![user_id, date], map_record_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query daily records")?;

        Ok(rows)
    }

    /// Records with `start <= date <= end`, inclusive on both ends.
    /// Dates are fixed-width `YYYY-MM-DD` strings, so SQLite's string
    /// comparison is calendar order.
    pub fn records_for_user_between(
        &self,
        user_id: i64,
        start: &str,
        end: &str,
    ) -> Result<Vec<DailyRecordRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, activity_marker_id, date, completed, target, completed_at, created_at
             FROM daily_records
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, created_at ASC, id ASC",
        )?;

        let rows = statement
            .query_map(params![user_id, start, end], map_record_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query daily records in range")?;

        Ok(rows)
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn map_activity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        schedule: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_marker_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MarkerRow> {
    Ok(MarkerRow {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        label: row.get(2)?,
        is_default: row.get(3)?,
        target: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyRecordRow> {
    Ok(DailyRecordRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        activity_marker_id: row.get(2)?,
        date: row.get(3)?,
        completed: row.get(4)?,
        target: row.get(5)?,
        completed_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::Database;

    fn open_temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("temp dir");
        let database = Database::open(&dir.path().join("tracker.db")).expect("open db");
        (dir, database)
    }

    #[test]
    fn username_is_unique() {
        let (_dir, db) = open_temp_db();
        db.insert_user("alice", 1).expect("first insert");
        assert!(db.insert_user("alice", 2).is_err());
    }

    #[test]
    fn range_query_is_inclusive_on_both_ends() {
        let (_dir, db) = open_temp_db();
        let user = db.insert_user("alice", 1).expect("user");
        let activity = db.insert_activity(user, "Exercise", None, 1).expect("activity");
        let marker = db
            .insert_marker(activity, "Pushups", None, None, 1)
            .expect("marker");

        for (i, date) in ["2026-02-09", "2026-02-10", "2026-02-15", "2026-02-16"]
            .iter()
            .enumerate()
        {
            db.insert_daily_record(user, marker, date, true, None, None, i as i64)
                .expect("record");
        }

        let rows = db
            .records_for_user_between(user, "2026-02-10", "2026-02-15")
            .expect("range");
        let dates = rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>();
        assert_eq!(dates, vec!["2026-02-10", "2026-02-15"]);
    }

    #[test]
    fn deleted_record_stays_deleted() {
        let (_dir, db) = open_temp_db();
        let user = db.insert_user("alice", 1).expect("user");
        let activity = db.insert_activity(user, "Exercise", None, 1).expect("activity");
        let marker = db
            .insert_marker(activity, "Pushups", None, None, 1)
            .expect("marker");
        let record = db
            .insert_daily_record(user, marker, "2026-02-10", true, None, None, 1)
            .expect("record");

        assert_eq!(db.delete_daily_record(record).expect("delete"), 1);
        assert!(db.record_by_id(record).expect("refetch").is_none());
        assert_eq!(db.delete_daily_record(record).expect("second delete"), 0);
    }

    #[test]
    fn optional_columns_read_back_as_none() {
        let (_dir, db) = open_temp_db();
        let user = db.insert_user("alice", 1).expect("user");
        let activity = db.insert_activity(user, "Exercise", None, 1).expect("activity");
        let marker_id = db
            .insert_marker(activity, "Pushups", None, None, 1)
            .expect("marker");

        let marker = db.marker_by_id(marker_id).expect("query").expect("present");
        assert!(marker.is_default.is_none());
        assert!(marker.target.is_none());

        let stored = db.activity_by_id(activity).expect("query").expect("present");
        assert!(stored.schedule.is_none());
    }
}
