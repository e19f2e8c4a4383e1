use crate::db::{ActivityRow, Database, DailyRecordRow, MarkerRow, UserRow};
use crate::model::{
    format_date_local, parse_schedule, serialize_schedule, Activity, ActivityMarker, DailyRecord,
    Schedule, User,
};
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use std::path::Path;
use tracing::warn;

/// Options for marker creation. Both fields are optional on the wire and
/// absent by default.
#[derive(Debug, Clone, Default)]
pub struct MarkerOptions {
    pub is_default: Option<bool>,
    pub target: Option<u32>,
}

/// Data access layer: translates between the row shape the store speaks
/// (snake_case columns, string-encoded schedule) and the application
/// entities. Reads tolerate any missing optional column by mapping it to
/// an absent value.
pub struct Tracker {
    db: Database,
}

impl Tracker {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: Database::open(path)?,
        })
    }

    pub fn create_user(&self, username: &str) -> Result<User> {
        let id = self.db.insert_user(username, Utc::now().timestamp())?;
        let row = self
            .db
            .user_by_id(id)?
            .context("User row missing after insert")?;

        Ok(map_user(row))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.db.user_by_username(username)?.map(map_user))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.db.user_by_id(id)?.map(map_user))
    }

    pub fn create_activity(
        &self,
        user_id: i64,
        name: &str,
        schedule: Option<&Schedule>,
    ) -> Result<Activity> {
        let encoded = schedule.map(serialize_schedule).transpose()?;
        let id = self.db.insert_activity(
            user_id,
            name,
            encoded.as_deref(),
            Utc::now().timestamp(),
        )?;
        let row = self
            .db
            .activity_by_id(id)?
            .context("Activity row missing after insert")?;

        Ok(map_activity(row))
    }

    pub fn get_activities(&self, user_id: i64) -> Result<Vec<Activity>> {
        Ok(self
            .db
            .activities_for_user(user_id)?
            .into_iter()
            .map(map_activity)
            .collect())
    }

    pub fn get_activity(&self, activity_id: i64) -> Result<Option<Activity>> {
        Ok(self.db.activity_by_id(activity_id)?.map(map_activity))
    }

    pub fn create_activity_marker(
        &self,
        activity_id: i64,
        label: &str,
        options: MarkerOptions,
    ) -> Result<ActivityMarker> {
        let id = self.db.insert_marker(
            activity_id,
            label,
            options.is_default,
            options.target.map(i64::from),
            Utc::now().timestamp(),
        )?;
        let row = self
            .db
            .marker_by_id(id)?
            .context("Marker row missing after insert")?;

        Ok(map_marker(row))
    }

    pub fn get_activity_markers(&self, activity_id: i64) -> Result<Vec<ActivityMarker>> {
        Ok(self
            .db
            .markers_for_activity(activity_id)?
            .into_iter()
            .map(map_marker)
            .collect())
    }

    pub fn get_marker(&self, marker_id: i64) -> Result<Option<ActivityMarker>> {
        Ok(self.db.marker_by_id(marker_id)?.map(map_marker))
    }

    /// Sets or clears (`None`) a marker's daily target. Snapshots already
    /// written to daily records keep their old value.
    pub fn update_marker_target(
        &self,
        marker_id: i64,
        target: Option<u32>,
    ) -> Result<ActivityMarker> {
        let changed = self
            .db
            .set_marker_target(marker_id, target.map(i64::from))?;
        if changed == 0 {
            bail!("Marker not found: {marker_id}");
        }

        let row = self
            .db
            .marker_by_id(marker_id)?
            .context("Marker row missing after update")?;

        Ok(map_marker(row))
    }

    /// `target` is the caller-supplied snapshot of the marker's target at
    /// completion time, recorded as-is.
    pub fn create_daily_record(
        &self,
        user_id: i64,
        activity_marker_id: i64,
        date: NaiveDate,
        completed: bool,
        target: Option<u32>,
    ) -> Result<DailyRecord> {
        let id = self.db.insert_daily_record(
            user_id,
            activity_marker_id,
            &format_date_local(date),
            completed,
            target.map(i64::from),
            None,
            Utc::now().timestamp(),
        )?;
        let row = self
            .db
            .record_by_id(id)?
            .context("Daily record row missing after insert")?;

        Ok(map_record(row))
    }

    pub fn update_daily_record(&self, record_id: i64, completed: bool) -> Result<DailyRecord> {
        let completed_at = completed.then(|| Utc::now().timestamp());
        let changed = self
            .db
            .set_record_completed(record_id, completed, completed_at)?;
        if changed == 0 {
            bail!("Daily record not found: {record_id}");
        }

        let row = self
            .db
            .record_by_id(record_id)?
            .context("Daily record row missing after update")?;

        Ok(map_record(row))
    }

    pub fn delete_daily_record(&self, record_id: i64) -> Result<()> {
        let deleted = self.db.delete_daily_record(record_id)?;
        if deleted == 0 {
            bail!("Daily record not found: {record_id}");
        }

        Ok(())
    }

    pub fn get_daily_records(&self, user_id: i64, date: NaiveDate) -> Result<Vec<DailyRecord>> {
        Ok(self
            .db
            .records_for_user_date(user_id, &format_date_local(date))?
            .into_iter()
            .map(map_record)
            .collect())
    }

    pub fn get_daily_records_for_activity(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>> {
        Ok(self
            .db
            .records_for_user_between(
                user_id,
                &format_date_local(start),
                &format_date_local(end),
            )?
            .into_iter()
            .map(map_record)
            .collect())
    }
}

fn map_user(row: UserRow) -> User {
    User {
        id: row.id,
        username: row.username,
    }
}

fn map_activity(row: ActivityRow) -> Activity {
    let schedule = row.schedule.as_deref().and_then(|raw| {
        parse_schedule(raw)
            .map_err(|error| {
                warn!(error = %error, activity_id = row.id, "ignoring unreadable schedule");
            })
            .ok()
    });

    Activity {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        schedule,
        created_at: row.created_at,
    }
}

fn map_marker(row: MarkerRow) -> ActivityMarker {
    ActivityMarker {
        id: row.id,
        activity_id: row.activity_id,
        label: row.label,
        is_default: row.is_default.unwrap_or(false),
        target: row.target.and_then(|value| u32::try_from(value).ok()),
        created_at: row.created_at,
    }
}

fn map_record(row: DailyRecordRow) -> DailyRecord {
    DailyRecord {
        id: row.id,
        user_id: row.user_id,
        activity_marker_id: row.activity_marker_id,
        date: row.date,
        completed: row.completed,
        target: row.target.and_then(|value| u32::try_from(value).ok()),
        completed_at: row.completed_at,
        created_at: row.created_at,
    }
}
