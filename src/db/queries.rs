pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  username   TEXT NOT NULL UNIQUE,
  created_at INTEGER NOT NULL
);
"#;

pub const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id    INTEGER NOT NULL REFERENCES users(id),
  name       TEXT NOT NULL,
  schedule   TEXT,
  created_at INTEGER NOT NULL
);
"#;

pub const CREATE_ACTIVITY_MARKERS: &str = r#"
CREATE TABLE IF NOT EXISTS activity_markers (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL REFERENCES activities(id),
  label       TEXT NOT NULL,
  is_default  INTEGER,
  target      INTEGER,
  created_at  INTEGER NOT NULL
);
"#;

pub const CREATE_DAILY_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_records (
  id                 INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id            INTEGER NOT NULL REFERENCES users(id),
  activity_marker_id INTEGER NOT NULL REFERENCES activity_markers(id),
  date               TEXT NOT NULL,
  completed          INTEGER NOT NULL DEFAULT 1,
  target             INTEGER,
  completed_at       INTEGER,
  created_at         INTEGER NOT NULL
);
"#;

pub const INDEX_ACTIVITIES_USER: &str =
    "CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);";

pub const INDEX_MARKERS_ACTIVITY: &str =
    "CREATE INDEX IF NOT EXISTS idx_markers_activity ON activity_markers(activity_id);";

pub const INDEX_RECORDS_USER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_user_date ON daily_records(user_id, date);";

pub const INDEX_RECORDS_MARKER: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_marker ON daily_records(activity_marker_id);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_USERS,
        CREATE_ACTIVITIES,
        CREATE_ACTIVITY_MARKERS,
        CREATE_DAILY_RECORDS,
        INDEX_ACTIVITIES_USER,
        INDEX_MARKERS_ACTIVITY,
        INDEX_RECORDS_USER_DATE,
        INDEX_RECORDS_MARKER,
    ]
}
