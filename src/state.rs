use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Client-local persisted state: the active user plus per-marker checkbox
/// row counts and per-(activity, date) visible marker sets. A best-effort
/// cache, never authoritative; a missing or corrupt file resets to
/// defaults instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientState {
    pub active_user: Option<StoredUser>,
    pub checkbox_counts: BTreeMap<i64, u32>,
    pub visible_markers: BTreeMap<String, BTreeSet<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
}

pub struct StateStore {
    path: PathBuf,
    state: ClientState,
}

impl StateStore {
    pub fn load(path: &Path) -> Self {
        let state = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!(error = %error, path = %path.display(), "corrupt state file, resetting");
                ClientState::default()
            }),
            Err(_) => ClientState::default(),
        };

        Self {
            path: path.to_path_buf(),
            state,
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(&self.state).context("Failed to serialize state")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        Ok(())
    }

    pub fn active_user(&self) -> Option<&StoredUser> {
        self.state.active_user.as_ref()
    }

    pub fn set_active_user(&mut self, user: StoredUser) -> Result<()> {
        self.state.active_user = Some(user);
        self.save()
    }

    pub fn clear_active_user(&mut self) -> Result<()> {
        self.state.active_user = None;
        self.save()
    }

    pub fn checkbox_count(&self, marker_id: i64, default: u32) -> u32 {
        self.state
            .checkbox_counts
            .get(&marker_id)
            .copied()
            .unwrap_or(default)
    }

    /// Grows or shrinks a marker's checkbox row, never below one box.
    pub fn adjust_checkbox_count(&mut self, marker_id: i64, delta: i32, default: u32) -> Result<u32> {
        let current = self.checkbox_count(marker_id, default);
        let adjusted = current.saturating_add_signed(delta).max(1);
        self.state.checkbox_counts.insert(marker_id, adjusted);
        self.save()?;

        Ok(adjusted)
    }

    /// Markers visible for one (activity, date). When nothing has been
    /// persisted yet, only the first-created marker shows.
    pub fn visible_markers(
        &self,
        activity_id: i64,
        date: &str,
        first_marker: Option<i64>,
    ) -> BTreeSet<i64> {
        self.state
            .visible_markers
            .get(&visibility_key(activity_id, date))
            .cloned()
            .unwrap_or_else(|| first_marker.into_iter().collect())
    }

    pub fn show_marker(
        &mut self,
        activity_id: i64,
        date: &str,
        marker_id: i64,
        first_marker: Option<i64>,
    ) -> Result<()> {
        let mut visible = self.visible_markers(activity_id, date, first_marker);
        visible.insert(marker_id);
        self.state
            .visible_markers
            .insert(visibility_key(activity_id, date), visible);
        self.save()
    }

    pub fn hide_marker(
        &mut self,
        activity_id: i64,
        date: &str,
        marker_id: i64,
        first_marker: Option<i64>,
    ) -> Result<()> {
        let mut visible = self.visible_markers(activity_id, date, first_marker);
        visible.remove(&marker_id);
        self.state
            .visible_markers
            .insert(visibility_key(activity_id, date), visible);
        self.save()
    }

    pub fn show_all_markers(
        &mut self,
        activity_id: i64,
        date: &str,
        marker_ids: impl IntoIterator<Item = i64>,
    ) -> Result<()> {
        self.state.visible_markers.insert(
            visibility_key(activity_id, date),
            marker_ids.into_iter().collect(),
        );
        self.save()
    }
}

fn visibility_key(activity_id: i64, date: &str) -> String {
    format!("{activity_id}:{date}")
}

#[cfg(test)]
mod tests {
    use super::{StateStore, StoredUser};
    use std::collections::BTreeSet;

    fn temp_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = StateStore::load(&dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn active_user_survives_reload() {
        let (dir, mut store) = temp_store();
        store
            .set_active_user(StoredUser {
                id: 7,
                username: "alice".to_string(),
            })
            .expect("persist");

        let reloaded = StateStore::load(&dir.path().join("state.json"));
        assert_eq!(
            reloaded.active_user().map(|u| u.id),
            Some(7),
            "stored identity should survive a restart"
        );
    }

    #[test]
    fn corrupt_state_file_resets_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").expect("write");

        let store = StateStore::load(&path);
        assert!(store.active_user().is_none());
    }

    #[test]
    fn checkbox_count_never_drops_below_one() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.checkbox_count(1, 10), 10);

        let shrunk = store.adjust_checkbox_count(1, -50, 10).expect("adjust");
        assert_eq!(shrunk, 1);

        let grown = store.adjust_checkbox_count(1, 5, 10).expect("adjust");
        assert_eq!(grown, 6);
    }

    #[test]
    fn only_first_marker_visible_by_default() {
        let (_dir, mut store) = temp_store();
        assert_eq!(
            store.visible_markers(3, "2026-02-18", Some(11)),
            BTreeSet::from([11])
        );

        store
            .show_marker(3, "2026-02-18", 12, Some(11))
            .expect("show");
        assert_eq!(
            store.visible_markers(3, "2026-02-18", Some(11)),
            BTreeSet::from([11, 12])
        );

        store
            .hide_marker(3, "2026-02-18", 11, Some(11))
            .expect("hide");
        assert_eq!(
            store.visible_markers(3, "2026-02-18", Some(11)),
            BTreeSet::from([12])
        );

        // visibility is scoped per date
        assert_eq!(
            store.visible_markers(3, "2026-02-19", Some(11)),
            BTreeSet::from([11])
        );
    }
}
