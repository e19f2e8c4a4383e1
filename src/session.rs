use crate::model::User;
use crate::service::Tracker;
use crate::state::{StateStore, StoredUser};
use anyhow::{bail, Result};
use tracing::{info, warn};

/// Username-only identity. Resolves the name against the store, creating
/// the user on first login, and persists the result into the client state
/// slot so the next start can restore it.
pub fn login(tracker: &Tracker, state: &mut StateStore, username: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        bail!("Username must not be empty");
    }

    let user = match tracker.get_user_by_username(username)? {
        Some(existing) => existing,
        None => tracker.create_user(username)?,
    };

    state.set_active_user(StoredUser {
        id: user.id,
        username: user.username.clone(),
    })?;
    info!(username = %user.username, user_id = user.id, "logged in");

    Ok(user)
}

pub fn logout(state: &mut StateStore) -> Result<()> {
    state.clear_active_user()?;
    info!("logged out");

    Ok(())
}

/// Re-validates a previously persisted identity against the store. The
/// stored user is only trusted when a fresh fetch by username returns the
/// same id; a mismatch or fetch failure clears the slot and forces a new
/// login.
pub fn restore(tracker: &Tracker, state: &mut StateStore) -> Result<Option<User>> {
    let Some(stored) = state.active_user().cloned() else {
        return Ok(None);
    };

    match tracker.get_user_by_username(&stored.username) {
        Ok(Some(user)) if user.id == stored.id => Ok(Some(user)),
        Ok(_) => {
            warn!(username = %stored.username, "stored identity no longer valid, clearing");
            state.clear_active_user()?;
            Ok(None)
        }
        Err(error) => {
            warn!(error = %error, username = %stored.username, "failed to verify stored identity, clearing");
            state.clear_active_user()?;
            Ok(None)
        }
    }
}

/// The active user, or an error when nobody is logged in. Used by every
/// view and mutation path that needs an identity.
pub fn require_user(tracker: &Tracker, state: &mut StateStore) -> Result<User> {
    restore(tracker, state)?.ok_or_else(|| anyhow::anyhow!("Not logged in. Run `breadcrumb login <username>` first."))
}

#[cfg(test)]
mod tests {
    use super::{login, logout, restore};
    use crate::service::Tracker;
    use crate::state::{StateStore, StoredUser};

    fn fixtures() -> (tempfile::TempDir, Tracker, StateStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let tracker = Tracker::open(&dir.path().join("tracker.db")).expect("open db");
        let state = StateStore::load(&dir.path().join("state.json"));
        (dir, tracker, state)
    }

    #[test]
    fn second_login_reuses_the_same_user() {
        let (_dir, tracker, mut state) = fixtures();

        let first = login(&tracker, &mut state, "alice").expect("first login");
        logout(&mut state).expect("logout");
        let second = login(&tracker, &mut state, "alice").expect("second login");

        assert_eq!(first.id, second.id, "no duplicate user row");
    }

    #[test]
    fn blank_username_is_rejected() {
        let (_dir, tracker, mut state) = fixtures();
        assert!(login(&tracker, &mut state, "   ").is_err());
    }

    #[test]
    fn restore_round_trips_a_valid_identity() {
        let (_dir, tracker, mut state) = fixtures();
        let user = login(&tracker, &mut state, "alice").expect("login");

        let restored = restore(&tracker, &mut state).expect("restore");
        assert_eq!(restored.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn restore_clears_identity_on_id_mismatch() {
        let (_dir, tracker, mut state) = fixtures();
        let user = login(&tracker, &mut state, "alice").expect("login");

        state
            .set_active_user(StoredUser {
                id: user.id + 100,
                username: "alice".to_string(),
            })
            .expect("tamper");

        let restored = restore(&tracker, &mut state).expect("restore");
        assert!(restored.is_none());
        assert!(state.active_user().is_none(), "slot must be cleared");
    }

    #[test]
    fn restore_without_stored_identity_is_none() {
        let (_dir, tracker, mut state) = fixtures();
        assert!(restore(&tracker, &mut state).expect("restore").is_none());
    }
}
