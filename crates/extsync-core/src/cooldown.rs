use chrono::{DateTime, Duration, Utc};

use crate::state::GlobalSyncState;

/// Decide whether a synchronization run is due.
///
/// `force` wins over everything. Otherwise auto-update must be enabled, and the
/// run is due when no check was ever recorded or at least `cooldownHours` have
/// passed since the last one.
pub fn should_run(state: &GlobalSyncState, force: bool, now: DateTime<Utc>) -> bool {
    if force {
        return true;
    }
    if !state.auto_update {
        return false;
    }
    let Some(last_check) = state.last_check else {
        return true;
    };
    now - last_check >= cooldown(state.cooldown_hours)
}

fn cooldown(hours: f64) -> Duration {
    if !hours.is_finite() || hours <= 0.0 {
        return Duration::zero();
    }
    Duration::milliseconds((hours * 3_600_000.0) as i64)
}
