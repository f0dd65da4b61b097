use super::resolve_week;
use crate::error::{PoolError, PoolResult};
use crate::models::{Pick, PickStatus, WeekId};
use crate::store::Store;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCounts {
    pub win: usize,
    pub loss: usize,
    pub in_progress: usize,
    pub tbd: usize,
    pub eliminated: usize,
    /// Picks whose stored row changed.
    pub updated: usize,
    /// Picks skipped because a write failed; retried on the next run.
    pub failed: usize,
}

impl UpdateCounts {
    fn tally(&mut self, status: PickStatus) {
        match status {
            PickStatus::Win => self.win += 1,
            PickStatus::Loss => self.loss += 1,
            PickStatus::InProgress => self.in_progress += 1,
            PickStatus::Tbd | PickStatus::NoPick => self.tbd += 1,
        }
    }
}

/// Recompute every pick of a week from its games, writing only what changed.
///
/// A pick moving into `loss` eliminates its entry first; the pick row is only
/// written once that succeeds, so an interrupted run converges when re-run.
pub async fn update_week(
    store: &dyn Store,
    week_id: WeekId,
    now: DateTime<Utc>,
) -> PoolResult<UpdateCounts> {
    if store.week(week_id).await?.is_none() {
        return Err(PoolError::WeekNotFound(format!("week id {week_id}")));
    }

    let outcome = resolve_week(&store.games_for_week(week_id).await?);
    let picks = store.picks_for_week(week_id).await?;
    let mut counts = UpdateCounts::default();

    for pick in picks {
        let Some(team) = pick.team() else {
            counts.tbd += 1;
            continue;
        };
        let status = outcome.status_for(&team);
        counts.tally(status);

        let Some(next) = next_pick_state(&pick, status, now) else {
            continue;
        };

        if status == PickStatus::Loss && pick.status != PickStatus::Loss {
            match eliminate_entry(store, &pick).await {
                Ok(true) => counts.eliminated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("failed to eliminate entry {} for pick {}: {e}", pick.entry_id, pick.id);
                    counts.failed += 1;
                    continue;
                }
            }
        }

        match store.update_pick(&next).await {
            Ok(()) => counts.updated += 1,
            Err(e) => {
                warn!("failed to update pick {}: {e}", pick.id);
                counts.failed += 1;
            }
        }
    }

    info!(
        "week {week_id}: {} win, {} loss, {} in progress, {} tbd, {} eliminated, {} updated",
        counts.win, counts.loss, counts.in_progress, counts.tbd, counts.eliminated, counts.updated
    );
    Ok(counts)
}

/// The row to write for `pick`, or `None` when the stored row is already right.
fn next_pick_state(pick: &Pick, status: PickStatus, now: DateTime<Utc>) -> Option<Pick> {
    let status_changed = pick.status != status;
    let missing_timestamp = status.is_final() && pick.result_at.is_none();
    let stale_timestamp = !status.is_final() && pick.result_at.is_some();
    if !status_changed && !missing_timestamp && !stale_timestamp {
        return None;
    }

    let result_at = match (status.is_final(), status_changed) {
        (true, true) => Some(now),
        (true, false) => pick.result_at.or(Some(now)),
        (false, _) => None,
    };
    Some(Pick { status, result_at, ..pick.clone() })
}

/// Returns whether this call flipped the flag. Never un-eliminates.
async fn eliminate_entry(store: &dyn Store, pick: &Pick) -> PoolResult<bool> {
    let Some(entry) = store.entry(pick.entry_id).await? else {
        debug!("pick {} references missing entry {}", pick.id, pick.entry_id);
        return Ok(false);
    };
    if entry.is_eliminated {
        return Ok(false);
    }
    let mut entry = entry;
    entry.is_eliminated = true;
    store.update_entry(&entry).await?;
    info!("entry {} eliminated by pick {}", entry.id, pick.id);
    Ok(true)
}
