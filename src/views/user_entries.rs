use crate::error::PoolResult;
use crate::models::{EntryId, PickStatus, UserId, WeekId};
use crate::store::Store;
use chrono::{DateTime, Utc};
use futures_util::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntries {
    pub user_id: UserId,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<UserEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: EntryId,
    pub name: String,
    pub is_eliminated: bool,
    pub picks: Vec<UserPick>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPick {
    pub week_id: WeekId,
    pub week_number: u32,
    pub team_abbr: Option<String>,
    pub status: PickStatus,
}

/// A user's entries with their picks in week order. Picks on weeks that no
/// longer exist are dropped. An unknown user yields no entries.
pub async fn build_user_entries(
    store: &dyn Store,
    user_id: UserId,
    now: DateTime<Utc>,
) -> PoolResult<UserEntries> {
    let (entries, weeks) = try_join(store.entries_for_user(user_id), store.weeks()).await?;
    let week_numbers: HashMap<WeekId, u32> = weeks.iter().map(|w| (w.id, w.week_number)).collect();

    let picks = try_join_all(entries.iter().map(|e| store.picks_for_entry(e.id))).await?;

    let entries = entries
        .into_iter()
        .zip(picks)
        .map(|(entry, picks)| {
            let mut picks: Vec<UserPick> = picks
                .into_iter()
                .filter_map(|pick| {
                    let week_number = *week_numbers.get(&pick.week_id)?;
                    Some(UserPick {
                        week_id: pick.week_id,
                        week_number,
                        team_abbr: pick.team(),
                        status: pick.status,
                    })
                })
                .collect();
            picks.sort_by_key(|p| (p.week_number, p.week_id));
            UserEntry {
                id: entry.id,
                name: entry.name,
                is_eliminated: entry.is_eliminated,
                picks,
            }
        })
        .collect();

    Ok(UserEntries { user_id, generated_at: now, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreData};
    use crate::testing::{entry, pick, week};
    use chrono::TimeZone;

    #[tokio::test]
    async fn picks_are_listed_in_week_order() {
        let mut late = pick(21, 1, 3, Some("jac"));
        late.status = PickStatus::Win;
        let store = MemoryStore::new(StoreData {
            weeks: vec![week(3, 2025, 2, None, false), week(2, 2025, 1, None, false)],
            picks: vec![late, pick(20, 1, 2, Some("SEA")), pick(22, 1, 99, Some("KC")), pick(23, 2, 2, Some("NE"))],
            entries: vec![entry(1, 7, "Main", false), entry(2, 8, "Other", false)],
            ..Default::default()
        });
        let now = Utc.with_ymd_and_hms(2025, 9, 20, 0, 0, 0).unwrap();

        let view = build_user_entries(&store, 7, now).await.unwrap();
        assert_eq!(view.entries.len(), 1);
        let picks = &view.entries[0].picks;
        assert_eq!(picks.len(), 2, "pick on a missing week is dropped");
        assert_eq!((picks[0].week_number, picks[0].team_abbr.as_deref()), (1, Some("SEA")));
        assert_eq!((picks[1].week_number, picks[1].team_abbr.as_deref()), (2, Some("JAX")));
        assert_eq!(picks[1].status, PickStatus::Win);
    }

    #[tokio::test]
    async fn unknown_user_has_no_entries() {
        let view = build_user_entries(&MemoryStore::default(), 5, Utc::now()).await.unwrap();
        assert!(view.entries.is_empty());
    }
}
