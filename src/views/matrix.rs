use super::{display_name_for, display_names};
use crate::error::PoolResult;
use crate::models::{EntryId, Game, Pick, PickStatus, UserId, Week, WeekId};
use crate::results::resolve_week;
use crate::store::Store;
use chrono::{DateTime, Utc};
use futures_util::future::{try_join, try_join_all};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonMatrix {
    /// `None` only when the store holds no weeks at all.
    pub season_year: Option<i32>,
    pub generated_at: DateTime<Utc>,
    pub weeks: Vec<MatrixWeek>,
    pub entries: Vec<MatrixEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixWeek {
    pub week_id: WeekId,
    pub week_number: u32,
    pub lock_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub name: String,
    pub user_name: String,
    /// Live flag from the store, shown as-is.
    pub is_eliminated: bool,
    /// First visible week with a losing pick, rebuilt from game scores.
    pub eliminated_week: Option<u32>,
    pub picks: BTreeMap<u32, MatrixCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub team_abbr: Option<String>,
    pub result: PickStatus,
}

/// Explicit season, then the current week's season, then the latest season.
pub fn resolve_season(weeks: &[Week], current: Option<&Week>, season_year: Option<i32>) -> Option<i32> {
    season_year
        .or(current.map(|w| w.season_year))
        .or_else(|| weeks.iter().map(|w| w.season_year).max())
}

fn is_visible(week: &Week, current: Option<&Week>, now: DateTime<Utc>) -> bool {
    week.is_locked_at(now)
        || current.is_some_and(|c| {
            c.season_year == week.season_year && week.week_number < c.week_number
        })
}

/// Season-wide entry by week grid.
///
/// Results come straight from each visible week's games, so the grid is
/// correct even for weeks the pick updater never processed. Weeks that are
/// neither locked nor before the current week are withheld. Every entry gets
/// a row, with an empty `picks` map when it has no visible pick.
pub async fn build_matrix(
    store: &dyn Store,
    current: Option<&Week>,
    season_year: Option<i32>,
    now: DateTime<Utc>,
) -> PoolResult<SeasonMatrix> {
    let all_weeks = store.weeks().await?;
    let Some(season) = resolve_season(&all_weeks, current, season_year).filter(|_| !all_weeks.is_empty())
    else {
        debug!("matrix requested with no weeks stored");
        return Ok(SeasonMatrix {
            season_year: None,
            generated_at: now,
            weeks: Vec::new(),
            entries: Vec::new(),
        });
    };

    let mut visible: Vec<Week> = all_weeks
        .into_iter()
        .filter(|w| w.season_year == season && is_visible(w, current, now))
        .collect();
    visible.sort_by_key(|w| (w.week_number, w.id));
    debug!("matrix for {season}: {} visible weeks", visible.len());

    let per_week: Vec<(Vec<Game>, Vec<Pick>)> = try_join_all(
        visible
            .iter()
            .map(|w| try_join(store.games_for_week(w.id), store.picks_for_week(w.id))),
    )
    .await?;

    let mut cells: HashMap<EntryId, BTreeMap<u32, MatrixCell>> = HashMap::new();
    for (week, (games, picks)) in visible.iter().zip(&per_week) {
        let outcome = resolve_week(games);
        for pick in picks {
            let team = pick.team();
            let result = match &team {
                Some(team) => outcome.status_for(team),
                None => PickStatus::NoPick,
            };
            cells
                .entry(pick.entry_id)
                .or_default()
                .insert(week.week_number, MatrixCell { team_abbr: team, result });
        }
    }

    let (entries, users) = try_join(store.entries(), store.users()).await?;
    let names = display_names(&users);
    let mut entries: Vec<MatrixEntry> = entries
        .into_iter()
        .map(|entry| {
            let picks = cells.remove(&entry.id).unwrap_or_default();
            let eliminated_week = picks
                .iter()
                .find(|(_, cell)| cell.result == PickStatus::Loss)
                .map(|(&number, _)| number);
            MatrixEntry {
                entry_id: entry.id,
                user_id: entry.user_id,
                name: entry.name,
                user_name: display_name_for(&names, entry.user_id),
                is_eliminated: entry.is_eliminated,
                eliminated_week,
                picks,
            }
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.entry_id.cmp(&b.entry_id)));

    Ok(SeasonMatrix {
        season_year: Some(season),
        generated_at: now,
        weeks: visible
            .iter()
            .map(|w| MatrixWeek { week_id: w.id, week_number: w.week_number, lock_time: w.lock_time })
            .collect(),
        entries,
    })
}
