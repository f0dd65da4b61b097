use super::{display_name_for, display_names};
use crate::blob::{SnapshotPublisher, reveal_snapshot_key};
use crate::error::{PoolError, PoolResult};
use crate::models::{
    Entry, EntryId, Game, GameId, GameStatus, Pick, PickStatus, User, UserId, Week, WeekId,
};
use crate::store::Store;
use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealSnapshot {
    pub week_id: WeekId,
    pub season_year: i32,
    pub week_number: u32,
    /// False only for the current week before its lock time.
    pub locked: bool,
    pub generated_at: DateTime<Utc>,
    pub games: Vec<RevealGame>,
    /// Pick distribution keyed by canonical team code.
    pub counts: BTreeMap<String, usize>,
    pub kpis: Kpis,
    pub leaderboard: Vec<LeaderboardRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealGame {
    pub id: GameId,
    pub home_team_abbr: String,
    pub away_team_abbr: String,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub winner: Option<String>,
}

impl From<&Game> for RevealGame {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            home_team_abbr: game.home_team_abbr.clone(),
            away_team_abbr: game.away_team_abbr.clone(),
            start_time: game.start_time,
            status: game.status,
            home_score: game.home_score,
            away_score: game.away_score,
            winner: game.winner().map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpis {
    pub wins: usize,
    pub losses: usize,
    /// Every pick that is neither a win nor a loss, `no_pick` included, so
    /// `wins + losses + tbd == total`.
    pub tbd: usize,
    pub total: usize,
    pub alive_count: usize,
    pub no_pick_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub display_name: String,
    pub wins: usize,
    pub losses: usize,
    pub tbd: usize,
}

/// Build the reveal payload for one week.
///
/// While `week_id` is the current week and its lock time has not passed, the
/// payload is empty no matter what the store holds.
pub async fn build_reveal_snapshot(
    store: &dyn Store,
    current: Option<&Week>,
    week_id: WeekId,
    now: DateTime<Utc>,
) -> PoolResult<RevealSnapshot> {
    let week = store
        .week(week_id)
        .await?
        .ok_or_else(|| PoolError::WeekNotFound(format!("week id {week_id}")))?;

    let is_current = current.is_some_and(|c| c.id == week.id);
    let mut snapshot = RevealSnapshot {
        week_id: week.id,
        season_year: week.season_year,
        week_number: week.week_number,
        locked: true,
        generated_at: now,
        games: Vec::new(),
        counts: BTreeMap::new(),
        kpis: Kpis::default(),
        leaderboard: Vec::new(),
    };
    if is_current && !week.is_locked_at(now) {
        snapshot.locked = false;
        return Ok(snapshot);
    }

    let games = store.games_for_week(week.id).await?;
    let picks = store.picks_for_week(week.id).await?;
    let (entries, users) = try_join(store.entries(), store.users()).await?;

    snapshot.games = games.iter().map(RevealGame::from).collect();
    snapshot.counts = pick_distribution(&picks);
    snapshot.kpis = kpis(&picks);
    snapshot.leaderboard = leaderboard(&picks, &entries, &users);
    Ok(snapshot)
}

/// Build and persist the reveal snapshot of every week in a season. A week
/// that fails is logged and skipped. Returns the keys written.
pub async fn publish_reveal_snapshots(
    store: &dyn Store,
    publisher: &SnapshotPublisher,
    current: Option<&Week>,
    season_year: i32,
    now: DateTime<Utc>,
) -> PoolResult<Vec<String>> {
    let weeks: Vec<Week> = store
        .weeks()
        .await?
        .into_iter()
        .filter(|w| w.season_year == season_year)
        .collect();
    if weeks.is_empty() {
        return Err(PoolError::WeekNotFound(format!("season {season_year}")));
    }

    let mut written = Vec::new();
    for week in &weeks {
        let result = match build_reveal_snapshot(store, current, week.id, now).await {
            Ok(snapshot) => publisher.publish(&reveal_snapshot_key(week.id), &snapshot).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(key) => written.push(key),
            Err(e) => warn!("skipping reveal snapshot for week {}: {e}", week.id),
        }
    }
    info!("published {}/{} reveal snapshots for {season_year}", written.len(), weeks.len());
    Ok(written)
}

fn pick_distribution(picks: &[Pick]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for team in picks.iter().filter_map(Pick::team) {
        *counts.entry(team).or_insert(0) += 1;
    }
    counts
}

/// Reads each pick's stored status; nothing is re-resolved from games here.
fn kpis(picks: &[Pick]) -> Kpis {
    let mut kpis = Kpis { total: picks.len(), ..Default::default() };
    for pick in picks {
        if pick.team_abbr.is_none() || pick.status == PickStatus::NoPick {
            kpis.no_pick_count += 1;
        }
        match pick.status {
            PickStatus::Win => kpis.wins += 1,
            PickStatus::Loss => kpis.losses += 1,
            PickStatus::Tbd | PickStatus::InProgress | PickStatus::NoPick => kpis.tbd += 1,
        }
        if pick.status != PickStatus::Loss {
            kpis.alive_count += 1;
        }
    }
    kpis
}

/// Per-user tallies ordered by wins descending, then display name.
fn leaderboard(picks: &[Pick], entries: &[Entry], users: &[User]) -> Vec<LeaderboardRow> {
    let owners: HashMap<EntryId, UserId> = entries.iter().map(|e| (e.id, e.user_id)).collect();
    let names = display_names(users);

    let mut rows: HashMap<UserId, LeaderboardRow> = HashMap::new();
    for pick in picks {
        let Some(&user_id) = owners.get(&pick.entry_id) else {
            continue;
        };
        let row = rows.entry(user_id).or_insert_with(|| LeaderboardRow {
            user_id,
            display_name: display_name_for(&names, user_id),
            wins: 0,
            losses: 0,
            tbd: 0,
        });
        match pick.status {
            PickStatus::Win => row.wins += 1,
            PickStatus::Loss => row.losses += 1,
            _ => row.tbd += 1,
        }
    }

    let mut rows: Vec<_> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then(a.user_id.cmp(&b.user_id))
    });
    rows
}
