//! Ingestion: replace a week's games with the provider's slate and refresh
//! the week's auto-managed ineligible teams.

use crate::error::{PoolError, PoolResult};
use crate::models::{GameRecord, NewGame, Week, WeekId};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use log::{debug, info, warn};
use nfl_api::NFL_TEAMS;
use nfl_api::client::{ApiResult, FetchedScoreboard, NflApi};
use serde::Serialize;
use std::collections::BTreeSet;

/// Games kicking off on this league-local weekday follow a short turnaround.
const BLACKOUT_DAY: Weekday = Weekday::Thu;

/// Source of scoreboard data for a week.
#[async_trait]
pub trait ScoreboardFeed: Send + Sync {
    async fn fetch_week(
        &self,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> ApiResult<FetchedScoreboard>;
}

#[async_trait]
impl ScoreboardFeed for NflApi {
    async fn fetch_week(
        &self,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> ApiResult<FetchedScoreboard> {
        self.fetch_scoreboard(season_year, week_number).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub incoming: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub season_year: i32,
    pub week_number: u32,
    pub week_id: WeekId,
    pub counts: SyncCounts,
    pub source_url: String,
    pub ineligible_teams: BTreeSet<String>,
    pub ineligible_updated: bool,
}

/// Fetch one week from the feed and replace its stored games.
///
/// Week resolution: explicit arguments, then the provider's hint, then
/// `current`. The week must already exist in the store.
pub async fn sync_week(
    store: &dyn Store,
    feed: &dyn ScoreboardFeed,
    current: Option<&Week>,
    season_year: Option<i32>,
    week_number: Option<u32>,
) -> PoolResult<SyncReport> {
    let fetched = feed.fetch_week(season_year, week_number).await?;
    let board = fetched.scoreboard;

    let season = season_year
        .or(board.season_year)
        .or(current.map(|w| w.season_year));
    let number = week_number
        .or(board.week_number)
        .or(current.map(|w| w.week_number));
    let (Some(season), Some(number)) = (season, number) else {
        return Err(PoolError::WeekNotFound(format!(
            "could not infer season/week (season {season:?}, week {number:?})"
        )));
    };
    let week = store
        .week_by_number(season, number)
        .await?
        .ok_or_else(|| PoolError::WeekNotFound(format!("season {season} week {number}")))?;

    let mut counts = SyncCounts {
        incoming: board.games.len(),
        skipped: board.skipped,
        ..Default::default()
    };

    // Any delete failure aborts before inserting so stale rows never mix with new ones.
    for game in store.games_for_week(week.id).await? {
        store.delete_game(game.id).await?;
        counts.deleted += 1;
    }

    for record in &board.games {
        let new_game = NewGame { week_id: week.id, record: record.clone() };
        match store.create_game(new_game).await {
            Ok(_) => counts.created += 1,
            Err(e) => {
                warn!(
                    "failed to insert {} @ {} for week {}: {e}",
                    record.away_team_abbr, record.home_team_abbr, week.id
                );
                counts.failed += 1;
            }
        }
    }
    info!(
        "synced {} games for {season} week {number} (deleted {}, failed {})",
        counts.created, counts.deleted, counts.failed
    );

    let (ineligible_teams, ineligible_updated) =
        refresh_ineligible_teams(store, &week, &board.games).await;

    Ok(SyncReport {
        season_year: season,
        week_number: number,
        week_id: week.id,
        counts,
        source_url: fetched.source_url,
        ineligible_teams,
        ineligible_updated,
    })
}

/// Best-effort: a failed write is logged and the stored set is reported back.
async fn refresh_ineligible_teams(
    store: &dyn Store,
    week: &Week,
    slate: &[GameRecord],
) -> (BTreeSet<String>, bool) {
    let computed = compute_ineligible_teams(&week.ineligible_teams, slate);
    if same_team_set(&computed, &week.ineligible_teams) {
        debug!("ineligible teams unchanged for week {}", week.id);
        return (week.ineligible_teams.clone(), false);
    }

    let updated = Week { ineligible_teams: computed.clone(), ..week.clone() };
    match store.update_week(&updated).await {
        Ok(()) => {
            info!("week {} ineligible teams now {:?}", week.id, computed);
            (computed, true)
        }
        Err(e) => {
            warn!("failed to update ineligible teams for week {}: {e}", week.id);
            (week.ineligible_teams.clone(), false)
        }
    }
}

/// Union of bye teams, blackout-day teams, and teams already ineligible.
/// Never removes a team.
///
/// An empty slate adds nothing and returns `existing` as is. Taken literally
/// the bye rule would flag all 32 teams, which is what an empty or failed feed
/// response would otherwise do to the week.
pub fn compute_ineligible_teams(
    existing: &BTreeSet<String>,
    slate: &[GameRecord],
) -> BTreeSet<String> {
    let mut ineligible: BTreeSet<String> =
        existing.iter().map(|t| t.trim().to_ascii_uppercase()).collect();

    if slate.is_empty() {
        return ineligible;
    }

    let playing: BTreeSet<&str> = slate.iter().flat_map(|g| g.teams()).collect();
    ineligible.extend(
        NFL_TEAMS
            .iter()
            .filter(|team| !playing.contains(*team))
            .map(|team| team.to_string()),
    );

    for game in slate {
        if league_local_time(game.start_time).weekday() == BLACKOUT_DAY {
            ineligible.extend(game.teams().map(str::to_owned));
        }
    }
    ineligible
}

fn same_team_set(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    let upper = |set: &BTreeSet<String>| -> BTreeSet<String> {
        set.iter().map(|t| t.trim().to_ascii_uppercase()).collect()
    };
    upper(a) == upper(b)
}

/// Wall-clock time in US Eastern, the league's home time zone.
pub fn league_local_time(utc: DateTime<Utc>) -> chrono::NaiveDateTime {
    let offset_hours = if is_eastern_dst(utc) { -4 } else { -5 };
    utc.naive_utc() + Duration::hours(offset_hours)
}

/// US daylight saving time: second Sunday of March 02:00 EST through first
/// Sunday of November 02:00 EDT.
fn is_eastern_dst(utc: DateTime<Utc>) -> bool {
    let year = utc.year();
    let start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)
        .and_then(|d| d.and_hms_opt(7, 0, 0));
    let end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)
        .and_then(|d| d.and_hms_opt(6, 0, 0));
    match (start, end) {
        (Some(start), Some(end)) => {
            let naive = utc.naive_utc();
            naive >= start && naive < end
        }
        _ => false,
    }
}
