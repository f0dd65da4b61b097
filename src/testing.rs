//! Fixtures and a fault-injecting store shared by unit tests.

use crate::error::{PoolError, PoolResult};
use crate::models::{
    Entry, EntryId, Game, GameId, GameRecord, GameStatus, NewGame, Pick, PickId, PickStatus, User, UserId,
    Week, WeekId,
};
use crate::store::{MemoryStore, Store, StoreData};
use crate::sync::ScoreboardFeed;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nfl_api::Scoreboard;
use nfl_api::client::{ApiError, ApiResult, FetchedScoreboard};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn week(
    id: WeekId,
    season_year: i32,
    week_number: u32,
    lock_time: Option<DateTime<Utc>>,
    is_current: bool,
) -> Week {
    Week {
        id,
        season_year,
        week_number,
        lock_time,
        is_current,
        ineligible_teams: Default::default(),
    }
}

pub fn game(id: GameId, week_id: WeekId, home: &str, away: &str, status: GameStatus) -> Game {
    Game {
        id,
        week_id,
        home_team_abbr: home.into(),
        away_team_abbr: away.into(),
        start_time: Utc.with_ymd_and_hms(2025, 9, 7, 17, 0, 0).unwrap() + chrono::Duration::minutes(id),
        status,
        home_score: None,
        away_score: None,
    }
}

pub fn final_game(
    id: GameId,
    week_id: WeekId,
    home: &str,
    away: &str,
    home_score: u32,
    away_score: u32,
) -> Game {
    Game {
        home_score: Some(home_score),
        away_score: Some(away_score),
        ..game(id, week_id, home, away, GameStatus::Final)
    }
}

pub fn pick(id: PickId, entry_id: EntryId, week_id: WeekId, team: Option<&str>) -> Pick {
    Pick {
        id,
        entry_id,
        week_id,
        team_abbr: team.map(str::to_owned),
        status: PickStatus::Tbd,
        result_at: None,
    }
}

pub fn entry(id: EntryId, user_id: UserId, name: &str, is_eliminated: bool) -> Entry {
    Entry { id, user_id, name: name.into(), is_eliminated }
}

pub fn user(id: UserId, first_name: &str, email: &str) -> User {
    User {
        id,
        first_name: Some(first_name.into()),
        last_name: None,
        email: email.into(),
    }
}

/// Wraps `MemoryStore`, counting successful writes and failing chosen ones.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing_picks: Mutex<HashSet<PickId>>,
    failing_entries: Mutex<HashSet<EntryId>>,
    fail_reads: Mutex<bool>,
    fail_week_writes: Mutex<bool>,
    failing_next_reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FailingStore {
    pub fn new(data: StoreData) -> Self {
        Self { inner: MemoryStore::new(data), ..Default::default() }
    }

    pub fn fail_pick(&self, id: PickId) {
        self.failing_picks.lock().unwrap().insert(id);
    }

    pub fn fail_entry(&self, id: EntryId) {
        self.failing_entries.lock().unwrap().insert(id);
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn fail_week_writes(&self) {
        *self.fail_week_writes.lock().unwrap() = true;
    }

    /// Fail only the next `n` reads, then behave normally.
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_next_reads.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing_picks.lock().unwrap().clear();
        self.failing_entries.lock().unwrap().clear();
        *self.fail_reads.lock().unwrap() = false;
        *self.fail_week_writes.lock().unwrap() = false;
        self.failing_next_reads.store(0, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn pick(&self, id: PickId) -> Pick {
        self.inner
            .snapshot()
            .await
            .picks
            .into_iter()
            .find(|p| p.id == id)
            .unwrap()
    }

    fn check_reads(&self) -> PoolResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(PoolError::StoreReadFailed("injected".into()));
        }
        let pending = self
            .failing_next_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(PoolError::StoreReadFailed("injected once".into()));
        }
        Ok(())
    }

    fn wrote<T>(&self, result: PoolResult<T>) -> PoolResult<T> {
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn weeks(&self) -> PoolResult<Vec<Week>> {
        self.check_reads()?;
        self.inner.weeks().await
    }

    async fn week(&self, id: WeekId) -> PoolResult<Option<Week>> {
        self.check_reads()?;
        self.inner.week(id).await
    }

    async fn current_week(&self) -> PoolResult<Option<Week>> {
        self.check_reads()?;
        self.inner.current_week().await
    }

    async fn week_by_number(&self, season_year: i32, week_number: u32) -> PoolResult<Option<Week>> {
        self.check_reads()?;
        self.inner.week_by_number(season_year, week_number).await
    }

    async fn update_week(&self, week: &Week) -> PoolResult<()> {
        if *self.fail_week_writes.lock().unwrap() {
            return Err(PoolError::StoreWriteFailed(format!("injected week {}", week.id)));
        }
        let result = self.inner.update_week(week).await;
        self.wrote(result)
    }

    async fn games_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Game>> {
        self.check_reads()?;
        self.inner.games_for_week(week_id).await
    }

    async fn create_game(&self, game: NewGame) -> PoolResult<Game> {
        let result = self.inner.create_game(game).await;
        self.wrote(result)
    }

    async fn delete_game(&self, id: GameId) -> PoolResult<()> {
        let result = self.inner.delete_game(id).await;
        self.wrote(result)
    }

    async fn picks_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Pick>> {
        self.check_reads()?;
        self.inner.picks_for_week(week_id).await
    }

    async fn picks_for_entry(&self, entry_id: EntryId) -> PoolResult<Vec<Pick>> {
        self.check_reads()?;
        self.inner.picks_for_entry(entry_id).await
    }

    async fn update_pick(&self, pick: &Pick) -> PoolResult<()> {
        if self.failing_picks.lock().unwrap().contains(&pick.id) {
            return Err(PoolError::StoreWriteFailed(format!("injected pick {}", pick.id)));
        }
        let result = self.inner.update_pick(pick).await;
        self.wrote(result)
    }

    async fn entries(&self) -> PoolResult<Vec<Entry>> {
        self.check_reads()?;
        self.inner.entries().await
    }

    async fn entry(&self, id: EntryId) -> PoolResult<Option<Entry>> {
        self.check_reads()?;
        self.inner.entry(id).await
    }

    async fn entries_for_user(&self, user_id: UserId) -> PoolResult<Vec<Entry>> {
        self.check_reads()?;
        self.inner.entries_for_user(user_id).await
    }

    async fn update_entry(&self, entry: &Entry) -> PoolResult<()> {
        if self.failing_entries.lock().unwrap().contains(&entry.id) {
            return Err(PoolError::StoreWriteFailed(format!("injected entry {}", entry.id)));
        }
        let result = self.inner.update_entry(entry).await;
        self.wrote(result)
    }

    async fn users(&self) -> PoolResult<Vec<User>> {
        self.check_reads()?;
        self.inner.users().await
    }
}

/// Feed returning a fixed scoreboard, or a 503 when built with `failing`.
pub struct StaticFeed {
    board: Scoreboard,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(season_year: Option<i32>, week_number: Option<u32>, games: Vec<GameRecord>) -> Self {
        Self {
            board: Scoreboard { season_year, week_number, games, skipped: 0 },
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new(None, None, Vec::new()) }
    }
}

#[async_trait]
impl ScoreboardFeed for StaticFeed {
    async fn fetch_week(
        &self,
        _season_year: Option<i32>,
        _week_number: Option<u32>,
    ) -> ApiResult<FetchedScoreboard> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ApiError::Status {
                status: 503,
                url: "http://feed/scoreboard".into(),
                body: "unavailable".into(),
            });
        }
        Ok(FetchedScoreboard {
            scoreboard: self.board.clone(),
            source_url: "http://feed/scoreboard".into(),
        })
    }
}
