use super::Store;
use crate::error::{PoolError, PoolResult};
use crate::models::{Entry, EntryId, Game, GameId, NewGame, Pick, User, UserId, Week, WeekId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;

/// Full contents of a store, as persisted to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub picks: Vec<Pick>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub users: Vec<User>,
    /// Next game id to hand out. Never decreases, so deleted ids are not reused.
    #[serde(default)]
    pub next_game_id: GameId,
}

/// In-process store. Backs the CLI (loaded from and saved to a JSON file) and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new(data: StoreData) -> Self {
        Self { data: RwLock::new(data) }
    }

    /// Load from `path`; a missing file yields an empty store.
    pub async fn load(path: &Path) -> PoolResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Self::new(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PoolError::StoreReadFailed(format!("{}: {e}", path.display()))),
        }
    }

    pub async fn save(&self, path: &Path) -> PoolResult<()> {
        let json = serde_json::to_string_pretty(&*self.data.read().await)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| PoolError::StoreWriteFailed(format!("{}: {e}", path.display())))
    }

    pub async fn snapshot(&self) -> StoreData {
        self.data.read().await.clone()
    }
}

fn missing(kind: &str, id: i64) -> PoolError {
    PoolError::StoreWriteFailed(format!("{kind} {id} does not exist"))
}

#[async_trait]
impl Store for MemoryStore {
    async fn weeks(&self) -> PoolResult<Vec<Week>> {
        let mut weeks = self.data.read().await.weeks.clone();
        weeks.sort_by_key(|w| (w.season_year, w.week_number, w.id));
        Ok(weeks)
    }

    async fn week(&self, id: WeekId) -> PoolResult<Option<Week>> {
        Ok(self.data.read().await.weeks.iter().find(|w| w.id == id).cloned())
    }

    async fn current_week(&self) -> PoolResult<Option<Week>> {
        Ok(self.data.read().await.weeks.iter().find(|w| w.is_current).cloned())
    }

    async fn week_by_number(&self, season_year: i32, week_number: u32) -> PoolResult<Option<Week>> {
        // Duplicate rows prefer the most recently inserted one.
        Ok(self
            .data
            .read()
            .await
            .weeks
            .iter()
            .filter(|w| w.season_year == season_year && w.week_number == week_number)
            .max_by_key(|w| w.id)
            .cloned())
    }

    async fn update_week(&self, week: &Week) -> PoolResult<()> {
        let mut data = self.data.write().await;
        let slot = data
            .weeks
            .iter_mut()
            .find(|w| w.id == week.id)
            .ok_or_else(|| missing("week", week.id))?;
        *slot = week.clone();
        Ok(())
    }

    async fn games_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Game>> {
        let mut games: Vec<Game> = self
            .data
            .read()
            .await
            .games
            .iter()
            .filter(|g| g.week_id == week_id)
            .cloned()
            .collect();
        games.sort_by_key(|g| (g.start_time, g.id));
        Ok(games)
    }

    async fn create_game(&self, game: NewGame) -> PoolResult<Game> {
        let mut data = self.data.write().await;
        let floor = data.games.iter().map(|g| g.id).max().unwrap_or(0) + 1;
        let id = data.next_game_id.max(floor);
        data.next_game_id = id + 1;
        let record = game.record;
        let created = Game {
            id,
            week_id: game.week_id,
            home_team_abbr: record.home_team_abbr,
            away_team_abbr: record.away_team_abbr,
            start_time: record.start_time,
            status: record.status,
            home_score: record.home_score,
            away_score: record.away_score,
        };
        data.games.push(created.clone());
        Ok(created)
    }

    async fn delete_game(&self, id: GameId) -> PoolResult<()> {
        self.data.write().await.games.retain(|g| g.id != id);
        Ok(())
    }

    async fn picks_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Pick>> {
        let data = self.data.read().await;
        Ok(data.picks.iter().filter(|p| p.week_id == week_id).cloned().collect())
    }

    async fn picks_for_entry(&self, entry_id: EntryId) -> PoolResult<Vec<Pick>> {
        let data = self.data.read().await;
        Ok(data.picks.iter().filter(|p| p.entry_id == entry_id).cloned().collect())
    }

    async fn update_pick(&self, pick: &Pick) -> PoolResult<()> {
        let mut data = self.data.write().await;
        let slot = data
            .picks
            .iter_mut()
            .find(|p| p.id == pick.id)
            .ok_or_else(|| missing("pick", pick.id))?;
        *slot = pick.clone();
        Ok(())
    }

    async fn entries(&self) -> PoolResult<Vec<Entry>> {
        Ok(self.data.read().await.entries.clone())
    }

    async fn entry(&self, id: EntryId) -> PoolResult<Option<Entry>> {
        Ok(self.data.read().await.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn entries_for_user(&self, user_id: UserId) -> PoolResult<Vec<Entry>> {
        let data = self.data.read().await;
        Ok(data.entries.iter().filter(|e| e.user_id == user_id).cloned().collect())
    }

    async fn update_entry(&self, entry: &Entry) -> PoolResult<()> {
        let mut data = self.data.write().await;
        let slot = data
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| missing("entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    async fn users(&self) -> PoolResult<Vec<User>> {
        Ok(self.data.read().await.users.clone())
    }
}
