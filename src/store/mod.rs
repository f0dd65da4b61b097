//! Store facade contract. Lookups return `None` or an empty collection for
//! missing records; errors are reserved for the backend itself failing.

mod memory;

pub use memory::{MemoryStore, StoreData};

use crate::error::PoolResult;
use crate::models::{Entry, EntryId, Game, GameId, NewGame, Pick, User, UserId, Week, WeekId};
use async_trait::async_trait;

#[async_trait]
pub trait Store: Send + Sync {
    // weeks
    async fn weeks(&self) -> PoolResult<Vec<Week>>;
    async fn week(&self, id: WeekId) -> PoolResult<Option<Week>>;
    async fn current_week(&self) -> PoolResult<Option<Week>>;
    async fn week_by_number(&self, season_year: i32, week_number: u32) -> PoolResult<Option<Week>>;
    async fn update_week(&self, week: &Week) -> PoolResult<()>;

    // games
    async fn games_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Game>>;
    async fn create_game(&self, game: NewGame) -> PoolResult<Game>;
    async fn delete_game(&self, id: GameId) -> PoolResult<()>;

    // picks
    async fn picks_for_week(&self, week_id: WeekId) -> PoolResult<Vec<Pick>>;
    async fn picks_for_entry(&self, entry_id: EntryId) -> PoolResult<Vec<Pick>>;
    async fn update_pick(&self, pick: &Pick) -> PoolResult<()>;

    // entries
    async fn entries(&self) -> PoolResult<Vec<Entry>>;
    async fn entry(&self, id: EntryId) -> PoolResult<Option<Entry>>;
    async fn entries_for_user(&self, user_id: UserId) -> PoolResult<Vec<Entry>>;
    async fn update_entry(&self, entry: &Entry) -> PoolResult<()>;

    // users
    async fn users(&self) -> PoolResult<Vec<User>>;
}
