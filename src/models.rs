//! Records exchanged with the store facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use nfl_api::{GameRecord, GameStatus};

pub type WeekId = i64;
pub type GameId = i64;
pub type PickId = i64;
pub type EntryId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub id: WeekId,
    pub season_year: i32,
    pub week_number: u32,
    #[serde(default)]
    pub lock_time: Option<DateTime<Utc>>,
    /// Set on exactly one week by the admin surface.
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub ineligible_teams: BTreeSet<String>,
}

impl Week {
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_time.is_some_and(|lock| now >= lock)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub week_id: WeekId,
    pub home_team_abbr: String,
    pub away_team_abbr: String,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

impl Game {
    /// Winning team of a final game; `None` for ties and unfinished games.
    pub fn winner(&self) -> Option<&str> {
        if self.status != GameStatus::Final {
            return None;
        }
        match (self.home_score?, self.away_score?) {
            (h, a) if h > a => Some(self.home_team_abbr.as_str()),
            (h, a) if a > h => Some(self.away_team_abbr.as_str()),
            _ => None,
        }
    }
}

/// A game about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub week_id: WeekId,
    pub record: GameRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStatus {
    #[default]
    Tbd,
    Win,
    Loss,
    InProgress,
    NoPick,
}

impl PickStatus {
    /// Win and loss are terminal for a week and carry a result timestamp.
    pub fn is_final(&self) -> bool {
        matches!(self, PickStatus::Win | PickStatus::Loss)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub id: PickId,
    pub entry_id: EntryId,
    pub week_id: WeekId,
    #[serde(default)]
    pub team_abbr: Option<String>,
    #[serde(default)]
    pub status: PickStatus,
    #[serde(default)]
    pub result_at: Option<DateTime<Utc>>,
}

impl Pick {
    /// The selected team in canonical form, if one was selected.
    pub fn team(&self) -> Option<String> {
        self.team_abbr.as_deref().and_then(nfl_api::canonical_team_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub is_eliminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() { self.email.clone() } else { full }
    }
}
