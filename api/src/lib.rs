pub mod client;
pub mod espn;
pub mod normalize;

pub use normalize::{canonical_team_code, NFL_TEAMS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Internal game records, independent of the ESPN wire format
// ---------------------------------------------------------------------------

/// One normalized week of the scoreboard feed.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    /// Season hint reported by the provider, if any.
    pub season_year: Option<i32>,
    /// Week hint reported by the provider, if any.
    pub week_number: Option<u32>,
    /// Games ordered by start time.
    pub games: Vec<GameRecord>,
    /// Events dropped because their teams or start time could not be resolved.
    pub skipped: usize,
}

/// A game as the feed describes it, before the store assigns ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub home_team_abbr: String,
    pub away_team_abbr: String,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl GameRecord {
    pub fn teams(&self) -> [&str; 2] {
        [self.home_team_abbr.as_str(), self.away_team_abbr.as_str()]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::InProgress => "in_progress",
            GameStatus::Final => "final",
        }
    }
}
