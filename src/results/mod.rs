//! Outcome resolution from game scores.

mod updater;

pub use updater::{update_week, UpdateCounts};

use crate::models::{Game, GameStatus, PickStatus};
use std::collections::HashSet;

/// Per-team outcome for one week. Each team plays at most once a week, so a
/// single pass with set insertion is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekOutcome {
    pub winners: HashSet<String>,
    pub losers: HashSet<String>,
    pub in_progress: HashSet<String>,
}

impl WeekOutcome {
    /// Status a pick of `team` resolves to. Teams without a result are `Tbd`.
    pub fn status_for(&self, team: &str) -> PickStatus {
        if self.winners.contains(team) {
            PickStatus::Win
        } else if self.losers.contains(team) {
            PickStatus::Loss
        } else if self.in_progress.contains(team) {
            PickStatus::InProgress
        } else {
            PickStatus::Tbd
        }
    }
}

/// Ties are a loss for both teams. Rows with missing teams or a final status
/// without both scores are ignored.
pub fn resolve_week(games: &[Game]) -> WeekOutcome {
    let mut outcome = WeekOutcome::default();

    for game in games {
        let home = game.home_team_abbr.trim().to_ascii_uppercase();
        let away = game.away_team_abbr.trim().to_ascii_uppercase();
        if home.is_empty() || away.is_empty() {
            continue;
        }

        match game.status {
            GameStatus::Final => {
                let (Some(home_score), Some(away_score)) = (game.home_score, game.away_score) else {
                    continue;
                };
                if home_score == away_score {
                    outcome.losers.insert(home);
                    outcome.losers.insert(away);
                } else if home_score > away_score {
                    outcome.winners.insert(home);
                    outcome.losers.insert(away);
                } else {
                    outcome.winners.insert(away);
                    outcome.losers.insert(home);
                }
            }
            GameStatus::InProgress => {
                outcome.in_progress.insert(home);
                outcome.in_progress.insert(away);
            }
            GameStatus::Scheduled => {}
        }
    }

    outcome
}
