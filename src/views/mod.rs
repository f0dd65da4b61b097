//! Read-optimized payloads derived from store state and persisted as blobs.

mod matrix;
mod reveal;
mod user_entries;

pub use matrix::{MatrixCell, MatrixEntry, MatrixWeek, SeasonMatrix, build_matrix, resolve_season};
pub use reveal::{
    Kpis, LeaderboardRow, RevealGame, RevealSnapshot, build_reveal_snapshot,
    publish_reveal_snapshots,
};
pub use user_entries::{UserEntries, UserEntry, UserPick, build_user_entries};

use crate::models::{User, UserId};
use std::collections::HashMap;

fn display_names(users: &[User]) -> HashMap<UserId, String> {
    users.iter().map(|u| (u.id, u.display_name())).collect()
}

/// Users missing from the store are shown by id.
fn display_name_for(names: &HashMap<UserId, String>, user_id: UserId) -> String {
    names.get(&user_id).cloned().unwrap_or_else(|| user_id.to_string())
}
