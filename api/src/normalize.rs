//! Mapping: ESPN wire types → clean domain types.
//!
//! This is the only place team codes are canonicalized; everything downstream
//! compares codes produced here.

use crate::espn::{EspnCompetitor, EspnEvent, ScoreboardResponse};
use crate::{GameRecord, GameStatus, Scoreboard};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;

/// Canonical codes of the 32 franchises.
pub const NFL_TEAMS: [&str; 32] = [
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC", "LAC", "LAR", "LV", "MIA", "MIN", "NE", "NO", "NYG", "NYJ", "PHI", "PIT",
    "SEA", "SF", "TB", "TEN", "WAS",
];

/// Provider or legacy code → canonical code.
const TEAM_ALIASES: [(&str, &str); 6] = [
    ("WSH", "WAS"),
    ("JAC", "JAX"),
    ("LA", "LAR"),
    ("STL", "LAR"),
    ("SD", "LAC"),
    ("OAK", "LV"),
];

/// Canonicalize a raw team code. Returns `None` unless the result is 2–3 ASCII letters.
pub fn canonical_team_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let code = TEAM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| (*canonical).to_owned())
        .unwrap_or(code);

    let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
    valid.then_some(code)
}

/// Map the provider status to our taxonomy. Unknown values stay `Scheduled`
/// so bad data can never finalize a game.
pub fn parse_status(name: Option<&str>, state: Option<&str>) -> GameStatus {
    if let Some(name) = name {
        let name = name.to_ascii_uppercase();
        if ["POSTPONED", "CANCELED", "CANCELLED", "SUSPENDED", "DELAYED"]
            .iter()
            .any(|s| name.contains(s))
        {
            return GameStatus::Scheduled;
        }
    }

    match state.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("pre" | "pregame" | "scheduled") => GameStatus::Scheduled,
        Some("in" | "inprogress") => GameStatus::InProgress,
        Some("post" | "final") => GameStatus::Final,
        _ => GameStatus::Scheduled,
    }
}

/// Parse RFC 3339 or ESPN's minute-precision `2024-09-06T00:20Z`.
pub fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Normalize a raw scoreboard into games ordered by start time.
pub fn normalize_scoreboard(raw: ScoreboardResponse) -> Scoreboard {
    let events = raw.events.unwrap_or_default();
    let total = events.len();

    let mut games: Vec<GameRecord> = events
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<EspnEvent>(value) {
            Ok(event) => map_event(&event),
            Err(e) => {
                debug!("skipping malformed event: {e}");
                None
            }
        })
        .collect();
    games.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.home_team_abbr.cmp(&b.home_team_abbr))
    });

    Scoreboard {
        season_year: raw.season.and_then(|s| s.year),
        week_number: raw.week.and_then(|w| w.number),
        skipped: total - games.len(),
        games,
    }
}

fn map_event(event: &EspnEvent) -> Option<GameRecord> {
    let competitors: Vec<&EspnCompetitor> = event
        .competitions
        .as_deref()
        .unwrap_or_default()
        .first()
        .map(|c| c.competitors.iter().flatten().collect())
        .unwrap_or_default();
    if competitors.len() < 2 {
        debug!("skipping event {:?}: fewer than two competitors", event.id);
        return None;
    }

    // Use "home"/"away" markers; fall back to index order
    let home = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("home"))
        .or_else(|| competitors.first())
        .copied()?;
    let away = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("away"))
        .or_else(|| competitors.get(1))
        .copied()?;

    let home_team_abbr = competitor_code(home)?;
    let away_team_abbr = competitor_code(away)?;
    if home_team_abbr == away_team_abbr {
        debug!("skipping event {:?}: same team on both sides", event.id);
        return None;
    }

    let Some(start_time) = event.date.as_deref().and_then(parse_start_time) else {
        debug!("skipping event {:?}: unparsable start time {:?}", event.id, event.date);
        return None;
    };

    let status_type = event.status.as_ref().and_then(|s| s.status_type.as_ref());
    let status = parse_status(
        status_type.and_then(|t| t.name.as_deref()),
        status_type.and_then(|t| t.state.as_deref()),
    );

    Some(GameRecord {
        home_team_abbr,
        away_team_abbr,
        start_time,
        status,
        home_score: home.score.as_ref().and_then(|s| s.value()),
        away_score: away.score.as_ref().and_then(|s| s.value()),
    })
}

fn competitor_code(c: &EspnCompetitor) -> Option<String> {
    c.team
        .as_ref()
        .and_then(|t| t.abbreviation.as_deref())
        .and_then(canonical_team_code)
}
