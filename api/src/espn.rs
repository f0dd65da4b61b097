//! Serde shapes for the ESPN NFL scoreboard payload.
//! Mapped to `GameRecord` by the normalizer.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    /// Kept as raw values so one malformed event never poisons the whole week.
    pub events: Option<Vec<serde_json::Value>>,
    pub season: Option<EspnSeason>,
    pub week: Option<EspnWeek>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnSeason {
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub season_type: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnWeek {
    pub number: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<EspnStatus>,
    pub competitions: Option<Vec<EspnCompetition>>,
    pub date: Option<String>, // "2024-09-06T00:20Z"
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>,  // "STATUS_SCHEDULED", "STATUS_FINAL", "STATUS_POSTPONED"
    pub state: Option<String>, // "pre" | "in" | "post"
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnCompetition {
    pub competitors: Option<Vec<EspnCompetitor>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EspnCompetitor {
    pub id: Option<String>,
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>, // "home" | "away"
    pub team: Option<EspnTeam>,
    pub score: Option<EspnScore>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnTeam {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub abbreviation: Option<String>,
}

/// ESPN sends scores as strings on the scoreboard but as numbers elsewhere.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum EspnScore {
    Number(u32),
    Text(String),
}

impl EspnScore {
    pub fn value(&self) -> Option<u32> {
        match self {
            EspnScore::Number(n) => Some(*n),
            EspnScore::Text(s) => s.trim().parse().ok(),
        }
    }
}
