use crate::espn::ScoreboardResponse;
use crate::normalize::normalize_scoreboard;
use crate::Scoreboard;
use log::{debug, warn};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const ESPN_NFL_SCOREBOARD: &str =
    "https://site.api.espn.com/apis/site/v2/sports/football/nfl/scoreboard";

const BODY_EXCERPT_CHARS: usize = 300;

/// NFL scoreboard client backed by ESPN's public endpoint.
#[derive(Debug, Clone)]
pub struct NflApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl Default for NflApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("survivor-pool/0.1 (scoreboard sync)")
                .build()
                .unwrap_or_default(),
            base_url: ESPN_NFL_SCOREBOARD.to_owned(),
            timeout: Duration::from_secs(10),
            retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Status { status: u16, url: String, body: String },
    Parsing(serde_json::Error, String),
}

impl ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(..) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Parsing(..) => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Status { status, url, body } => {
                write!(f, "Upstream returned {status} for {url}: {body}")
            }
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// A normalized scoreboard along with the URL it came from.
#[derive(Debug, Clone)]
pub struct FetchedScoreboard {
    pub scoreboard: Scoreboard,
    pub source_url: String,
}

impl NflApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Extra attempts after the first failure, and the base delay between them.
    pub fn with_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    pub fn scoreboard_url(&self, season_year: Option<i32>, week_number: Option<u32>) -> String {
        let mut params = Vec::new();
        if let Some(week) = week_number {
            params.push(format!("week={week}"));
        }
        if let Some(year) = season_year {
            params.push(format!("year={year}"));
        }
        if params.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}?{}", self.base_url, params.join("&"))
        }
    }

    /// Fetch and normalize one week of the scoreboard. With no week the
    /// provider answers with the week it considers current.
    pub async fn fetch_scoreboard(
        &self,
        season_year: Option<i32>,
        week_number: Option<u32>,
    ) -> ApiResult<FetchedScoreboard> {
        let url = self.scoreboard_url(season_year, week_number);
        let raw: ScoreboardResponse = self.get_with_retry(&url).await?;
        let scoreboard = normalize_scoreboard(raw);
        debug!(
            "fetched {} games ({} skipped) from {url}",
            scoreboard.games.len(),
            scoreboard.skipped
        );
        Ok(FetchedScoreboard { scoreboard, source_url: url })
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let mut attempt = 0;
        loop {
            match self.get(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!("attempt {attempt} for {url} failed, retrying: {e}");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }
}
