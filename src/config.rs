use nfl_api::client::{NflApi, ESPN_NFL_SCOREBOARD};
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: Option<String>,
    pub bucket_prefix: String,
    pub blob_root: PathBuf,
    pub data_file: PathBuf,
    pub scoreboard_url: String,
    pub fetch_retries: u32,
    pub fetch_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: None,
            bucket_prefix: String::new(),
            blob_root: PathBuf::from("blobs"),
            data_file: PathBuf::from("survivor-data.json"),
            scoreboard_url: ESPN_NFL_SCOREBOARD.to_owned(),
            fetch_retries: 1,
            fetch_backoff: Duration::from_millis(500),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            bucket: get("SURVIVOR_BUCKET"),
            bucket_prefix: get("SURVIVOR_BUCKET_PREFIX").unwrap_or_default(),
            blob_root: get("SURVIVOR_BLOB_ROOT").map(PathBuf::from).unwrap_or(defaults.blob_root),
            data_file: get("SURVIVOR_DATA").map(PathBuf::from).unwrap_or(defaults.data_file),
            scoreboard_url: get("ESPN_BASE_URL").unwrap_or(defaults.scoreboard_url),
            fetch_retries: get("SURVIVOR_FETCH_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_retries),
            fetch_backoff: get("SURVIVOR_FETCH_BACKOFF_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_backoff),
        }
    }

    pub fn scoreboard_client(&self) -> NflApi {
        NflApi::new()
            .with_base_url(self.scoreboard_url.clone())
            .with_retry(self.fetch_retries, self.fetch_backoff)
    }
}
