use nfl_api::client::ApiError;
use std::fmt;

pub type PoolResult<T> = Result<T, PoolError>;

#[derive(Debug)]
pub enum PoolError {
    /// The requested week could not be resolved to a stored week.
    WeekNotFound(String),
    UpstreamFetchFailed(ApiError),
    StoreReadFailed(String),
    StoreWriteFailed(String),
    BlobFailed(String),
    ConfigurationMissing(&'static str),
    Serialization(serde_json::Error),
}

impl PoolError {
    /// Marker for callers that map missing resources to a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PoolError::WeekNotFound(_))
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::WeekNotFound(what) => write!(f, "Week not found: {what}"),
            PoolError::UpstreamFetchFailed(e) => write!(f, "Upstream fetch failed: {e}"),
            PoolError::StoreReadFailed(msg) => write!(f, "Store read failed: {msg}"),
            PoolError::StoreWriteFailed(msg) => write!(f, "Store write failed: {msg}"),
            PoolError::BlobFailed(msg) => write!(f, "Blob store failed: {msg}"),
            PoolError::ConfigurationMissing(key) => write!(f, "Missing configuration: {key}"),
            PoolError::Serialization(e) => write!(f, "Serialization failed: {e}"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::UpstreamFetchFailed(e) => Some(e),
            PoolError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for PoolError {
    fn from(e: ApiError) -> Self {
        PoolError::UpstreamFetchFailed(e)
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(e: serde_json::Error) -> Self {
        PoolError::Serialization(e)
    }
}
