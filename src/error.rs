use thiserror::Error;

/// Failure of a video lookup.
///
/// The search controller never lets one of these escape a debounced lookup: it
/// is folded into [`SearchStatus::Failed`](crate::search::SearchStatus) and the
/// rendered message is kept as the state's `error`.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("video search is not configured: missing API key")]
    MissingCredentials,

    #[error("video search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("video search returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("video search returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SearchError {
    /// Whether retrying the same query could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::MissingCredentials | SearchError::UnexpectedResponse(_) => false,
            SearchError::Transport(_) => true,
            SearchError::Upstream { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
