use thiserror::Error;

/// Failures talking to the upstream platform or the metadata service.
///
/// Messages coming back from yt-dlp are classified so callers can tell an
/// account-wide block apart from a per-item failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Authentication / anti-bot challenge. Applies to the whole account, not one item.
    #[error("blocked by upstream authentication check: {0}")]
    AuthBlocked(String),
    /// Requested media format unavailable because of a bot check.
    #[error("upstream challenge/format failure: {0}")]
    ChallengeFormat(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
    #[error("yt-dlp is required. Install it with `pip install -U yt-dlp` or set global.yt_dlp_path")]
    ToolMissing,
}

impl SourceError {
    /// Classify a raw upstream error message.
    pub fn from_upstream_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_auth_block_message(&message) {
            SourceError::AuthBlocked(message)
        } else if is_challenge_format_message(&message) {
            SourceError::ChallengeFormat(message)
        } else {
            SourceError::Upstream(message)
        }
    }

    pub fn is_auth_block(&self) -> bool {
        matches!(self, SourceError::AuthBlocked(_))
    }

    pub fn is_challenge_format(&self) -> bool {
        matches!(self, SourceError::ChallengeFormat(_))
    }

    /// Either kind of upstream rejection.
    pub fn is_blocked(&self) -> bool {
        self.is_auth_block() || self.is_challenge_format()
    }
}

pub fn is_auth_block_message(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("sign in to confirm you\u{2019}re not a bot") || m.contains("sign in to confirm you're not a bot")
}

pub fn is_challenge_format_message(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("requested format is not available") || m.contains("only images are available")
}
