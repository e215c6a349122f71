use thiserror::Error;

#[derive(Debug, Error)]
pub enum TvdbError {
  #[error("Authentication failed: {0}")]
  Authentication(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("API error: {status_code} - {message}")]
  Api { status_code: u16, message: String },

  #[error("HTTP request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("Invalid request URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Paginated response exceeded {0} pages")]
  PageLimitExceeded(usize),

  #[error("Operation cancelled")]
  Cancelled,
}

impl TvdbError {
  /// Failures worth retrying later: timeouts, resets, malformed bodies, 5xx.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Transport(_) | Self::Decode(_) => true,
      Self::Api { status_code, .. } => *status_code >= 500,
      _ => false,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled)
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

pub type Result<T> = std::result::Result<T, TvdbError>;
