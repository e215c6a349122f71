//! Bearer token lifecycle.
//!
//! One token protects the whole process, so renewal is guarded by a single
//! lock. Readers take the fast path without touching that lock; only callers
//! that observe a stale token queue on it, and they re-check staleness once
//! they hold it so a burst of callers produces exactly one login.

use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::client::TvdbTransport;
use super::error::{Result, TvdbError};

/// Tokens are valid for a month; renew well before that.
pub const MAX_TOKEN_AGE: Duration = Duration::from_secs(25 * 24 * 60 * 60);

/// A bearer token and when it was issued. Replaced wholesale on renewal.
#[derive(Debug, Clone)]
pub struct AuthToken {
  value: String,
  issued_at: Instant,
}

impl AuthToken {
  pub fn new(value: String) -> Self {
    Self {
      value,
      issued_at: Instant::now(),
    }
  }

  pub fn value(&self) -> &str {
    &self.value
  }

  pub fn is_valid(&self, max_age: Duration) -> bool {
    !self.value.is_empty() && self.issued_at.elapsed() < max_age
  }
}

/// Credentials used for login.
#[derive(Clone)]
pub struct Credentials {
  pub api_key: String,
  pub pin: Option<String>,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("api_key", &"<redacted>")
      .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
      .finish()
  }
}

pub struct TokenManager {
  credentials: Credentials,
  max_age: Duration,
  current: RwLock<Option<AuthToken>>,
  renewal: Mutex<()>,
}

impl TokenManager {
  pub fn new(credentials: Credentials) -> Self {
    Self {
      credentials,
      max_age: MAX_TOKEN_AGE,
      current: RwLock::new(None),
      renewal: Mutex::new(()),
    }
  }

  #[cfg(test)]
  pub(crate) fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = max_age;
    self
  }

  /// The current token if it is still fresh.
  async fn fresh_token(&self) -> Option<String> {
    self
      .current
      .read()
      .await
      .as_ref()
      .filter(|token| token.is_valid(self.max_age))
      .map(|token| token.value().to_string())
  }

  /// Return a fresh bearer token, logging in if the current one is missing,
  /// empty or too old.
  ///
  /// Check, lock, re-check, renew, unlock. A failed login leaves the old
  /// state in place so the next caller tries again.
  pub async fn ensure_valid_token<T: TvdbTransport + ?Sized>(
    &self,
    transport: &T,
    cancel: &CancellationToken,
  ) -> Result<String> {
    if let Some(token) = self.fresh_token().await {
      return Ok(token);
    }

    let _guard = tokio::select! {
      _ = cancel.cancelled() => return Err(TvdbError::Cancelled),
      guard = self.renewal.lock() => guard,
    };

    // Another caller may have renewed while we waited for the lock.
    if let Some(token) = self.fresh_token().await {
      tracing::debug!("token renewed by a concurrent caller");
      return Ok(token);
    }

    tracing::info!("logging in to TVDB");
    let login = transport.login(&self.credentials.api_key, self.credentials.pin.as_deref());
    let value = tokio::select! {
      _ = cancel.cancelled() => return Err(TvdbError::Cancelled),
      result = login => result.inspect_err(|e| tracing::warn!(error = %e, "TVDB login failed"))?,
    };

    *self.current.write().await = Some(AuthToken::new(value.clone()));
    tracing::info!("TVDB login successful");
    Ok(value)
  }

  /// Forget the token the API just rejected. A token renewed in the meantime
  /// by another caller is kept.
  pub async fn invalidate(&self, rejected: &str) {
    let mut current = self.current.write().await;
    if current.as_ref().is_some_and(|token| token.value() == rejected) {
      tracing::info!("TVDB rejected the bearer token, discarding it");
      *current = None;
    }
  }

  pub async fn has_valid_token(&self) -> bool {
    self.fresh_token().await.is_some()
  }
}
