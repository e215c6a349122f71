//! Serde types matching the TVDB v4 response envelope and login payloads.
//!
//! Entity records live in `types`; these types only describe the wrapper the
//! API puts around every payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, TvdbError};

// ============================================================================
// Response envelope
// ============================================================================

/// Every v4 response wraps its payload as `{ "status", "data", "links" }`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  #[serde(default)]
  pub status: Option<String>,
  pub data: Option<T>,
  #[serde(default)]
  pub links: Option<ApiLinks>,
}

/// Pagination links, present on list endpoints such as `/updates`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiLinks {
  pub prev: Option<String>,
  #[serde(rename = "self")]
  pub current: Option<String>,
  pub next: Option<String>,
  pub total_items: Option<u64>,
  pub page_size: Option<u64>,
}

impl ApiLinks {
  pub fn has_next(&self) -> bool {
    self.next.as_deref().is_some_and(|next| !next.trim().is_empty())
  }
}

impl<T: DeserializeOwned> ApiResponse<T> {
  /// Decode a raw response body.
  pub fn from_value(body: Value) -> Result<Self> {
    Ok(serde_json::from_value(body)?)
  }

  /// Take the payload, treating a null `data` as a missing entity.
  pub fn into_data(self, what: &str) -> Result<T> {
    self
      .data
      .ok_or_else(|| TvdbError::NotFound(what.to_string()))
  }

  pub fn has_next_page(&self) -> bool {
    self.links.as_ref().is_some_and(ApiLinks::has_next)
  }
}

/// Decode a response body and extract its payload in one step.
pub fn decode_data<T: DeserializeOwned>(body: Value, what: &str) -> Result<T> {
  ApiResponse::<T>::from_value(body)?.into_data(what)
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub apikey: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pin: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
  pub token: String,
}
