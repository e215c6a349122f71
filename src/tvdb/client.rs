//! HTTP transport for the TVDB v4 API.
//!
//! `TvdbTransport` is the seam between the caching client and the network:
//! it knows how to log in and how to issue an authenticated GET, nothing
//! more. Endpoint knowledge lives in the request descriptors.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::api_types::{decode_data, LoginData, LoginRequest};
use super::error::{Result, TvdbError};
use crate::config::TvdbConfig;

/// A GET request against the API: a path below the base URL plus query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
  pub path: String,
  pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      query: Vec::new(),
    }
  }

  /// Append a query parameter.
  pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
    self.query.push((name, value.to_string()));
    self
  }

  /// Append a query parameter only when a value is present.
  pub fn param_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
    match value {
      Some(v) => self.param(name, v),
      None => self,
    }
  }

  /// Query value by name, mostly useful for stubs and logs.
  pub fn query_value(&self, name: &str) -> Option<&str> {
    self
      .query
      .iter()
      .find(|(k, _)| *k == name)
      .map(|(_, v)| v.as_str())
  }
}

/// Network boundary consumed by the caching client.
pub trait TvdbTransport: Send + Sync {
  /// Exchange the API key (and optional subscriber PIN) for a bearer token.
  fn login<'a>(&'a self, api_key: &'a str, pin: Option<&'a str>) -> BoxFuture<'a, Result<String>>;

  /// Issue an authenticated GET and return the raw JSON body.
  fn get<'a>(&'a self, request: &'a ApiRequest, token: &'a str) -> BoxFuture<'a, Result<Value>>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  base_url: Arc<str>,
}

impl HttpTransport {
  /// Create a transport with the configured User-Agent chain and timeout.
  pub fn new(config: &TvdbConfig) -> Result<Self> {
    let client = Client::builder()
      .user_agent(user_agent(config.contact.as_deref()))
      .gzip(true)
      .deflate(true)
      .timeout(Duration::from_secs(config.timeout_secs.max(1)))
      .build()?;
    Ok(Self::with_client(client, &config.base_url))
  }

  /// Create a transport around an existing reqwest client.
  pub fn with_client(client: Client, base_url: &str) -> Self {
    Self {
      client,
      base_url: Arc::from(base_url.trim_end_matches('/')),
    }
  }

  pub(crate) fn url(&self, request: &ApiRequest) -> Result<Url> {
    build_url(&self.base_url, request)
  }

  async fn login_inner(&self, api_key: &str, pin: Option<&str>) -> Result<String> {
    let url = build_url(&self.base_url, &ApiRequest::new("/login"))?;
    let body = LoginRequest {
      apikey: api_key,
      pin: pin.filter(|p| !p.is_empty()),
    };

    let response = self
      .client
      .post(url)
      .json(&body)
      .send()
      .await
      .map_err(|e| TvdbError::Authentication(format!("login request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(TvdbError::Authentication(format!(
        "login rejected: {} - {}",
        status.as_u16(),
        message
      )));
    }

    let body: Value = response
      .json()
      .await
      .map_err(|e| TvdbError::Authentication(format!("invalid login response: {}", e)))?;
    let data: LoginData = decode_data(body, "login token")
      .map_err(|e| TvdbError::Authentication(format!("invalid login response: {}", e)))?;

    if data.token.is_empty() {
      return Err(TvdbError::Authentication("login returned an empty token".into()));
    }
    Ok(data.token)
  }

  async fn get_inner(&self, request: &ApiRequest, token: &str) -> Result<Value> {
    let url = self.url(request)?;
    let response = self.client.get(url).bearer_auth(token).send().await?;
    handle_response(response, &request.path).await
  }
}

impl TvdbTransport for HttpTransport {
  fn login<'a>(&'a self, api_key: &'a str, pin: Option<&'a str>) -> BoxFuture<'a, Result<String>> {
    self.login_inner(api_key, pin).boxed()
  }

  fn get<'a>(&'a self, request: &'a ApiRequest, token: &'a str) -> BoxFuture<'a, Result<Value>> {
    self.get_inner(request, token).boxed()
  }
}

async fn handle_response(response: reqwest::Response, path: &str) -> Result<Value> {
  let status = response.status();
  match status {
    StatusCode::UNAUTHORIZED => Err(TvdbError::Authentication(format!(
      "token rejected for {}",
      path
    ))),
    StatusCode::NOT_FOUND => Err(TvdbError::NotFound(path.to_string())),
    s if !s.is_success() => {
      let message = response.text().await.unwrap_or_default();
      Err(TvdbError::Api {
        status_code: s.as_u16(),
        message,
      })
    }
    _ => {
      let bytes = response.bytes().await?;
      Ok(serde_json::from_slice(&bytes)?)
    }
  }
}

/// Join a request onto the base URL, percent-encoding query values.
pub(crate) fn build_url(base_url: &str, request: &ApiRequest) -> Result<Url> {
  let mut url = Url::parse(&format!("{}{}", base_url, request.path))?;
  if !request.query.is_empty() {
    let mut pairs = url.query_pairs_mut();
    for (name, value) in &request.query {
      pairs.append_pair(name, value);
    }
  }
  Ok(url)
}

/// `tvdbc/<version> (+<repository>; <contact>)`
pub fn user_agent(contact: Option<&str>) -> String {
  let product = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
  match contact.filter(|c| !c.trim().is_empty()) {
    Some(contact) => format!(
      "{} (+{}; {})",
      product,
      env!("CARGO_PKG_REPOSITORY"),
      contact.trim()
    ),
    None => format!("{} (+{})", product, env!("CARGO_PKG_REPOSITORY")),
  }
}
