//! Stub transport with call counters for unit tests.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::{ApiRequest, TvdbTransport};
use super::error::{Result, TvdbError};

type Responder = Box<dyn Fn(&ApiRequest) -> Result<Value> + Send + Sync>;

pub struct StubTransport {
  login_calls: AtomicUsize,
  failing_logins: AtomicUsize,
  login_delay: Duration,
  get_delay: Duration,
  last_login: Mutex<Option<(String, Option<String>)>>,
  requests: Mutex<Vec<(ApiRequest, String)>>,
  responder: Responder,
}

impl StubTransport {
  /// Every GET succeeds with `{ "data": { "id": 1, "path": <path> } }`.
  pub fn new() -> Self {
    Self {
      login_calls: AtomicUsize::new(0),
      failing_logins: AtomicUsize::new(0),
      login_delay: Duration::ZERO,
      get_delay: Duration::ZERO,
      last_login: Mutex::new(None),
      requests: Mutex::new(Vec::new()),
      responder: Box::new(|request| Ok(json!({ "data": { "id": 1, "path": request.path } }))),
    }
  }

  pub fn with_responder<F>(mut self, responder: F) -> Self
  where
    F: Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static,
  {
    self.responder = Box::new(responder);
    self
  }

  pub fn with_login_delay(mut self, delay: Duration) -> Self {
    self.login_delay = delay;
    self
  }

  pub fn with_get_delay(mut self, delay: Duration) -> Self {
    self.get_delay = delay;
    self
  }

  /// Reject the next `count` logins.
  pub fn fail_logins(self, count: usize) -> Self {
    self.failing_logins.store(count, Ordering::SeqCst);
    self
  }

  pub fn login_calls(&self) -> usize {
    self.login_calls.load(Ordering::SeqCst)
  }

  pub fn last_login(&self) -> Option<(String, Option<String>)> {
    self.last_login.lock().unwrap().clone()
  }

  pub fn get_calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .map(|(request, _)| request.clone())
      .collect()
  }

  /// Bearer tokens presented on each GET, in order.
  pub fn tokens_seen(&self) -> Vec<String> {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .map(|(_, token)| token.clone())
      .collect()
  }
}

impl TvdbTransport for StubTransport {
  fn login<'a>(&'a self, api_key: &'a str, pin: Option<&'a str>) -> BoxFuture<'a, Result<String>> {
    async move {
      let call = self.login_calls.fetch_add(1, Ordering::SeqCst) + 1;
      *self.last_login.lock().unwrap() = Some((api_key.to_string(), pin.map(String::from)));

      if !self.login_delay.is_zero() {
        tokio::time::sleep(self.login_delay).await;
      }

      let failing = self
        .failing_logins
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
      if failing {
        return Err(TvdbError::Authentication("login rejected: 401 - invalid PIN".into()));
      }
      Ok(format!("token-{}", call))
    }
    .boxed()
  }

  fn get<'a>(&'a self, request: &'a ApiRequest, token: &'a str) -> BoxFuture<'a, Result<Value>> {
    async move {
      self
        .requests
        .lock()
        .unwrap()
        .push((request.clone(), token.to_string()));

      if !self.get_delay.is_zero() {
        tokio::time::sleep(self.get_delay).await;
      }
      (self.responder)(request)
    }
    .boxed()
  }
}
