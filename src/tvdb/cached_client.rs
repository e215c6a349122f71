//! Cached TVDB client that wraps a transport with auth and transparent caching.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheLayer, MemoryStorage, QueryKey};
use crate::config::Config;

use super::api_types::{decode_data, ApiResponse};
use super::auth::{Credentials, TokenManager};
use super::cache::TvdbQueryKey;
use super::client::{ApiRequest, HttpTransport, TvdbTransport};
use super::error::{Result, TvdbError};
use super::types::{
  ArtworkExtended, ArtworkType, EntityUpdate, EpisodeExtended, EpisodeLookup, Language,
  ListExtended, Meta, MovieExtended, PersonExtended, RemoteIdResult, SearchResult, SearchType,
  SeasonExtended, SeasonType, SeriesArtworks, SeriesEpisodes, SeriesExtended, Translation,
  TranslationTarget, UpdateAction, UpdateEntityType,
};

/// Records per page of paginated endpoints, fixed by the API.
pub const UPDATES_PAGE_SIZE: usize = 500;

/// Stop draining a paginated endpoint after this many pages.
pub const MAX_PAGES: usize = 1000;

/// TVDB client with authentication and transparent caching.
///
/// Every lookup checks the cache first; only on a miss does it make sure a
/// fresh token exists and call the API. Errors are never cached.
pub struct CachedTvdbClient<T: TvdbTransport = HttpTransport> {
  transport: Arc<T>,
  auth: Arc<TokenManager>,
  cache: CacheLayer<MemoryStorage>,
  max_pages: usize,
}

impl<T: TvdbTransport> Clone for CachedTvdbClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      auth: Arc::clone(&self.auth),
      cache: self.cache.clone(),
      max_pages: self.max_pages,
    }
  }
}

impl CachedTvdbClient<HttpTransport> {
  /// Create a new cached client talking HTTP to the configured API.
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    let credentials = config.tvdb.credentials()?;
    let transport = HttpTransport::new(&config.tvdb)?;
    let cache = CacheLayer::new(MemoryStorage::new()).with_durations(config.cache.durations());

    Ok(Self::from_parts(
      transport,
      TokenManager::new(credentials),
      cache,
    ))
  }
}

impl<T: TvdbTransport> CachedTvdbClient<T> {
  /// Create a client over any transport, with the given tier durations.
  pub fn with_transport(
    transport: T,
    credentials: Credentials,
    durations: crate::cache::CacheDurations,
  ) -> Self {
    Self::from_parts(
      transport,
      TokenManager::new(credentials),
      CacheLayer::new(MemoryStorage::new()).with_durations(durations),
    )
  }

  pub(crate) fn from_parts(
    transport: T,
    auth: TokenManager,
    cache: CacheLayer<MemoryStorage>,
  ) -> Self {
    Self {
      transport: Arc::new(transport),
      auth: Arc::new(auth),
      cache,
      max_pages: MAX_PAGES,
    }
  }

  /// Lower the page ceiling for paginated endpoints.
  pub fn with_max_pages(mut self, max_pages: usize) -> Self {
    self.max_pages = max_pages.max(1);
    self
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  // ==========================================================================
  // Plumbing
  // ==========================================================================

  /// Make sure a fresh bearer token exists, logging in if needed.
  pub async fn ensure_valid_token(&self, cancel: &CancellationToken) -> Result<String> {
    self
      .auth
      .ensure_valid_token(self.transport.as_ref(), cancel)
      .await
  }

  /// Authenticated GET that aborts as soon as `cancel` fires.
  async fn get(&self, request: &ApiRequest, cancel: &CancellationToken) -> Result<Value> {
    let token = self.ensure_valid_token(cancel).await?;
    let result = cancellable(cancel, self.transport.get(request, &token)).await;

    if let Err(TvdbError::Authentication(_)) = &result {
      self.auth.invalidate(&token).await;
    }
    result
  }

  /// One page of a paginated endpoint, and whether another follows.
  async fn get_page<D: DeserializeOwned>(
    &self,
    request: &ApiRequest,
    page: usize,
    what: &str,
    cancel: &CancellationToken,
  ) -> Result<(D, bool)> {
    let request = request.clone().param("page", page);
    let body = self.get(&request, cancel).await?;
    let response = ApiResponse::<D>::from_value(body)?;
    let has_next = response.has_next_page();
    Ok((response.into_data(what)?, has_next))
  }

  /// Cache-or-fetch for one descriptor.
  async fn fetch<D>(&self, key: TvdbQueryKey, cancel: &CancellationToken) -> Result<D>
  where
    D: DeserializeOwned + Clone + Send + Sync + 'static,
  {
    let description = key.description();
    let result = self
      .cache
      .fetch(&key, || async {
        let body = self.get(&key.request(), cancel).await?;
        decode_data::<D>(body, &description)
      })
      .await?;

    tracing::debug!(query = %description, source = ?result.source, "lookup complete");
    Ok(result.data)
  }

  // ==========================================================================
  // Search
  // ==========================================================================

  /// Free-text search restricted to one record type.
  pub async fn search(
    &self,
    query: &str,
    kind: SearchType,
    language: Option<&str>,
    year: Option<i32>,
    cancel: &CancellationToken,
  ) -> Result<Vec<SearchResult>> {
    let key = TvdbQueryKey::Search {
      query: query.to_string(),
      kind,
      language: language.map(String::from),
      year,
    };
    self.fetch(key, cancel).await
  }

  pub async fn search_series(
    &self,
    name: &str,
    language: Option<&str>,
    cancel: &CancellationToken,
  ) -> Result<Vec<SearchResult>> {
    self
      .search(name, SearchType::Series, language, None, cancel)
      .await
  }

  pub async fn search_movies(
    &self,
    name: &str,
    language: Option<&str>,
    year: Option<i32>,
    cancel: &CancellationToken,
  ) -> Result<Vec<SearchResult>> {
    self
      .search(name, SearchType::Movie, language, year, cancel)
      .await
  }

  pub async fn search_people(
    &self,
    name: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<SearchResult>> {
    self
      .search(name, SearchType::Person, None, None, cancel)
      .await
  }

  /// Find records by an external id such as an IMDb or TMDB id.
  pub async fn search_by_remote_id(
    &self,
    remote_id: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<RemoteIdResult>> {
    let key = TvdbQueryKey::SearchByRemoteId {
      remote_id: remote_id.to_string(),
    };
    self.fetch(key, cancel).await
  }

  // ==========================================================================
  // Series, seasons, episodes
  // ==========================================================================

  pub async fn get_series_extended(
    &self,
    id: i64,
    meta: Option<Meta>,
    short: bool,
    cancel: &CancellationToken,
  ) -> Result<SeriesExtended> {
    self
      .fetch(TvdbQueryKey::SeriesExtended { id, meta, short }, cancel)
      .await
  }

  /// Episodes of a series in the lookup's ordering, filtered by whichever of
  /// season, episode number and air date are set.
  ///
  /// The endpoint pages at 500 episodes; every page is fetched and the
  /// combined list is cached as one entry.
  pub async fn get_series_episodes(
    &self,
    id: i64,
    lookup: &EpisodeLookup,
    cancel: &CancellationToken,
  ) -> Result<SeriesEpisodes> {
    let key = TvdbQueryKey::SeriesEpisodes {
      id,
      season_type: lookup.season_type,
      season: lookup.season,
      episode_number: lookup.episode_number,
      air_date: lookup.air_date,
    };
    let description = key.description();

    let result = self
      .cache
      .fetch(&key, || async {
        let request = key.request();
        let (mut combined, mut has_next) = self
          .get_page::<SeriesEpisodes>(&request, 0, &description, cancel)
          .await?;

        let mut page = 1usize;
        while has_next {
          if page >= self.max_pages {
            tracing::warn!(query = %description, pages = page, "episode list never ended, giving up");
            return Err(TvdbError::PageLimitExceeded(self.max_pages));
          }
          let (next, more) = self
            .get_page::<SeriesEpisodes>(&request, page, &description, cancel)
            .await?;
          combined.episodes.extend(next.episodes);
          has_next = more;
          page += 1;
        }

        tracing::debug!(
          query = %description,
          pages = page,
          episodes = combined.episodes.len(),
          "episode list drained"
        );
        Ok::<_, TvdbError>(combined)
      })
      .await?;

    tracing::debug!(query = %description, source = ?result.source, "lookup complete");
    Ok(result.data)
  }

  /// Resolve an episode's TVDB id from season/episode numbers, falling back
  /// to its air date. Returns `None` without a request when the lookup has
  /// neither a complete season/episode pair nor an air date.
  pub async fn get_episode_tvdb_id(
    &self,
    series_id: i64,
    lookup: &EpisodeLookup,
    cancel: &CancellationToken,
  ) -> Result<Option<i64>> {
    let narrowed = match (lookup.season, lookup.episode_number, lookup.air_date) {
      (Some(season), Some(episode_number), _) => {
        by_number(lookup.season_type, season, episode_number)
      }
      (_, _, Some(air_date)) => by_air_date(lookup.season_type, air_date),
      _ => {
        tracing::debug!(series_id, "episode lookup has no season/episode or air date");
        return Ok(None);
      }
    };

    let episodes = self
      .get_series_episodes(series_id, &narrowed, cancel)
      .await?;
    Ok(episodes.episodes.first().map(|episode| episode.id))
  }

  pub async fn get_series_artworks(
    &self,
    id: i64,
    language: Option<&str>,
    artwork_type: Option<i64>,
    cancel: &CancellationToken,
  ) -> Result<SeriesArtworks> {
    let key = TvdbQueryKey::SeriesArtworks {
      id,
      language: language.map(String::from),
      artwork_type,
    };
    self.fetch(key, cancel).await
  }

  pub async fn get_season_extended(
    &self,
    id: i64,
    cancel: &CancellationToken,
  ) -> Result<SeasonExtended> {
    self
      .fetch(TvdbQueryKey::SeasonExtended { id }, cancel)
      .await
  }

  pub async fn get_episode_extended(
    &self,
    id: i64,
    meta: Option<Meta>,
    cancel: &CancellationToken,
  ) -> Result<EpisodeExtended> {
    self
      .fetch(TvdbQueryKey::EpisodeExtended { id, meta }, cancel)
      .await
  }

  // ==========================================================================
  // Movies, people, artwork, lists
  // ==========================================================================

  pub async fn get_movie_extended(
    &self,
    id: i64,
    meta: Option<Meta>,
    short: bool,
    cancel: &CancellationToken,
  ) -> Result<MovieExtended> {
    self
      .fetch(TvdbQueryKey::MovieExtended { id, meta, short }, cancel)
      .await
  }

  pub async fn get_person_extended(
    &self,
    id: i64,
    meta: Option<Meta>,
    cancel: &CancellationToken,
  ) -> Result<PersonExtended> {
    self
      .fetch(TvdbQueryKey::PersonExtended { id, meta }, cancel)
      .await
  }

  pub async fn get_artwork_extended(
    &self,
    id: i64,
    cancel: &CancellationToken,
  ) -> Result<ArtworkExtended> {
    self
      .fetch(TvdbQueryKey::ArtworkExtended { id }, cancel)
      .await
  }

  /// Lists back collections (box sets).
  pub async fn get_list_extended(
    &self,
    id: i64,
    cancel: &CancellationToken,
  ) -> Result<ListExtended> {
    self.fetch(TvdbQueryKey::ListExtended { id }, cancel).await
  }

  pub async fn get_translation(
    &self,
    target: TranslationTarget,
    id: i64,
    language: &str,
    cancel: &CancellationToken,
  ) -> Result<Translation> {
    let key = TvdbQueryKey::Translation {
      target,
      id,
      language: language.to_string(),
    };
    self.fetch(key, cancel).await
  }

  // ==========================================================================
  // Reference data
  // ==========================================================================

  pub async fn get_languages(&self, cancel: &CancellationToken) -> Result<Vec<Language>> {
    self.fetch(TvdbQueryKey::Languages, cancel).await
  }

  pub async fn get_artwork_types(&self, cancel: &CancellationToken) -> Result<Vec<ArtworkType>> {
    self.fetch(TvdbQueryKey::ArtworkTypes, cancel).await
  }

  // ==========================================================================
  // Update feed
  // ==========================================================================

  /// Every change since `since`, draining all pages of the feed.
  ///
  /// Never cached. Any failure discards the pages gathered so far; callers
  /// must restart rather than act on a truncated list.
  pub async fn get_all_updates(
    &self,
    since: DateTime<Utc>,
    entity_type: Option<UpdateEntityType>,
    action: Option<UpdateAction>,
    cancel: &CancellationToken,
  ) -> Result<Vec<EntityUpdate>> {
    self.ensure_valid_token(cancel).await?;

    let mut updates = Vec::new();
    let mut page = 0usize;

    loop {
      if page >= self.max_pages {
        tracing::warn!(pages = page, "update feed never ended, giving up");
        return Err(TvdbError::PageLimitExceeded(self.max_pages));
      }

      let request = ApiRequest::new("/updates")
        .param("since", since.timestamp())
        .param_opt("type", entity_type)
        .param_opt("action", action)
        .param("page", page);

      let body = self.get(&request, cancel).await?;
      let response = ApiResponse::<Vec<EntityUpdate>>::from_value(body)?;
      let has_next = response.has_next_page();
      let records = response.data.unwrap_or_default();

      tracing::debug!(page, records = records.len(), has_next, "fetched update page");
      updates.extend(records);

      if !has_next {
        break;
      }
      page += 1;
    }

    tracing::info!(
      since = %since,
      pages = page + 1,
      records = updates.len(),
      "update feed drained"
    );
    Ok(updates)
  }

  // ==========================================================================
  // Maintenance
  // ==========================================================================

  /// Drop every cached response. The bearer token is kept.
  pub fn purge_cache(&self) -> bool {
    let purged = self.cache.purge();
    if purged {
      tracing::info!("TVDB cache purged");
    } else {
      tracing::warn!("TVDB cache purge failed");
    }
    purged
  }

  /// Number of cached responses currently held.
  pub fn cached_entries(&self) -> usize {
    self.cache.len()
  }
}

fn by_number(season_type: SeasonType, season: i32, episode_number: i32) -> EpisodeLookup {
  EpisodeLookup {
    season_type,
    season: Some(season),
    episode_number: Some(episode_number),
    air_date: None,
  }
}

fn by_air_date(season_type: SeasonType, air_date: NaiveDate) -> EpisodeLookup {
  EpisodeLookup {
    season_type,
    season: None,
    episode_number: None,
    air_date: Some(air_date),
  }
}

/// Race a network future against the caller's cancellation signal.
async fn cancellable<F, R>(cancel: &CancellationToken, future: F) -> Result<R>
where
  F: Future<Output = Result<R>>,
{
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(TvdbError::Cancelled),
    result = future => result,
  }
}
