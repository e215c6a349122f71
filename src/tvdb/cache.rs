//! Cache keys and request descriptors for TVDB endpoints.

use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use crate::cache::{CacheTier, QueryKey};

use super::client::ApiRequest;
use super::types::{Meta, SearchType, SeasonType, TranslationTarget};

// ============================================================================
// Query key types
// ============================================================================

/// One variant per cached endpoint, carrying every parameter that changes
/// the response. The same descriptor produces both the cache key and the
/// outgoing request, so the two cannot drift apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TvdbQueryKey {
  /// Free-text search, filtered by record type
  Search {
    query: String,
    kind: SearchType,
    language: Option<String>,
    year: Option<i32>,
  },
  /// Lookup by an external id (IMDb, TMDB, ...)
  SearchByRemoteId { remote_id: String },
  SeriesExtended {
    id: i64,
    meta: Option<Meta>,
    short: bool,
  },
  /// Episodes of a series in a given ordering, optionally narrowed down
  SeriesEpisodes {
    id: i64,
    season_type: SeasonType,
    season: Option<i32>,
    episode_number: Option<i32>,
    air_date: Option<NaiveDate>,
  },
  SeriesArtworks {
    id: i64,
    language: Option<String>,
    artwork_type: Option<i64>,
  },
  Translation {
    target: TranslationTarget,
    id: i64,
    language: String,
  },
  SeasonExtended { id: i64 },
  EpisodeExtended { id: i64, meta: Option<Meta> },
  MovieExtended {
    id: i64,
    meta: Option<Meta>,
    short: bool,
  },
  PersonExtended { id: i64, meta: Option<Meta> },
  ArtworkExtended { id: i64 },
  ListExtended { id: i64 },
  Languages,
  ArtworkTypes,
}

impl TvdbQueryKey {
  /// Unambiguous text form of the descriptor. Strings and optionals are
  /// written with `Debug` so quoting keeps separators inside values from
  /// colliding with the field layout.
  pub fn canonical(&self) -> String {
    match self {
      Self::Search {
        query,
        kind,
        language,
        year,
      } => format!(
        "search:{}:{:?}:{:?}:{:?}",
        kind,
        query.trim(),
        language,
        year
      ),
      Self::SearchByRemoteId { remote_id } => format!("search_remote_id:{:?}", remote_id.trim()),
      Self::SeriesExtended { id, meta, short } => {
        format!("series_extended:{}:{}:{}", id, meta_str(meta), short)
      }
      Self::SeriesEpisodes {
        id,
        season_type,
        season,
        episode_number,
        air_date,
      } => format!(
        "series_episodes:{}:{}:{:?}:{:?}:{:?}",
        id, season_type, season, episode_number, air_date
      ),
      Self::SeriesArtworks {
        id,
        language,
        artwork_type,
      } => format!("series_artworks:{}:{:?}:{:?}", id, language, artwork_type),
      Self::Translation {
        target,
        id,
        language,
      } => format!("translation:{}:{}:{:?}", target, id, language),
      Self::SeasonExtended { id } => format!("season_extended:{}", id),
      Self::EpisodeExtended { id, meta } => {
        format!("episode_extended:{}:{}", id, meta_str(meta))
      }
      Self::MovieExtended { id, meta, short } => {
        format!("movie_extended:{}:{}:{}", id, meta_str(meta), short)
      }
      Self::PersonExtended { id, meta } => format!("person_extended:{}:{}", id, meta_str(meta)),
      Self::ArtworkExtended { id } => format!("artwork_extended:{}", id),
      Self::ListExtended { id } => format!("list_extended:{}", id),
      Self::Languages => "languages".to_string(),
      Self::ArtworkTypes => "artwork_types".to_string(),
    }
  }

  /// The GET request this descriptor stands for.
  pub fn request(&self) -> ApiRequest {
    match self {
      Self::Search {
        query,
        kind,
        language,
        year,
      } => ApiRequest::new("/search")
        .param("query", query.trim())
        .param("type", kind)
        .param_opt("language", language.as_deref())
        .param_opt("year", *year),
      Self::SearchByRemoteId { remote_id } => {
        ApiRequest::new(format!("/search/remoteid/{}", encode_segment(remote_id.trim())))
      }
      Self::SeriesExtended { id, meta, short } => {
        ApiRequest::new(format!("/series/{}/extended", id))
          .param_opt("meta", *meta)
          .param_opt("short", short.then_some(true))
      }
      Self::SeriesEpisodes {
        id,
        season_type,
        season,
        episode_number,
        air_date,
      } => ApiRequest::new(format!("/series/{}/episodes/{}", id, season_type))
        .param_opt("season", *season)
        .param_opt("episodeNumber", *episode_number)
        .param_opt("airDate", air_date.map(|d| d.format("%Y-%m-%d"))),
      Self::SeriesArtworks {
        id,
        language,
        artwork_type,
      } => ApiRequest::new(format!("/series/{}/artworks", id))
        .param_opt("lang", language.as_deref())
        .param_opt("type", *artwork_type),
      Self::Translation {
        target,
        id,
        language,
      } => ApiRequest::new(format!(
        "/{}/{}/translations/{}",
        target,
        id,
        encode_segment(language)
      )),
      Self::SeasonExtended { id } => ApiRequest::new(format!("/seasons/{}/extended", id)),
      Self::EpisodeExtended { id, meta } => {
        ApiRequest::new(format!("/episodes/{}/extended", id)).param_opt("meta", *meta)
      }
      Self::MovieExtended { id, meta, short } => {
        ApiRequest::new(format!("/movies/{}/extended", id))
          .param_opt("meta", *meta)
          .param_opt("short", short.then_some(true))
      }
      Self::PersonExtended { id, meta } => {
        ApiRequest::new(format!("/people/{}/extended", id)).param_opt("meta", *meta)
      }
      Self::ArtworkExtended { id } => ApiRequest::new(format!("/artwork/{}/extended", id)),
      Self::ListExtended { id } => ApiRequest::new(format!("/lists/{}/extended", id)),
      Self::Languages => ApiRequest::new("/languages"),
      Self::ArtworkTypes => ApiRequest::new("/artwork/types"),
    }
  }
}

impl QueryKey for TvdbQueryKey {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  fn description(&self) -> String {
    match self {
      Self::Search { query, kind, .. } => format!("{} search '{}'", kind, query.trim()),
      Self::SearchByRemoteId { remote_id } => format!("remote id {}", remote_id),
      Self::SeriesExtended { id, meta, .. } => match meta {
        Some(m) => format!("series {} extended ({})", id, m),
        None => format!("series {} extended", id),
      },
      Self::SeriesEpisodes {
        id,
        season_type,
        season,
        episode_number,
        air_date,
      } => match (season, episode_number, air_date) {
        (Some(s), Some(e), _) => format!("series {} {} S{:02}E{:02}", id, season_type, s, e),
        (_, _, Some(date)) => format!("series {} {} aired {}", id, season_type, date),
        _ => format!("series {} {} episodes", id, season_type),
      },
      Self::SeriesArtworks { id, .. } => format!("series {} artworks", id),
      Self::Translation {
        target,
        id,
        language,
      } => format!("{} {} translation {}", target, id, language),
      Self::SeasonExtended { id } => format!("season {}", id),
      Self::EpisodeExtended { id, .. } => format!("episode {}", id),
      Self::MovieExtended { id, .. } => format!("movie {}", id),
      Self::PersonExtended { id, .. } => format!("person {}", id),
      Self::ArtworkExtended { id } => format!("artwork {}", id),
      Self::ListExtended { id } => format!("list {}", id),
      Self::Languages => "languages".to_string(),
      Self::ArtworkTypes => "artwork types".to_string(),
    }
  }

  fn tier(&self) -> CacheTier {
    match self {
      Self::Languages | Self::ArtworkTypes => CacheTier::Long,
      _ => CacheTier::Short,
    }
  }
}

fn meta_str(meta: &Option<Meta>) -> &'static str {
  meta.map(|m| m.as_str()).unwrap_or("none")
}

/// Everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'.')
  .remove(b'_')
  .remove(b'~');

fn encode_segment(segment: &str) -> String {
  utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  fn series(meta: Option<Meta>, short: bool) -> TvdbQueryKey {
    TvdbQueryKey::SeriesExtended {
      id: 121361,
      meta,
      short,
    }
  }

  fn episodes(
    season_type: SeasonType,
    season: Option<i32>,
    episode_number: Option<i32>,
    air_date: Option<NaiveDate>,
  ) -> TvdbQueryKey {
    TvdbQueryKey::SeriesEpisodes {
      id: 121361,
      season_type,
      season,
      episode_number,
      air_date,
    }
  }

  fn all_variants() -> Vec<TvdbQueryKey> {
    let date = NaiveDate::from_ymd_opt(2011, 4, 17);
    let mut keys = vec![
      series(None, false),
      series(None, true),
      series(Some(Meta::Translations), false),
      series(Some(Meta::Translations), true),
      series(Some(Meta::Episodes), false),
      series(Some(Meta::Episodes), true),
      TvdbQueryKey::MovieExtended {
        id: 121361,
        meta: None,
        short: false,
      },
      TvdbQueryKey::MovieExtended {
        id: 121361,
        meta: None,
        short: true,
      },
      TvdbQueryKey::MovieExtended {
        id: 121361,
        meta: Some(Meta::Translations),
        short: false,
      },
      TvdbQueryKey::EpisodeExtended {
        id: 121361,
        meta: None,
      },
      TvdbQueryKey::EpisodeExtended {
        id: 121361,
        meta: Some(Meta::Translations),
      },
      TvdbQueryKey::PersonExtended {
        id: 121361,
        meta: None,
      },
      TvdbQueryKey::PersonExtended {
        id: 121361,
        meta: Some(Meta::Translations),
      },
      TvdbQueryKey::SeasonExtended { id: 121361 },
      TvdbQueryKey::ArtworkExtended { id: 121361 },
      TvdbQueryKey::ListExtended { id: 121361 },
      TvdbQueryKey::SeriesArtworks {
        id: 121361,
        language: None,
        artwork_type: None,
      },
      TvdbQueryKey::SeriesArtworks {
        id: 121361,
        language: Some("eng".into()),
        artwork_type: None,
      },
      TvdbQueryKey::SeriesArtworks {
        id: 121361,
        language: Some("eng".into()),
        artwork_type: Some(2),
      },
      TvdbQueryKey::SearchByRemoteId {
        remote_id: "tt0944947".into(),
      },
      TvdbQueryKey::Languages,
      TvdbQueryKey::ArtworkTypes,
    ];

    for season_type in SeasonType::ALL {
      keys.push(episodes(*season_type, Some(1), Some(1), None));
      keys.push(episodes(*season_type, Some(1), Some(2), None));
      keys.push(episodes(*season_type, Some(2), Some(1), None));
      keys.push(episodes(*season_type, None, None, date));
      keys.push(episodes(*season_type, None, None, None));
    }

    for kind in SearchType::ALL {
      keys.push(TvdbQueryKey::Search {
        query: "Dark".into(),
        kind: *kind,
        language: None,
        year: None,
      });
      keys.push(TvdbQueryKey::Search {
        query: "Dark".into(),
        kind: *kind,
        language: Some("deu".into()),
        year: None,
      });
      keys.push(TvdbQueryKey::Search {
        query: "Dark".into(),
        kind: *kind,
        language: None,
        year: Some(2017),
      });
    }

    for target in TranslationTarget::ALL {
      for language in ["eng", "deu"] {
        keys.push(TvdbQueryKey::Translation {
          target: *target,
          id: 121361,
          language: language.into(),
        });
      }
    }

    keys
  }

  #[test]
  fn test_all_variants_have_distinct_keys() {
    let keys = all_variants();
    let hashes: HashSet<String> = keys.iter().map(|k| k.cache_hash()).collect();
    let canonical: HashSet<String> = keys.iter().map(|k| k.canonical()).collect();
    assert_eq!(hashes.len(), keys.len());
    assert_eq!(canonical.len(), keys.len());
  }

  #[test]
  fn test_meta_and_short_flags_change_key() {
    let plain = series(None, false);
    let translated = series(Some(Meta::Translations), false);
    let short = series(None, true);

    assert_ne!(plain.cache_hash(), translated.cache_hash());
    assert_ne!(plain.cache_hash(), short.cache_hash());
    assert_ne!(translated.cache_hash(), short.cache_hash());
  }

  #[test]
  fn test_season_type_changes_key() {
    let aired = episodes(SeasonType::Official, Some(1), Some(1), None);
    let dvd = episodes(SeasonType::Dvd, Some(1), Some(1), None);
    assert_ne!(aired.cache_hash(), dvd.cache_hash());
  }

  #[test]
  fn test_keys_are_deterministic() {
    for key in all_variants() {
      assert_eq!(key.cache_hash(), key.clone().cache_hash());
      assert_eq!(key.cache_hash().len(), 64);
    }
  }

  #[test]
  fn test_separators_in_values_do_not_collide() {
    let a = TvdbQueryKey::Search {
      query: "x:Some(\"eng\")".into(),
      kind: SearchType::Series,
      language: None,
      year: None,
    };
    let b = TvdbQueryKey::Search {
      query: "x".into(),
      kind: SearchType::Series,
      language: Some("eng".into()),
      year: None,
    };
    assert_ne!(a.canonical(), b.canonical());
  }

  #[test]
  fn test_surrounding_whitespace_is_ignored() {
    let a = TvdbQueryKey::Search {
      query: "  Dark ".into(),
      kind: SearchType::Series,
      language: None,
      year: None,
    };
    let b = TvdbQueryKey::Search {
      query: "Dark".into(),
      kind: SearchType::Series,
      language: None,
      year: None,
    };
    assert_eq!(a.cache_hash(), b.cache_hash());
    assert_eq!(a.request(), b.request());
  }

  #[test]
  fn test_tiers() {
    assert_eq!(TvdbQueryKey::Languages.tier(), CacheTier::Long);
    assert_eq!(TvdbQueryKey::ArtworkTypes.tier(), CacheTier::Long);
    assert_eq!(series(None, false).tier(), CacheTier::Short);
    assert_eq!(
      TvdbQueryKey::SearchByRemoteId {
        remote_id: "tt1".into()
      }
      .tier(),
      CacheTier::Short
    );
  }

  #[test]
  fn test_series_extended_request() {
    let request = series(Some(Meta::Translations), true).request();
    assert_eq!(request.path, "/series/121361/extended");
    assert_eq!(request.query_value("meta"), Some("translations"));
    assert_eq!(request.query_value("short"), Some("true"));

    let request = series(None, false).request();
    assert!(request.query.is_empty());
  }

  #[test]
  fn test_series_episodes_request() {
    let by_number = episodes(SeasonType::Dvd, Some(3), Some(7), None).request();
    assert_eq!(by_number.path, "/series/121361/episodes/dvd");
    assert_eq!(by_number.query_value("season"), Some("3"));
    assert_eq!(by_number.query_value("episodeNumber"), Some("7"));
    assert_eq!(by_number.query_value("airDate"), None);

    let by_date = episodes(
      SeasonType::Default,
      None,
      None,
      NaiveDate::from_ymd_opt(2011, 4, 17),
    )
    .request();
    assert_eq!(by_date.query_value("airDate"), Some("2011-04-17"));
  }

  #[test]
  fn test_search_request() {
    let request = TvdbQueryKey::Search {
      query: "The Office".into(),
      kind: SearchType::Series,
      language: Some("eng".into()),
      year: Some(2005),
    }
    .request();
    assert_eq!(request.path, "/search");
    assert_eq!(request.query_value("query"), Some("The Office"));
    assert_eq!(request.query_value("type"), Some("series"));
    assert_eq!(request.query_value("language"), Some("eng"));
    assert_eq!(request.query_value("year"), Some("2005"));
  }

  #[test]
  fn test_translation_and_reference_paths() {
    let request = TvdbQueryKey::Translation {
      target: TranslationTarget::Person,
      id: 7,
      language: "eng".into(),
    }
    .request();
    assert_eq!(request.path, "/people/7/translations/eng");
    assert_eq!(TvdbQueryKey::ArtworkTypes.request().path, "/artwork/types");
    assert_eq!(
      TvdbQueryKey::SearchByRemoteId {
        remote_id: "tt0944947".into()
      }
      .request()
      .path,
      "/search/remoteid/tt0944947"
    );
  }

  #[test]
  fn test_path_segments_are_percent_encoded() {
    let remote = TvdbQueryKey::SearchByRemoteId {
      remote_id: "EP01 2345/6+7".into(),
    }
    .request();
    assert_eq!(remote.path, "/search/remoteid/EP01%202345%2F6%2B7");

    let translation = TvdbQueryKey::Translation {
      target: TranslationTarget::Series,
      id: 1,
      language: "pt br".into(),
    }
    .request();
    assert_eq!(translation.path, "/series/1/translations/pt%20br");
  }

  #[test]
  fn test_description() {
    let key = episodes(SeasonType::Official, Some(1), Some(2), None);
    assert_eq!(key.description(), "series 121361 official S01E02");
    assert_eq!(
      series(Some(Meta::Translations), false).description(),
      "series 121361 extended (translations)"
    );
  }
}
