//! Typed records returned by TVDB endpoints, and the request enums used to
//! parameterise them.
//!
//! Only the fields consumers actually read are modelled; unknown fields are
//! ignored on deserialisation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read an explicit `null` the same as a missing field. TVDB sends `null`
/// for empty collections on many records.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Request parameters
// ============================================================================

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// variants map one-to-one onto API query values.
macro_rules! api_enum {
  ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $value),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = String;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        $name::ALL
          .iter()
          .copied()
          .find(|v| v.as_str() == lower)
          .ok_or_else(|| {
            let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
            format!("invalid value '{}', expected one of: {}", s, valid.join(", "))
          })
      }
    }
  };
}

/// Extra data embedded in an extended record (`meta=` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Meta {
  Translations,
  /// Only honoured by the series endpoint
  Episodes,
}

api_enum!(Meta {
  Translations => "translations",
  Episodes => "episodes",
});

/// Episode ordering used by the series episodes endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeasonType {
  #[default]
  Default,
  Official,
  Dvd,
  Absolute,
  Alternate,
  Regional,
}

api_enum!(SeasonType {
  Default => "default",
  Official => "official",
  Dvd => "dvd",
  Absolute => "absolute",
  Alternate => "alternate",
  Regional => "regional",
});

/// Record type filter for `/search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
  Series,
  Movie,
  Person,
  Company,
}

api_enum!(SearchType {
  Series => "series",
  Movie => "movie",
  Person => "person",
  Company => "company",
});

/// Entity kinds reported by the `/updates` feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateEntityType {
  Series,
  Episodes,
  Movies,
  People,
  Seasons,
  Artwork,
  TranslatedSeries,
  TranslatedMovies,
  TranslatedEpisodes,
  TranslatedPeople,
  Lists,
}

api_enum!(UpdateEntityType {
  Series => "series",
  Episodes => "episodes",
  Movies => "movies",
  People => "people",
  Seasons => "seasons",
  Artwork => "artwork",
  TranslatedSeries => "translatedseries",
  TranslatedMovies => "translatedmovies",
  TranslatedEpisodes => "translatedepisodes",
  TranslatedPeople => "translatedpeople",
  Lists => "lists",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateAction {
  Create,
  Update,
  Delete,
}

api_enum!(UpdateAction {
  Create => "create",
  Update => "update",
  Delete => "delete",
});

/// Entities that have per-language translation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationTarget {
  Series,
  Season,
  Episode,
  Movie,
  Person,
}

api_enum!(TranslationTarget {
  Series => "series",
  Season => "seasons",
  Episode => "episodes",
  Movie => "movies",
  Person => "people",
});

/// Identifies a single episode within a series for id lookups.
///
/// Season + episode number take precedence; the air date is only used when
/// either number is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EpisodeLookup {
  pub season_type: SeasonType,
  pub season: Option<i32>,
  pub episode_number: Option<i32>,
  pub air_date: Option<NaiveDate>,
}

// ============================================================================
// Shared nested records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteId {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: Option<i64>,
  pub source_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
  pub language: Option<String>,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
  pub id: Option<i64>,
  pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
  pub id: i64,
  pub name: String,
  pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
  pub name: Option<String>,
  pub overview: Option<String>,
  pub language: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<String>,
  pub is_primary: Option<bool>,
  pub tagline: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationExtended {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name_translations: Vec<Translation>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub overview_translations: Vec<Translation>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub alias: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTypeRecord {
  pub id: i64,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub alternate_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
  pub id: i64,
  pub name: Option<String>,
  pub people_id: Option<i64>,
  pub series_id: Option<i64>,
  pub movie_id: Option<i64>,
  pub episode_id: Option<i64>,
  #[serde(rename = "type")]
  pub kind: Option<i64>,
  pub image: Option<String>,
  pub sort: Option<i64>,
  pub people_type: Option<String>,
  pub person_name: Option<String>,
  pub person_img_url: Option<String>,
  pub is_featured: Option<bool>,
}

// ============================================================================
// Search
// ============================================================================

/// One hit from `/search`. This endpoint uses snake_case field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
  pub tvdb_id: Option<String>,
  pub name: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub year: Option<String>,
  pub slug: Option<String>,
  pub image_url: Option<String>,
  pub overview: Option<String>,
  pub primary_language: Option<String>,
  pub first_air_time: Option<String>,
  pub network: Option<String>,
  pub country: Option<String>,
  pub status: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
}

/// One hit from `/search/remoteid/{id}`; exactly one field is normally set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteIdResult {
  pub series: Option<SeriesBase>,
  pub movie: Option<MovieBase>,
  pub episode: Option<EpisodeBase>,
  pub people: Option<PersonBase>,
}

// ============================================================================
// Series, seasons and episodes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBase {
  pub id: i64,
  pub name: Option<String>,
  pub slug: Option<String>,
  pub image: Option<String>,
  pub overview: Option<String>,
  pub year: Option<String>,
  pub first_aired: Option<String>,
  pub last_aired: Option<String>,
  pub next_aired: Option<String>,
  pub original_country: Option<String>,
  pub original_language: Option<String>,
  pub default_season_type: Option<i64>,
  pub average_runtime: Option<i64>,
  pub last_updated: Option<String>,
  pub status: Option<Status>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<Alias>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name_translations: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub overview_translations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesExtended {
  #[serde(flatten)]
  pub base: SeriesBase,
  #[serde(default, deserialize_with = "null_as_default")]
  pub artworks: Vec<ArtworkBase>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub characters: Vec<Character>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub genres: Vec<Genre>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub seasons: Vec<SeasonBase>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub season_types: Vec<SeasonTypeRecord>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
  /// Present with `meta=episodes`
  #[serde(default, deserialize_with = "null_as_default")]
  pub episodes: Vec<EpisodeBase>,
  /// Present with `meta=translations`
  pub translations: Option<TranslationExtended>,
}

/// Payload of `/series/{id}/episodes/{season-type}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesEpisodes {
  pub series: Option<SeriesBase>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub episodes: Vec<EpisodeBase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonBase {
  pub id: i64,
  pub series_id: Option<i64>,
  #[serde(rename = "type")]
  pub kind: Option<SeasonTypeRecord>,
  pub number: Option<i64>,
  pub name: Option<String>,
  pub image: Option<String>,
  pub image_type: Option<i64>,
  pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonExtended {
  #[serde(flatten)]
  pub base: SeasonBase,
  pub year: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub episodes: Vec<EpisodeBase>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub artwork: Vec<ArtworkBase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeBase {
  pub id: i64,
  pub series_id: Option<i64>,
  pub name: Option<String>,
  pub overview: Option<String>,
  pub aired: Option<String>,
  pub runtime: Option<i64>,
  pub image: Option<String>,
  pub number: Option<i64>,
  pub season_number: Option<i64>,
  pub absolute_number: Option<i64>,
  pub airs_after_season: Option<i64>,
  pub airs_before_season: Option<i64>,
  pub airs_before_episode: Option<i64>,
  pub finale_type: Option<String>,
  pub year: Option<String>,
  pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeExtended {
  #[serde(flatten)]
  pub base: EpisodeBase,
  #[serde(default, deserialize_with = "null_as_default")]
  pub characters: Vec<Character>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
  pub production_code: Option<String>,
  pub translations: Option<TranslationExtended>,
}

// ============================================================================
// Movies, people, lists
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieBase {
  pub id: i64,
  pub name: Option<String>,
  pub slug: Option<String>,
  pub image: Option<String>,
  pub year: Option<String>,
  pub runtime: Option<i64>,
  pub score: Option<f64>,
  pub last_updated: Option<String>,
  pub status: Option<Status>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDate {
  pub country: Option<String>,
  pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieExtended {
  #[serde(flatten)]
  pub base: MovieBase,
  pub original_country: Option<String>,
  pub original_language: Option<String>,
  pub first_release: Option<ReleaseDate>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub artworks: Vec<ArtworkBase>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub characters: Vec<Character>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub genres: Vec<Genre>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
  pub translations: Option<TranslationExtended>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonBase {
  pub id: i64,
  pub name: Option<String>,
  pub image: Option<String>,
  pub score: Option<f64>,
  pub last_updated: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Biography {
  pub biography: Option<String>,
  pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonExtended {
  #[serde(flatten)]
  pub base: PersonBase,
  pub birth: Option<String>,
  pub death: Option<String>,
  pub birth_place: Option<String>,
  pub gender: Option<i64>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub biographies: Vec<Biography>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub characters: Vec<Character>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
  pub translations: Option<TranslationExtended>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntity {
  pub order: Option<i64>,
  pub series_id: Option<i64>,
  pub movie_id: Option<i64>,
}

/// A list; official lists back collections (box sets).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExtended {
  pub id: i64,
  pub name: Option<String>,
  pub overview: Option<String>,
  pub url: Option<String>,
  pub image: Option<String>,
  pub is_official: Option<bool>,
  pub score: Option<f64>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub entities: Vec<ListEntity>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub aliases: Vec<Alias>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub remote_ids: Vec<RemoteId>,
}

// ============================================================================
// Artwork and reference data
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkBase {
  pub id: i64,
  pub image: Option<String>,
  pub thumbnail: Option<String>,
  pub language: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<i64>,
  pub score: Option<f64>,
  pub width: Option<i64>,
  pub height: Option<i64>,
  pub includes_text: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkExtended {
  #[serde(flatten)]
  pub base: ArtworkBase,
  pub series_id: Option<i64>,
  pub season_id: Option<i64>,
  pub episode_id: Option<i64>,
  pub movie_id: Option<i64>,
  pub people_id: Option<i64>,
  pub network_id: Option<i64>,
  pub updated_at: Option<i64>,
}

/// Payload of `/series/{id}/artworks`: the series plus its filtered artwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesArtworks {
  #[serde(flatten)]
  pub series: SeriesBase,
  #[serde(default, deserialize_with = "null_as_default")]
  pub artworks: Vec<ArtworkBase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkType {
  pub id: i64,
  pub name: Option<String>,
  pub record_type: Option<String>,
  pub slug: Option<String>,
  pub image_format: Option<String>,
  pub width: Option<i64>,
  pub height: Option<i64>,
  pub thumb_width: Option<i64>,
  pub thumb_height: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
  pub id: String,
  pub name: Option<String>,
  pub native_name: Option<String>,
  pub short_code: Option<String>,
}

// ============================================================================
// Update feed
// ============================================================================

/// One record of the `/updates` feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
  pub record_id: i64,
  pub record_type: Option<String>,
  pub entity_type: Option<String>,
  pub method: Option<String>,
  pub method_int: Option<i64>,
  /// Unix seconds
  pub time_stamp: Option<i64>,
  pub series_id: Option<i64>,
  pub merge_to_id: Option<i64>,
  pub merge_to_entity_type: Option<String>,
  pub extra_info: Option<String>,
  pub user_id: Option<i64>,
}

impl EntityUpdate {
  pub fn updated_at(&self) -> Option<DateTime<Utc>> {
    self
      .time_stamp
      .and_then(|secs| DateTime::from_timestamp(secs, 0))
  }
}
