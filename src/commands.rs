/// Available commands, autocomplete logic and the shared query grammar
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::tvdb::types::{
  EpisodeLookup, Meta, SearchType, SeasonType, TranslationTarget, UpdateAction, UpdateEntityType,
};
use crate::tvdb::{CachedTvdbClient, Result, TvdbTransport};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "search",
    aliases: &["s", "find"],
    description: "Search series, movies, people or companies by name",
  },
  Command {
    name: "search-remote-id",
    aliases: &["remote", "imdb"],
    description: "Find records by IMDb, TMDB or other external id",
  },
  Command {
    name: "series",
    aliases: &["show"],
    description: "Extended series record",
  },
  Command {
    name: "episodes",
    aliases: &["eps"],
    description: "Episodes of a series in a given ordering",
  },
  Command {
    name: "episode-id",
    aliases: &["epid"],
    description: "Resolve an episode id by season/episode or air date",
  },
  Command {
    name: "season",
    aliases: &[],
    description: "Extended season record",
  },
  Command {
    name: "episode",
    aliases: &["ep"],
    description: "Extended episode record",
  },
  Command {
    name: "movie",
    aliases: &["m", "film"],
    description: "Extended movie record",
  },
  Command {
    name: "person",
    aliases: &["p", "people"],
    description: "Extended person record",
  },
  Command {
    name: "artwork",
    aliases: &["art"],
    description: "Extended artwork record",
  },
  Command {
    name: "artworks",
    aliases: &["arts"],
    description: "Artwork of a series, filtered by language and type",
  },
  Command {
    name: "translation",
    aliases: &["tr", "translate"],
    description: "Translated name and overview of a record",
  },
  Command {
    name: "list",
    aliases: &["collection", "boxset"],
    description: "Extended list (collection) record",
  },
  Command {
    name: "languages",
    aliases: &["langs"],
    description: "Languages known to TheTVDB",
  },
  Command {
    name: "artwork-types",
    aliases: &["types"],
    description: "Artwork types known to TheTVDB",
  },
  Command {
    name: "updates",
    aliases: &["changes"],
    description: "Every change since a point in time",
  },
  Command {
    name: "purge",
    aliases: &["clear"],
    description: "Drop every cached response",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    description: "List commands matching a prefix",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit the shell",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Look up a command by exact name or alias.
pub fn resolve(word: &str) -> Option<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == word || cmd.aliases.contains(&word.as_str()))
}

// ============================================================================
// Query grammar
// ============================================================================

/// A lookup against the TVDB API. Shared by the one-shot CLI and the shell.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Query {
  /// Search by name
  Search {
    query: String,
    /// series, movie, person or company
    #[arg(short = 't', long = "type", default_value = "series")]
    kind: SearchType,
    /// Three-letter language code, e.g. eng
    #[arg(short, long)]
    language: Option<String>,
    #[arg(short, long)]
    year: Option<i32>,
  },
  /// Search by an external id (IMDb, TMDB, ...)
  SearchRemoteId { remote_id: String },
  /// Extended series record
  Series {
    id: i64,
    /// translations or episodes
    #[arg(long)]
    meta: Option<Meta>,
    /// Omit characters, artwork and trailers
    #[arg(long)]
    short: bool,
  },
  /// Episodes of a series
  Episodes {
    id: i64,
    #[command(flatten)]
    lookup: EpisodeArgs,
  },
  /// Resolve an episode id
  EpisodeId {
    series_id: i64,
    #[command(flatten)]
    lookup: EpisodeArgs,
  },
  /// Extended season record
  Season { id: i64 },
  /// Extended episode record
  Episode {
    id: i64,
    #[arg(long)]
    meta: Option<Meta>,
  },
  /// Extended movie record
  Movie {
    id: i64,
    #[arg(long)]
    meta: Option<Meta>,
    #[arg(long)]
    short: bool,
  },
  /// Extended person record
  Person {
    id: i64,
    #[arg(long)]
    meta: Option<Meta>,
  },
  /// Extended artwork record
  Artwork { id: i64 },
  /// Artwork of a series
  Artworks {
    id: i64,
    #[arg(short, long)]
    language: Option<String>,
    /// Numeric artwork type, see `artwork-types`
    #[arg(short = 't', long = "type")]
    artwork_type: Option<i64>,
  },
  /// Translation of a record
  Translation {
    /// series, seasons, episodes, movies or people
    target: TranslationTarget,
    id: i64,
    language: String,
  },
  /// Extended list (collection) record
  List { id: i64 },
  /// All languages
  Languages,
  /// All artwork types
  ArtworkTypes,
  /// Changes since a point in time
  Updates {
    /// Unix timestamp; defaults to `--hours` ago
    #[arg(long)]
    since: Option<i64>,
    #[arg(long, default_value_t = 24)]
    hours: u32,
    #[arg(short = 't', long = "type")]
    entity_type: Option<UpdateEntityType>,
    #[arg(short, long)]
    action: Option<UpdateAction>,
  },
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct EpisodeArgs {
  /// default, official, dvd, absolute, alternate or regional
  #[arg(long, default_value = "default")]
  pub season_type: SeasonType,
  #[arg(short, long)]
  pub season: Option<i32>,
  #[arg(short, long)]
  pub episode: Option<i32>,
  /// YYYY-MM-DD
  #[arg(long)]
  pub air_date: Option<NaiveDate>,
}

impl EpisodeArgs {
  pub fn lookup(&self) -> EpisodeLookup {
    EpisodeLookup {
      season_type: self.season_type,
      season: self.season,
      episode_number: self.episode,
      air_date: self.air_date,
    }
  }
}

impl Query {
  /// Run the lookup and render the result as JSON.
  pub async fn execute<T: TvdbTransport>(
    &self,
    client: &CachedTvdbClient<T>,
    cancel: &CancellationToken,
  ) -> Result<Value> {
    let value = match self {
      Query::Search {
        query,
        kind,
        language,
        year,
      } => {
        let results = client
          .search(query, *kind, language.as_deref(), *year, cancel)
          .await?;
        serde_json::to_value(results)?
      }
      Query::SearchRemoteId { remote_id } => {
        serde_json::to_value(client.search_by_remote_id(remote_id, cancel).await?)?
      }
      Query::Series { id, meta, short } => {
        serde_json::to_value(client.get_series_extended(*id, *meta, *short, cancel).await?)?
      }
      Query::Episodes { id, lookup } => {
        serde_json::to_value(client.get_series_episodes(*id, &lookup.lookup(), cancel).await?)?
      }
      Query::EpisodeId { series_id, lookup } => {
        let id = client
          .get_episode_tvdb_id(*series_id, &lookup.lookup(), cancel)
          .await?;
        json!({ "series_id": series_id, "episode_id": id })
      }
      Query::Season { id } => serde_json::to_value(client.get_season_extended(*id, cancel).await?)?,
      Query::Episode { id, meta } => {
        serde_json::to_value(client.get_episode_extended(*id, *meta, cancel).await?)?
      }
      Query::Movie { id, meta, short } => {
        serde_json::to_value(client.get_movie_extended(*id, *meta, *short, cancel).await?)?
      }
      Query::Person { id, meta } => {
        serde_json::to_value(client.get_person_extended(*id, *meta, cancel).await?)?
      }
      Query::Artwork { id } => {
        serde_json::to_value(client.get_artwork_extended(*id, cancel).await?)?
      }
      Query::Artworks {
        id,
        language,
        artwork_type,
      } => {
        let artworks = client
          .get_series_artworks(*id, language.as_deref(), *artwork_type, cancel)
          .await?;
        serde_json::to_value(artworks)?
      }
      Query::Translation {
        target,
        id,
        language,
      } => serde_json::to_value(client.get_translation(*target, *id, language, cancel).await?)?,
      Query::List { id } => serde_json::to_value(client.get_list_extended(*id, cancel).await?)?,
      Query::Languages => serde_json::to_value(client.get_languages(cancel).await?)?,
      Query::ArtworkTypes => serde_json::to_value(client.get_artwork_types(cancel).await?)?,
      Query::Updates {
        since,
        hours,
        entity_type,
        action,
      } => {
        let since = updates_since(*since, *hours);
        let updates = client
          .get_all_updates(since, *entity_type, *action, cancel)
          .await?;
        json!({
          "since": since.to_rfc3339(),
          "count": updates.len(),
          "updates": updates,
        })
      }
    };
    Ok(value)
  }
}

/// Explicit timestamp if given, otherwise `hours` before now.
fn updates_since(since: Option<i64>, hours: u32) -> DateTime<Utc> {
  since
    .and_then(|secs| DateTime::from_timestamp(secs, 0))
    .unwrap_or_else(|| Utc::now() - TimeDelta::hours(i64::from(hours)))
}

// ============================================================================
// Shell line parsing
// ============================================================================

/// One line entered at the shell prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
  Query(Query),
  Purge,
  Help(Option<String>),
  Quit,
  Empty,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
struct ShellLine {
  #[command(subcommand)]
  query: Query,
}

/// Parse a shell line. Errors are ready to print.
pub fn parse_line(line: &str) -> std::result::Result<ShellCommand, String> {
  let mut words = split_words(line)?;
  let Some(first) = words.first() else {
    return Ok(ShellCommand::Empty);
  };

  let Some(cmd) = resolve(first) else {
    let hint = get_suggestions(first)
      .first()
      .map(|cmd| format!(" (did you mean `{}`?)", cmd.name))
      .unwrap_or_default();
    return Err(format!("unknown command `{}`{}", first, hint));
  };

  match cmd.name {
    "purge" => Ok(ShellCommand::Purge),
    "quit" => Ok(ShellCommand::Quit),
    "help" => Ok(ShellCommand::Help(words.get(1).cloned())),
    name => {
      words[0] = name.to_string();
      ShellLine::try_parse_from(words)
        .map(|parsed| ShellCommand::Query(parsed.query))
        .map_err(|e| e.render().to_string())
    }
  }
}

/// Split on whitespace, keeping double-quoted runs together.
fn split_words(line: &str) -> std::result::Result<Vec<String>, String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut quoted = false;
  let mut in_word = false;

  for c in line.chars() {
    match c {
      '"' => {
        quoted = !quoted;
        in_word = true;
      }
      c if c.is_whitespace() && !quoted => {
        if in_word {
          words.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      c => {
        current.push(c);
        in_word = true;
      }
    }
  }

  if quoted {
    return Err("unterminated quote".to_string());
  }
  if in_word {
    words.push(current);
  }
  Ok(words)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheDurations;
  use crate::tvdb::testing::StubTransport;
  use crate::tvdb::Credentials;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("episode");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "episode");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("q");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "quit");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("lan");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "languages");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("remote");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "search-remote-id");

    let suggestions = get_suggestions("types");
    assert_eq!(suggestions[0].name, "artwork-types");
  }

  #[test]
  fn test_every_query_command_parses() {
    for cmd in COMMANDS {
      if matches!(cmd.name, "purge" | "help" | "quit") {
        continue;
      }
      // Only the shape matters here; the error must not be "unknown command"
      let result = parse_line(cmd.name);
      if let Err(e) = result {
        assert!(!e.contains("unknown command"), "{}: {}", cmd.name, e);
        assert!(!e.contains("unrecognized subcommand"), "{}: {}", cmd.name, e);
      }
    }
  }

  #[test]
  fn test_parse_series_with_flags() {
    let parsed = parse_line("series 121361 --meta translations --short").unwrap();
    assert_eq!(
      parsed,
      ShellCommand::Query(Query::Series {
        id: 121361,
        meta: Some(Meta::Translations),
        short: true,
      })
    );
  }

  #[test]
  fn test_parse_alias_and_quotes() {
    let parsed = parse_line("s \"The Wire\" -t movie --year 2002").unwrap();
    assert_eq!(
      parsed,
      ShellCommand::Query(Query::Search {
        query: "The Wire".into(),
        kind: SearchType::Movie,
        language: None,
        year: Some(2002),
      })
    );
  }

  #[test]
  fn test_parse_episode_lookup() {
    let parsed = parse_line("epid 121361 --season-type dvd -s 2 -e 4").unwrap();
    let ShellCommand::Query(Query::EpisodeId { series_id, lookup }) = parsed else {
      panic!("expected episode-id, got {:?}", parsed);
    };
    assert_eq!(series_id, 121361);
    assert_eq!(lookup.lookup().season_type, SeasonType::Dvd);
    assert_eq!(lookup.lookup().season, Some(2));
    assert_eq!(lookup.lookup().episode_number, Some(4));

    let parsed = parse_line("episodes 1 --air-date 2011-04-17").unwrap();
    let ShellCommand::Query(Query::Episodes { lookup, .. }) = parsed else {
      panic!("expected episodes");
    };
    assert_eq!(lookup.air_date, NaiveDate::from_ymd_opt(2011, 4, 17));
    assert_eq!(lookup.season_type, SeasonType::Default);
  }

  #[test]
  fn test_parse_builtins() {
    assert_eq!(parse_line("   "), Ok(ShellCommand::Empty));
    assert_eq!(parse_line("PURGE"), Ok(ShellCommand::Purge));
    assert_eq!(parse_line("exit"), Ok(ShellCommand::Quit));
    assert_eq!(parse_line("help"), Ok(ShellCommand::Help(None)));
    assert_eq!(
      parse_line("? ep"),
      Ok(ShellCommand::Help(Some("ep".into())))
    );
  }

  #[test]
  fn test_parse_errors() {
    let err = parse_line("serie 1").unwrap_err();
    assert!(err.contains("unknown command `serie`"));
    assert!(err.contains("series"));

    assert!(parse_line("series not-a-number").is_err());
    assert!(parse_line("translation books 1 eng").is_err());
    assert_eq!(
      parse_line("search \"open").unwrap_err(),
      "unterminated quote"
    );
  }

  #[test]
  fn test_updates_since() {
    assert_eq!(updates_since(Some(1_700_000_000), 24).timestamp(), 1_700_000_000);

    let since = updates_since(None, 2);
    let age = Utc::now() - since;
    assert!(age >= TimeDelta::hours(2));
    assert!(age < TimeDelta::hours(2) + TimeDelta::minutes(1));
  }

  #[tokio::test]
  async fn test_execute_renders_json() {
    let transport = StubTransport::new().with_responder(|request| {
      if request.path == "/series/7/episodes/default" {
        return Ok(json!({ "data": { "episodes": [{ "id": 70 }] } }));
      }
      Ok(json!({ "data": [{ "id": "eng", "name": "English" }] }))
    });
    let client = CachedTvdbClient::with_transport(
      transport,
      Credentials {
        api_key: "key".into(),
        pin: None,
      },
      CacheDurations::default(),
    );
    let cancel = CancellationToken::new();

    let languages = Query::Languages.execute(&client, &cancel).await.unwrap();
    assert_eq!(languages[0]["id"], "eng");

    let episode = Query::EpisodeId {
      series_id: 7,
      lookup: EpisodeArgs {
        season: Some(1),
        episode: Some(1),
        ..Default::default()
      },
    }
    .execute(&client, &cancel)
    .await
    .unwrap();
    assert_eq!(episode, json!({ "series_id": 7, "episode_id": 70 }));
  }
}
