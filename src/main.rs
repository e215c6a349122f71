use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use tvdbc::commands::Query;
use tvdbc::config::Config;
use tvdbc::shell::Shell;
use tvdbc::tvdb::CachedTvdbClient;

#[derive(Parser, Debug)]
#[command(name = "tvdbc")]
#[command(about = "A caching, authenticating client for TheTVDB v4 API")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./tvdbc.yaml or $XDG_CONFIG_HOME/tvdbc/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Cli>,
}

#[derive(Subcommand, Debug)]
enum Cli {
  #[command(flatten)]
  Query(Query),
  /// Interactive shell sharing one cache (default)
  Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging(args.verbose)?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  tracing::debug!(?config, "configuration loaded");
  let client = CachedTvdbClient::new(&config)?;

  match args.command.unwrap_or(Cli::Shell) {
    Cli::Query(query) => run_once(&client, query).await,
    Cli::Shell => Shell::new(client).run().await,
  }
}

/// Run a single lookup and print it as JSON. Ctrl-C cancels it.
async fn run_once(client: &CachedTvdbClient, query: Query) -> Result<()> {
  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_interrupt.cancel();
    }
  });

  let value = query.execute(client, &cancel).await?;
  println!("{}", serde_json::to_string_pretty(&value)?);
  Ok(())
}

/// Log to a daily file under the user data directory; stdout stays clean for
/// command output. The returned guard flushes the file writer on drop.
fn init_logging(verbose: bool) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tvdbc=info"));

  let (file_layer, guard) = match dirs::data_dir() {
    Some(data_dir) => {
      let log_dir = data_dir.join("tvdbc").join("logs");
      std::fs::create_dir_all(&log_dir)?;
      let appender = tracing_appender::rolling::daily(&log_dir, "tvdbc.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (
        Some(fmt::layer().with_writer(writer).with_ansi(false)),
        Some(guard),
      )
    }
    None => (None, None),
  };

  let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .init();

  Ok(guard)
}
