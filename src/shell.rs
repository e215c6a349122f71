//! Interactive shell sharing one cached client across commands.

use color_eyre::Result;
use std::collections::VecDeque;
use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::commands::{self, Query, ShellCommand};
use crate::event::{EventHandler, ShellEvent};
use crate::tvdb::{CachedTvdbClient, HttpTransport, TvdbTransport};

const PROMPT: &str = "tvdb> ";

pub struct Shell<T: TvdbTransport = HttpTransport, W: Write = std::io::Stdout> {
  client: CachedTvdbClient<T>,
  events: EventHandler,
  out: W,
  /// Lines typed while a command was running
  pending: VecDeque<String>,
  stdin_closed: bool,
}

impl<T: TvdbTransport> Shell<T, std::io::Stdout> {
  pub fn new(client: CachedTvdbClient<T>) -> Self {
    Self::with_output(client, EventHandler::new(), std::io::stdout())
  }
}

impl<T: TvdbTransport, W: Write> Shell<T, W> {
  pub fn with_output(client: CachedTvdbClient<T>, events: EventHandler, out: W) -> Self {
    Self {
      client,
      events,
      out,
      pending: VecDeque::new(),
      stdin_closed: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    writeln!(
      self.out,
      "tvdbc {}: type `help` for commands, Ctrl-C cancels a running lookup",
      env!("CARGO_PKG_VERSION")
    )?;

    while let Some(line) = self.next_line().await? {
      match commands::parse_line(&line) {
        Ok(ShellCommand::Quit) => break,
        Ok(ShellCommand::Empty) => {}
        Ok(ShellCommand::Purge) => {
          let message = if self.client.purge_cache() {
            "cache purged"
          } else {
            "cache purge failed"
          };
          writeln!(self.out, "{}", message)?;
        }
        Ok(ShellCommand::Help(prefix)) => self.print_help(prefix.as_deref())?,
        Ok(ShellCommand::Query(query)) => self.run_query(query).await?,
        Err(message) => writeln!(self.out, "{}", message.trim_end())?,
      }
    }

    tracing::debug!("shell finished");
    Ok(())
  }

  /// Next line to execute, or `None` once stdin is closed.
  async fn next_line(&mut self) -> Result<Option<String>> {
    if let Some(line) = self.pending.pop_front() {
      return Ok(Some(line));
    }
    if self.stdin_closed {
      return Ok(None);
    }

    self.prompt()?;
    loop {
      match self.events.next().await {
        Some(ShellEvent::Line(line)) => return Ok(Some(line)),
        Some(ShellEvent::Interrupt) => {
          writeln!(self.out)?;
          writeln!(self.out, "nothing to cancel, type `quit` to exit")?;
          self.prompt()?;
        }
        Some(ShellEvent::Eof) | None => {
          self.stdin_closed = true;
          return Ok(None);
        }
      }
    }
  }

  /// Run one lookup, cancelling it on Ctrl-C or when stdin closes.
  async fn run_query(&mut self, query: Query) -> Result<()> {
    let cancel = CancellationToken::new();
    let task = query.execute(&self.client, &cancel);
    tokio::pin!(task);

    let outcome = loop {
      tokio::select! {
        result = &mut task => break result,
        event = self.events.next(), if !self.stdin_closed => match event {
          Some(ShellEvent::Interrupt) => cancel.cancel(),
          Some(ShellEvent::Line(line)) => self.pending.push_back(line),
          Some(ShellEvent::Eof) | None => {
            self.stdin_closed = true;
            cancel.cancel();
          }
        },
      }
    };

    match outcome {
      Ok(value) => writeln!(self.out, "{}", serde_json::to_string_pretty(&value)?)?,
      Err(e) if e.is_cancelled() => writeln!(self.out, "cancelled")?,
      Err(e) => {
        tracing::warn!(error = %e, "shell command failed");
        writeln!(self.out, "error: {}", e)?;
      }
    }
    Ok(())
  }

  fn print_help(&mut self, prefix: Option<&str>) -> Result<()> {
    let suggestions = commands::get_suggestions(prefix.unwrap_or_default());
    if suggestions.is_empty() {
      writeln!(self.out, "no command matches `{}`", prefix.unwrap_or_default())?;
      return Ok(());
    }

    for cmd in suggestions {
      let aliases = if cmd.aliases.is_empty() {
        String::new()
      } else {
        format!(" ({})", cmd.aliases.join(", "))
      };
      writeln!(self.out, "  {:<18}{}{}", cmd.name, cmd.description, aliases)?;
    }
    writeln!(self.out, "Append --help to a command for its arguments.")?;
    Ok(())
  }

  fn prompt(&mut self) -> Result<()> {
    write!(self.out, "{}", PROMPT)?;
    self.out.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheDurations;
  use crate::tvdb::testing::StubTransport;
  use crate::tvdb::Credentials;
  use serde_json::json;
  use std::time::Duration;

  fn shell_with(
    transport: StubTransport,
    lines: &[&str],
    extra: &[ShellEvent],
  ) -> Shell<StubTransport, Vec<u8>> {
    let client = CachedTvdbClient::with_transport(
      transport,
      Credentials {
        api_key: "key".into(),
        pin: None,
      },
      CacheDurations::default(),
    );
    let (tx, events) = EventHandler::channel();
    for line in lines {
      tx.send(ShellEvent::Line(line.to_string())).unwrap();
    }
    for event in extra {
      tx.send(event.clone()).unwrap();
    }
    Shell::with_output(client, events, Vec::new())
  }

  fn output(shell: &Shell<StubTransport, Vec<u8>>) -> String {
    String::from_utf8_lossy(&shell.out).into_owned()
  }

  fn languages() -> StubTransport {
    StubTransport::new()
      .with_responder(|_| Ok(json!({ "data": [{ "id": "eng", "name": "English" }] })))
  }

  #[tokio::test]
  async fn test_lookup_purge_and_quit() {
    let mut shell = shell_with(
      languages(),
      &["languages", "langs", "purge", "languages", "quit", "languages"],
      &[],
    );
    shell.run().await.unwrap();

    let out = output(&shell);
    assert!(out.contains("\"English\""));
    assert!(out.contains("cache purged"));
    // Lines after quit are never run
    assert_eq!(shell.client.transport().get_calls(), 2);
    assert_eq!(shell.client.transport().login_calls(), 1);
  }

  #[tokio::test]
  async fn test_stdin_close_ends_shell() {
    let mut shell = shell_with(languages(), &["languages"], &[ShellEvent::Eof]);
    shell.run().await.unwrap();
    assert!(output(&shell).contains("English"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_interrupt_cancels_running_lookup() {
    let transport = languages().with_get_delay(Duration::from_secs(60));
    let mut shell = shell_with(
      transport,
      &["languages"],
      &[ShellEvent::Interrupt, ShellEvent::Line("quit".into())],
    );
    shell.run().await.unwrap();

    let out = output(&shell);
    assert!(out.contains("cancelled"));
    assert!(!out.contains("English"));
    assert_eq!(shell.client.cached_entries(), 0);
  }

  #[tokio::test]
  async fn test_errors_are_reported_and_shell_continues() {
    let transport = StubTransport::new().with_responder(|request| {
      Err(crate::tvdb::TvdbError::NotFound(request.path.clone()))
    });
    let mut shell = shell_with(transport, &["seriez 1", "series 99", "help ep", "q"], &[]);
    shell.run().await.unwrap();

    let out = output(&shell);
    assert!(out.contains("unknown command `seriez`"));
    assert!(out.contains("error: Not found: /series/99/extended"));
    assert!(out.contains("episode-id"));
  }
}
