use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Shell events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
  /// A line typed at the prompt
  Line(String),
  /// Ctrl-C
  Interrupt,
  /// Stdin closed
  Eof,
}

/// Event handler that produces events from stdin and the Ctrl-C signal
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<ShellEvent>,
}

impl EventHandler {
  /// Create a new event handler reading the process's stdin
  pub fn new() -> Self {
    let (tx, handler) = Self::channel();

    // Spawn stdin reader
    let lines_tx = tx.clone();
    tokio::spawn(async move {
      let mut lines = BufReader::new(tokio::io::stdin()).lines();
      loop {
        match lines.next_line().await {
          Ok(Some(line)) => {
            if lines_tx.send(ShellEvent::Line(line)).is_err() {
              return;
            }
          }
          Ok(None) => break,
          Err(e) => {
            tracing::warn!(error = %e, "failed to read stdin");
            break;
          }
        }
      }
      let _ = lines_tx.send(ShellEvent::Eof);
    });

    // Spawn signal listener
    tokio::spawn(async move {
      while tokio::signal::ctrl_c().await.is_ok() {
        if tx.send(ShellEvent::Interrupt).is_err() {
          break;
        }
      }
    });

    handler
  }

  /// A handler fed by the returned sender instead of the terminal
  pub fn channel() -> (mpsc::UnboundedSender<ShellEvent>, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Self { rx })
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<ShellEvent> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_channel_delivers_in_order() {
    let (tx, mut events) = EventHandler::channel();
    tx.send(ShellEvent::Line("languages".into())).unwrap();
    tx.send(ShellEvent::Interrupt).unwrap();
    drop(tx);

    assert_eq!(events.next().await, Some(ShellEvent::Line("languages".into())));
    assert_eq!(events.next().await, Some(ShellEvent::Interrupt));
    assert_eq!(events.next().await, None);
  }
}
