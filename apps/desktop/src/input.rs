use client_core::UserAction;
use shared::domain::UiMode;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::warn;

pub const HELP: &str =
    "keys: [enter]/s simulate lead | t retention check-ins | m toggle mode | old/new set mode | r reset | q quit";

/// Tracks the mode so `m` can toggle without asking the session.
#[derive(Debug, Clone, Copy)]
pub struct KeyMap {
    mode: UiMode,
}

impl KeyMap {
    pub fn new(mode: UiMode) -> Self {
        Self { mode }
    }

    pub fn action_for(&mut self, line: &str) -> Option<UserAction> {
        let key = line.trim();
        let action = match key {
            "" | "s" => UserAction::SimulateLead,
            "t" => UserAction::SimulateRetention,
            "r" => UserAction::Reset,
            "q" => UserAction::Quit,
            "m" => {
                self.mode = match self.mode {
                    UiMode::Legacy => UiMode::Assisted,
                    UiMode::Assisted => UiMode::Legacy,
                };
                UserAction::SetMode(self.mode)
            }
            other => {
                self.mode = UiMode::parse(other)?;
                UserAction::SetMode(self.mode)
            }
        };
        Some(action)
    }
}

pub async fn forward_stdin(actions: mpsc::Sender<UserAction>, mode: UiMode) {
    forward_lines(BufReader::new(tokio::io::stdin()), actions, mode).await;
}

/// End of input is treated as a quit request.
pub async fn forward_lines<R>(reader: R, actions: mpsc::Sender<UserAction>, mode: UiMode)
where
    R: AsyncBufRead + Unpin,
{
    let mut keys = KeyMap::new(mode);
    let mut lines = reader.lines();
    loop {
        let action = match lines.next_line().await {
            Ok(Some(line)) => match keys.action_for(&line) {
                Some(action) => action,
                None => {
                    println!("{HELP}");
                    continue;
                }
            },
            Ok(None) => UserAction::Quit,
            Err(err) => {
                warn!(%err, "stdin read failed");
                UserAction::Quit
            }
        };
        let quit = action == UserAction::Quit;
        if actions.send(action).await.is_err() || quit {
            return;
        }
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
