//! Cooperative session loop: inbound events, user actions and due timers are
//! handled one at a time on a single task, each to completion.

use futures::{Stream, StreamExt};
use shared::{domain::UiMode, protocol::ServerEvent};
use tokio::sync::mpsc;
use tracing::info;

use crate::{projector::RenderInstruction, session::FunnelSession, transport::CommandSink};

/// Where render instructions land. Implementations own all drawing.
pub trait RenderSurface {
    fn apply(&mut self, instruction: &RenderInstruction);

    fn apply_all(&mut self, instructions: &[RenderInstruction]) {
        for instruction in instructions {
            self.apply(instruction);
        }
    }
}

impl RenderSurface for Vec<RenderInstruction> {
    fn apply(&mut self, instruction: &RenderInstruction) {
        self.push(instruction.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    SetMode(UiMode),
    SimulateLead,
    Reset,
    SimulateRetention,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    StreamClosed,
    Quit,
}

pub async fn run_session<S, E, R>(
    session: &mut FunnelSession<S>,
    mut inbound: E,
    mut actions: mpsc::Receiver<UserAction>,
    surface: &mut R,
) -> SessionExit
where
    S: CommandSink,
    E: Stream<Item = ServerEvent> + Unpin,
    R: RenderSurface,
{
    surface.apply_all(&session.initial_view());

    loop {
        let wait = session.time_until_next_timer();
        let timer = async move {
            match wait {
                Some(wait) => tokio::time::sleep(wait).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            event = inbound.next() => match event {
                Some(event) => surface.apply_all(&session.handle_event(event)),
                None => {
                    info!("event stream ended");
                    return SessionExit::StreamClosed;
                }
            },
            action = actions.recv() => match action {
                Some(UserAction::Quit) | None => return SessionExit::Quit,
                Some(action) => surface.apply_all(&handle_action(session, action)),
            },
            _ = timer => surface.apply_all(&session.poll_timers()),
        }
    }
}

fn handle_action<S: CommandSink>(
    session: &mut FunnelSession<S>,
    action: UserAction,
) -> Vec<RenderInstruction> {
    let result = match action {
        UserAction::SetMode(mode) => Ok(session.set_mode(mode)),
        UserAction::SimulateLead => session.simulate_lead(),
        UserAction::SimulateRetention => session.request_retention(),
        UserAction::Reset => {
            session.request_reset();
            Ok(Vec::new())
        }
        UserAction::Quit => Ok(Vec::new()),
    };
    result.unwrap_or_else(|err| {
        info!(%err, ?action, "ignoring user action");
        Vec::new()
    })
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
