use std::sync::Arc;

use chrono::Local;
use shared::{
    domain::{PatientId, UiMode},
    protocol::{ClientCommand, ServerEvent},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    config::Pacing,
    simulation::{generate_lead, script_for, DemoState, RETENTION_SCRIPT},
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) demo: Arc<Mutex<DemoState>>,
    pub(crate) events: broadcast::Sender<ServerEvent>,
    pub(crate) pacing: Pacing,
}

impl AppState {
    pub(crate) fn new(pacing: Pacing, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            demo: Arc::new(Mutex::new(DemoState::default())),
            events,
            pacing,
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        let kind = event.kind();
        if self.events.send(event).is_err() {
            debug!(kind, "no connected dashboards");
        }
    }

    fn broadcast_all(&self, events: Vec<ServerEvent>) {
        for event in events {
            self.broadcast(event);
        }
    }

    pub(crate) async fn handle_command(self: &Arc<Self>, command: ClientCommand) {
        info!(action = command.name(), "command received");
        match command {
            ClientCommand::Reset => {
                let event = self.demo.lock().await.reset();
                self.broadcast(event);
            }
            ClientCommand::SimulateLead { mode } => {
                let (patient_id, event) = {
                    let patient = generate_lead(&mut rand::thread_rng(), mode, now());
                    let patient_id = patient.id().clone();
                    let event = self.demo.lock().await.add_lead(patient);
                    (patient_id, event)
                };
                self.broadcast(event);
                tokio::spawn(run_conversation(Arc::clone(self), patient_id, mode));
            }
            ClientCommand::SimulateRetention { patient_id } => {
                if self.demo.lock().await.contains(&patient_id) {
                    tokio::spawn(run_retention(Arc::clone(self), patient_id));
                } else {
                    debug!(%patient_id, "retention requested for unknown patient");
                }
            }
        }
    }
}

async fn run_conversation(state: Arc<AppState>, patient_id: PatientId, mode: UiMode) {
    for line in script_for(mode) {
        let delay = match mode {
            UiMode::Assisted => state.pacing.scaled(line.delay_secs),
            UiMode::Legacy => state.pacing.legacy_delay(line.delay_secs),
        };
        tokio::time::sleep(delay).await;

        let Some(events) = state.demo.lock().await.play_line(&patient_id, line, now()) else {
            return;
        };
        state.broadcast_all(events);
    }
    if let Some(patient) = state.demo.lock().await.patient(&patient_id) {
        info!(
            %patient_id,
            stage = %patient.record.stage,
            revenue = patient.revenue,
            messages = patient.messages_sent,
            time_to_book_secs = ?patient.booking_time.map(|t| (t - patient.lead_time).num_seconds()),
            "conversation finished"
        );
    }
}

async fn run_retention(state: Arc<AppState>, patient_id: PatientId) {
    for step in &RETENTION_SCRIPT {
        tokio::time::sleep(state.pacing.retention_interval()).await;

        let Some(events) = state.demo.lock().await.play_checkin(&patient_id, step) else {
            return;
        };
        state.broadcast_all(events);
    }
    if let Some(patient) = state.demo.lock().await.patient(&patient_id) {
        info!(
            %patient_id,
            stage = %patient.record.stage,
            check_ins = patient.check_ins.len(),
            "retention sequence finished"
        );
    }
}

fn now() -> chrono::NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
#[path = "tests/app_state_tests.rs"]
mod tests;
