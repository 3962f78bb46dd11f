//! One demo session: the store, the dispatcher, pending cosmetic timers, the
//! outbound channel and the trigger affordances, owned together.

use std::{sync::Arc, time::Duration};

use chrono::{Local, NaiveDateTime};
use shared::{
    domain::{PatientId, UiMode},
    protocol::{ClientCommand, ServerEvent},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::Timings,
    dispatcher::{Affordances, Dispatcher, ScheduledTask},
    projector::{chat_status_instruction, response_time_instruction, RenderInstruction, Trigger},
    scheduler::{Clock, TimerQueue},
    store::FunnelStore,
    transport::{decode_frame, CommandSink},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{trigger:?} trigger is disabled")]
    TriggerDisabled { trigger: Trigger },
    #[error("no active patient to target")]
    NoActivePatient,
}

pub struct FunnelSession<S: CommandSink> {
    store: FunnelStore,
    dispatcher: Dispatcher,
    timers: TimerQueue<ScheduledTask>,
    clock: Arc<dyn Clock>,
    sink: S,
    timings: Timings,
    retention_requested_for: Option<PatientId>,
}

impl<S: CommandSink> FunnelSession<S> {
    pub fn new(sink: S, clock: Arc<dyn Clock>, mode: UiMode, timings: Timings) -> Self {
        Self {
            store: FunnelStore::new(mode),
            dispatcher: Dispatcher::new(timings),
            timers: TimerQueue::new(),
            clock,
            sink,
            timings,
            retention_requested_for: None,
        }
    }

    pub fn store(&self) -> &FunnelStore {
        &self.store
    }

    pub fn affordances(&self) -> Affordances {
        self.dispatcher.affordances()
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.timers.iter()
    }

    /// Instructions that bring a fresh surface in line with the mode.
    pub fn initial_view(&self) -> Vec<RenderInstruction> {
        let mode = self.store.mode();
        vec![
            RenderInstruction::ResetLog,
            RenderInstruction::ResetPatientList,
            response_time_instruction(mode),
            chat_status_instruction(mode),
            RenderInstruction::SetTrigger {
                trigger: Trigger::SimulateLead,
                enabled: self.affordances().simulate_enabled,
            },
            RenderInstruction::SetTrigger {
                trigger: Trigger::Retention,
                enabled: self.affordances().retention_enabled,
            },
        ]
    }

    /// Malformed frames are logged and dropped without touching state.
    pub fn handle_frame(&mut self, raw: &str) -> Vec<RenderInstruction> {
        match decode_frame(raw) {
            Ok(event) => self.handle_event(event),
            Err(err) => {
                warn!(%err, "dropping malformed frame");
                Vec::new()
            }
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent) -> Vec<RenderInstruction> {
        self.handle_event_at(event, Local::now().naive_local())
    }

    /// `received_at` is the wall-clock time stamped on synthetic entries.
    pub fn handle_event_at(
        &mut self,
        event: ServerEvent,
        received_at: NaiveDateTime,
    ) -> Vec<RenderInstruction> {
        debug!(kind = event.kind(), "applying server event");
        match &event {
            ServerEvent::Reset { .. } => {
                // Highlight and flash timers stay so the surface is cleared.
                let cancelled = self
                    .timers
                    .cancel_where(|task| matches!(task, ScheduledTask::ShowTyping));
                if cancelled > 0 {
                    debug!(cancelled, "cancelled pending typing indicator on reset");
                }
                self.retention_requested_for = None;
            }
            ServerEvent::NewLead { .. } => self.retention_requested_for = None,
            _ => {}
        }

        let dispatch = self.dispatcher.dispatch(&mut self.store, &event, received_at);
        let now = self.clock.now();
        for (delay, task) in dispatch.timers {
            self.supersede_timer(&task);
            self.timers.schedule(now, delay, task);
        }
        dispatch.instructions
    }

    /// A new highlight or flash restarts the clearing timer instead of
    /// letting an older one cut it short.
    fn supersede_timer(&mut self, task: &ScheduledTask) {
        match task {
            ScheduledTask::ClearStageHighlight(_) => {
                self.timers
                    .cancel_where(|pending| matches!(pending, ScheduledTask::ClearStageHighlight(_)));
            }
            ScheduledTask::ClearFlash(counter) => {
                self.timers
                    .cancel_where(|pending| pending == &ScheduledTask::ClearFlash(*counter));
            }
            ScheduledTask::ShowTyping | ScheduledTask::EnableSimulateTrigger => {}
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Time left on the session clock before the next timer is due.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(now))
    }

    /// Fires every timer that is due on the session clock.
    pub fn poll_timers(&mut self) -> Vec<RenderInstruction> {
        let now = self.clock.now();
        let mut out = Vec::new();
        for task in self.timers.drain_due(now) {
            match task {
                ScheduledTask::ShowTyping => {
                    if self.store.chat_mut().show_typing() {
                        out.push(RenderInstruction::ShowTyping);
                    }
                }
                ScheduledTask::ClearStageHighlight(stage) => {
                    out.push(self.dispatcher.clear_stage_highlight(&stage));
                }
                ScheduledTask::ClearFlash(counter) => {
                    out.push(RenderInstruction::Unflash { counter });
                }
                ScheduledTask::EnableSimulateTrigger => {
                    out.extend(self.dispatcher.set_trigger(Trigger::SimulateLead, true));
                }
            }
        }
        out
    }

    /// Mode is client-local: it changes display strings and the retention
    /// affordance, never patients or metrics.
    pub fn set_mode(&mut self, mode: UiMode) -> Vec<RenderInstruction> {
        self.store.set_mode(mode);
        info!(mode = mode.wire_name(), "ui mode changed");
        let mut out = vec![response_time_instruction(mode), chat_status_instruction(mode)];
        let retention_available = mode == UiMode::Assisted
            && self
                .store
                .active_patient()
                .is_some_and(|patient| self.retention_requested_for.as_ref() != Some(&patient.id));
        out.extend(
            self.dispatcher
                .set_trigger(Trigger::Retention, retention_available),
        );
        out
    }

    /// Asks the server for a new lead in the current mode and starts the
    /// trigger cooldown.
    pub fn simulate_lead(&mut self) -> Result<Vec<RenderInstruction>, SessionError> {
        if !self.affordances().simulate_enabled {
            return Err(SessionError::TriggerDisabled {
                trigger: Trigger::SimulateLead,
            });
        }
        self.send_command(ClientCommand::SimulateLead {
            mode: self.store.mode(),
        });
        let now = self.clock.now();
        self.timers.schedule(
            now,
            self.timings.simulate_cooldown,
            ScheduledTask::EnableSimulateTrigger,
        );
        Ok(self
            .dispatcher
            .set_trigger(Trigger::SimulateLead, false)
            .into_iter()
            .collect())
    }

    /// The local state only changes once the server echoes the reset.
    pub fn request_reset(&mut self) {
        self.send_command(ClientCommand::Reset);
    }

    pub fn request_retention(&mut self) -> Result<Vec<RenderInstruction>, SessionError> {
        if !self.affordances().retention_enabled {
            return Err(SessionError::TriggerDisabled {
                trigger: Trigger::Retention,
            });
        }
        let patient_id = self
            .store
            .active_patient()
            .map(|patient| patient.id.clone())
            .ok_or(SessionError::NoActivePatient)?;
        self.send_command(ClientCommand::SimulateRetention {
            patient_id: patient_id.clone(),
        });
        self.retention_requested_for = Some(patient_id);
        Ok(self
            .dispatcher
            .set_trigger(Trigger::Retention, false)
            .into_iter()
            .collect())
    }

    fn send_command(&self, command: ClientCommand) {
        match self.sink.send(&command) {
            Ok(()) => debug!(command = command.name(), "sent command"),
            Err(err) => debug!(command = command.name(), %err, "command dropped"),
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
