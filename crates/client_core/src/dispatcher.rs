//! Maps each decoded server event to one store mutation plus the render
//! instructions and cosmetic timers that follow from it.
//!
//! Events are applied synchronously in arrival order. Nothing is retried or
//! deferred, and an unknown patient id only narrows the effects of an event.

use std::time::Duration;

use chrono::NaiveDateTime;
use shared::{
    domain::{ChatSender, FunnelStage, UiMode},
    protocol::ServerEvent,
};
use tracing::debug;

use crate::{
    config::Timings,
    projector::{Counter, Projector, RenderInstruction, Trigger},
    store::{ChatEntry, FunnelStore, Patient},
};

/// What an event actually changed in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreEffects {
    pub log_cleared: bool,
    pub typing_shown: bool,
    pub typing_hidden: bool,
    pub entry_appended: bool,
    pub patient_created: bool,
    pub patient_updated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledTask {
    ShowTyping,
    ClearStageHighlight(FunnelStage),
    ClearFlash(Counter),
    EnableSimulateTrigger,
}

#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    pub instructions: Vec<RenderInstruction>,
    /// Delays are relative to the moment the event was applied.
    pub timers: Vec<(Duration, ScheduledTask)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub simulate_enabled: bool,
    pub retention_enabled: bool,
}

impl Default for Affordances {
    fn default() -> Self {
        Self {
            simulate_enabled: true,
            retention_enabled: false,
        }
    }
}

impl Affordances {
    pub fn is_enabled(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::SimulateLead => self.simulate_enabled,
            Trigger::Retention => self.retention_enabled,
        }
    }
}

/// Applies `event` to the store using only fields carried by the event.
/// `received_at` timestamps synthetic chat entries.
pub fn apply_event(
    store: &mut FunnelStore,
    event: &ServerEvent,
    received_at: NaiveDateTime,
) -> StoreEffects {
    let mut effects = StoreEffects::default();
    match event {
        ServerEvent::NewLead { patient, metrics } => {
            effects.patient_created = store.upsert_patient(Patient::from(patient.clone()));
            store.set_active_patient(patient.id.clone());
            if store.chat().is_placeholder() {
                store.chat_mut().clear();
                effects.log_cleared = true;
            }
            store.replace_metrics(*metrics);
            effects.typing_shown = store.chat_mut().show_typing();
        }
        ServerEvent::Message {
            sender,
            text,
            timestamp,
            ..
        } => {
            let chat = store.chat_mut();
            effects.typing_hidden = chat.hide_typing();
            chat.append(ChatEntry {
                sender: *sender,
                text: text.clone(),
                timestamp: *timestamp,
                checkin_day: None,
            });
            effects.entry_appended = true;
        }
        ServerEvent::StageChange {
            patient_id,
            stage,
            metrics,
        } => {
            effects.patient_updated = store.set_stage(patient_id, stage.clone());
            if !effects.patient_updated {
                debug!(%patient_id, %stage, "stage change for unknown patient");
            }
            store.replace_metrics(*metrics);
        }
        ServerEvent::Checkin { data, metrics } => {
            if store.contains_patient(&data.patient_id) {
                let chat = store.chat_mut();
                effects.typing_hidden = chat.hide_typing();
                chat.append(ChatEntry {
                    sender: ChatSender::Ai,
                    text: data.text.clone(),
                    timestamp: Some(received_at),
                    checkin_day: Some(data.day),
                });
                effects.entry_appended = true;
            } else {
                debug!(patient_id = %data.patient_id, day = data.day, "check-in for unknown patient");
            }
            store.replace_metrics(*metrics);
        }
        ServerEvent::Metrics { metrics } => store.replace_metrics(*metrics),
        ServerEvent::Reset { .. } => store.clear_all(),
    }
    effects
}

pub struct Dispatcher {
    projector: Projector,
    affordances: Affordances,
    timings: Timings,
}

impl Dispatcher {
    pub fn new(timings: Timings) -> Self {
        Self {
            projector: Projector::new(timings.highlight),
            affordances: Affordances::default(),
            timings,
        }
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn dispatch(
        &mut self,
        store: &mut FunnelStore,
        event: &ServerEvent,
        received_at: NaiveDateTime,
    ) -> Dispatch {
        let effects = apply_event(store, event, received_at);
        let mut instructions = self.projector.project(store, event, &effects);

        match event {
            ServerEvent::NewLead { .. } if store.mode() == UiMode::Assisted => {
                instructions.extend(self.set_trigger(Trigger::Retention, true));
            }
            ServerEvent::Reset { .. } => {
                instructions.extend(self.set_trigger(Trigger::Retention, false));
            }
            _ => {}
        }

        let mut timers = Vec::new();
        for instruction in &instructions {
            match instruction {
                RenderInstruction::Flash { counter } => {
                    timers.push((self.timings.flash, ScheduledTask::ClearFlash(*counter)));
                }
                RenderInstruction::HighlightStage { stage, duration } => {
                    timers.push((*duration, ScheduledTask::ClearStageHighlight(stage.clone())));
                }
                _ => {}
            }
        }
        if let ServerEvent::Message {
            sender: ChatSender::Patient,
            ..
        } = event
        {
            if store.mode() == UiMode::Assisted {
                timers.push((self.timings.typing_delay, ScheduledTask::ShowTyping));
            }
        }

        Dispatch {
            instructions,
            timers,
        }
    }

    /// Called when a highlight timer fires.
    pub fn clear_stage_highlight(&mut self, stage: &FunnelStage) -> RenderInstruction {
        self.projector.clear_highlight(stage)
    }

    /// Returns the instruction to emit when the enablement actually changes.
    pub fn set_trigger(&mut self, trigger: Trigger, enabled: bool) -> Option<RenderInstruction> {
        let slot = match trigger {
            Trigger::SimulateLead => &mut self.affordances.simulate_enabled,
            Trigger::Retention => &mut self.affordances.retention_enabled,
        };
        if *slot == enabled {
            return None;
        }
        *slot = enabled;
        Some(RenderInstruction::SetTrigger { trigger, enabled })
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
