//! Canonical in-memory replica of the funnel: patients, the latest metrics
//! snapshot, the chat log, and the client-local UI mode.
//!
//! Only the dispatcher mutates the store, and only with fields taken from
//! decoded server events. Mode is the one exception: it is client-local.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use shared::{
    domain::{ChatSender, FunnelStage, PatientId, UiMode},
    protocol::{MetricsSnapshot, PatientRecord},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub stage: FunnelStage,
}

impl Patient {
    /// First character of every whitespace-separated name part.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect()
    }
}

impl From<PatientRecord> for Patient {
    fn from(record: PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            stage: record.stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender: ChatSender,
    pub text: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Set for synthetic retention check-in entries.
    pub checkin_day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    Entry(ChatEntry),
    Typing,
}

/// Append-only message log plus the transient typing indicator. The
/// indicator is never part of the log contract: it is always the last line
/// and there is at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLog {
    lines: Vec<ChatLine>,
    placeholder: bool,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            placeholder: true,
        }
    }
}

impl ChatLog {
    /// True until the first lead of a session clears the empty-state view.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn has_typing(&self) -> bool {
        matches!(self.lines.last(), Some(ChatLine::Typing))
    }

    /// Returns false when the indicator was already showing.
    pub fn show_typing(&mut self) -> bool {
        if self.has_typing() {
            return false;
        }
        self.lines.push(ChatLine::Typing);
        true
    }

    /// Returns true when an indicator was removed.
    pub fn hide_typing(&mut self) -> bool {
        if self.has_typing() {
            self.lines.pop();
            return true;
        }
        false
    }

    pub fn append(&mut self, entry: ChatEntry) {
        self.hide_typing();
        self.lines.push(ChatLine::Entry(entry));
    }

    /// Empties the log and leaves the placeholder state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.placeholder = false;
    }

    /// Empties the log and returns to the placeholder state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.lines.iter().filter_map(|line| match line {
            ChatLine::Entry(entry) => Some(entry),
            ChatLine::Typing => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct FunnelStore {
    patients: HashMap<PatientId, Patient>,
    /// Most recently created first.
    order: Vec<PatientId>,
    metrics: MetricsSnapshot,
    mode: UiMode,
    active_patient: Option<PatientId>,
    chat: ChatLog,
}

impl FunnelStore {
    pub fn new(mode: UiMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Inserts or fully replaces the record keyed by its id. Returns true for
    /// a newly created patient; replacements keep their list position.
    pub fn upsert_patient(&mut self, patient: Patient) -> bool {
        let id = patient.id.clone();
        let created = self.patients.insert(id.clone(), patient).is_none();
        if created {
            self.order.insert(0, id);
        }
        created
    }

    /// No-op for unknown ids. Returns whether a patient was updated.
    pub fn set_stage(&mut self, id: &PatientId, stage: FunnelStage) -> bool {
        match self.patients.get_mut(id) {
            Some(patient) => {
                patient.stage = stage;
                true
            }
            None => false,
        }
    }

    pub fn replace_metrics(&mut self, snapshot: MetricsSnapshot) {
        self.metrics = snapshot;
    }

    pub fn clear_all(&mut self) {
        self.patients.clear();
        self.order.clear();
        self.active_patient = None;
        self.metrics = MetricsSnapshot::default();
        self.chat.reset();
    }

    pub fn set_mode(&mut self, mode: UiMode) {
        self.mode = mode;
    }

    pub fn set_active_patient(&mut self, id: PatientId) {
        self.active_patient = Some(id);
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn patient(&self, id: &PatientId) -> Option<&Patient> {
        self.patients.get(id)
    }

    pub fn contains_patient(&self, id: &PatientId) -> bool {
        self.patients.contains_key(id)
    }

    /// Patients in display order, newest first.
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.order.iter().filter_map(|id| self.patients.get(id))
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    /// The id reference may outlive its patient; a stale id resolves to None.
    pub fn active_patient(&self) -> Option<&Patient> {
        self.active_patient
            .as_ref()
            .and_then(|id| self.patients.get(id))
    }

    pub fn active_patient_id(&self) -> Option<&PatientId> {
        self.active_patient.as_ref()
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatLog {
        &mut self.chat
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
