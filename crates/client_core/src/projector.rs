//! Pure derivation of render instructions from the store and the event that
//! was just applied. Applying instructions to a real surface happens
//! elsewhere.

use std::time::Duration;

use shared::{
    domain::{ChatSender, FunnelStage, PatientId, UiMode},
    protocol::{MetricsSnapshot, ServerEvent},
};

use crate::{
    dispatcher::StoreEffects,
    store::{ChatEntry, ChatLine, FunnelStore, Patient},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Leads,
    Booked,
    Showed,
    Retained,
    Upsold,
    RevenueCaptured,
    RevenueLost,
    PatientsSaved,
}

impl Counter {
    pub const ALL: [Counter; 8] = [
        Counter::Leads,
        Counter::Booked,
        Counter::Showed,
        Counter::Retained,
        Counter::Upsold,
        Counter::RevenueCaptured,
        Counter::RevenueLost,
        Counter::PatientsSaved,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Leads => "count-lead",
            Self::Booked => "count-booked",
            Self::Showed => "count-showed",
            Self::Retained => "count-retained",
            Self::Upsold => "count-upsold",
            Self::RevenueCaptured => "revenue-captured",
            Self::RevenueLost => "revenue-lost",
            Self::PatientsSaved => "patients-saved",
        }
    }

    fn zero_text(&self) -> String {
        match self {
            Self::RevenueCaptured | Self::RevenueLost => format_currency(0.0),
            _ => "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    SimulateLead,
    Retention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientStatus {
    Active,
    Lost,
}

impl PatientStatus {
    pub fn for_stage(stage: &FunnelStage) -> Self {
        if stage.is_lost() {
            Self::Lost
        } else {
            Self::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    /// Restore the empty-state chat view.
    ResetLog,
    /// Drop the empty-state view ahead of the first conversation.
    ClearLog,
    ShowTyping,
    HideTyping,
    AppendMessage {
        sender: ChatSender,
        text: String,
        time_label: Option<String>,
        heading: Option<String>,
    },
    /// Restore the "no active patients" list view.
    ResetPatientList,
    UpsertPatient {
        id: PatientId,
        initials: String,
        name: String,
        stage: FunnelStage,
        status: PatientStatus,
    },
    HighlightStage {
        stage: FunnelStage,
        duration: Duration,
    },
    ClearStageHighlight {
        stage: FunnelStage,
    },
    SetCounter {
        counter: Counter,
        value: String,
    },
    Flash {
        counter: Counter,
    },
    Unflash {
        counter: Counter,
    },
    SetResponseTime {
        value: &'static str,
        comparison: &'static str,
    },
    SetChatStatus {
        label: &'static str,
        tone: StatusTone,
    },
    SetTrigger {
        trigger: Trigger,
        enabled: bool,
    },
}

/// Last values written to counters whose changes are animated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderCache {
    revenue_captured: f64,
}

impl RenderCache {
    pub fn revenue_captured(&self) -> f64 {
        self.revenue_captured
    }
}

#[derive(Debug)]
pub struct Projector {
    cache: RenderCache,
    highlight: Duration,
    /// At most one stage is highlighted at a time.
    highlighted: Option<FunnelStage>,
}

impl Projector {
    pub fn new(highlight: Duration) -> Self {
        Self {
            cache: RenderCache::default(),
            highlight,
            highlighted: None,
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn highlighted(&self) -> Option<&FunnelStage> {
        self.highlighted.as_ref()
    }

    pub fn clear_highlight(&mut self, stage: &FunnelStage) -> RenderInstruction {
        if self.highlighted.as_ref() == Some(stage) {
            self.highlighted = None;
        }
        RenderInstruction::ClearStageHighlight {
            stage: stage.clone(),
        }
    }

    pub fn project(
        &mut self,
        store: &FunnelStore,
        event: &ServerEvent,
        effects: &StoreEffects,
    ) -> Vec<RenderInstruction> {
        let mut out = Vec::new();
        match event {
            ServerEvent::NewLead { patient, .. } => {
                if effects.log_cleared {
                    out.push(RenderInstruction::ClearLog);
                }
                if let Some(patient) = store.patient(&patient.id) {
                    out.push(patient_instruction(patient));
                }
                self.project_metrics(store, &mut out);
                if effects.typing_shown {
                    out.push(RenderInstruction::ShowTyping);
                }
            }
            ServerEvent::Message { .. } => {
                if effects.typing_hidden {
                    out.push(RenderInstruction::HideTyping);
                }
                if effects.entry_appended {
                    out.extend(last_entry(store).map(message_instruction));
                }
            }
            ServerEvent::StageChange {
                patient_id, stage, ..
            } => {
                if effects.patient_updated {
                    out.extend(store.patient(patient_id).map(patient_instruction));
                }
                if let Some(previous) = self.highlighted.replace(stage.clone()) {
                    if previous != *stage {
                        out.push(RenderInstruction::ClearStageHighlight { stage: previous });
                    }
                }
                out.push(RenderInstruction::HighlightStage {
                    stage: stage.clone(),
                    duration: self.highlight,
                });
                self.project_metrics(store, &mut out);
            }
            ServerEvent::Checkin { .. } => {
                if effects.typing_hidden {
                    out.push(RenderInstruction::HideTyping);
                }
                if effects.entry_appended {
                    out.extend(last_entry(store).map(message_instruction));
                }
                self.project_metrics(store, &mut out);
            }
            ServerEvent::Metrics { .. } => self.project_metrics(store, &mut out),
            ServerEvent::Reset { .. } => {
                out.push(RenderInstruction::ResetLog);
                out.push(RenderInstruction::ResetPatientList);
                out.extend(Counter::ALL.iter().map(|counter| RenderInstruction::SetCounter {
                    counter: *counter,
                    value: counter.zero_text(),
                }));
                self.cache = RenderCache::default();
            }
        }
        out
    }

    fn project_metrics(&mut self, store: &FunnelStore, out: &mut Vec<RenderInstruction>) {
        let metrics = store.metrics();
        for (counter, value) in [
            (Counter::Leads, metrics.total_leads),
            (Counter::Booked, metrics.booked),
            (Counter::Showed, metrics.showed),
            (Counter::Retained, metrics.retained),
            (Counter::Upsold, metrics.upsold),
        ] {
            out.push(RenderInstruction::SetCounter {
                counter,
                value: value.to_string(),
            });
        }

        if metrics.revenue_captured != self.cache.revenue_captured {
            self.cache.revenue_captured = metrics.revenue_captured;
            out.push(RenderInstruction::SetCounter {
                counter: Counter::RevenueCaptured,
                value: format_currency(metrics.revenue_captured),
            });
            out.push(RenderInstruction::Flash {
                counter: Counter::RevenueCaptured,
            });
        }

        out.push(RenderInstruction::SetCounter {
            counter: Counter::RevenueLost,
            value: format_currency(metrics.revenue_lost),
        });
        out.push(patients_saved_instruction(metrics));
        out.push(response_time_instruction(store.mode()));
    }
}

pub fn patient_instruction(patient: &Patient) -> RenderInstruction {
    RenderInstruction::UpsertPatient {
        id: patient.id.clone(),
        initials: patient.initials(),
        name: patient.name.clone(),
        stage: patient.stage.clone(),
        status: PatientStatus::for_stage(&patient.stage),
    }
}

pub fn message_instruction(entry: &ChatEntry) -> RenderInstruction {
    let time_label = if entry.sender == ChatSender::System {
        None
    } else {
        entry.timestamp.map(|ts| ts.format("%H:%M").to_string())
    };
    RenderInstruction::AppendMessage {
        sender: entry.sender,
        text: entry.text.clone(),
        time_label,
        heading: entry.checkin_day.map(|day| format!("Day {day} Check-in")),
    }
}

pub fn patients_saved_instruction(metrics: &MetricsSnapshot) -> RenderInstruction {
    RenderInstruction::SetCounter {
        counter: Counter::PatientsSaved,
        value: metrics.patients_saved().to_string(),
    }
}

pub fn response_time_instruction(mode: UiMode) -> RenderInstruction {
    match mode {
        UiMode::Assisted => RenderInstruction::SetResponseTime {
            value: "4 sec",
            comparison: "vs 24-48 hours manual",
        },
        UiMode::Legacy => RenderInstruction::SetResponseTime {
            value: "24+ hrs",
            comparison: "voicemail delay",
        },
    }
}

pub fn chat_status_instruction(mode: UiMode) -> RenderInstruction {
    match mode {
        UiMode::Assisted => RenderInstruction::SetChatStatus {
            label: "AI Active",
            tone: StatusTone::Success,
        },
        UiMode::Legacy => RenderInstruction::SetChatStatus {
            label: "Voicemail",
            tone: StatusTone::Danger,
        },
    }
}

/// `$` followed by the amount with thousands separators. Fractions are
/// shown only when present; negative amounts are rendered as given.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round();
    let negative = cents < 0.0;
    let cents = cents.abs() as u64;
    let whole = group_thousands(cents / 100);
    let fraction = cents % 100;
    let sign = if negative { "-" } else { "" };
    if fraction == 0 {
        format!("${sign}{whole}")
    } else if fraction % 10 == 0 {
        format!("${sign}{whole}.{}", fraction / 10)
    } else {
        format!("${sign}{whole}.{fraction:02}")
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn last_entry(store: &FunnelStore) -> Option<&ChatEntry> {
    match store.chat().lines().last() {
        Some(ChatLine::Entry(entry)) => Some(entry),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/projector_tests.rs"]
mod tests;
