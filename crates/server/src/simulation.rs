//! Scripted patient journeys and the authoritative demo state they mutate.
//!
//! Every mutation returns the events to broadcast, in order, so the async
//! drivers in [`crate::app_state`] only own the pacing.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rand::Rng;
use shared::{
    domain::{ChatSender, FunnelStage, PatientId, UiMode},
    protocol::{CheckinPayload, MetricsSnapshot, PatientRecord, ServerEvent},
};
use tracing::debug;

pub const FIRST_NAMES: [&str; 8] = [
    "Sarah", "Jennifer", "Maria", "Lisa", "Amanda", "Jessica", "Michelle", "Emily",
];
pub const LAST_INITIALS: [&str; 8] = ["M", "K", "R", "S", "J", "T", "P", "L"];

pub const BOOKING_VALUE: f64 = 2800.0;
pub const UPSELL_VALUE: f64 = 1500.0;
pub const RETAINED_DAY: u32 = 28;
pub const UPSOLD_DAY: u32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine {
    /// Pause before the line, in scripted seconds.
    pub delay_secs: u64,
    pub sender: ChatSender,
    pub text: &'static str,
}

const fn line(delay_secs: u64, sender: ChatSender, text: &'static str) -> ScriptLine {
    ScriptLine {
        delay_secs,
        sender,
        text,
    }
}

pub const ASSISTED_SCRIPT: [ScriptLine; 7] = [
    line(2, ChatSender::Ai, "Hi! This is Dr. Martinez's clinic. I see you're interested in our GLP-1 program. I can help you right now! 💪"),
    line(3, ChatSender::Patient, "Yes! How much does it cost?"),
    line(2, ChatSender::Ai, "Our comprehensive program is $497/month including medication, coaching, and 24/7 support. When would you like to start? 🗓️"),
    line(4, ChatSender::Patient, "Can I book for this week?"),
    line(2, ChatSender::Ai, "Absolutely! I have Thursday at 2pm or Friday at 10am available. Which works better?"),
    line(3, ChatSender::Patient, "Friday 10am please"),
    line(2, ChatSender::Ai, "Perfect! You're booked for Friday at 10am. I'll send you a confirmation and pre-visit guide. See you then! ✅"),
];

pub const LEGACY_SCRIPT: [ScriptLine; 5] = [
    line(1, ChatSender::Patient, "Hi, I want to book an appointment"),
    line(86_400, ChatSender::Clinic, "Hi! This is the clinic. We got your message. Please call us during business hours (9-5) to schedule. ☎️"),
    line(2, ChatSender::Patient, "I called but got voicemail..."),
    line(172_800, ChatSender::Clinic, "Sorry we missed you! Call again tomorrow between 9-5. 📞"),
    line(1, ChatSender::System, "❌ PATIENT BOOKED WITH COMPETITOR"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionStep {
    pub day: u32,
    pub text: &'static str,
}

pub const RETENTION_SCRIPT: [RetentionStep; 5] = [
    RetentionStep { day: 7, text: "Hey! How are you feeling after your first week? Any questions about your medication? 💬" },
    RetentionStep { day: 14, text: "You're doing great! 2 weeks down. How's your energy level? 🌟" },
    RetentionStep { day: 21, text: "Checking in! Any side effects I should know about? I'm here to help. 🩺" },
    RetentionStep { day: RETAINED_DAY, text: "Month 1 complete! 🎉 Ready to refill? I can schedule your Month 2 check-in." },
    RetentionStep { day: UPSOLD_DAY, text: "You're in Month 2 now! Have you thought about adding our peptide optimization program?" },
];

pub fn script_for(mode: UiMode) -> &'static [ScriptLine] {
    match mode {
        UiMode::Assisted => &ASSISTED_SCRIPT,
        UiMode::Legacy => &LEGACY_SCRIPT,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoPatient {
    pub record: PatientRecord,
    pub mode: UiMode,
    pub lead_time: NaiveDateTime,
    pub booking_time: Option<NaiveDateTime>,
    pub revenue: f64,
    pub messages_sent: usize,
    pub check_ins: Vec<CheckinPayload>,
}

impl DemoPatient {
    pub fn id(&self) -> &PatientId {
        &self.record.id
    }
}

pub fn generate_lead<R: Rng>(rng: &mut R, mode: UiMode, now: NaiveDateTime) -> DemoPatient {
    let id: String = uuid::Uuid::new_v4().to_string().chars().take(8).collect();
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_INITIALS[rng.gen_range(0..LAST_INITIALS.len())];
    let phone = format!(
        "(555) {}-{}",
        rng.gen_range(100..=999),
        rng.gen_range(1000..=9999)
    );
    DemoPatient {
        record: PatientRecord {
            id: PatientId::new(id),
            name: format!("{first} {last}."),
            stage: FunnelStage::Lead,
            phone: Some(phone),
        },
        mode,
        lead_time: now,
        booking_time: None,
        revenue: 0.0,
        messages_sent: 0,
        check_ins: Vec::new(),
    }
}

#[derive(Debug, Default)]
pub struct DemoState {
    patients: HashMap<PatientId, DemoPatient>,
    metrics: MetricsSnapshot,
}

impl DemoState {
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
    }

    pub fn patient(&self, id: &PatientId) -> Option<&DemoPatient> {
        self.patients.get(id)
    }

    pub fn contains(&self, id: &PatientId) -> bool {
        self.patients.contains_key(id)
    }

    pub fn reset(&mut self) -> ServerEvent {
        self.patients.clear();
        self.metrics = MetricsSnapshot::default();
        ServerEvent::Reset {
            metrics: Some(self.metrics),
        }
    }

    pub fn add_lead(&mut self, patient: DemoPatient) -> ServerEvent {
        self.metrics.total_leads += 1;
        let record = patient.record.clone();
        self.patients.insert(record.id.clone(), patient);
        ServerEvent::NewLead {
            patient: record,
            metrics: self.metrics,
        }
    }

    /// Plays one scripted line for `id`. Returns `None` once the patient is
    /// gone, which ends the conversation.
    pub fn play_line(
        &mut self,
        id: &PatientId,
        line: &ScriptLine,
        now: NaiveDateTime,
    ) -> Option<Vec<ServerEvent>> {
        let Some(patient) = self.patients.get_mut(id) else {
            debug!(patient_id = %id, "conversation target no longer present");
            return None;
        };
        patient.messages_sent += 1;

        let mut events = vec![ServerEvent::Message {
            patient_id: Some(id.clone()),
            sender: line.sender,
            text: line.text.to_string(),
            timestamp: Some(now),
        }];

        let stage = match patient.mode {
            UiMode::Assisted if line.text.to_lowercase().contains("booked") => {
                patient.booking_time = Some(now);
                patient.revenue = BOOKING_VALUE;
                self.metrics.booked += 1;
                self.metrics.revenue_captured += BOOKING_VALUE;
                Some(FunnelStage::Booked)
            }
            UiMode::Legacy if line.text.contains("COMPETITOR") => {
                patient.revenue = 0.0;
                self.metrics.lost += 1;
                self.metrics.revenue_lost += BOOKING_VALUE;
                Some(FunnelStage::Lost)
            }
            _ => None,
        };
        if let Some(stage) = stage {
            patient.record.stage = stage.clone();
            events.push(ServerEvent::StageChange {
                patient_id: id.clone(),
                stage,
                metrics: self.metrics,
            });
        }
        Some(events)
    }

    /// Records one retention check-in. Stage changes are broadcast before
    /// the check-in itself so it carries the updated metrics.
    pub fn play_checkin(&mut self, id: &PatientId, step: &RetentionStep) -> Option<Vec<ServerEvent>> {
        let Some(patient) = self.patients.get_mut(id) else {
            debug!(patient_id = %id, "retention target no longer present");
            return None;
        };
        let payload = CheckinPayload {
            patient_id: id.clone(),
            day: step.day,
            text: step.text.to_string(),
        };
        patient.check_ins.push(payload.clone());

        let stage = match step.day {
            RETAINED_DAY => {
                self.metrics.retained += 1;
                Some(FunnelStage::Retained)
            }
            UPSOLD_DAY => {
                patient.revenue += UPSELL_VALUE;
                self.metrics.upsold += 1;
                self.metrics.revenue_captured += UPSELL_VALUE;
                Some(FunnelStage::Upsold)
            }
            _ => None,
        };

        let mut events = Vec::with_capacity(2);
        if let Some(stage) = stage {
            patient.record.stage = stage.clone();
            events.push(ServerEvent::StageChange {
                patient_id: id.clone(),
                stage,
                metrics: self.metrics,
            });
        }
        events.push(ServerEvent::Checkin {
            data: payload,
            metrics: self.metrics,
        });
        Some(events)
    }
}

#[cfg(test)]
#[path = "tests/simulation_tests.rs"]
mod tests;
