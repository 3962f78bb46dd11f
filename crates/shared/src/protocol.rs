use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{ChatSender, FunnelStage, PatientId, UiMode};

/// Authoritative funnel counters. Every event that carries one replaces the
/// previous snapshot wholesale; absent fields read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub total_leads: i64,
    #[serde(default)]
    pub booked: i64,
    #[serde(default)]
    pub showed: i64,
    #[serde(default)]
    pub retained: i64,
    #[serde(default)]
    pub upsold: i64,
    #[serde(default)]
    pub revenue_captured: f64,
    #[serde(default)]
    pub revenue_lost: f64,
    #[serde(default)]
    pub lost: i64,
}

impl MetricsSnapshot {
    pub fn patients_saved(&self) -> i64 {
        (self.booked - self.lost).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub name: String,
    pub stage: FunnelStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinPayload {
    pub patient_id: PatientId,
    pub day: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewLead {
        patient: PatientRecord,
        #[serde(default)]
        metrics: MetricsSnapshot,
    },
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        patient_id: Option<PatientId>,
        sender: ChatSender,
        text: String,
        #[serde(
            default,
            deserialize_with = "lenient_timestamp",
            skip_serializing_if = "Option::is_none"
        )]
        timestamp: Option<NaiveDateTime>,
    },
    StageChange {
        patient_id: PatientId,
        stage: FunnelStage,
        #[serde(default)]
        metrics: MetricsSnapshot,
    },
    Checkin {
        data: CheckinPayload,
        #[serde(default)]
        metrics: MetricsSnapshot,
    },
    Metrics {
        metrics: MetricsSnapshot,
    },
    Reset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<MetricsSnapshot>,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewLead { .. } => "new_lead",
            Self::Message { .. } => "message",
            Self::StageChange { .. } => "stage_change",
            Self::Checkin { .. } => "checkin",
            Self::Metrics { .. } => "metrics",
            Self::Reset { .. } => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    SimulateLead {
        #[serde(default)]
        mode: UiMode,
    },
    Reset,
    SimulateRetention { patient_id: PatientId },
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimulateLead { .. } => "simulate_lead",
            Self::Reset => "reset",
            Self::SimulateRetention { .. } => "simulate_retention",
        }
    }
}

/// Accepts RFC 3339 as well as offset-less ISO-8601 timestamps. Anything
/// unparsable is treated as absent so the rest of the frame still applies.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}
