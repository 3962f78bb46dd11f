use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id_newtype!(PatientId);

/// Funnel position asserted by the server. Stages this client does not know
/// are carried through verbatim instead of failing the frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FunnelStage {
    Lead,
    Booked,
    Showed,
    Retained,
    Upsold,
    Lost,
    Other(String),
}

impl FunnelStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Lead => "lead",
            Self::Booked => "booked",
            Self::Showed => "showed",
            Self::Retained => "retained",
            Self::Upsold => "upsold",
            Self::Lost => "lost",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, Self::Lost)
    }
}

impl From<String> for FunnelStage {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lead" => Self::Lead,
            "booked" => Self::Booked,
            "showed" => Self::Showed,
            "retained" => Self::Retained,
            "upsold" => Self::Upsold,
            "lost" => Self::Lost,
            _ => Self::Other(value),
        }
    }
}

impl From<FunnelStage> for String {
    fn from(value: FunnelStage) -> Self {
        match value {
            FunnelStage::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSender {
    System,
    Ai,
    Patient,
    /// Manual front-desk replies in the legacy workflow.
    Clinic,
}

impl ChatSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Ai => "ai",
            Self::Patient => "patient",
            Self::Clinic => "clinic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UiMode {
    #[serde(rename = "old")]
    Legacy,
    #[default]
    #[serde(rename = "new")]
    Assisted,
}

impl UiMode {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Legacy => "old",
            Self::Assisted => "new",
        }
    }

    /// Accepts both the wire names and the descriptive names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "old" | "legacy" => Some(Self::Legacy),
            "new" | "assisted" => Some(Self::Assisted),
            _ => None,
        }
    }
}
