use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {reason}")]
    Malformed { reason: String },
    #[error("failed to encode command {command}: {source}")]
    Encode {
        command: &'static str,
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
