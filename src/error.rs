use gsd_core::settings::SettingsError;
use gsd_core::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("IO error: {msg}")]
    Io { msg: String },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid data: {msg}")]
    InvalidData { msg: String },
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData { msg: msg.into() }
    }
}

impl From<SettingsError> for EngineError {
    fn from(e: SettingsError) -> Self {
        Self::invalid(e.to_string())
    }
}
