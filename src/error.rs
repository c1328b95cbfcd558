// Every failure the editor can hit. None of these are fatal: the host shell
// turns them into a notification and keeps going.

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("limit reached: at most {max} regions")]
    LimitExceeded { max: usize },

    #[error("could not decode audio: {0}")]
    DecodeError(String),

    #[error("export quota exhausted")]
    QuotaExceeded,

    #[error("audio device unavailable: {0}")]
    DeviceError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    // quota problems get an upgrade prompt instead of a plain message
    pub fn wants_upgrade_prompt(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;
