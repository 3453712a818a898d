use std::fmt;

/// Remote call a failure or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Metadata,
    JobStart,
    Progress,
    Artifact,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStage::Metadata => write!(f, "metadata request"),
            RequestStage::JobStart => write!(f, "job start"),
            RequestStage::Progress => write!(f, "progress query"),
            RequestStage::Artifact => write!(f, "artifact download"),
        }
    }
}

/// Every failure the client can surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// Malformed or empty input, detected before any network call.
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{stage} timed out")]
    Timeout { stage: RequestStage },
    /// Transport failure or unreachable service.
    #[error("network error: {0}")]
    Network(String),
    /// The service answered but reported a failure or sent a malformed payload.
    #[error("{0}")]
    Remote(String),
    #[error("status unavailable after {attempts} failed attempts")]
    PollExhausted { attempts: u32 },
    /// The artifact arrived but could not be written locally.
    #[error("could not save file: {0}")]
    Save(String),
}
