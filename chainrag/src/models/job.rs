use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Returned by status polling when no job was ever triggered for a tag.
    Unknown,
    Queued,
    Fetching,
    Embedding,
    Done,
    Error,
}

impl JobState {
    /// A build is running or waiting for a worker.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Queued | Self::Fetching | Self::Embedding)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Queued => write!(f, "queued"),
            Self::Fetching => write!(f, "fetching"),
            Self::Embedding => write!(f, "embedding"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct JobStatus {
    pub state: JobState,
    pub message: String,
}

impl JobStatus {
    pub fn new(state: JobState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(JobState::Unknown, "No preparation has been triggered for this tag")
    }

    pub fn queued() -> Self {
        Self::new(JobState::Queued, "Waiting for a preparation worker")
    }
}
