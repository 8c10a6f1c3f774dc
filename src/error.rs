use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// Every failure the narrative engine and the asset cache can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Upstream error: {0}")]
    Upstream(String), // A provider answered with a failure status or a body we could not read.

    #[error("Generation timed out after {attempts} polling attempts")]
    GenerationTimeout { attempts: u32 }, // The asynchronous job never completed within the budget.

    #[error("Generation polling was cancelled")]
    Cancelled, // The owning request went away while a job was being polled.

    #[error(
        "The LLM responsible for narrative text outputted an invalid response. Please try again with a different prompt. ({0})"
    )]
    InvalidGenerativeResponse(String),

    #[error("Persistence error: {0}")]
    Persistence(String), // Store failures other than a benign duplicate key.

    #[error("Failed to save campaign event: {0}")]
    FailedToSaveCampaignEvent(String),

    #[error("Failed to save character: {0}")]
    FailedToSaveCharacter(String),

    #[error("A character has not been created yet for campaign '{campaign}' and player '{player}'")]
    NotFound { campaign: String, player: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable code reported to the client layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Upstream(_) => "UpstreamError",
            Error::GenerationTimeout { .. } => "GenerationTimeout",
            Error::Cancelled => "Cancelled",
            Error::InvalidGenerativeResponse(_) => "InvalidGenerativeResponse",
            Error::Persistence(_) => "PersistenceError",
            Error::FailedToSaveCampaignEvent(_) => "FailedToSaveCampaignEvent",
            Error::FailedToSaveCharacter(_) => "UnableToSaveCharacter",
            Error::NotFound { .. } => "CharacterNotFound",
            Error::Io(_) => "IoError",
        }
    }

    /// Whether the player can reasonably try the same operation again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Upstream(_) | Error::GenerationTimeout { .. } | Error::InvalidGenerativeResponse(_)
        )
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::Upstream(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Upstream(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
