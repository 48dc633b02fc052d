use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The generation backend rejected or failed a call.
    #[error("Generation backend error: {0}")]
    Backend(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A pipeline step was requested before the value it depends on exists.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Worker pool error: {0}")]
    Isolation(String),
}

impl Error {
    /// Whether this error came from the backend (as opposed to bad input).
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::Request(_))
    }

    /// Whether the caller supplied input the pipeline refuses to act on.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidTransition(_))
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::InvalidTransition(_) => 2,
            Error::Config(_) | Error::Toml(_) => 3,
            Error::Backend(_) | Error::Request(_) => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
