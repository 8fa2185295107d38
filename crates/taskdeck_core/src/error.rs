use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("data_corruption - {0}")]
    DataCorruption(String),
    #[error("persistence_failure - {0}")]
    Persistence(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn data_corruption<M: Into<String>>(message: M) -> Self {
        Self::DataCorruption(message.into())
    }

    pub fn persistence<M: Into<String>>(message: M) -> Self {
        Self::Persistence(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::DataCorruption(_) => "data_corruption",
            Self::Persistence(_) => "persistence_failure",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message) => message,
            Self::DataCorruption(message) => message,
            Self::Persistence(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}
