use furnish::{backend::BackendError, errors::StoreError, service::InvalidSearch};
use thiserror::Error;

/// User facing failures of CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Storage operation failed: {message}")]
    Storage { message: String },

    #[error("Search backend failed: {message}")]
    Network { message: String },
}

impl CliError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<InvalidSearch>() {
            Ok(err) => return err.into(),
            Err(err) => err,
        };
        match err.downcast::<BackendError>() {
            Ok(err) => err.into(),
            Err(err) => Self::Storage {
                message: format!("{err:#}"),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::Storage {
                message: "File not found".to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::Storage {
                message: "Permission denied".to_string(),
            },
            _ => Self::Storage {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<InvalidSearch> for CliError {
    fn from(err: InvalidSearch) -> Self {
        let field = match err {
            InvalidSearch::MaxResults(_) => "max_results",
            InvalidSearch::EmptyQuery | InvalidSearch::QueryTooLong(_) => "query",
        };
        Self::validation(field, err.to_string())
    }
}

impl From<BackendError> for CliError {
    fn from(err: BackendError) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}
