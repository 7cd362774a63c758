#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage error on {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("malformed record {key}: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }

    pub fn serialization(key: &str, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.to_string(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
