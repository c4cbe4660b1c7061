#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("corrupt {collection} collection: {message}")]
    Corrupt {
        collection: &'static str,
        message: String,
    },
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl StoreError {
    pub(crate) fn corrupt(collection: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            collection,
            message: message.into(),
        }
    }
}
