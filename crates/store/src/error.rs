use plantcare_core::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: RecordId },

    #[error("failed to encode or decode {table} record: {source}")]
    Serialization {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    pub(crate) fn not_found<R: crate::Record>(id: RecordId) -> Self {
        Self::NotFound { table: R::TABLE, id }
    }

    pub(crate) fn serialization<R: crate::Record>(source: serde_json::Error) -> Self {
        Self::Serialization { table: R::TABLE, source }
    }

    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}
