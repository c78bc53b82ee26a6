use crate::log::StorageError;

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// A caller-supplied parameter is outside its contract. Raised before the
    /// log is touched.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The query was well formed but there is nothing to return.
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
