use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("sheet is empty: no rows or only blank cells")]
    EmptyGrid,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
