use crate::range::RangeError;

/// Errors raised by a [`SheetStore`](crate::SheetStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("invalid range: {0}")]
    Range(#[from] RangeError),

    #[error("values do not fit range {range}: {reason}")]
    Shape { range: String, reason: String },

    #[error("unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("sheets api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
