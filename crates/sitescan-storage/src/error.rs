/// Errors that can occur within the storage layer.
///
/// The `ScanStore` methods return `anyhow::Result` at their seams; this
/// type is used for the failure classes callers match on (missing records,
/// rejected lifecycle transitions) so they survive the `anyhow` boundary
/// via downcasting.
///
/// # Examples
///
/// ```rust
/// use sitescan_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "scan",
///     id: "scan-99".to_string(),
/// };
/// assert!(err.to_string().contains("scan"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A scan in a terminal state was asked to move to a non-terminal one.
    /// Scan status transitions are monotonic.
    #[error("Storage: scan {scan_id} is terminal ({from}), refusing transition to {to}")]
    TerminalTransition {
        scan_id: String,
        from: String,
        to: String,
    },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// A stored string column did not parse into its domain enum.
    #[error("Storage: invalid value in column '{column}': {message}")]
    InvalidColumn {
        column: &'static str,
        message: String,
    },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
