use thiserror::Error;

/// Errors produced while turning a manifest database into a document
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The database could not be opened or read, or a table/column is missing
    #[error("database error: {0}")]
    Io(#[from] rusqlite::Error),

    /// A payload could not be decoded as 7-bit text
    #[error("cannot decode payload in table {table}: {reason}")]
    Decode { table: String, reason: String },

    /// A payload is not a JSON object
    #[error("malformed payload in table {table}: {reason}")]
    MalformedPayload { table: String, reason: String },

    /// Every synthesized key in the configured range is already taken
    #[error("no free fallback key left in table {table} ({available} keys in range)")]
    FallbackKeysExhausted { table: String, available: u64 },

    #[error("failed to serialize manifest document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;
