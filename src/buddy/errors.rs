use thiserror::Error;

/// Reason a sync payload was refused. Every variant surfaces to the user the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDefect {
    /// The payload does not start with the magic tag (not our format).
    MissingTag,
    /// Base64 or percent-decoding failed.
    Encoding,
    /// Decoded text is not a well-formed snapshot record, or exceeds the size limit.
    Malformed,
    /// The snapshot was produced by an incompatible codec version.
    UnsupportedVersion,
    /// Stored checksum does not match the recomputed one.
    ChecksumMismatch,
}

impl PayloadDefect {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadDefect::MissingTag => "missing_tag",
            PayloadDefect::Encoding => "encoding",
            PayloadDefect::Malformed => "malformed",
            PayloadDefect::UnsupportedVersion => "unsupported_version",
            PayloadDefect::ChecksumMismatch => "checksum_mismatch",
        }
    }
}

/// Errors that can arise while evaluating progression, syncing, or touching the store.
#[derive(Debug, Error)]
pub enum BuddyError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors (seed files, sync records).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Authored content references something that does not resolve.
    #[error("configuration defect: {0}")]
    ConfigurationDefect(String),

    /// A sync payload could not be accepted.
    #[error("cannot read this code")]
    CorruptPayload(PayloadDefect),

    /// The persisted store could not be opened or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A first-run seeding step failed; earlier steps stay written and a retry is safe.
    #[error("initialization failed during {step}: {source}")]
    InitializationFailed {
        step: &'static str,
        #[source]
        source: Box<BuddyError>,
    },

    /// The initialization progress listener went away before seeding finished.
    #[error("initialization cancelled")]
    Cancelled,
}

impl BuddyError {
    /// True for any failure a retry button should be offered for.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BuddyError::StorageUnavailable(_)
                | BuddyError::InitializationFailed { .. }
                | BuddyError::Cancelled
        )
    }
}
