use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid library root: {0}")]
    InvalidRoot(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Failures surfaced to external callers of the resolver.
///
/// Scan-time problems never show up here; they are logged and collected as
/// [`crate::ScanWarning`]s instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("Resource {kind} not available for {id}")]
    ResourceNotFound { id: String, kind: String },

    #[error("Failed to read {kind} for {id}: {reason}")]
    ReadError {
        id: String,
        kind: String,
        reason: String,
    },

    #[error("Invalid resource kind: {0}")]
    InvalidKind(String),
}

impl ResolveError {
    /// Entry or resource absent (404-equivalent).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound { .. } | Self::ResourceNotFound { .. }
        )
    }

    pub fn entry_not_found(id: impl Into<String>) -> Self {
        Self::EntryNotFound { id: id.into() }
    }

    pub fn resource_not_found(id: impl Into<String>, kind: impl ToString) -> Self {
        Self::ResourceNotFound {
            id: id.into(),
            kind: kind.to_string(),
        }
    }
}

impl From<crate::kind::KindParseError> for ResolveError {
    fn from(err: crate::kind::KindParseError) -> Self {
        Self::InvalidKind(err.to_string())
    }
}
