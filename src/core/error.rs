//! Error types for descriptor evaluation, synthesis and snapshot I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors raised locally by stackform.
///
/// Structural problems in the declared topology are not errors here; they
/// are reported as [`ValidationError`](crate::core::validate::ValidationError)
/// findings or surface later from the provisioning engine.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("cannot read key material from {}: {source}", path.display())]
    KeyMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key material from {} is not valid UTF-8", path.display())]
    KeyEncoding { path: PathBuf },

    #[error("config error: {0}")]
    Config(String),

    #[error("CIDR error: {0}")]
    Cidr(String),

    #[error("unresolved reference: {0}")]
    Reference(String),

    #[error("dependency cycle detected involving: {0}")]
    Cycle(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lock file {}: {message}", path.display())]
    Lock { path: PathBuf, message: String },
}

impl StackError {
    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::KeyMaterial { source, .. } | Self::Io { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
