//! Error types for contentseed.
//!
//! Library crates use [`ContentSeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all contentseed operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentSeedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure, throttling, or a server-side error from the remote API.
    #[error("network error: {0}")]
    Network(String),

    /// The remote API rejected the payload or the request.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A field resolver failed.
    #[error("resolver error in field '{field}': {message}")]
    Resolver { field: String, message: String },

    /// No template is registered for the requested content type.
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Template or data file parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContentSeedError>;

/// Coarse classification of a failure, for callers that want to react to the
/// cause without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    Validation,
    Resolver,
    UnknownContentType,
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Resolver => "resolver",
            Self::UnknownContentType => "unknown_content_type",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl ContentSeedError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a resolver error not yet attributed to a field.
    ///
    /// The factory fills in the field name when the error surfaces from a
    /// field resolution.
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver {
            field: String::new(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute an unattributed resolver error to `field`. Other errors pass
    /// through unchanged so nested creation failures keep their kind.
    pub fn in_field(self, field: &str) -> Self {
        match self {
            Self::Resolver { field: f, message } if f.is_empty() => Self::Resolver {
                field: field.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Validation { .. } => FailureKind::Validation,
            Self::Resolver { .. } => FailureKind::Resolver,
            Self::UnknownContentType(_) => FailureKind::UnknownContentType,
            Self::Config { .. } | Self::Io { .. } | Self::Parse { .. } => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ContentSeedError::config("missing space id");
        assert_eq!(err.to_string(), "config error: missing space id");

        let err = ContentSeedError::UnknownContentType("post".into());
        assert_eq!(err.to_string(), "unknown content type: post");
    }

    #[test]
    fn resolver_error_is_attributed_once() {
        let err = ContentSeedError::resolver("boom").in_field("hero");
        assert_eq!(err.to_string(), "resolver error in field 'hero': boom");

        // Already attributed by a nested call: keep the innermost field.
        let err = err.in_field("outer");
        assert!(err.to_string().contains("'hero'"));
    }

    #[test]
    fn in_field_keeps_other_kinds() {
        let err = ContentSeedError::Network("connection reset".into()).in_field("author");
        assert_eq!(err.kind(), FailureKind::Network);
    }

    #[test]
    fn kind_classification() {
        assert_eq!(
            ContentSeedError::validation("bad field").kind(),
            FailureKind::Validation
        );
        assert_eq!(ContentSeedError::resolver("x").kind(), FailureKind::Resolver);
        assert_eq!(ContentSeedError::parse("x").kind(), FailureKind::Other);
        assert_eq!(FailureKind::UnknownContentType.to_string(), "unknown_content_type");
    }
}
