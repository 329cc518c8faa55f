//! Error types for the Arc exporter.
//!
//! Every library crate in the workspace returns [`ArcExportError`] via `thiserror`.
//! The host decides how to report it; a failed conversion produces no artifact.

use std::path::PathBuf;

/// Top-level error type for all exporter operations.
#[derive(Debug, thiserror::Error)]
pub enum ArcExportError {
    /// A directive line violates the `key=value` shape, or a nested
    /// comma-separated `key=value` list is malformed.
    #[error("malformed directive `{line}`: {message}")]
    MalformedDirective { line: String, message: String },

    /// The notebook failed the structural check run after a preprocessor.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Notebook or resource JSON that does not fit the data model.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ArcExportError>;

impl ArcExportError {
    /// Create a malformed-directive error for the offending directive line.
    pub fn malformed(line: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedDirective {
            line: line.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ArcExportError::malformed("%sql badtoken", "expected key=value, got `badtoken`");
        assert_eq!(
            err.to_string(),
            "malformed directive `%sql badtoken`: expected key=value, got `badtoken`"
        );

        let err = ArcExportError::validation("nbformat 3 not supported");
        assert!(err.to_string().contains("nbformat 3"));

        let err = ArcExportError::config("file_extension must start with '.'");
        assert_eq!(err.to_string(), "config error: file_extension must start with '.'");
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ArcExportError::io("/tmp/arcexport.toml", source);
        assert!(err.to_string().contains("/tmp/arcexport.toml"));
        assert!(err.to_string().contains("gone"));
    }
}
