//! Error types for the Grimoire pipeline.
//!
//! Every fatal condition the pipeline can hit maps onto one of four content
//! categories (structural, integrity, broken link, policy) or onto an
//! environmental failure (I/O, JSON, configuration). There is no recoverable
//! content error: the first one aborts the run.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for Grimoire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input cannot be read as a document, or a mandatory field is missing.
    #[error("StructuralError: {message}")]
    Structural {
        /// What was wrong with the input.
        message: String,
    },

    /// Duplicate ids or filenames, dangling sibling references, bad enums.
    #[error("IntegrityError: {message}")]
    Integrity {
        /// What invariant was violated.
        message: String,
    },

    /// A cross-document reference that the link index cannot resolve.
    #[error("BrokenLink: \"{source_doc}\" references unknown \"{token}\" in pack \"{pack}\"")]
    BrokenLink {
        /// Name of the document holding the reference.
        source_doc: String,
        /// Pack the reference points into.
        pack: String,
        /// The unresolved target token.
        token: String,
    },

    /// Disallowed content shape (inline images, world-scoped references, ...).
    #[error("PolicyError: {message}")]
    Policy {
        /// What policy was violated.
        message: String,
    },

    /// I/O error with the path that triggered it.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error outside document parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic.
        message: String,
    },

    /// A worker task panicked or was cancelled.
    #[error("Task failed: {message}")]
    Task {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Creates a new structural error.
    pub fn structural<S: Into<String>>(message: S) -> Self {
        Error::Structural {
            message: message.into(),
        }
    }

    /// Creates a new integrity error.
    pub fn integrity<S: Into<String>>(message: S) -> Self {
        Error::Integrity {
            message: message.into(),
        }
    }

    /// Creates a new broken-link error.
    pub fn broken_link<D, P, T>(source_doc: D, pack: P, token: T) -> Self
    where
        D: Into<String>,
        P: Into<String>,
        T: Into<String>,
    {
        Error::BrokenLink {
            source_doc: source_doc.into(),
            pack: pack.into(),
            token: token.into(),
        }
    }

    /// Creates a new policy error.
    pub fn policy<S: Into<String>>(message: S) -> Self {
        Error::Policy {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new task error.
    pub fn task<S: Into<String>>(message: S) -> Self {
        Error::Task {
            message: message.into(),
        }
    }

    /// Wraps an I/O error together with the path that produced it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns the taxonomy name used in reports.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Structural { .. } | Error::Json(_) => "StructuralError",
            Error::Integrity { .. } => "IntegrityError",
            Error::BrokenLink { .. } => "BrokenLink",
            Error::Policy { .. } => "PolicyError",
            Error::Io { .. } => "IoError",
            Error::Config { .. } => "ConfigError",
            Error::Task { .. } => "TaskError",
        }
    }

    /// Returns `true` for errors caused by the content itself rather than
    /// by the environment the pipeline runs in.
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            Error::Structural { .. }
                | Error::Integrity { .. }
                | Error::BrokenLink { .. }
                | Error::Policy { .. }
        )
    }

    /// Prefixes the message with the document and pack that caused it.
    ///
    /// Broken links already name their source document and are returned
    /// unchanged.
    pub fn in_document(self, pack: &str, document: &str) -> Self {
        let context = |message: String| format!("{message} (document \"{document}\" in pack \"{pack}\")");
        match self {
            Error::Structural { message } => Error::Structural {
                message: context(message),
            },
            Error::Integrity { message } => Error::Integrity {
                message: context(message),
            },
            Error::Policy { message } => Error::Policy {
                message: context(message),
            },
            other => other,
        }
    }
}
