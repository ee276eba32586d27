//! Error types for convergence operations.
//!
//! Every failure surfaced by the engine maps to exactly one [`ErrorKind`].
//! Kinds drive how the executor reports a failed resource and how the
//! requirement ledger turns a failing assertion into a raised error.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for convergence operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of convergence errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A property rejected a value.
    ValidationFailed,
    /// A property was read before being set and has no default.
    Required,
    /// An assertion failed outside why-run mode.
    PreconditionFailed,
    /// The selected provider intentionally does not implement the operation.
    UnsupportedOperation,
    /// A required system binary or file is absent.
    MissingPrerequisite,
    /// A shell command exited with an unaccepted status.
    ExternalCommandFailed,
    /// A nil set was resolved as a get while deprecations are errors.
    Deprecated,
    /// Resource types, registry entries or run lists are inconsistent.
    Configuration,
    /// Filesystem access failed.
    Io,
}

impl ErrorKind {
    /// Get a user-friendly description of this error kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::Required => "Required property missing",
            Self::PreconditionFailed => "Precondition failed",
            Self::UnsupportedOperation => "Unsupported operation",
            Self::MissingPrerequisite => "Missing prerequisite",
            Self::ExternalCommandFailed => "External command failed",
            Self::Deprecated => "Deprecated usage",
            Self::Configuration => "Configuration error",
            Self::Io => "Filesystem error",
        }
    }

    /// Get actionable advice for resolving this error kind.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Check the property value against its declared constraints",
            Self::Required => "Set the property on the resource or give it a default",
            Self::PreconditionFailed => {
                "Converge the resources this one depends on first, or run with --why-run to inspect"
            }
            Self::UnsupportedOperation => {
                "Choose a different action or provider for this platform"
            }
            Self::MissingPrerequisite => "Install the missing binary or create the missing file",
            Self::ExternalCommandFailed => "Inspect the command's stderr for details",
            Self::Deprecated => "Remove the explicit nil assignment",
            Self::Configuration => "Fix the resource declarations or provider registrations",
            Self::Io => "Check file permissions and paths",
        }
    }

    /// Stable snake_case name used in reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::Required => "required",
            Self::PreconditionFailed => "precondition_failed",
            Self::UnsupportedOperation => "unsupported_operation",
            Self::MissingPrerequisite => "missing_prerequisite",
            Self::ExternalCommandFailed => "external_command_failed",
            Self::Deprecated => "deprecated",
            Self::Configuration => "configuration",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while declaring or converging resources.
#[derive(Debug, Error)]
pub enum Error {
    /// A property rejected a value.
    #[error("{0}")]
    ValidationFailed(String),

    /// A required property was read with nothing set and no default.
    #[error("{property} is required")]
    Required {
        /// Property name.
        property: String,
    },

    /// An assertion failed in normal mode.
    #[error("{0}")]
    PreconditionFailed(String),

    /// The provider does not support the operation.
    #[error("{0}")]
    UnsupportedOperation(String),

    /// A binary or file the provider depends on is absent.
    #[error("{0}")]
    MissingPrerequisite(String),

    /// A shell command failed.
    #[error("command `{command}` failed with status {status}: {stderr}")]
    ExternalCommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status, or -1 when killed.
        status: i32,
        /// Trimmed stderr (or a reason when no output exists).
        stderr: String,
    },

    /// Nil-set-as-get while deprecations are treated as errors.
    #[error("{0}")]
    Deprecated(String),

    /// Inconsistent declarations or registrations.
    #[error("{0}")]
    Configuration(String),

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an error of the given kind carrying only a message.
    ///
    /// Used by the requirement ledger, whose assertions declare a kind and
    /// a message but no structured payload.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::ValidationFailed => Self::ValidationFailed(message),
            ErrorKind::Required => Self::Required { property: message },
            ErrorKind::PreconditionFailed => Self::PreconditionFailed(message),
            ErrorKind::UnsupportedOperation => Self::UnsupportedOperation(message),
            ErrorKind::MissingPrerequisite => Self::MissingPrerequisite(message),
            ErrorKind::ExternalCommandFailed => Self::ExternalCommandFailed {
                command: String::new(),
                status: -1,
                stderr: message,
            },
            ErrorKind::Deprecated => Self::Deprecated(message),
            ErrorKind::Configuration => Self::Configuration(message),
            ErrorKind::Io => Self::Io {
                path: PathBuf::new(),
                source: io::Error::other(message),
            },
        }
    }

    /// Get the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Required { .. } => ErrorKind::Required,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::MissingPrerequisite(_) => ErrorKind::MissingPrerequisite,
            Self::ExternalCommandFailed { .. } => ErrorKind::ExternalCommandFailed,
            Self::Deprecated(_) => ErrorKind::Deprecated,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
