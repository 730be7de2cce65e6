//! # Jour Error Types
//!
//! Every failure the journal core can report. Each variant maps to a stable
//! error code and to the exit status the `jw` binary uses for it.
//!
//! ## Error Categories
//!
//! - **Configuration**: no usable journal path could be resolved
//! - **Concurrency**: the named lock was not acquired in time
//! - **Journal State**: malformed or empty journal, misuse of a session
//! - **System**: I/O failures while loading or dumping the journal

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a clean run.
pub const EXIT_OK: i32 = 0;
/// Exit status clap uses for argument parse errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit status for configuration errors.
pub const EXIT_CONFIG: i32 = 3;
/// Exit status when the lock was not acquired within the timeout.
pub const EXIT_CONCURRENCY: i32 = 4;
/// Exit status for every other runtime failure.
pub const EXIT_RUNTIME: i32 = 5;

/// Result type for all journal operations.
pub type JourResult<T> = Result<T, JourError>;

/// Error enumeration for journal operations.
#[derive(Debug, Error)]
pub enum JourError {
    /// E_CONFIG - No usable journal path
    ///
    /// Fatal; retrying without changing the configuration will not help.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// E_UNREACHABLE - The journal file does not exist and creation was not requested
    ///
    /// Callers react to this by switching to the emergency journal.
    #[error("Journal file in '{}' unreachable", path.display())]
    JournalUnreachable {
        /// Path that was probed
        path: PathBuf,
    },

    /// E_CONCURRENCY - Lock not acquired within the timeout
    ///
    /// The journal has not been touched and the invocation can be retried.
    #[error("Timeout of {timeout_secs}s was reached, but the lock '{lock_name}' wasn't acquired")]
    Concurrency {
        /// Name of the contended lock
        lock_name: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// E_MALFORMED_JOURNAL - The last line does not carry a parsable index
    #[error(
        "The last line of '{}' is not well-formed ({reason}). Check it manually",
        path.display()
    )]
    MalformedJournal {
        /// Journal being operated on
        path: PathBuf,
        /// What was wrong with the line
        reason: String,
    },

    /// E_EMPTY_JOURNAL - The operation needs at least one line
    #[error("The journal is empty.")]
    EmptyJournal,

    /// E_SESSION_STATE - Operation outside an open session
    #[error("No active journal session: {operation} requires an open session")]
    SessionState {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// E_INVALID_INPUT - Content or tag name the journal cannot store
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected
        reason: String,
    },

    /// E_IO - I/O failure
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" on '{}'", p.display())).unwrap_or_default())]
    Io {
        /// Operation that failed
        operation: String,
        /// Path involved, if any
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl JourError {
    /// Builds an I/O error with an optional path and an operation name.
    pub fn io<P, S>(path: P, operation: S, source: std::io::Error) -> Self
    where
        P: Into<Option<PathBuf>>,
        S: Into<String>,
    {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input<M: Into<String>>(reason: M) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns the stable error code for this variant.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E_CONFIG",
            Self::JournalUnreachable { .. } => "E_UNREACHABLE",
            Self::Concurrency { .. } => "E_CONCURRENCY",
            Self::MalformedJournal { .. } => "E_MALFORMED_JOURNAL",
            Self::EmptyJournal => "E_EMPTY_JOURNAL",
            Self::SessionState { .. } => "E_SESSION_STATE",
            Self::InvalidInput { .. } => "E_INVALID_INPUT",
            Self::Io { .. } => "E_IO",
        }
    }

    /// Returns the process exit status the CLI uses for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::JournalUnreachable { .. } => EXIT_CONFIG,
            Self::Concurrency { .. } => EXIT_CONCURRENCY,
            _ => EXIT_RUNTIME,
        }
    }

    /// Label printed in front of the message, e.g. `[CONCURRENCY ERROR]`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::JournalUnreachable { .. } => "CONFIG ERROR",
            Self::Concurrency { .. } => "CONCURRENCY ERROR",
            _ => "RUNTIME ERROR",
        }
    }
}
