use std::fmt;

/// All errors that can originate from migration planning.
///
/// A failing migration tool in execute mode is *not* represented here: the
/// failure is captured in the returned plan. Only caller-initiated
/// cancellation surfaces as an error, because the caller asked for it.
///
/// `Display` and `Error` are implemented by hand: the `Unsupported` variant
/// has a field named `source` that thiserror would otherwise treat as an
/// error source, which `String` is not.
#[derive(Debug)]
pub enum MigrateError {
    /// An endpoint field was empty or malformed; the message is
    /// caller-facing.
    Validation(String),

    /// The compatibility matrix lists no path from source to target.
    Unsupported { source: String, target: String },

    /// The caller aborted an execute-mode run via its cancellation token.
    Cancelled,
}

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrateError::Validation(msg) => write!(f, "validation failed: {msg}"),
            MigrateError::Unsupported { source, target } => {
                write!(f, "migration from {source} to {target} is not supported")
            }
            MigrateError::Cancelled => write!(f, "migration cancelled"),
        }
    }
}

impl std::error::Error for MigrateError {}

pub type Result<T> = std::result::Result<T, MigrateError>;
