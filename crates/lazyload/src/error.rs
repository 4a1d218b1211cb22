//! Error taxonomy and the single reporting sink.
//!
//! Nothing in the loader is ever thrown back to the caller. Every failure is
//! reported through [`report`] and then surfaces only as a per-entry
//! [`Outcome`](crate::outcome::Outcome) in the batch report.

use std::time::Duration;

/// Prefix carried by every error line the loader emits.
pub const ERROR_PREFIX: &str = "~ lazyload error:";

/// Why a single asset could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// No extension could be extracted, or it contains non-word characters.
    #[error("file extension is not specified ( {0} )")]
    Classification(String),

    /// The extension is well-formed but no loader handles it.
    #[error("unsupported extension ( {0} )")]
    UnsupportedType(String),

    /// The network never delivered the asset.
    #[error("transport failure for {path}: {cause}")]
    Transport { path: String, cause: TransportCause },

    /// A `.less` asset was requested but no compiler is installed.
    #[error("can't load .less file {0}, no LESS compiler is installed")]
    MissingCompiler(String),

    /// The LESS compiler rejected the source.
    #[error("failed to compile {path}: {message}")]
    Compile { path: String, message: String },
}

/// The signal that identified a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportCause {
    #[error("element fired an error event")]
    ErrorEvent,

    #[error("no load signal after {checks} checks")]
    PollExhausted { checks: u32 },

    #[error("no load signal within {0:?}")]
    BudgetElapsed(Duration),

    #[error("load was cancelled")]
    Cancelled,

    #[error("element event stream closed before settling")]
    Detached,

    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Another request already loaded this path and that load failed.
    #[error("an earlier request for this path failed")]
    EarlierAttemptFailed,
}

impl LoadError {
    pub(crate) fn transport(path: &str, cause: TransportCause) -> Self {
        LoadError::Transport {
            path: path.to_string(),
            cause,
        }
    }

    /// Whether the fallback resolver may move on to the next candidate.
    pub fn is_recoverable(&self) -> bool {
        match self {
            LoadError::Classification(_) | LoadError::UnsupportedType(_) => true,
            LoadError::Transport { cause, .. } => {
                !matches!(cause, TransportCause::Cancelled | TransportCause::Fetch(_))
            }
            LoadError::MissingCompiler(_) | LoadError::Compile { .. } => false,
        }
    }
}

/// Report an internal error. This is the only place loader errors are logged.
pub fn report(err: &LoadError) {
    tracing::warn!(target: "lazyload", "{ERROR_PREFIX} {err}");
}
