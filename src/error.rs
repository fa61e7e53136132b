//! Error taxonomy shared by every module of the crate.

use std::fmt;

use thiserror::Error;

/// External collaborator that failed to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Directions,
    Places,
    Backend,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Directions => "directions provider",
            Provider::Places => "places provider",
            Provider::Backend => "ride backend",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed encoded path at byte {offset}: {reason}")]
    MalformedPath { offset: usize, reason: &'static str },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("seat count must be between 1 and {max}, got {count}")]
    InvalidSeatCount { count: i64, max: u32 },
    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable { provider: Provider, reason: String },
    #[error("cannot {action} while the session is {state}")]
    InvalidTransition { action: &'static str, state: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn unavailable(provider: Provider, reason: impl fmt::Display) -> Self {
        Error::ProviderUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }

    /// True for failures of an external collaborator rather than bad data.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Error::ProviderUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
