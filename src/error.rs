use thiserror::Error;

/// Error taxonomy for the control plane (spec §7).
///
/// Every public setter and send operation returns one of these instead of
/// panicking; callers decide whether to retry, back off, or surface the
/// message to a human.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CwError {
    /// Argument out of range, conflicting tone-slope arguments, or an
    /// unknown symbol in a representation string.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// A character has no Morse mapping.
    #[error("no morse mapping for character '{0}'")]
    NotFound(char),

    /// The tone queue is at or above its high-water mark; back off.
    #[error("tone queue full, back off")]
    Again,

    /// The sink or key is currently held by the opposite keying subsystem.
    #[error("resource busy: {0}")]
    Busy(String),

    /// The selected audio backend refused to open.
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),

    /// Sample-rate probe failed, thread creation failed, or other
    /// unrecoverable internal condition.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type CwResult<T> = Result<T, CwError>;
