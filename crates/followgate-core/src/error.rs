use thiserror::Error;

/// Failures the verification flow can report. None of them is fatal to the page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The popup window could not be created. Surfaced to the user immediately.
    #[error("popup blocked: {0}")]
    PopupBlocked(String),

    /// An inbound message without a recognised shape or generation tag.
    #[error("malformed signal")]
    MalformedSignal,

    /// A signal from a popup that has since been superseded.
    #[error("stale signal for generation {got} (current {current})")]
    StaleSignal { got: u64, current: u64 },
}

impl GateError {
    /// Whether the user needs to be told about this error.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GateError::PopupBlocked(_))
    }
}
