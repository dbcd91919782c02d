use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// A construction or configuration input was out of range.
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },
    /// An automation curve ran out of event slots.
    AutomationFull { capacity: usize },
    /// The control queue to the render thread is full.
    QueueFull,
}

impl SynthError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SynthError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for `{field}`: {reason}")
            }
            SynthError::AutomationFull { capacity } => {
                write!(f, "Automation curve is full ({capacity} events)")
            }
            SynthError::QueueFull => write!(f, "Control queue is full"),
        }
    }
}

impl std::error::Error for SynthError {}
