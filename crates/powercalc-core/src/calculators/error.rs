use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// User input breaks a calculator rule. The message is ready for display.
    #[error("{0}")]
    Validation(String),

    #[error("Unknown calculator: {0}")]
    NotFound(String),

    #[error("{field} is not a number")]
    NotANumber { field: String },
}

impl CalcError {
    pub(crate) fn validation(message: &str) -> Self {
        CalcError::Validation(message.to_string())
    }

    /// Whether the user can fix this by correcting the form.
    pub fn is_validation(&self) -> bool {
        matches!(self, CalcError::Validation(_))
    }

    /// Render the error the way the result area shows it.
    pub fn display(&self) -> String {
        match self {
            CalcError::Validation(msg) => format!("[error] {}", msg),
            other => format!("[unexpected] {}", other),
        }
    }
}
