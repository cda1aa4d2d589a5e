use thiserror::Error;

use crate::ports::CollaboratorError;
use crate::session::SessionError;

/// Failures raised while processing one webhook turn before the engine
/// has produced a reply. The engine itself never returns these; they
/// cover the surrounding plumbing, parsing, wiring, and delivery.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("malformed inbound payload: {detail}")]
    MalformedInput { detail: String },
}

impl TurnError {
    /// Copy safe to echo back to the end user. Internal detail stays in
    /// the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Session(_) | Self::MalformedInput { .. } => {
                "Sorry, I didn't understand that. Try selecting an option or type 'start'."
            }
            Self::Collaborator(_) => "Something went wrong on our side. Please try again shortly.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TurnError;
    use crate::ports::CollaboratorError;
    use crate::session::SessionError;

    #[test]
    fn session_errors_read_as_not_understood() {
        let error = TurnError::from(SessionError::NoActiveSession { user_id: "u1".to_owned() });
        assert!(error.user_message().contains("didn't understand"));
    }

    #[test]
    fn collaborator_errors_never_leak_detail() {
        let error = TurnError::from(CollaboratorError::Unavailable {
            service: "scheduling",
            detail: "connection refused to 10.0.0.5:8443".to_owned(),
        });
        assert!(!error.user_message().contains("10.0.0.5"));
    }
}
