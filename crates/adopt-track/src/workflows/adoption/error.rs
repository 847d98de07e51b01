use super::guards::IssuanceGuard;

/// Error taxonomy shared by every adoption workflow operation. All variants
/// are terminal for the triggering request; retries, where sensible at all,
/// belong to the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed or missing required input. Carries every offending field
    /// so the caller can fix them in one pass.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Business-rule preconditions not met. Always the complete failing
    /// set, never just the first blocker.
    #[error("agreement guards failed: {}", describe_guards(.failing))]
    Guard { failing: Vec<IssuanceGuard> },

    /// Action attempted from a state that does not permit it.
    #[error("{entity} {id} does not allow {action} while {state}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        state: &'static str,
        action: &'static str,
    },

    /// Uniqueness or concurrency violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced entity does not exist or the caller lacks visibility.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The caller's role does not permit the action.
    #[error("role {role} may not {action}")]
    Forbidden {
        role: &'static str,
        action: &'static str,
    },
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

fn describe_guards(failing: &[IssuanceGuard]) -> String {
    failing
        .iter()
        .map(|guard| guard.label())
        .collect::<Vec<_>>()
        .join(", ")
}
