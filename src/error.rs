use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Malformed URN: {0}")]
    MalformedUrn(String),

    #[error("Policy load failed ({source_name}): {reason}")]
    PolicyLoad { source_name: String, reason: String },

    #[error("Unsupported condition operator: {0}")]
    UnsupportedOperator(String),

    #[error("{subject} is not authorized to perform '{action}' on {resource}")]
    Authorization {
        subject: String,
        action: String,
        resource: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    pub(crate) fn policy_load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        GuardError::PolicyLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the expected "deny" outcome of `authorize`
    pub fn is_authorization(&self) -> bool {
        matches!(self, GuardError::Authorization { .. })
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
