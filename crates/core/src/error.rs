use esfinteres_sheets::SheetsError;
use thiserror::Error;

/// Failures of the record store and the family resolver.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no activity of {owner} at {timestamp}")]
    ActivityNotFound { owner: String, timestamp: String },

    #[error("invitee is not registered: {0}")]
    InviteeNotRegistered(String),

    #[error("{0} is already a family member")]
    AlreadyMember(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to encode activity details: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("backend unavailable: {0}")]
    Backend(#[from] SheetsError),
}

impl StoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UserNotFound(_) | StoreError::ActivityNotFound { .. } => "not-found",
            StoreError::InviteeNotRegistered(_) => "invitee-not-registered",
            StoreError::AlreadyMember(_) => "already-member",
            StoreError::InvalidInput(_) | StoreError::Encoding(_) => "invalid-input",
            StoreError::Backend(_) => "backend-unavailable",
        }
    }
}

/// Outcomes of the access-control gate that stop a request.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{feature} requires a premium account")]
    PremiumRequired { feature: &'static str },

    #[error("monthly limit of {limit} records reached ({monthly_count} this month)")]
    LimitReached { monthly_count: usize, limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_codes_are_stable() {
        assert_eq!(StoreError::UserNotFound("a@x.com".into()).code(), "not-found");
        assert_eq!(
            StoreError::InviteeNotRegistered("b@x.com".into()).code(),
            "invitee-not-registered"
        );
        assert_eq!(StoreError::AlreadyMember("b@x.com".into()).code(), "already-member");
        assert_eq!(
            StoreError::Backend(SheetsError::UnknownSheet("Users".into())).code(),
            "backend-unavailable"
        );
    }
}
