//! Errors raised by domain rules.

use thiserror::Error;

/// Business rule violations independent of storage or transport.
#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Renewals in final processing cannot be deleted.
    #[error("Cannot delete renewals in final processing: {}", contract_numbers.join(", "))]
    RenewalLocked { contract_numbers: Vec<String> },
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_locked_lists_contracts() {
        let err = DomainError::RenewalLocked {
            contract_numbers: vec!["UG-1".into(), "UG-7".into()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot delete renewals in final processing: UG-1, UG-7"
        );
    }
}
