use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("malformed asset hash: {length} hex chars, expected at least {minimum}")]
    MalformedHash { length: usize, minimum: usize },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn malformed_hash(length: usize, minimum: usize) -> Self {
        Self::MalformedHash { length, minimum }
    }
}
