//! Error taxonomy shared by every provisioning backend.
//!
//! Messages name the record by its public identity only. Passwords, admin
//! secrets, and API keys never appear in an error.

use serde::{Deserialize, Serialize};

/// Stable, serializable classification of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidProtocol,
    InvalidCredential,
    DuplicateCredential,
    NotFound,
    Forbidden,
    Persistence,
    Firewall,
    PortRangeExhausted,
    RemoteUnavailable,
    RemoteRejected,
    CorrelationMismatch,
    MissingDeviceBinding,
    InvalidDescriptor,
    Unsupported,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidProtocol => "invalid_protocol",
            Self::InvalidCredential => "invalid_credential",
            Self::DuplicateCredential => "duplicate_credential",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Persistence => "persistence",
            Self::Firewall => "firewall",
            Self::PortRangeExhausted => "port_range_exhausted",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::RemoteRejected => "remote_rejected",
            Self::CorrelationMismatch => "correlation_mismatch",
            Self::MissingDeviceBinding => "missing_device_binding",
            Self::InvalidDescriptor => "invalid_descriptor",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Unified error type for all provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Credential '{0}' already exists")]
    DuplicateCredential(String),

    #[error("Credential '{0}' not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Firewall error: {0}")]
    Firewall(String),

    #[error("No free port left at or above {0}")]
    PortRangeExhausted(u16),

    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote service rejected the call ({code}): {message}")]
    RemoteRejected { code: i64, message: String },

    #[error("Response id '{actual}' does not match request id '{expected}'")]
    CorrelationMismatch { expected: String, actual: String },

    #[error("Credential has no device binding")]
    MissingDeviceBinding,

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidProtocol(_) => ErrorKind::InvalidProtocol,
            Self::InvalidCredential(_) => ErrorKind::InvalidCredential,
            Self::DuplicateCredential(_) => ErrorKind::DuplicateCredential,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Firewall(_) => ErrorKind::Firewall,
            Self::PortRangeExhausted(_) => ErrorKind::PortRangeExhausted,
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::RemoteRejected { .. } => ErrorKind::RemoteRejected,
            Self::CorrelationMismatch { .. } => ErrorKind::CorrelationMismatch,
            Self::MissingDeviceBinding => ErrorKind::MissingDeviceBinding,
            Self::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
            Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// HTTP status a web layer should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidProtocol
            | ErrorKind::InvalidCredential
            | ErrorKind::MissingDeviceBinding
            | ErrorKind::InvalidDescriptor => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateCredential => 409,
            ErrorKind::Unsupported => 501,
            ErrorKind::RemoteUnavailable
            | ErrorKind::RemoteRejected
            | ErrorKind::CorrelationMismatch => 502,
            ErrorKind::Persistence | ErrorKind::Firewall | ErrorKind::PortRangeExhausted => 500,
        }
    }

    /// After these, the on-disk state is unknown and must be re-read before retrying.
    pub fn leaves_unknown_state(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Firewall(_))
    }

    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{}: {}", context, err))
    }
}

/// Convenience Result alias.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl From<ProvisionError> for String {
    fn from(e: ProvisionError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::CorrelationMismatch).unwrap();
        assert_eq!(json, "\"correlation_mismatch\"");
        assert_eq!(ErrorKind::CorrelationMismatch.as_str(), "correlation_mismatch");
    }

    #[test]
    fn statuses_follow_kind() {
        assert_eq!(ProvisionError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ProvisionError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(ProvisionError::DuplicateCredential("x".into()).http_status(), 409);
        assert_eq!(ProvisionError::MissingDeviceBinding.http_status(), 400);
        assert_eq!(
            ProvisionError::CorrelationMismatch {
                expected: "a".into(),
                actual: "b".into()
            }
            .http_status(),
            502
        );
    }

    #[test]
    fn only_write_side_failures_leave_unknown_state() {
        assert!(ProvisionError::Persistence("disk".into()).leaves_unknown_state());
        assert!(ProvisionError::Firewall("ufw".into()).leaves_unknown_state());
        assert!(!ProvisionError::DuplicateCredential("x".into()).leaves_unknown_state());
    }
}
