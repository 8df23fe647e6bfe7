//! Authentication error types.
//!
//! Each variant carries a stable code surfaced to clients. Credential
//! mismatches share the generic `INVALID_CREDENTIALS` code; account
//! gating states (unverified email, pending approval, admin account on
//! the resident path) are reported explicitly.

use sumbong_core::error::SumbongError;
use sumbong_core::models::user::VerificationStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("admin accounts must sign in through the admin login")]
    AdminAccount,

    #[error("please verify your email address before signing in")]
    EmailNotVerified,

    #[error("{}", not_approved_message(.0))]
    NotApproved(VerificationStatus),

    #[error("invalid or expired token")]
    TokenInvalidOrExpired,

    #[error("session has expired")]
    SessionExpired,

    #[error("invalid session: {0}")]
    SessionInvalid(String),

    #[error("current password is incorrect")]
    WrongCurrentPassword,

    #[error("admin privileges are required")]
    AdminRequired,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

fn not_approved_message(status: &VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Rejected => {
            "your credentials were rejected; please review the email we sent and resubmit"
        }
        VerificationStatus::ResubmissionRequired => {
            "your credentials need to be resubmitted before you can sign in"
        }
        _ => "your account is awaiting credential approval by an administrator",
    }
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::WrongCurrentPassword => "INVALID_CREDENTIALS",
            Self::AdminAccount => "ADMIN_ACCOUNT",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::NotApproved(_) => "ACCOUNT_NOT_APPROVED",
            Self::TokenInvalidOrExpired => "TOKEN_INVALID_OR_EXPIRED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::SessionInvalid(_) => "SESSION_INVALID",
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::Crypto(_) => "CRYPTO",
        }
    }
}

impl From<AuthError> for SumbongError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => SumbongError::Crypto(msg),
            AuthError::AdminRequired => SumbongError::AuthorizationDenied {
                reason: err.to_string(),
            },
            other => SumbongError::AuthenticationFailed {
                code: other.code(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_errors_have_distinct_codes() {
        let codes = [
            AuthError::InvalidCredentials.code(),
            AuthError::AdminAccount.code(),
            AuthError::EmailNotVerified.code(),
            AuthError::NotApproved(VerificationStatus::Pending).code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn not_approved_message_reflects_status() {
        let msg = AuthError::NotApproved(VerificationStatus::Rejected).to_string();
        assert!(msg.contains("rejected"), "{msg}");
    }

    #[test]
    fn converts_to_authentication_failed_with_code() {
        let err: SumbongError = AuthError::EmailNotVerified.into();
        match err {
            SumbongError::AuthenticationFailed { code, .. } => {
                assert_eq!(code, "EMAIL_NOT_VERIFIED")
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }
}
