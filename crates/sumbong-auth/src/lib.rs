//! Sumbong Auth: account lifecycle, password policy and hashing,
//! session JWT issuance/validation, and single-use email tokens.

pub mod config;
pub mod error;
mod mail;
pub mod password;
pub mod principal;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use principal::{AdminPrincipal, Principal};
pub use service::{
    AuthOutput, AuthService, OAuthProfile, OAuthSignup, RegisterInput, CHECK_INBOX_MESSAGE,
};
pub use token::SessionClaims;
