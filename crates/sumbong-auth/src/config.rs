//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Session token lifetime in seconds (default: 2_592_000 = 30 days).
    pub session_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Email verification link lifetime (default: 86_400 = 24 hours).
    pub email_verification_ttl_secs: u64,
    /// Password reset link lifetime (default: 3600 = 1 hour).
    pub password_reset_ttl_secs: u64,
    /// Password change confirmation lifetime (default: 3600 = 1 hour).
    pub password_change_ttl_secs: u64,
    /// Public URL of the web client; links in emails point here.
    pub app_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            session_lifetime_secs: 2_592_000,
            jwt_issuer: "sumbong".into(),
            pepper: None,
            email_verification_ttl_secs: 86_400,
            password_reset_ttl_secs: 3600,
            password_change_ttl_secs: 3600,
            app_base_url: "http://localhost:5173".into(),
        }
    }
}
