//! Password policy, hashing and verification using Argon2id.

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use regex::Regex;
use sumbong_core::error::SumbongError;
use validator::ValidationError;

use crate::error::AuthError;

fn argon2() -> Result<Argon2<'static>, AuthError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// The account password policy, one pattern per requirement.
static PASSWORD_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?s)^.{8,}$", "at least 8 characters"),
        (r"\p{Lu}", "an uppercase letter"),
        (r"\p{Ll}", "a lowercase letter"),
        (r"[0-9]", "a number"),
        (r"[^\p{L}\p{N}\s]", "a special character"),
    ]
    .into_iter()
    .map(|(pattern, requirement)| {
        (
            Regex::new(pattern).expect("password rule regex is valid"),
            requirement,
        )
    })
    .collect()
});

fn unmet_requirements(password: &str) -> Vec<&'static str> {
    PASSWORD_RULES
        .iter()
        .filter(|(rule, _)| !rule.is_match(password))
        .map(|(_, requirement)| *requirement)
        .collect()
}

fn policy_message(missing: &[&str]) -> String {
    format!("password must contain {}", missing.join(", "))
}

/// Check a candidate password against the account password policy:
/// at least eight characters with an upper-case letter, a lower-case
/// letter, a digit and a non-alphanumeric character.
pub fn check_password_strength(password: &str) -> Result<(), SumbongError> {
    let missing = unmet_requirements(password);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SumbongError::validation(policy_message(&missing)))
    }
}

/// The same policy as a `validator` custom rule.
pub fn password_policy(password: &str) -> Result<(), ValidationError> {
    let missing = unmet_requirements(password);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new("password_policy").with_message(policy_message(&missing).into()))
    }
}

/// Hash a password into an Argon2id PHC string with a fresh random salt.
///
/// If `pepper` is provided it is prepended to the password first.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    argon2()?
        .hash_password(input, &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    // Parameters are read from the PHC string itself.
    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}
