//! Input normalization and shape checks shared by the service crates.

use std::sync::LazyLock;

use regex::Regex;
use validator::Validate;

use crate::error::{SumbongError, SumbongResult};

/// Trim and lower-case an email address. Lookups and uniqueness are
/// case-insensitive because every stored address goes through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Philippine mobile numbers: `09XXXXXXXXX` or `+639XXXXXXXXX`.
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+63|0)9[0-9]{9}$").expect("phone regex is valid"));

pub const PHONE_HINT: &str = "phone must be a mobile number like 09XXXXXXXXX or +639XXXXXXXXX";

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Run the `validator` rules derived on `value`, folding every failed
/// rule into one validation error. Messages are ordered by field name.
pub fn validated<T: Validate>(value: &T) -> SumbongResult<()> {
    value.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        SumbongError::validation(messages.join("; "))
    })
}

/// Require a non-blank value, returning it trimmed.
pub fn required(field: &str, value: &str) -> SumbongResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SumbongError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional free-text value, mapping blank to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Juan@Example.COM "), "juan@example.com");
    }

    #[derive(Validate)]
    struct Contact {
        #[validate(email(message = "email address is invalid"))]
        email: String,
        #[validate(regex(path = *PHONE_RE, message = "phone is invalid"))]
        phone: String,
        #[validate(length(min = 1))]
        files: Vec<String>,
    }

    fn contact(email: &str, phone: &str) -> Contact {
        Contact {
            email: email.into(),
            phone: phone.into(),
            files: vec!["id.jpg".into()],
        }
    }

    #[test]
    fn derived_rules_become_one_validation_error() {
        assert!(validated(&contact("juan.dela.cruz@barangay.gov.ph", "09171234567")).is_ok());

        for email in ["not-an-email", "@b.com", "a b@c.com", "a@@b.com", "a,b@c.com"] {
            let err = validated(&contact(email, "09171234567")).unwrap_err();
            assert_eq!(err.to_string(), "Validation error: email address is invalid", "{email}");
        }

        let err = validated(&Contact {
            files: Vec::new(),
            ..contact("bad", "123")
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: email address is invalid; files is invalid; phone is invalid"
        );
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("09171234567"));
        assert!(is_valid_phone("+639171234567"));
        assert!(!is_valid_phone("0917123456"));
        assert!(!is_valid_phone("08171234567"));
        assert!(!is_valid_phone("9171234567"));
        assert!(!is_valid_phone("0917-123-4567"));
    }

    #[test]
    fn required_rejects_blank() {
        assert!(required("location", "   ").is_err());
        assert_eq!(required("location", " Purok 3 ").unwrap(), "Purok 3");
    }
}
