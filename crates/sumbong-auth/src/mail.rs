//! Account emails carrying single-use links.

use sumbong_core::models::user::User;
use sumbong_core::notifier::OutgoingEmail;

fn link(base: &str, path: &str, raw_token: &str) -> String {
    format!("{}/{path}/{raw_token}", base.trim_end_matches('/'))
}

pub(crate) fn email_verification(user: &User, base: &str, raw_token: &str) -> OutgoingEmail {
    let url = link(base, "verify-email", raw_token);
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Verify your Sumbong email address".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>Please confirm your email address to continue your registration.</p>\
             <p><a href=\"{url}\">Verify email</a></p>\
             <p>This link expires in 24 hours.</p>",
            user.first_name
        ),
    }
}

pub(crate) fn password_reset(user: &User, base: &str, raw_token: &str) -> OutgoingEmail {
    let url = link(base, "reset-password", raw_token);
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Reset your Sumbong password".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>We received a request to reset your password.</p>\
             <p><a href=\"{url}\">Choose a new password</a></p>\
             <p>This link expires in 1 hour. If you did not ask for this, ignore this email.</p>",
            user.first_name
        ),
    }
}

pub(crate) fn password_change(user: &User, base: &str, raw_token: &str) -> OutgoingEmail {
    let url = link(base, "confirm-password-change", raw_token);
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Confirm your Sumbong password change".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>Confirm the password change on your account. You will be asked \
             for your current password once more.</p>\
             <p><a href=\"{url}\">Confirm password change</a></p>\
             <p>This link expires in 1 hour.</p>",
            user.first_name
        ),
    }
}
