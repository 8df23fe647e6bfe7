//! Emails sent on credential review decisions.

use chrono::{DateTime, Utc};
use sumbong_core::models::user::User;
use sumbong_core::notifier::OutgoingEmail;

fn notes_block(admin_notes: Option<&str>) -> String {
    admin_notes
        .map(|n| format!("<p><strong>Notes from the administrator:</strong> {n}</p>"))
        .unwrap_or_default()
}

pub(crate) fn credentials_approved(user: &User, admin_notes: Option<&str>) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Your Sumbong account has been approved".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>Your residency credentials have been reviewed and approved. \
             You can now sign in and file complaints.</p>{}",
            user.first_name,
            notes_block(admin_notes)
        ),
    }
}

pub(crate) fn credentials_rejected(
    user: &User,
    issue_details: &str,
    required_actions: &str,
    admin_notes: Option<&str>,
) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Action needed: your Sumbong credentials were not accepted".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>We could not verify the credentials you submitted.</p>\
             <p><strong>Issue found:</strong> {issue_details}</p>\
             <p><strong>What to do next:</strong> {required_actions}</p>{}",
            user.first_name,
            notes_block(admin_notes)
        ),
    }
}

pub(crate) fn resubmission_requested(
    user: &User,
    reason: &str,
    deadline: DateTime<Utc>,
    admin_notes: Option<&str>,
) -> OutgoingEmail {
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Please resubmit your Sumbong credentials".into(),
        html: format!(
            "<p>Hello {},</p>\
             <p>An administrator has asked you to upload your credentials again.</p>\
             <p><strong>Reason:</strong> {reason}</p>\
             <p>Please resubmit before {}.</p>{}",
            user.first_name,
            deadline.format("%B %-d, %Y"),
            notes_block(admin_notes)
        ),
    }
}
