//! Sumbong Workflow: the admin and resident operations that sit on top
//! of authentication: credential review, complaints, the per-complaint
//! feedback thread and admin notifications.
//!
//! Every service writes through the repositories first and only then
//! fans out side effects (push, email, notification records). Side
//! effects are best-effort and never fail the primary action.

mod mail;
pub mod complaint;
pub mod feedback;
pub mod notification;
pub mod users;
pub mod verification;

pub use complaint::ComplaintService;
pub use feedback::FeedbackService;
pub use notification::NotificationService;
pub use users::UserService;
pub use verification::{RejectInput, ResubmissionInput, VerificationService};
