//! Shared application state: one instance of every service, wired to
//! the same database handle and connection registry.

use std::sync::Arc;
use std::time::Duration;

use sumbong_auth::AuthService;
use sumbong_core::error::SumbongResult;
use sumbong_db::repository::{
    SurrealComplaintRepository, SurrealNotificationRepository, SurrealUserRepository,
};
use sumbong_realtime::ConnectionRegistry;
use sumbong_workflow::{
    ComplaintService, FeedbackService, NotificationService, UserService, VerificationService,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::config::Config;
use crate::mailer::AppMailer;
use crate::oauth::GoogleIdentityVerifier;

pub type Users = SurrealUserRepository<Any>;
pub type Complaints = SurrealComplaintRepository<Any>;
pub type Notifications = SurrealNotificationRepository<Any>;
pub type Publisher = Arc<ConnectionRegistry>;

pub struct AppState {
    pub auth: AuthService<Users, AppMailer>,
    pub users: UserService<Users>,
    pub verification: VerificationService<Users, Notifications, AppMailer, Publisher>,
    pub complaints: ComplaintService<Complaints, Users, Notifications, Publisher>,
    pub feedback: FeedbackService<Complaints, Users, Notifications, Publisher>,
    pub notices: NotificationService<Users, Notifications, Publisher>,
    pub registry: Publisher,
    pub google: Option<GoogleIdentityVerifier>,
    pub heartbeat_interval: Duration,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Surreal<Any>, config: &Config) -> SumbongResult<SharedState> {
        let mailer = AppMailer::from_config(&config.mail)?;
        let registry = Arc::new(ConnectionRegistry::new(config.realtime.buffer_size));

        let users = SurrealUserRepository::new(db.clone());
        let complaints = SurrealComplaintRepository::new(db.clone());
        let notifications = SurrealNotificationRepository::new(db);

        let notices = || {
            NotificationService::new(
                users.clone(),
                notifications.clone(),
                Arc::clone(&registry),
            )
        };

        Ok(Arc::new(Self {
            auth: AuthService::new(users.clone(), mailer.clone(), config.auth.clone()),
            users: UserService::new(users.clone()),
            verification: VerificationService::new(users.clone(), mailer, notices()),
            complaints: ComplaintService::new(complaints.clone(), notices()),
            feedback: FeedbackService::new(complaints, notices()),
            notices: notices(),
            registry: Arc::clone(&registry),
            google: GoogleIdentityVerifier::from_config(&config.oauth)?,
            heartbeat_interval: config.realtime.heartbeat_interval,
        }))
    }
}
