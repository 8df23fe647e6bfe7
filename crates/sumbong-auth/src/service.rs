//! Authentication service: registration, login, email verification
//! and the password recovery/change flows.

use chrono::Utc;
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::models::user::{
    AuthProvider, CreateUser, CredentialFile, IssueToken, PolicyAcceptance, Role,
    TokenConsumption, TokenPurpose, User,
};
use sumbong_core::notifier::{Mailer, OutgoingEmail};
use sumbong_core::repository::UserRepository;
use sumbong_core::validation::{PHONE_RE, normalize_email, required, validated};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::mail;
use crate::password::{self, password_policy};
use crate::principal::{AdminPrincipal, Principal};
use crate::token;

/// Returned by flows that must not reveal whether an account exists.
pub const CHECK_INBOX_MESSAGE: &str =
    "If an account exists for that email, we have sent a message with further instructions.";

const POLICY_VERSION: &str = "1.0";

/// Input for resident signup.
#[derive(Debug, Clone, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "email address is invalid"))]
    pub email: String,
    #[validate(custom(function = "password_policy"))]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(regex(
        path = *PHONE_RE,
        message = "phone must be a mobile number like 09XXXXXXXXX or +639XXXXXXXXX"
    ))]
    pub phone: String,
    pub address: String,
    pub avatar_url: Option<String>,
    #[validate(length(min = 1, message = "at least one credential file is required"))]
    pub credentials: Vec<CredentialFile>,
    pub accepted_terms: bool,
    pub accepted_privacy: bool,
    pub policy_version: Option<String>,
}

/// Identity asserted by an external provider after it has verified the
/// ID token.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
}

/// Registration details a first-time OAuth user still has to supply.
#[derive(Debug, Clone, Validate)]
pub struct OAuthSignup {
    #[validate(regex(
        path = *PHONE_RE,
        message = "phone must be a mobile number like 09XXXXXXXXX or +639XXXXXXXXX"
    ))]
    pub phone: String,
    pub address: String,
    #[validate(length(min = 1, message = "at least one credential file is required"))]
    pub credentials: Vec<CredentialFile>,
    pub accepted_terms: bool,
    pub accepted_privacy: bool,
    pub policy_version: Option<String>,
}

/// A session token and the account it was issued for.
#[derive(Debug)]
pub struct AuthOutput {
    pub token: String,
    pub user: User,
    /// The account was created by this call.
    pub created: bool,
}

/// Authentication service.
///
/// Generic over the user repository and the mailer so that the auth
/// layer has no dependency on the database crate or an email vendor.
pub struct AuthService<U: UserRepository, M: Mailer> {
    users: U,
    mailer: M,
    config: AuthConfig,
}

impl<U: UserRepository, M: Mailer> AuthService<U, M> {
    pub fn new(users: U, mailer: M, config: AuthConfig) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn pepper(&self) -> Option<&str> {
        self.config.pepper.as_deref()
    }

    fn session(&self, user: User) -> SumbongResult<AuthOutput> {
        let token = token::issue_session_token(user.id, user.is_admin(), &self.config)?;
        Ok(AuthOutput {
            token,
            user,
            created: false,
        })
    }

    fn new_account_session(&self, user: User) -> SumbongResult<AuthOutput> {
        Ok(AuthOutput {
            created: true,
            ..self.session(user)?
        })
    }

    fn verify(&self, password: &str, user: &User) -> SumbongResult<bool> {
        Ok(password::verify_password(
            password,
            &user.password_hash,
            self.pepper(),
        )?)
    }

    async fn deliver(&self, email: OutgoingEmail) {
        let to = email.to.clone();
        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, to = %to, "failed to send account email");
        }
    }

    /// Store a fresh token of `purpose` for `user` and email the raw
    /// value. Only the hash is persisted.
    async fn issue_and_mail(
        &self,
        user: &User,
        purpose: TokenPurpose,
        pending_password_hash: Option<String>,
    ) -> SumbongResult<()> {
        let ttl = match purpose {
            TokenPurpose::EmailVerification => self.config.email_verification_ttl_secs,
            TokenPurpose::PasswordReset => self.config.password_reset_ttl_secs,
            TokenPurpose::PasswordChange => self.config.password_change_ttl_secs,
        };
        let (raw, slot) = token::mint(Utc::now(), ttl);
        self.users
            .issue_token(
                user.id,
                IssueToken {
                    purpose,
                    slot,
                    pending_password_hash,
                },
            )
            .await?;

        let base = &self.config.app_base_url;
        let email = match purpose {
            TokenPurpose::EmailVerification => mail::email_verification(user, base, &raw),
            TokenPurpose::PasswordReset => mail::password_reset(user, base, &raw),
            TokenPurpose::PasswordChange => mail::password_change(user, base, &raw),
        };
        self.deliver(email).await;
        Ok(())
    }

    /// Look up the live holder of a raw token; unknown and expired
    /// tokens are indistinguishable.
    async fn token_holder(&self, purpose: TokenPurpose, raw: &str) -> SumbongResult<(User, String)> {
        let hash = token::hash_token(raw);
        match self.users.find_by_token(purpose, &hash, Utc::now()).await {
            Ok(user) => Ok((user, hash)),
            Err(SumbongError::NotFound { .. }) => Err(AuthError::TokenInvalidOrExpired.into()),
            Err(e) => Err(e),
        }
    }

    async fn consume(
        &self,
        user_id: Uuid,
        hash: &str,
        consumption: TokenConsumption,
    ) -> SumbongResult<User> {
        match self
            .users
            .consume_token(user_id, hash, consumption, Utc::now())
            .await
        {
            Err(SumbongError::NotFound { .. }) => Err(AuthError::TokenInvalidOrExpired.into()),
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Signup & login
    // -----------------------------------------------------------------------

    /// Register a resident account. The account starts unverified and
    /// unapproved; a verification link is emailed.
    pub async fn register(&self, mut input: RegisterInput) -> SumbongResult<AuthOutput> {
        input.email = normalize_email(&input.email);
        input.phone = input.phone.trim().to_string();

        let first_name = required("first name", &input.first_name)?;
        let last_name = required("last name", &input.last_name)?;
        let address = required("address", &input.address)?;
        validated(&input)?;
        check_policy(input.accepted_terms, input.accepted_privacy)?;

        let password_hash = password::hash_password(&input.password, self.pepper())?;
        let user = self
            .users
            .create(CreateUser {
                email: input.email,
                password_hash,
                first_name,
                last_name,
                phone: input.phone,
                address,
                avatar_url: input.avatar_url,
                role: Role::Resident,
                auth_provider: AuthProvider::Password,
                credentials: input.credentials,
                email_verified: false,
                policy: policy(input.policy_version),
            })
            .await?;

        info!(user_id = %user.id, "resident registered");

        if let Err(e) = self
            .issue_and_mail(&user, TokenPurpose::EmailVerification, None)
            .await
        {
            warn!(error = %e, user_id = %user.id, "failed to issue verification token");
        }

        self.new_account_session(user)
    }

    /// Resident login. Gating failures are reported in a fixed order so
    /// the client can tell the user what is missing.
    pub async fn login(&self, email: &str, password: &str) -> SumbongResult<AuthOutput> {
        let user = match self.users.get_by_email(&normalize_email(email)).await {
            Ok(u) => u,
            Err(SumbongError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        if user.is_admin() {
            return Err(AuthError::AdminAccount.into());
        }
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified.into());
        }
        if !user.verification.approved {
            return Err(AuthError::NotApproved(user.verification.status).into());
        }
        if !self.verify(password, &user)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.session(user)
    }

    /// Admin login. Every failure is the generic invalid-credentials
    /// error.
    pub async fn admin_login(&self, email: &str, password: &str) -> SumbongResult<AuthOutput> {
        let user = match self.users.get_by_email(&normalize_email(email)).await {
            Ok(u) if u.is_admin() => u,
            Ok(_) | Err(SumbongError::NotFound { .. }) => {
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if !self.verify(password, &user)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        info!(admin_id = %user.id, "admin signed in");
        self.session(user)
    }

    /// Sign in (or sign up) with an identity already verified by an
    /// external provider.
    ///
    /// Unknown emails need `signup`; the new account is created with its
    /// email already verified and an unusable random password, and still
    /// waits for credential approval like any other resident.
    pub async fn complete_oauth(
        &self,
        profile: OAuthProfile,
        signup: Option<OAuthSignup>,
    ) -> SumbongResult<AuthOutput> {
        let email = normalize_email(&profile.email);

        match self.users.get_by_email(&email).await {
            Ok(user) => {
                if user.is_admin() {
                    return Err(AuthError::AdminAccount.into());
                }
                if !user.verification.approved {
                    return Err(AuthError::NotApproved(user.verification.status).into());
                }
                return self.session(user);
            }
            Err(SumbongError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let Some(mut signup) = signup else {
            return Err(SumbongError::validation(
                "registration details are required for a new account",
            ));
        };

        signup.phone = signup.phone.trim().to_string();
        let address = required("address", &signup.address)?;
        validated(&signup)?;
        check_policy(signup.accepted_terms, signup.accepted_privacy)?;

        let password_hash = password::hash_password(&token::generate_token(), self.pepper())?;
        let user = self
            .users
            .create(CreateUser {
                email,
                password_hash,
                first_name: required("first name", &profile.first_name)?,
                last_name: profile.last_name.trim().to_string(),
                phone: signup.phone,
                address,
                avatar_url: profile.picture,
                role: Role::Resident,
                auth_provider: AuthProvider::Google,
                credentials: signup.credentials,
                email_verified: true,
                policy: policy(signup.policy_version),
            })
            .await?;

        info!(user_id = %user.id, "resident registered via oauth");
        self.new_account_session(user)
    }

    /// Resolve a bearer session token to the current identity.
    ///
    /// The role is re-read from the store so that a demoted or deleted
    /// account cannot keep using an old token.
    pub async fn authenticate(&self, bearer: &str) -> SumbongResult<Principal> {
        let claims = token::decode_session_token(bearer, &self.config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::SessionInvalid("malformed subject".into()))?;

        let user = match self.users.get_by_id(user_id).await {
            Ok(u) => u,
            Err(SumbongError::NotFound { .. }) => {
                return Err(AuthError::SessionInvalid("account no longer exists".into()).into());
            }
            Err(e) => return Err(e),
        };

        Ok(if user.is_admin() {
            Principal::Admin(AdminPrincipal::new(user.id))
        } else {
            Principal::Resident(user.id)
        })
    }

    // -----------------------------------------------------------------------
    // Email verification
    // -----------------------------------------------------------------------

    pub async fn verify_email(&self, raw_token: &str) -> SumbongResult<User> {
        let (user, hash) = self
            .token_holder(TokenPurpose::EmailVerification, raw_token)
            .await?;

        match self.consume(user.id, &hash, TokenConsumption::VerifyEmail).await {
            Ok(user) => {
                info!(user_id = %user.id, "email verified");
                Ok(user)
            }
            // A concurrent request consumed it first.
            Err(e) => match self.users.get_by_id(user.id).await {
                Ok(current) if current.email_verified => Ok(current),
                _ => Err(e),
            },
        }
    }

    /// Always succeeds from the caller's perspective.
    pub async fn resend_verification(&self, email: &str) -> SumbongResult<()> {
        match self.users.get_by_email(&normalize_email(email)).await {
            Ok(user) if !user.is_admin() && !user.email_verified => {
                if let Err(e) = self
                    .issue_and_mail(&user, TokenPurpose::EmailVerification, None)
                    .await
                {
                    warn!(error = %e, user_id = %user.id, "failed to re-issue verification token");
                }
            }
            Ok(_) | Err(SumbongError::NotFound { .. }) => {}
            Err(e) => warn!(error = %e, "verification resend lookup failed"),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Password flows
    // -----------------------------------------------------------------------

    /// Always succeeds from the caller's perspective.
    pub async fn forgot_password(&self, email: &str) -> SumbongResult<()> {
        match self.users.get_by_email(&normalize_email(email)).await {
            Ok(user) if user.auth_provider == AuthProvider::Password => {
                if let Err(e) = self
                    .issue_and_mail(&user, TokenPurpose::PasswordReset, None)
                    .await
                {
                    warn!(error = %e, user_id = %user.id, "failed to issue reset token");
                }
            }
            Ok(_) | Err(SumbongError::NotFound { .. }) => {}
            Err(e) => warn!(error = %e, "password reset lookup failed"),
        }
        Ok(())
    }

    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> SumbongResult<()> {
        password::check_password_strength(new_password)?;
        let (user, hash) = self
            .token_holder(TokenPurpose::PasswordReset, raw_token)
            .await?;

        let password_hash = password::hash_password(new_password, self.pepper())?;
        self.consume(
            user.id,
            &hash,
            TokenConsumption::ResetPassword { password_hash },
        )
        .await?;

        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> SumbongResult<()> {
        let password_hash = self
            .checked_new_password(user_id, current_password, new_password)
            .await?;
        self.users.set_password(user_id, password_hash).await?;

        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    /// First half of the emailed change flow: the new hash is parked
    /// next to the token until the link is confirmed.
    pub async fn request_password_change(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> SumbongResult<()> {
        let password_hash = self
            .checked_new_password(user_id, current_password, new_password)
            .await?;
        let user = self.users.get_by_id(user_id).await?;
        self.issue_and_mail(&user, TokenPurpose::PasswordChange, Some(password_hash))
            .await
    }

    /// Second half of the emailed change flow. A wrong current password
    /// leaves the token in place.
    pub async fn confirm_password_change(
        &self,
        raw_token: &str,
        current_password: &str,
    ) -> SumbongResult<()> {
        let (user, hash) = self
            .token_holder(TokenPurpose::PasswordChange, raw_token)
            .await?;

        if !self.verify(current_password, &user)? {
            return Err(AuthError::WrongCurrentPassword.into());
        }

        self.consume(user.id, &hash, TokenConsumption::ApplyPendingPassword)
            .await?;

        info!(user_id = %user.id, "password change confirmed");
        Ok(())
    }

    async fn checked_new_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> SumbongResult<String> {
        let user = self.users.get_by_id(user_id).await?;
        if !self.verify(current_password, &user)? {
            return Err(AuthError::WrongCurrentPassword.into());
        }
        if current_password == new_password {
            return Err(SumbongError::validation(
                "new password must differ from the current password",
            ));
        }
        password::check_password_strength(new_password)?;
        Ok(password::hash_password(new_password, self.pepper())?)
    }
}

fn check_policy(accepted_terms: bool, accepted_privacy: bool) -> SumbongResult<()> {
    if !accepted_terms || !accepted_privacy {
        return Err(SumbongError::validation(
            "the terms of service and privacy policy must be accepted",
        ));
    }
    Ok(())
}

fn policy(version: Option<String>) -> PolicyAcceptance {
    PolicyAcceptance {
        accepted_terms: true,
        accepted_privacy: true,
        version: version.unwrap_or_else(|| POLICY_VERSION.to_string()),
        accepted_at: Some(Utc::now()),
    }
}
