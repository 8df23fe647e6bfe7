//! `/api/auth`: signup, login, email verification and password flows.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use sumbong_auth::{AuthOutput, CHECK_INBOX_MESSAGE, OAuthSignup, RegisterInput};
use sumbong_core::error::SumbongError;
use sumbong_core::models::notification::{EntityRef, NotificationKind};
use sumbong_core::models::user::User;

use super::done;
use crate::dto::{UploadedFile, UserView, credentials};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, CurrentUser};
use crate::oauth::IdentityVerifier;
use crate::state::{AppState, SharedState};

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route("/oauth/google", post(google))
        .route("/verify-email/{token}", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/request-password-change", post(request_password_change))
        .route("/confirm-password-change/{token}", post(confirm_password_change))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    #[serde(default)]
    avatar_url: Option<String>,
    credentials: Vec<UploadedFile>,
    accepted_terms: bool,
    accepted_privacy: bool,
    #[serde(default)]
    policy_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleSignInRequest {
    id_token: String,
    #[serde(default)]
    signup: Option<GoogleSignupDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleSignupDetails {
    phone: String,
    address: String,
    credentials: Vec<UploadedFile>,
    accepted_terms: bool,
    accepted_privacy: bool,
    #[serde(default)]
    policy_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPasswordRequest {
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmChangeRequest {
    current_password: String,
}

fn session(out: AuthOutput, message: Option<&str>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "token": out.token,
        "user": UserView::from(out.user),
    }))
}

async fn announce_new_user(state: &AppState, user: &User) {
    state
        .notices
        .notify_admins(
            NotificationKind::NewUser,
            EntityRef::User(user.id),
            format!("{} signed up and is awaiting verification", user.full_name()),
            Some(json!({ "email": user.email, "provider": user.auth_provider })),
        )
        .await;
}

async fn signup(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let out = state
        .auth
        .register(RegisterInput {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            address: req.address,
            avatar_url: req.avatar_url,
            credentials: credentials(req.credentials)?,
            accepted_terms: req.accepted_terms,
            accepted_privacy: req.accepted_privacy,
            policy_version: req.policy_version,
        })
        .await?;

    announce_new_user(&state, &out.user).await;
    Ok((
        StatusCode::CREATED,
        session(
            out,
            Some("Registration successful. Please check your email to verify your account."),
        ),
    ))
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let out = state.auth.login(&req.email, &req.password).await?;
    Ok(session(out, None))
}

async fn admin_login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let out = state.auth.admin_login(&req.email, &req.password).await?;
    Ok(session(out, None))
}

async fn google(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<GoogleSignInRequest>,
) -> ApiResult<Json<Value>> {
    let Some(verifier) = &state.google else {
        return Err(SumbongError::Upstream("Google sign-in is not configured".into()).into());
    };
    let profile = verifier.verify(&req.id_token).await?;

    let signup = match req.signup {
        Some(details) => Some(OAuthSignup {
            phone: details.phone,
            address: details.address,
            credentials: credentials(details.credentials)?,
            accepted_terms: details.accepted_terms,
            accepted_privacy: details.accepted_privacy,
            policy_version: details.policy_version,
        }),
        None => None,
    };

    let out = state.auth.complete_oauth(profile, signup).await?;
    if out.created {
        announce_new_user(&state, &out.user).await;
    }
    Ok(session(out, None))
}

async fn verify_email(
    State(state): State<SharedState>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let user = state.auth.verify_email(&token).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Email verified. Your account is now awaiting admin approval.",
        "user": UserView::from(user),
    })))
}

async fn resend_verification(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.resend_verification(&req.email).await?;
    Ok(done(CHECK_INBOX_MESSAGE))
}

async fn forgot_password(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.forgot_password(&req.email).await?;
    Ok(done(CHECK_INBOX_MESSAGE))
}

async fn reset_password(
    State(state): State<SharedState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<NewPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.reset_password(&token, &req.password).await?;
    Ok(done("Your password has been reset. You can now log in."))
}

async fn change_password(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .change_password(principal.user_id(), &req.current_password, &req.new_password)
        .await?;
    Ok(done("Password changed."))
}

async fn request_password_change(
    State(state): State<SharedState>,
    CurrentUser(principal): CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .request_password_change(principal.user_id(), &req.current_password, &req.new_password)
        .await?;
    Ok(done("Check your email to confirm the password change."))
}

async fn confirm_password_change(
    State(state): State<SharedState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<ConfirmChangeRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .confirm_password_change(&token, &req.current_password)
        .await?;
    Ok(done("Password changed."))
}
