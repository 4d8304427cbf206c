use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use rand::Rng;

use super::non_blank;
use crate::{
    AppState,
    auth::{self, Principal},
    config::Env,
    error::{ApiError, ApiResult, ErrorBody},
    models::{
        LoginRequest, LoginResponse, MessageResponse, NewUser, OtpIssuedResponse, OtpKind,
        RegisterRequest, RegisterResponse, ResendRequest, Role, User, VerifyRequest,
    },
};

const MIN_PASSWORD_LEN: usize = 8;
const MIN_NAME_LEN: usize = 2;
const OTP_TTL_MINUTES: i64 = 10;
const INVALID_CODE: &str = "Invalid or expired verification code";

/// Six random decimal digits, never starting with zero.
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn is_otp_shaped(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Trims the identifier and lowercases email addresses the way `register` stores
/// them, so codes are issued and consumed under the same key.
fn otp_identifier(kind: OtpKind, raw: &str) -> Option<String> {
    let identifier = non_blank(Some(raw))?;
    Some(match kind {
        OtpKind::Email => identifier.to_lowercase(),
        OtpKind::Phone => identifier,
    })
}

/// Maps the public signup choice onto a role. Admins are never self-registered.
fn signup_role(requested: Option<&str>) -> ApiResult<Role> {
    match requested.map(str::trim) {
        None | Some("") | Some("customer") | Some("user") => Ok(Role::User),
        Some("restaurant_owner") => Ok(Role::RestaurantOwner),
        Some(_) => Err(ApiError::BadRequest("Invalid role".to_string())),
    }
}

/// Persists a fresh code for `identifier`, invalidating older ones, and returns it.
async fn issue_otp(state: &AppState, identifier: &str, kind: OtpKind) -> ApiResult<String> {
    let code = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
    state
        .repo
        .replace_otp(identifier, kind, &code, expires_at)
        .await?;

    // Delivery goes through an external mailer; locally the code is surfaced instead.
    tracing::info!(%identifier, kind = kind.as_str(), "verification code issued");
    if state.config.env == Env::Local {
        tracing::debug!(%identifier, %code, "development verification code");
    }
    Ok(code)
}

/// register
///
/// [Public] Creates an account with an Argon2-hashed password and sends an email
/// verification code. Restaurant owners start with onboarding completed.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(payload) = payload?;

    let email = payload.email.trim().to_lowercase();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid_email {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let name = payload.name.trim().to_string();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Name must be at least {} characters",
            MIN_NAME_LEN
        )));
    }
    let role = signup_role(payload.role.as_deref())?;
    let phone = non_blank(payload.phone.as_deref());

    if state.repo.find_credentials(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let is_owner = role == Role::RestaurantOwner;
    let new_user = NewUser {
        email: email.clone(),
        name,
        phone_verified: phone.is_some(),
        phone,
        role,
        password_hash: auth::hash_password(&payload.password)?,
        onboarding_completed: is_owner,
        subscription_tier: if is_owner { "plus" } else { "free" }.to_string(),
    };

    let user = match state.repo.create_user(new_user).await {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same address.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "account registered");

    let code = issue_otp(&state, &email, OtpKind::Email).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "Account created. Check your email for a verification code.".to_string(),
            otp_code: (state.config.env == Env::Local).then_some(code),
        }),
    ))
}

/// login
///
/// [Public] Exchanges email and password for a session token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();

    let Some(credentials) = state.repo.find_credentials(&email).await? else {
        tracing::debug!("login for unknown email");
        return Err(ApiError::Unauthenticated);
    };
    if !auth::verify_password(&payload.password, &credentials.password_hash) {
        tracing::warn!(user_id = %credentials.user.id, "login with wrong password");
        return Err(ApiError::Unauthenticated);
    }

    let token = auth::issue_token(credentials.user.id, &state.config)?;
    Ok(Json(LoginResponse {
        token,
        user: credentials.user,
    }))
}

/// verify
///
/// [Public] Consumes a verification code and flags the matching email or phone
/// as verified.
#[utoipa::path(
    post,
    path = "/auth/verify",
    tag = "account",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorBody)
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    let identifier = otp_identifier(payload.kind, &payload.identifier);
    let code = payload.code.trim();

    let Some(identifier) = identifier.filter(|_| is_otp_shaped(code)) else {
        return Err(ApiError::BadRequest(INVALID_CODE.to_string()));
    };
    if !state.repo.consume_otp(&identifier, payload.kind, code).await? {
        return Err(ApiError::BadRequest(INVALID_CODE.to_string()));
    }
    if state.repo.mark_verified(payload.kind, &identifier).await? == 0 {
        // A valid code for an address or number no account holds.
        tracing::warn!(kind = payload.kind.as_str(), "verification code matched no account");
        return Err(ApiError::BadRequest(INVALID_CODE.to_string()));
    }

    let what = match payload.kind {
        OtpKind::Email => "Email",
        OtpKind::Phone => "Phone",
    };
    Ok(Json(MessageResponse {
        message: format!("{} verified successfully", what),
    }))
}

/// resend
///
/// [Public] Invalidates outstanding codes for the identifier and issues a new one,
/// valid for ten minutes.
#[utoipa::path(
    post,
    path = "/auth/resend",
    tag = "account",
    request_body = ResendRequest,
    responses(
        (status = 200, description = "Code issued", body = OtpIssuedResponse),
        (status = 400, description = "Missing identifier", body = ErrorBody)
    )
)]
pub async fn resend(
    State(state): State<AppState>,
    payload: Result<Json<ResendRequest>, JsonRejection>,
) -> ApiResult<Json<OtpIssuedResponse>> {
    let Json(payload) = payload?;
    let Some(identifier) = otp_identifier(payload.kind, &payload.identifier) else {
        return Err(ApiError::BadRequest("Identifier is required".to_string()));
    };

    let code = issue_otp(&state, &identifier, payload.kind).await?;

    let response = if state.config.env == Env::Local {
        OtpIssuedResponse {
            message: "New verification code generated".to_string(),
            development_mode: Some(true),
            otp_code: Some(code),
        }
    } else {
        OtpIssuedResponse {
            message: "Verification code resent successfully".to_string(),
            ..Default::default()
        }
    };
    Ok(Json(response))
}

/// get_me
///
/// [Authenticated] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    tag = "account",
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn get_me(principal: Principal, State(state): State<AppState>) -> ApiResult<Json<User>> {
    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(user))
}
