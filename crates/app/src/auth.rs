use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use onboard_core::types::{User, UserRole};
use onboard_core::validate::email_is_valid;
use onboard_storage::{NewUser, UserError};

use crate::password::{hash_password, verify_password};
use crate::problem::ProblemResponse;
use crate::router::AppState;

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

fn check_register_request(req: &RegisterRequest) -> Result<(), ProblemResponse> {
    if req.name.trim().len() < MIN_NAME_LEN {
        return Err(ProblemResponse::bad_request(
            "registration_invalid",
            "name must be at least 2 characters",
        ));
    }
    if !email_is_valid(req.email.trim()) {
        return Err(ProblemResponse::bad_request(
            "registration_invalid",
            "email address is not valid",
        ));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ProblemResponse::bad_request(
            "registration_invalid",
            "password must be at least 6 characters",
        ));
    }
    if req.password != req.confirm_password {
        return Err(ProblemResponse::bad_request(
            "registration_invalid",
            "passwords do not match",
        ));
    }
    Ok(())
}

/// POST /api/auth/register. New accounts are admins; the capture console
/// has no self-service non-admin signup.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ProblemResponse> {
    if let Err(problem) = check_register_request(&req) {
        counter!("auth_registrations_total", "result" => "invalid").increment(1);
        return Err(problem);
    }

    let password_hash = hash_password(&req.password).map_err(|err| {
        warn!(error = %err, "password hashing failed");
        counter!("auth_registrations_total", "result" => "error").increment(1);
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "registration_failed",
            "could not create the account",
        )
    })?;

    let now = state.now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email.trim().to_lowercase(),
        role: UserRole::Admin,
        name: Some(req.name.trim().to_string()),
    };

    let insert = state
        .storage
        .users()
        .insert(&NewUser {
            id: &user.id,
            email: &user.email,
            name: user.name.as_deref(),
            role: user.role,
            password_hash: &password_hash,
            created_at: now,
        })
        .await;

    match insert {
        Ok(()) => {}
        Err(UserError::EmailTaken) => {
            counter!("auth_registrations_total", "result" => "email_taken").increment(1);
            return Err(ProblemResponse::conflict(
                "email_taken",
                "an account with this email already exists",
            ));
        }
        Err(err) => {
            warn!(error = %err, "account insert failed");
            counter!("auth_registrations_total", "result" => "error").increment(1);
            return Err(ProblemResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "registration_failed",
                "could not create the account",
            ));
        }
    }

    let token = issue_token(&state, &user)?;
    counter!("auth_registrations_total", "result" => "created").increment(1);
    info!(user_id = %user.id, "account registered");
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

/// POST /api/auth/login. Only admin accounts may open a session.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ProblemResponse> {
    let email = req.email.trim().to_lowercase();
    let row = state
        .storage
        .users()
        .fetch_by_email(&email)
        .await
        .map_err(|err| {
            warn!(error = %err, "account lookup failed");
            counter!("auth_logins_total", "result" => "error").increment(1);
            ProblemResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "login_failed",
                "could not check the credentials",
            )
        })?;

    // Unknown email and wrong password share one message.
    let rejected = || {
        counter!("auth_logins_total", "result" => "rejected").increment(1);
        ProblemResponse::unauthorized("invalid email or password")
    };

    let row = row.ok_or_else(rejected)?;
    let matches = verify_password(&req.password, &row.password_hash).map_err(|err| {
        warn!(error = %err, "stored hash unreadable");
        counter!("auth_logins_total", "result" => "error").increment(1);
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "login_failed",
            "could not check the credentials",
        )
    })?;
    if !matches {
        return Err(rejected());
    }

    let user = row.to_user();
    if user.role != UserRole::Admin {
        counter!("auth_logins_total", "result" => "forbidden").increment(1);
        return Err(ProblemResponse::new(
            StatusCode::FORBIDDEN,
            "admin_required",
            "admin access is required",
        ));
    }

    let token = issue_token(&state, &user)?;
    counter!("auth_logins_total", "result" => "accepted").increment(1);
    info!(user_id = %user.id, "session opened");
    Ok(Json(SessionResponse { token, user }))
}

/// GET /api/auth/me. Echoes the identity carried by the bearer token.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ProblemResponse> {
    let user = authenticate(&state, &headers)?;
    Ok(Json(user))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ProblemResponse> {
    state.sessions.issue(user, state.now()).map_err(|err| {
        warn!(error = %err, "token signing failed");
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "session_failed",
            "could not open a session",
        )
    })
}

/// Resolves the bearer token in `Authorization` to a user, or a 401 problem.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ProblemResponse> {
    current_user(state, headers).ok_or_else(|| ProblemResponse::unauthorized("sign in to continue"))
}

/// Like [`authenticate`] but without an error shape, for callers that feed
/// the pipeline an optional session.
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    state.sessions.validate(token, state.now()).ok()
}
