//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup and signin.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use linkstash_core::ports::{CredentialError, StorageError, ValidationError, MIN_PASSWORD_LEN};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

// Fields are optional so a missing one yields our 400 rather than a
// deserializer rejection.
#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub email: String,
    pub token: String,
}

fn require_field<'a>(
    value: Option<&'a str>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(name)),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /signup - Create a new user account
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing field or weak password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate input before touching any collaborator
    let email = require_field(req.email.as_deref(), "email")?;
    let password = require_field(req.password.as_deref(), "password")?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CredentialError::WeakPassword.into());
    }

    // 2. Fast-path uniqueness check; the store's unique index remains the
    //    authoritative guard.
    if state.credentials.find_by_email(email).await?.is_some() {
        return Err(CredentialError::EmailTaken.into());
    }

    // 3. Hash the password; the plaintext is never stored
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("failed to hash password".to_string())
        })?
        .to_string();

    // 4. Create the user, mapping a storage conflict to its domain meaning
    let user = state
        .credentials
        .create_user(email, &password_hash)
        .await
        .map_err(|e| match e {
            StorageError::Conflict => ApiError::Credential(CredentialError::EmailTaken),
            other => ApiError::Storage(other),
        })?;

    // 5. Issue the session token
    let token = state.tokens.issue(user.id, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            email: user.email,
            token,
        }),
    ))
}

/// POST /signin - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signin successful", body = AuthResponse),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = require_field(req.email.as_deref(), "email")?;
    let password = require_field(req.password.as_deref(), "password")?;

    // Unknown email, an unreadable stored hash, and a wrong password all
    // produce the same response, so accounts cannot be enumerated.
    let creds = state
        .credentials
        .find_by_email(email)
        .await?
        .ok_or(CredentialError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse stored password hash: {:?}", e);
        CredentialError::InvalidCredentials
    })?;

    let valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(CredentialError::InvalidCredentials.into());
    }

    let token = state.tokens.issue(creds.id, &creds.email)?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            email: creds.email,
            token,
        }),
    ))
}
