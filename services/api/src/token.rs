//! services/api/src/token.rs
//!
//! Issues and verifies the signed, stateless session tokens used on every
//! protected request. Tokens are HS256 JWTs carrying the user's identity;
//! nothing is stored server-side, so verification is pure computation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use linkstash_core::ports::AuthError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

const TOKEN_TTL_HOURS: i64 = 24;
const ISSUER: &str = "linkstash";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject - user id.
    sub: Uuid,
    email: String,
    iss: String,
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expiration time (Unix timestamp).
    exp: i64,
}

/// The identity resolved from a verified token, injected into request
/// extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a signed token for the given identity, valid for 24 hours from
    /// now.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verifies signature and expiry, returning the embedded identity.
    ///
    /// Expiry is reported distinctly; every other failure (bad signature,
    /// malformed token, wrong issuer) collapses into `InvalidSignature`.
    /// Callers reject all failures identically.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidSignature,
            })?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}
