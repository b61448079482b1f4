//! services/api/src/web/links.rs
//!
//! Contains the Axum handlers for the link-ingestion pipeline and the master
//! definition for the OpenAPI specification.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use linkstash_core::domain::LinkRecord;
use linkstash_core::ports::{StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::token::AuthUser;
use crate::web::auth::{AuthResponse, SigninRequest, SignupRequest};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::signin_handler,
        add_link_handler,
        list_links_handler,
    ),
    components(
        schemas(SignupRequest, SigninRequest, AuthResponse, AddLinkRequest, LinkResponse)
    ),
    tags(
        (name = "linkstash API", description = "Per-user link aggregation with AI-generated annotations.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

// Optional so a missing field yields our 400 rather than a deserializer
// rejection.
#[derive(Deserialize, ToSchema)]
pub struct AddLinkRequest {
    pub url: Option<String>,
}

/// A stored link as returned to its owner.
#[derive(Serialize, ToSchema)]
pub struct LinkResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LinkRecord> for LinkResponse {
    fn from(record: LinkRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            url: record.url,
            title: record.title,
            summary: record.summary,
            tags: record.tags,
            created_at: record.created_at,
        }
    }
}

/// The submitted string must parse as a URL; it is stored byte-for-byte as
/// submitted, not in normalized form.
fn validate_url(raw: &str) -> Result<(), ValidationError> {
    Url::parse(raw).map_err(|_| ValidationError::MalformedUrl(raw.to_string()))?;
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET / - Service liveness probe
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is running")
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "linkstash API is running."
    }))
}

/// POST /links - Submit a URL for annotation and storage
#[utoipa::path(
    post,
    path = "/links",
    request_body = AddLinkRequest,
    responses(
        (status = 201, description = "Link annotated and stored", body = LinkResponse),
        (status = 400, description = "Missing, malformed, or duplicate URL"),
        (status = 401, description = "Unauthenticated"),
        (status = 500, description = "Annotation or storage failure")
    )
)]
pub async fn add_link_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    Json(req): Json<AddLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate input before any external call
    let url = match req.url.as_deref() {
        Some(u) if !u.is_empty() => u,
        _ => return Err(ValidationError::MissingField("url").into()),
    };
    validate_url(url)?;

    // 2. Duplicate fast-path, so no annotation is spent on a known duplicate
    if state.links.url_exists(identity.user_id, url).await? {
        return Err(ValidationError::DuplicateUrl.into());
    }

    // 3. Annotate. On failure nothing is persisted.
    let annotation = state.annotator.annotate(url).await?;

    // 4. Persist. The store's unique index catches a concurrent duplicate
    //    that slipped past the fast-path probe.
    let record = LinkRecord {
        id: Uuid::new_v4(),
        user_id: identity.user_id,
        url: url.to_string(),
        title: annotation.title,
        summary: annotation.summary,
        tags: annotation.tags,
        created_at: Utc::now(),
    };
    state
        .links
        .insert_link(&record)
        .await
        .map_err(|e| match e {
            StorageError::Conflict => ApiError::Validation(ValidationError::DuplicateUrl),
            other => ApiError::Storage(other),
        })?;

    // 5. Respond with the full stored record
    Ok((StatusCode::CREATED, Json(LinkResponse::from(record))))
}

/// GET /links - List the caller's links, newest first
#[utoipa::path(
    get,
    path = "/links",
    responses(
        (status = 200, description = "The caller's links, newest first", body = [LinkResponse]),
        (status = 401, description = "Unauthenticated"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_links_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.links.links_for_user(identity.user_id).await?;
    let links: Vec<LinkResponse> = records.into_iter().map(LinkResponse::from).collect();

    Ok((StatusCode::OK, Json(links)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls_are_accepted() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com/some/path?q=1").is_ok());
    }

    #[test]
    fn non_urls_are_rejected() {
        assert!(matches!(
            validate_url("not a url"),
            Err(ValidationError::MalformedUrl(_))
        ));
        assert!(matches!(
            validate_url("example.com"),
            Err(ValidationError::MalformedUrl(_))
        ));
    }
}
