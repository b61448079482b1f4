//! crates/linkstash_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or AI providers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Annotation, LinkRecord, User, UserCredentials};

//=========================================================================================
// Error Taxonomy
//=========================================================================================

/// Failures of token verification and the authentication gate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer token provided")]
    Missing,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

/// Request-input failures, detected before any external call is made.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid URL")]
    MalformedUrl(String),
    #[error("this URL has already been saved")]
    DuplicateUrl,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Failures of the external content-analysis call.
///
/// Annotation never partially succeeds: either a fully valid `Annotation`
/// comes back, or one of these errors does.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// Transport failure, timeout, or an empty response from the upstream
    /// capability.
    #[error("annotation upstream failure: {0}")]
    UpstreamFailure(String),
    /// The upstream answered, but the payload does not match the required
    /// shape (non-empty title and summary, tags as strings).
    #[error("annotation result is malformed: {0}")]
    MalformedResult(String),
}

/// Failures of the durable stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write. For links this is the
    /// `(user_id, url)` pair; for users it is the email. Callers assign the
    /// domain meaning.
    #[error("record conflicts with an existing one")]
    Conflict,
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("storage read failed: {0}")]
    ReadFailed(String),
}

/// Failures of the signup/signin flow.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("password must be at least {min} characters", min = MIN_PASSWORD_LEN)]
    WeakPassword,
    // One message for unknown email and wrong password alike, so responses
    // cannot be used to enumerate accounts.
    #[error("invalid email or password")]
    InvalidCredentials,
}

/// Minimum accepted password length for signup.
pub const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable store of user records.
///
/// Email uniqueness is enforced here (case-sensitive exact match):
/// `create_user` must fail with `StorageError::Conflict` when the email is
/// already present.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StorageError>;
}

/// Durable store of link records, scoped to their owning user.
///
/// The store is the authoritative guard against duplicate submissions:
/// `insert_link` must fail with `StorageError::Conflict` when the owner
/// already has a record with the same URL, even under concurrent inserts.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn insert_link(&self, record: &LinkRecord) -> Result<(), StorageError>;

    /// All records owned by `user_id`, newest first.
    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<LinkRecord>, StorageError>;

    /// Fast-path duplicate probe (byte-for-byte URL match). Advisory only;
    /// `insert_link` remains the authoritative check.
    async fn url_exists(&self, user_id: Uuid, url: &str) -> Result<bool, StorageError>;
}

/// External content-analysis capability.
#[async_trait]
pub trait LinkAnnotator: Send + Sync {
    /// Analyzes the content behind `url` and returns a title, a one-paragraph
    /// summary, and 3-5 lowercase tags. A single attempt is made per
    /// invocation; retrying is the caller's decision.
    async fn annotate(&self, url: &str) -> Result<Annotation, AnnotationError>;
}
