//! crates/linkstash_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

// Represents a user - used throughout the app. Never carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

// Only used internally for signup/signin - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// A single saved link with its AI-generated annotation.
///
/// Created exactly once by the ingestion pipeline, after annotation succeeds.
/// Records are never mutated and are always scoped to their owner.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The structured result of analyzing a URL's content.
///
/// Transient: produced by the annotator, consumed immediately to build a
/// `LinkRecord`, then discarded.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}
