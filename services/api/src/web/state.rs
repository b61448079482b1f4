//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use linkstash_core::ports::{CredentialStore, LinkAnnotator, LinkStore};

use crate::config::Config;
use crate::token::TokenService;

/// The shared application state, created once at startup and passed to all
/// handlers. Requests share nothing else; every port behind an `Arc` is safe
/// under concurrent access.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialStore>,
    pub links: Arc<dyn LinkStore>,
    pub annotator: Arc<dyn LinkAnnotator>,
    pub tokens: TokenService,
}
