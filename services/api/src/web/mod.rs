pub mod auth;
pub mod links;
pub mod middleware;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// builds the web server router.
pub use auth::{signin_handler, signup_handler};
pub use links::{add_link_handler, health_handler, list_links_handler};
pub use middleware::require_auth;
