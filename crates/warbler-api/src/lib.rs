pub mod auth;
pub mod error;
pub mod flash;
pub mod likes;
pub mod messages;
pub mod pages;
pub mod router;
pub mod session;
pub mod users;

use std::sync::Arc;

use warbler_db::Database;

pub use router::router;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Secret used to sign session tokens.
    pub secret: String,
    /// CSRF guard on authenticated POSTs; disabled in the test suites.
    pub csrf_protect: bool,
}
