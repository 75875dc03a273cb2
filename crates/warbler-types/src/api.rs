use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session claims --

/// Session claims shared across warbler-api (auth handlers and the session
/// middleware). Canonical definition lives here in warbler-types.
///
/// `csrf` is a per-session random token echoed back by form posts when the
/// CSRF guard is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub csrf: String,
    pub exp: usize,
}

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub text: String,
}

// -- User search --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}
