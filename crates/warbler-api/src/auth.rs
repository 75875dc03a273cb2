use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use tracing::info;
use uuid::Uuid;

use warbler_types::api::{Claims, LoginForm, SignupForm};
use warbler_types::models::DEFAULT_IMAGE_URL;

use crate::AppState;
use crate::error::ApiError;
use crate::flash;
use crate::pages;
use crate::session::{self, SESSION_COOKIE};

const TAKEN_MESSAGE: &str = "Username or email already taken";

/// Create an account: hash the password with Argon2id and persist the row.
/// When no image URL is given the default profile image is stored.
///
/// Uniqueness is the caller's concern — a constraint violation surfaces as
/// an error that `warbler_db::queries::is_unique_violation` recognizes.
pub fn create_account(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    image_url: Option<&str>,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash failed: {}", e))?
        .to_string();

    let image_url = match image_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_IMAGE_URL,
    };

    let user_id = Uuid::new_v4();
    state
        .db
        .create_user(&user_id.to_string(), username, email, &password_hash, image_url)?;

    info!("New account @{} ({})", username, user_id);
    Ok(user_id)
}

/// Check a login attempt against the stored Argon2 hash.
fn verify_password(stored_hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn signup_form(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash_message) = flash::take_flash(jar);
    (jar, pages::layout("Sign up", flash_message.as_deref(), SIGNUP_FORM))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, ApiError> {
    if form.username.is_empty() || form.username.len() > 50 {
        return Ok(signup_error("Username must be 1-50 characters."));
    }
    if !form.email.contains('@') {
        return Ok(signup_error("Enter a valid e-mail address."));
    }
    if form.password.len() < 6 {
        return Ok(signup_error("Password must be at least 6 characters."));
    }

    let taken = state.db.get_user_by_username(&form.username)?.is_some()
        || state.db.get_user_by_email(&form.email)?.is_some();
    if taken {
        return Ok(signup_error(TAKEN_MESSAGE));
    }

    let user_id = match create_account(
        &state,
        &form.username,
        &form.email,
        &form.password,
        form.image_url.as_deref(),
    ) {
        Ok(user_id) => user_id,
        // Lost the race against a concurrent signup for the same name.
        Err(err) if warbler_db::queries::is_unique_violation(&err) => {
            return Ok(signup_error(TAKEN_MESSAGE));
        }
        Err(err) => return Err(err.into()),
    };

    let token = session::create_session_token(&state.secret, user_id, &form.username)?;
    Ok(start_session(jar, token, &format!("Hello, {}!", form.username)))
}

pub async fn login_form(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash_message) = flash::take_flash(jar);
    (jar, pages::layout("Log in", flash_message.as_deref(), LOGIN_FORM))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let Some(user) = state.db.get_user_by_username(&form.username)? else {
        return Ok(login_error());
    };

    if !verify_password(&user.password, &form.password)? {
        return Ok(login_error());
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = session::create_session_token(&state.secret, user_id, &user.username)?;
    Ok(start_session(jar, token, &format!("Hello, {}!", user.username)))
}

/// `GET /logout` always clears the session and redirects, logged in or not.
pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, flash::flash_redirect("/login", "You have been logged out.")).into_response()
}

/// The CSRF token for the current session, for clients that render their
/// own forms. Sits behind `require_auth`.
pub async fn csrf_token(Extension(claims): Extension<Claims>) -> String {
    claims.csrf
}

fn start_session(jar: CookieJar, token: String, greeting: &str) -> Response {
    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .build(),
    );
    (jar, flash::flash_redirect("/", greeting)).into_response()
}

fn signup_error(message: &str) -> Response {
    pages::layout("Sign up", Some(message), SIGNUP_FORM).into_response()
}

fn login_error() -> Response {
    pages::layout("Log in", Some("Invalid credentials."), LOGIN_FORM).into_response()
}

const SIGNUP_FORM: &str = "<h1>Join Warbler today.</h1>\n\
<form method=\"POST\" action=\"/signup\">\n\
<input name=\"username\" placeholder=\"Username\" required>\n\
<input name=\"email\" type=\"email\" placeholder=\"E-mail\" required>\n\
<input name=\"password\" type=\"password\" placeholder=\"Password\" required>\n\
<input name=\"image_url\" placeholder=\"(Optional) Image URL\">\n\
<button>Sign me up!</button>\n\
</form>";

const LOGIN_FORM: &str = "<h1>Welcome back.</h1>\n\
<form method=\"POST\" action=\"/login\">\n\
<input name=\"username\" placeholder=\"Username\" required>\n\
<input name=\"password\" type=\"password\" placeholder=\"Password\" required>\n\
<button>Log in</button>\n\
</form>";
