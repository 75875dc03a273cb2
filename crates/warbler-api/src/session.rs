use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use uuid::Uuid;

use warbler_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;
use crate::flash;

/// Cookie holding the signed session token. Its presence and validity is
/// what "logged in" means.
pub const SESSION_COOKIE: &str = "warbler_session";

/// Header echoing the session's CSRF token on authenticated POSTs.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Mint a session token for a freshly authenticated user. Claims carry the
/// user id, username, a random CSRF token, and a 30-day expiry.
pub fn create_session_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let mut csrf_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut csrf_bytes);

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        csrf: URL_SAFE_NO_PAD.encode(csrf_bytes),
        exp: (Utc::now() + Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a session token. Expired or tampered tokens yield `None`.
pub fn decode_session_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// The logged-in user, for routes that render differently when
/// authenticated but do not require it.
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Option<Claims> {
    let token = session_cookie(headers)?;
    decode_session_token(&state.secret, &token)
}

/// Require a valid session cookie and stash the claims in request
/// extensions. Anything else gets the unauthorized flash redirect.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims =
        session_cookie(req.headers()).and_then(|token| decode_session_token(&state.secret, &token));

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => flash::unauthorized_redirect(),
    }
}

/// CSRF guard for authenticated POSTs: the claims' token must be echoed in
/// the `x-csrf-token` header. Runs inside `require_auth`, so the claims
/// extension is always present.
pub async fn csrf_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.csrf_protect && req.method() == Method::POST {
        let claims = req.extensions().get::<Claims>().ok_or(ApiError::Forbidden)?;
        let sent = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());
        if sent != Some(claims.csrf.as_str()) {
            return Err(ApiError::Forbidden);
        }
    }
    Ok(next.run(req).await)
}
