//! One-shot flash messages, carried across a redirect in a cookie.
//!
//! The cookie value is base64-encoded so arbitrary message text stays
//! cookie-safe. Pages read and clear the cookie on their next render.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

pub const FLASH_COOKIE: &str = "warbler_flash";

pub const UNAUTHORIZED_FLASH: &str = "Access unauthorized.";

/// Plain `302 Found` redirect. The route layer answers browser form posts,
/// which expect 302 rather than axum's default 303.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())], "").into_response()
}

/// Redirect with a flashed message for the next page render.
pub fn flash_redirect(to: &str, message: &str) -> Response {
    let jar = CookieJar::new().add(
        Cookie::build((FLASH_COOKIE, B64.encode(message)))
            .path("/")
            .build(),
    );
    (StatusCode::FOUND, jar, [(header::LOCATION, to.to_string())], "").into_response()
}

pub fn unauthorized_redirect() -> Response {
    flash_redirect("/", UNAUTHORIZED_FLASH)
}

/// Pull the pending flash message out of the jar, clearing its cookie.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let message = B64
                .decode(cookie.value())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
            (jar, message)
        }
        None => (jar, None),
    }
}
