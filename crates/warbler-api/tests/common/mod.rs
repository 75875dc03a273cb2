#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use warbler_api::auth::create_account;
use warbler_api::{AppState, AppStateInner, router, session};
use warbler_db::Database;

pub const TEST_SECRET: &str = "test-secret";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fresh app over an in-memory database. CSRF is disabled the way the test
/// configuration always disables it; `csrf.rs`-style tests opt back in via
/// `test_app_with_csrf`.
pub fn test_app() -> (Router, AppState) {
    test_app_inner(false)
}

pub fn test_app_with_csrf() -> (Router, AppState) {
    test_app_inner(true)
}

fn test_app_inner(csrf_protect: bool) -> (Router, AppState) {
    let db = Database::open_in_memory().expect("in-memory database");
    let state: AppState = Arc::new(AppStateInner {
        db,
        secret: TEST_SECRET.into(),
        csrf_protect,
    });
    (router(state.clone()), state)
}

/// The usual cast: testuser plus three others, mirroring the sample data
/// every view test starts from.
pub struct Seeded {
    pub testuser: Uuid,
    pub u1: Uuid,
    pub u2: Uuid,
    pub u3: Uuid,
}

pub fn seed_users(state: &AppState) -> Seeded {
    Seeded {
        testuser: create_account(state, "testuser", "test@test.com", "testuser", None)
            .expect("seed testuser"),
        u1: create_account(state, "user1", "user1@user.com", "password", None).expect("seed user1"),
        u2: create_account(state, "user2", "user2@user.com", "password", None).expect("seed user2"),
        u3: create_account(state, "user3", "user3@user.com", "password", None).expect("seed user3"),
    }
}

/// Cookie header value for a logged-in user — the moral equivalent of
/// writing the user id straight into the test client's session.
pub fn session_cookie_for(user_id: Uuid, username: &str) -> String {
    let token =
        session::create_session_token(TEST_SECRET, user_id, username).expect("session token");
    format!("{}={}", session::SESSION_COOKIE, token)
}

pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    build(Method::GET, path, cookie).body(Body::empty()).expect("request")
}

pub fn post(path: &str, cookie: Option<&str>) -> Request<Body> {
    build(Method::POST, path, cookie).body(Body::empty()).expect("request")
}

pub fn form_post(path: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    build(Method::POST, path, cookie)
        .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(Body::from(form.to_string()))
        .expect("request")
}

fn build(method: Method, path: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("infallible")
}

/// Send a request and follow redirects like a browser would, carrying
/// Set-Cookie values (session, flash) into each subsequent request.
pub async fn send_following_redirects(app: &Router, req: Request<Body>) -> Response<Body> {
    let mut cookies: HashMap<String, String> = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(parse_cookie_header)
        .unwrap_or_default();

    let mut resp = send(app, req).await;

    for _ in 0..5 {
        if resp.status() != StatusCode::FOUND && resp.status() != StatusCode::SEE_OTHER {
            break;
        }

        for set_cookie in resp.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = set_cookie.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some((name, value)) = pair.split_once('=') {
                cookies.insert(name.trim().to_string(), value.to_string());
            }
        }

        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("redirect without Location")
            .to_string();

        let cookie_header = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        let next = get(&location, (!cookie_header.is_empty()).then_some(cookie_header.as_str()));
        resp = send(app, next).await;
    }

    resp
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn parse_cookie_header(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
