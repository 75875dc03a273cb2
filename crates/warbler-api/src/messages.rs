use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form};
use axum_extra::extract::CookieJar;
use tracing::debug;
use uuid::Uuid;

use warbler_types::api::{Claims, MessageForm};

use crate::AppState;
use crate::error::ApiError;
use crate::flash;
use crate::pages;

const MAX_MESSAGE_LEN: usize = 140;

pub async fn new_form(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash_message) = flash::take_flash(jar);
    (jar, pages::layout("New message", flash_message.as_deref(), COMPOSE_FORM))
}

/// `POST /messages/new` — create a message owned by the current user.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let text = form.text.trim().to_string();
    if text.is_empty() {
        return Ok(compose_error("Message text is required."));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Ok(compose_error("Messages are limited to 140 characters."));
    }

    let message_id = Uuid::new_v4();

    // Blocking SQLite insert runs off the async runtime
    let db = state.clone();
    let mid = message_id.to_string();
    let author = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_message(&mid, &text, &author))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    debug!("@{} posted message {}", claims.username, message_id);
    Ok(flash::redirect(&format!("/users/{}", claims.sub)))
}

/// `GET /messages/{id}`.
pub async fn show(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);

    let message = state
        .db
        .get_message(&message_id.to_string())?
        .ok_or(ApiError::NotFound)?
        .into_model();

    let body = pages::message_card(&message);
    Ok((jar, pages::layout("Message", flash_message.as_deref(), &body)))
}

/// `POST /messages/{id}/delete` — owner only.
pub async fn delete(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let message = state
        .db
        .get_message(&message_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    if message.user_id != claims.sub.to_string() {
        return Err(ApiError::Unauthorized);
    }

    state.db.delete_message(&message_id.to_string())?;
    Ok(flash::redirect(&format!("/users/{}", claims.sub)))
}

fn compose_error(message: &str) -> Response {
    pages::layout("New message", Some(message), COMPOSE_FORM).into_response()
}

const COMPOSE_FORM: &str = "<h1>What's happening?</h1>\n\
<form method=\"POST\" action=\"/messages/new\">\n\
<textarea name=\"text\" maxlength=\"140\" required></textarea>\n\
<button>Add my message!</button>\n\
</form>";
