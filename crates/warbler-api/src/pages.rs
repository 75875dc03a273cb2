//! Server-rendered pages. Warbler's pages are small enough to assemble
//! inline; there is no template engine.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use axum_extra::extract::CookieJar;

use warbler_types::models::{Message, User};

use crate::AppState;
use crate::error::ApiError;
use crate::flash;
use crate::session;

pub fn layout(title: &str, flash_message: Option<&str>, body: &str) -> Html<String> {
    let flash_html = flash_message
        .map(|message| format!("<div class=\"flash\">{}</div>\n", escape(message)))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{} | Warbler</title></head>\n<body>\n{}{}\n</body>\n</html>\n",
        escape(title),
        flash_html,
        body,
    ))
}

/// Escape text destined for HTML.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn user_card(user: &User) -> String {
    format!(
        "<div class=\"user-card\"><img src=\"{}\" alt=\"\"> <a href=\"/users/{}\">@{}</a></div>",
        escape(&user.image_url),
        user.id,
        escape(&user.username),
    )
}

pub fn message_card(message: &Message) -> String {
    format!(
        "<div class=\"message\"><a href=\"/users/{}\">@{}</a><p>{}</p><span class=\"likes\">{} likes</span> <span class=\"timestamp\">{}</span></div>",
        message.user_id,
        escape(&message.author_username),
        escape(&message.text),
        message.like_count,
        message.created_at.format("%d %B %Y"),
    )
}

/// `GET /` — anonymous visitors get the landing page (and any flashed
/// message: unauthorized redirects land here); logged-in users get their
/// timeline.
pub async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);

    let Some(claims) = session::current_user(&state, &headers) else {
        let body = "<h1>What's Happening?</h1>\n\
                    <p><a href=\"/signup\">Sign up</a> or <a href=\"/login\">Log in</a> to see messages.</p>";
        return Ok((jar, layout("Home", flash_message.as_deref(), body)));
    };

    // Blocking SQLite work runs off the async runtime
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.timeline(&user_id, 100))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let cards: String = rows
        .into_iter()
        .map(|row| message_card(&row.into_model()))
        .collect();

    let body = format!(
        "<h1>Home</h1>\n<p><a href=\"/messages/new\">New message</a> | <a href=\"/users\">Find users</a> | <a href=\"/logout\">Log out @{}</a></p>\n<section class=\"timeline\">\n{}\n</section>",
        escape(&claims.username),
        cards,
    );

    Ok((jar, layout("Home", flash_message.as_deref(), &body)))
}
