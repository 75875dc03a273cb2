use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Extension;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use uuid::Uuid;

use warbler_types::api::{Claims, UserSearch};

use crate::AppState;
use crate::error::ApiError;
use crate::flash;
use crate::pages;
use crate::session::SESSION_COOKIE;

/// `GET /users` — all users, or those matching `?q=` as a username
/// substring.
pub async fn index(
    State(state): State<AppState>,
    Query(search): Query<UserSearch>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);

    let rows = state.db.search_users(search.q.as_deref())?;
    let cards: String = rows
        .into_iter()
        .map(|row| pages::user_card(&row.into_model()))
        .collect();

    let body = format!("<h1>Users</h1>\n<section class=\"user-list\">\n{}\n</section>", cards);
    Ok((jar, pages::layout("Users", flash_message.as_deref(), &body)))
}

/// `GET /users/{id}` — profile page: the user's messages, newest first.
pub async fn show(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);

    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound)?
        .into_model();

    let db = state.clone();
    let id = user_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_for_user(&id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let cards: String = rows
        .into_iter()
        .map(|row| pages::message_card(&row.into_model()))
        .collect();

    let body = format!(
        "<h1>@{}</h1>\n<img src=\"{}\" alt=\"\">\n\
         <p><a href=\"/users/{}/following\">Following</a> | <a href=\"/users/{}/followers\">Followers</a> | <a href=\"/users/{}/likes\">Likes</a></p>\n\
         <section class=\"messages\">\n{}\n</section>",
        pages::escape(&user.username),
        pages::escape(&user.image_url),
        user.id,
        user.id,
        user.id,
        cards,
    );
    let title = format!("@{}", user.username);
    Ok((jar, pages::layout(&title, flash_message.as_deref(), &body)))
}

/// `GET /users/{id}/following` — the users this user follows.
pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);
    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let rows = state.db.following(&user_id.to_string())?;
    let body = user_list_page(&user.username, "is following", rows);
    Ok((jar, pages::layout("Following", flash_message.as_deref(), &body)))
}

/// `GET /users/{id}/followers` — the users following this user.
pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);
    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let rows = state.db.followers(&user_id.to_string())?;
    let body = user_list_page(&user.username, "is followed by", rows);
    Ok((jar, pages::layout("Followers", flash_message.as_deref(), &body)))
}

/// `GET /users/{id}/likes` — the messages this user has liked.
pub async fn likes(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (jar, flash_message) = flash::take_flash(jar);
    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    let rows = state.db.liked_messages(&user_id.to_string())?;
    let cards: String = rows
        .into_iter()
        .map(|row| pages::message_card(&row.into_model()))
        .collect();

    let body = format!(
        "<h1>Messages @{} likes</h1>\n<section class=\"messages\">\n{}\n</section>",
        pages::escape(&user.username),
        cards,
    );
    Ok((jar, pages::layout("Likes", flash_message.as_deref(), &body)))
}

/// `POST /users/follow/{id}` — start following. Self-follows are rejected;
/// re-following is a no-op thanks to the unique edge.
pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    if user_id == claims.sub {
        return Ok(flash::flash_redirect("/", "You cannot follow yourself."));
    }
    if state.db.get_user_by_id(&user_id.to_string())?.is_none() {
        return Err(ApiError::NotFound);
    }

    state.db.follow(&user_id.to_string(), &claims.sub.to_string())?;
    Ok(flash::redirect(&format!("/users/{}/following", claims.sub)))
}

/// `POST /users/stop-following/{id}`.
pub async fn stop_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    state.db.unfollow(&user_id.to_string(), &claims.sub.to_string())?;
    Ok(flash::redirect(&format!("/users/{}/following", claims.sub)))
}

/// `POST /users/delete` — delete the current account and everything it
/// owns, then drop the session.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.db.delete_user(&user_id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    Ok((jar, flash::flash_redirect("/signup", "Account deleted.")).into_response())
}

fn user_list_page(username: &str, relation: &str, rows: Vec<warbler_db::models::UserRow>) -> String {
    let cards: String = rows
        .into_iter()
        .map(|row| pages::user_card(&row.into_model()))
        .collect();

    format!(
        "<h1>@{} {}</h1>\n<section class=\"user-list\">\n{}\n</section>",
        pages::escape(username),
        relation,
        cards,
    )
}
