use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use tracing::debug;
use uuid::Uuid;

use warbler_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;
use crate::flash;

/// `POST /users/add_like/{message_id}` — idempotent toggle: the first post
/// creates the (user, message) like, the second removes it.
pub async fn add_like(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    if state.db.get_message(&message_id.to_string())?.is_none() {
        return Err(ApiError::NotFound);
    }

    let like_id = Uuid::new_v4();
    let added = state.db.toggle_like(
        &like_id.to_string(),
        &claims.sub.to_string(),
        &message_id.to_string(),
    )?;

    debug!(
        "@{} {} message {}",
        claims.username,
        if added { "liked" } else { "unliked" },
        message_id,
    );

    Ok(flash::redirect("/"))
}
