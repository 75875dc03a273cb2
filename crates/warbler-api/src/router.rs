use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::session::{csrf_guard, require_auth};
use crate::{auth, likes, messages, pages, users, AppState};

/// Assemble the full application router. Everything under the protected
/// router requires a valid session; POSTs there additionally pass the CSRF
/// guard when it is enabled.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(pages::home))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/csrf", get(auth::csrf_token))
        .route("/users", get(users::index))
        .route("/users/{user_id}", get(users::show))
        .route("/users/{user_id}/following", get(users::following))
        .route("/users/{user_id}/followers", get(users::followers))
        .route("/users/{user_id}/likes", get(users::likes))
        .route("/users/follow/{user_id}", post(users::follow))
        .route("/users/stop-following/{user_id}", post(users::stop_following))
        .route("/users/add_like/{message_id}", post(likes::add_like))
        .route("/users/delete", post(users::delete_account))
        .route("/messages/new", get(messages::new_form).post(messages::create))
        .route("/messages/{message_id}", get(messages::show))
        .route("/messages/{message_id}/delete", post(messages::delete))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
}
