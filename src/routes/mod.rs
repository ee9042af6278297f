pub mod assets;
pub mod auth;
pub mod forum;
pub mod moderation;
pub mod profile;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Wrapper to render askama templates as axum responses.
/// A page render consumes any pending flash message, so the flash cookie is
/// cleared here in the same response.
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                    (header::SET_COOKIE, crate::flash::clear_cookie()),
                ],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// The full application: every route behind the ban gate, traced.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(forum::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/banned",
            get(moderation::banned_page).post(moderation::submit_appeal),
        )
        .route("/profile", get(profile::my_profile))
        .route("/u/{username}", get(profile::view_profile))
        .route("/update_profile", post(profile::update_profile))
        .route("/delete_account", post(profile::delete_account))
        .route("/report/{user_id}", post(moderation::report_user))
        .route("/report_post/{post_id}", post(moderation::report_post))
        .route("/ban/{user_id}", post(moderation::ban_user))
        .route("/unban/{user_id}", post(moderation::unban_user))
        .route("/reject_appeal/{user_id}", post(moderation::reject_appeal))
        .route("/admin/reports", get(moderation::admin_reports))
        .route(
            "/admin/resolve_report/{report_id}",
            get(moderation::resolve_report),
        )
        .route("/create", get(forum::create_page).post(forum::create_post))
        .route("/post/{post_id}", get(forum::view_post))
        .route("/add_comment/{post_id}", post(forum::add_comment))
        .route("/vote/{post_id}/{action}", get(forum::vote))
        .route("/vote_academic/{post_id}/{vtype}", post(forum::vote_academic))
        .route("/delete_post/{post_id}", post(forum::delete_post))
        .route("/delete_comment/{comment_id}", post(forum::delete_comment))
        .route("/assets/{*path}", get(assets::serve))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::moderation::ban_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
