use askama::Template;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::auth;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{self, flash_redirect, Flash, IncomingFlash};
use crate::profanity::contains_profanity;
use crate::routes::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub flash: Option<Flash>,
    pub user_id: String,
    pub username: String,
    pub university: String,
    pub position: String,
    pub bio: String,
    pub created_at: String,
    pub is_verified: bool,
    pub is_banned: bool,
    pub is_self: bool,
    pub viewer_logged_in: bool,
    pub viewer_is_admin: bool,
    pub can_change_username: bool,
    pub days_until_username_change: i64,
}

// -- Forms --

#[derive(Deserialize)]
pub struct UpdateProfileForm {
    pub username: Option<String>,
    pub university: Option<String>,
    pub bio: Option<String>,
    pub password: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// -- Handlers --

/// GET /profile — own profile lives at its public URL.
pub async fn my_profile(user: CurrentUser) -> Redirect {
    Redirect::to(&format!("/u/{}", user.username))
}

/// GET /u/{username}
pub async fn view_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Html<ProfileTemplate>> {
    let user = users::find_by_username(&state.db, &username)?.ok_or(AppError::NotFound)?;

    let is_self = viewer
        .0
        .as_ref()
        .map(|v| v.id == user.id)
        .unwrap_or(false);

    Ok(Html(ProfileTemplate {
        flash: flash.0,
        user_id: user.id.clone(),
        username: user.username.clone(),
        university: user.university.clone().unwrap_or_default(),
        position: user.position.clone().unwrap_or_default(),
        bio: user.bio.clone().unwrap_or_default(),
        created_at: user.created_at.clone(),
        is_verified: user.is_verified,
        is_banned: user.is_banned,
        is_self,
        viewer_logged_in: viewer.0.is_some(),
        viewer_is_admin: viewer.0.as_ref().map(|v| v.is_admin).unwrap_or(false),
        can_change_username: user.can_change_username(),
        days_until_username_change: user.days_until_username_change(),
    }))
}

/// POST /update_profile — university/bio/password edits, plus a username
/// change behind a weekly cooldown.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    axum::Form(form): axum::Form<UpdateProfileForm>,
) -> AppResult<Response> {
    let user = users::find_by_id(&state.db, &current.id)?.ok_or(AppError::NotFound)?;

    let new_username = non_empty(&form.username);
    let university = non_empty(&form.university);
    let bio = non_empty(&form.bio);

    if new_username.is_some_and(contains_profanity)
        || university.is_some_and(contains_profanity)
        || bio.is_some_and(contains_profanity)
    {
        return Ok(flash_redirect(
            "/profile",
            Flash::error("Banned words detected. Profile not updated."),
        ));
    }

    let mut flash = Flash::success("Profile updated.");

    if let Some(new_username) = new_username {
        if new_username != user.username {
            if !user.can_change_username() {
                flash = Flash::error(format!(
                    "You must wait {} more day(s) to change your username.",
                    user.days_until_username_change()
                ));
            } else if users::username_taken(&state.db, new_username)? {
                flash = Flash::error("That username is unfortunately taken.");
            } else {
                users::change_username(&state.db, &user.id, new_username)?;
                flash = Flash::success("Username changed.");
            }
        }
    }

    users::update_profile_fields(&state.db, &user.id, university, bio)?;

    if let Some(password) = non_empty(&form.password) {
        let hash = auth::hash_password(password)?;
        users::set_password_hash(&state.db, &user.id, &hash)?;
    }

    Ok(flash_redirect("/profile", flash))
}

/// POST /delete_account — the cascade takes posts, comments, votes,
/// academic features, views, sessions, and reports with it.
pub async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Response> {
    users::delete_user(&state.db, &user.id)?;
    tracing::info!("Account deleted: {}", user.username);

    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            auth::clear_session_cookie(&state.config.auth.cookie_name),
        ),
        (
            header::SET_COOKIE,
            flash::set_cookie(&Flash::success(
                "Your account and all of its data have been deleted.",
            )),
        ),
    ]);
    Ok((cookies, Redirect::to("/")).into_response())
}
