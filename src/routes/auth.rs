use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::auth::{self, session};
use crate::db::users::{self, NewUser};
use crate::error::AppResult;
use crate::flash::{self, flash_redirect, Flash, IncomingFlash};
use crate::moderation;
use crate::profanity::contains_profanity;
use crate::routes::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub flash: Option<Flash>,
}

// -- Forms --

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub university: Option<String>,
    pub bio: Option<String>,
    pub terms: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// -- Handlers --

pub async fn register_page(flash: IncomingFlash) -> Html<RegisterTemplate> {
    Html(RegisterTemplate { flash: flash.0 })
}

/// POST /register — create the account and log it straight in.
pub async fn register(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<RegisterForm>,
) -> AppResult<Response> {
    if form.terms.is_none() {
        return Ok(flash_redirect(
            "/register",
            Flash::error("You must accept the community terms to register."),
        ));
    }

    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(flash_redirect(
            "/register",
            Flash::error("Username and password are required."),
        ));
    }

    let university = non_empty(&form.university);
    let bio = non_empty(&form.bio);

    if contains_profanity(username)
        || university.is_some_and(contains_profanity)
        || bio.is_some_and(contains_profanity)
    {
        return Ok(flash_redirect(
            "/register",
            Flash::error("Banned words detected in username, university, or bio."),
        ));
    }

    if users::username_taken(&state.db, username)? {
        return Ok(flash_redirect(
            "/register",
            Flash::error("That username is already taken."),
        ));
    }

    let password_hash = auth::hash_password(&form.password)?;
    let user_id = users::create_user(
        &state.db,
        &NewUser {
            username,
            password_hash: &password_hash,
            university,
            bio,
        },
    )?;

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = auth::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}

pub async fn login_page(flash: IncomingFlash) -> Html<LoginTemplate> {
    Html(LoginTemplate { flash: flash.0 })
}

/// POST /login. A banned account whose ban has expired is quietly restored
/// here; a still-banned account is logged in but sent to the appeal page —
/// it must be able to authenticate to appeal at all.
pub async fn login(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<LoginForm>,
) -> AppResult<Response> {
    let user = users::find_by_username(&state.db, form.username.trim())?;
    let user = match user {
        Some(u) if auth::verify_password(&form.password, &u.password_hash) => u,
        _ => {
            return Ok(flash_redirect(
                "/login",
                Flash::error("Login failed. Wrong username or password."),
            ));
        }
    };

    let mut destination = "/";
    let mut flash = None;

    if user.is_banned {
        if moderation::clear_ban_if_expired(&state.db, &user.id)? {
            flash = Some(Flash::success("Your ban has expired, welcome back."));
        } else {
            destination = "/banned";
        }
    }

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    let session_cookie = auth::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    let mut cookies = vec![(header::SET_COOKIE, session_cookie)];
    if let Some(flash) = &flash {
        cookies.push((header::SET_COOKIE, flash::set_cookie(flash)));
    }

    Ok((AppendHeaders(cookies), Redirect::to(destination)).into_response())
}

/// GET /logout — drop the session. Stays reachable for banned users.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session::cookie_value(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    let cookie = auth::clear_session_cookie(&state.config.auth.cookie_name);
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}
