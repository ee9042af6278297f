use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::db::reports::{self, ReportRow};
use crate::db::users::{self, BannedUserRow};
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser, MaybeUser};
use crate::flash::{flash_redirect, Flash, IncomingFlash};
use crate::moderation::{self as bans, BanDuration};
use crate::routes::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/banned.html")]
pub struct BannedTemplate {
    pub flash: Option<Flash>,
    pub reason: String,
    pub permanent: bool,
    pub expires_at: String,
    pub appeal_submitted: bool,
    pub appeal_text: String,
}

#[derive(Template)]
#[template(path = "pages/admin_reports.html")]
pub struct AdminReportsTemplate {
    pub flash: Option<Flash>,
    pub reports: Vec<ReportRow>,
    pub banned_users: Vec<BannedUserRow>,
}

// -- Forms --

#[derive(Deserialize)]
pub struct AppealForm {
    pub appeal: String,
}

#[derive(Deserialize)]
pub struct ReportForm {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct BanForm {
    pub reason: Option<String>,
    pub duration: Option<String>,
}

// -- Banned-user handlers --

/// GET /banned — appeal page; everyone not banned is sent home.
pub async fn banned_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let Some(user) = viewer.0 else {
        return Ok(Redirect::to("/").into_response());
    };

    let status = bans::ban_status(&state.db, &user.id)?;
    if !status.is_banned {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Html(BannedTemplate {
        flash: flash.0,
        reason: status.reason.unwrap_or_else(|| "Rule violation".to_string()),
        permanent: status.expires_at.is_none(),
        expires_at: status.expires_at.unwrap_or_default(),
        appeal_submitted: status.appeal.is_some(),
        appeal_text: status.appeal.unwrap_or_default(),
    })
    .into_response())
}

/// POST /banned — file an appeal.
pub async fn submit_appeal(
    State(state): State<AppState>,
    user: CurrentUser,
    axum::Form(form): axum::Form<AppealForm>,
) -> AppResult<Response> {
    let appeal = form.appeal.trim();
    if appeal.is_empty() {
        return Ok(flash_redirect(
            "/banned",
            Flash::error("An appeal cannot be empty."),
        ));
    }

    match bans::submit_appeal(&state.db, &user.id, appeal) {
        Ok(()) => Ok(flash_redirect(
            "/banned",
            Flash::success("Your appeal has been submitted. An admin will review it."),
        )),
        // Not banned (any more): nothing to appeal.
        Err(AppError::NotFound) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e),
    }
}

// -- Reporting --

/// POST /report/{user_id}
pub async fn report_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    reporter: CurrentUser,
    axum::Form(form): axum::Form<ReportForm>,
) -> AppResult<Response> {
    if user_id == reporter.id {
        return Ok(flash_redirect(
            &format!("/u/{}", reporter.username),
            Flash::error("You cannot report yourself."),
        ));
    }

    let target = users::find_by_id(&state.db, &user_id)?.ok_or(AppError::NotFound)?;
    let back = format!("/u/{}", target.username);

    let Some(reason) = form.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(flash_redirect(&back, Flash::error("Please provide a reason.")));
    };

    reports::report_user(&state.db, &reporter.id, &target.id, reason)?;
    Ok(flash_redirect(
        &back,
        Flash::success("User reported. The moderators will take a look."),
    ))
}

/// POST /report_post/{post_id} — also records the post's author.
pub async fn report_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    reporter: CurrentUser,
    axum::Form(form): axum::Form<ReportForm>,
) -> AppResult<Response> {
    let post = posts::get_post(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    let back = format!("/post/{}", post.id);

    if post.author_id == reporter.id {
        return Ok(flash_redirect(
            &back,
            Flash::error("You cannot report your own post."),
        ));
    }

    let Some(reason) = form.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(flash_redirect(&back, Flash::error("Please provide a reason.")));
    };

    reports::report_post(&state.db, &reporter.id, &post.id, &post.author_id, reason)?;
    Ok(flash_redirect(
        &back,
        Flash::success("Post reported. The moderators will take a look."),
    ))
}

// -- Admin handlers --

/// POST /ban/{user_id} — form fields `reason` and `duration`.
pub async fn ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    _admin: AdminUser,
    axum::Form(form): axum::Form<BanForm>,
) -> AppResult<Response> {
    let target = users::find_by_id(&state.db, &user_id)?.ok_or(AppError::NotFound)?;

    let reason = form
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Rule violation");
    let duration = form
        .duration
        .as_deref()
        .map(BanDuration::from_form)
        .unwrap_or(BanDuration::Permanent);

    bans::apply_ban(&state.db, &target.id, reason, duration)?;
    tracing::info!("User banned: {} ({})", target.username, reason);

    Ok(flash_redirect(
        "/",
        Flash::success(format!("User banned: {}", target.username)),
    ))
}

/// POST /unban/{user_id}
pub async fn unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    _admin: AdminUser,
) -> AppResult<Response> {
    let target = users::find_by_id(&state.db, &user_id)?.ok_or(AppError::NotFound)?;
    bans::lift_ban(&state.db, &target.id)?;

    Ok(flash_redirect(
        "/admin/reports",
        Flash::success(format!("{} has been unbanned.", target.username)),
    ))
}

/// POST /reject_appeal/{user_id} — clears the appeal, keeps the ban.
pub async fn reject_appeal(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    _admin: AdminUser,
) -> AppResult<Response> {
    let target = users::find_by_id(&state.db, &user_id)?.ok_or(AppError::NotFound)?;
    bans::reject_appeal(&state.db, &target.id)?;

    Ok(flash_redirect(
        "/admin/reports",
        Flash::success(format!("Appeal from {} rejected.", target.username)),
    ))
}

/// GET /admin/reports — unresolved reports plus the banned-user list.
pub async fn admin_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    flash: IncomingFlash,
) -> AppResult<Html<AdminReportsTemplate>> {
    let reports = reports::list_unresolved(&state.db)?;
    let banned_users = users::list_banned(&state.db)?;

    Ok(Html(AdminReportsTemplate {
        flash: flash.0,
        reports,
        banned_users,
    }))
}

/// GET /admin/resolve_report/{report_id}
pub async fn resolve_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    _admin: AdminUser,
) -> AppResult<Response> {
    reports::resolve(&state.db, &report_id)?;
    Ok(flash_redirect(
        "/admin/reports",
        Flash::success("Report marked as resolved."),
    ))
}
