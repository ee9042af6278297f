//! Ban lifecycle: admin bans with a duration, the banned user may appeal,
//! admins unban or reject the appeal. Expiry is lazy — nothing runs in the
//! background; an expired ban is cleared the next time the account is seen.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use crate::auth::session::{cookie_value, user_for_token};
use crate::error::{AppError, AppResult};
use crate::state::{AppState, DbPool};

/// Ban lengths offered on the admin form. Anything unrecognized falls back
/// to permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDuration {
    OneDay,
    SevenDays,
    ThirtyDays,
    Permanent,
}

impl BanDuration {
    pub fn from_form(value: &str) -> Self {
        match value {
            "1_day" => BanDuration::OneDay,
            "7_days" => BanDuration::SevenDays,
            "30_days" => BanDuration::ThirtyDays,
            _ => BanDuration::Permanent,
        }
    }

    /// Absolute expiry, or None for a permanent ban.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BanDuration::OneDay => Some(now + Duration::days(1)),
            BanDuration::SevenDays => Some(now + Duration::days(7)),
            BanDuration::ThirtyDays => Some(now + Duration::days(30)),
            BanDuration::Permanent => None,
        }
    }
}

/// Current ban fields for one user, as shown on the appeal page.
#[derive(Debug, Clone)]
pub struct BanStatus {
    pub is_banned: bool,
    pub reason: Option<String>,
    pub expires_at: Option<String>,
    pub appeal: Option<String>,
}

pub fn ban_status(pool: &DbPool, user_id: &str) -> AppResult<BanStatus> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT is_banned, ban_reason, ban_expires_at, ban_appeal_reason
         FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(BanStatus {
                is_banned: row.get(0)?,
                reason: row.get(1)?,
                expires_at: row.get(2)?,
                appeal: row.get(3)?,
            })
        },
    ) {
        Ok(status) => Ok(status),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// active -> banned. Clears any stale appeal from a previous ban.
pub fn apply_ban(
    pool: &DbPool,
    user_id: &str,
    reason: &str,
    duration: BanDuration,
) -> AppResult<()> {
    let conn = pool.get()?;
    let expires_at = duration.expires_at(Utc::now()).map(|dt| dt.to_rfc3339());
    let updated = conn.execute(
        "UPDATE users SET is_banned = 1, ban_reason = ?1, ban_expires_at = ?2,
                          ban_appeal_reason = NULL
         WHERE id = ?3",
        params![reason, expires_at, user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// banned(*) -> active, by explicit admin action.
pub fn lift_ban(pool: &DbPool, user_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE users SET is_banned = 0, ban_reason = NULL, ban_expires_at = NULL,
                          ban_appeal_reason = NULL
         WHERE id = ?1",
        params![user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// banned -> banned_with_appeal. Only meaningful while banned.
pub fn submit_appeal(pool: &DbPool, user_id: &str, appeal: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE users SET ban_appeal_reason = ?1 WHERE id = ?2 AND is_banned = 1",
        params![appeal, user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// banned_with_appeal -> banned. The ban itself persists.
pub fn reject_appeal(pool: &DbPool, user_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE users SET ban_appeal_reason = NULL WHERE id = ?1",
        params![user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Lazy expiry: if the user's ban has an expiry in the past, clear the ban
/// fields and report true. Idempotent, so two racing requests both clearing
/// is harmless.
pub fn clear_ban_if_expired(pool: &DbPool, user_id: &str) -> AppResult<bool> {
    let status = ban_status(pool, user_id)?;
    if !status.is_banned {
        return Ok(false);
    }
    let expired = status
        .expires_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc) < Utc::now())
        .unwrap_or(false);
    if !expired {
        return Ok(false);
    }
    lift_ban(pool, user_id)?;
    Ok(true)
}

/// Paths a banned user may still reach. Logout must stay exempt or a banned
/// account could never leave the banned state by re-login after expiry.
fn is_exempt(path: &str) -> bool {
    path == "/banned" || path == "/logout" || path.starts_with("/assets/")
}

/// The single ban gate. Runs on every request: resolves the session, clears
/// an expired ban, and otherwise routes still-banned users to the appeal
/// page.
pub async fn ban_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = cookie_value(request.headers(), &state.config.auth.cookie_name)
        .map(|t| t.to_string());

    if let Some(token) = token {
        let user = match user_for_token(&state.db, &token) {
            Ok(user) => user,
            Err(e) => return e.into_response(),
        };
        if let Some(user) = user {
            if user.is_banned {
                match clear_ban_if_expired(&state.db, &user.id) {
                    Ok(true) => {} // expired, cleared, carry on
                    Ok(false) => {
                        if !is_exempt(request.uri().path()) {
                            return Redirect::to("/banned").into_response();
                        }
                    }
                    Err(e) => return e.into_response(),
                }
            }
        }
    }

    next.run(request).await
}
