use rusqlite::{params, Row};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        university: row.get("university")?,
        position: row.get("position")?,
        bio: row.get("bio")?,
        is_admin: row.get("is_admin")?,
        is_verified: row.get("is_verified")?,
        verification_type: row.get("verification_type")?,
        is_banned: row.get("is_banned")?,
        ban_reason: row.get("ban_reason")?,
        ban_appeal_reason: row.get("ban_appeal_reason")?,
        ban_expires_at: row.get("ban_expires_at")?,
        last_username_change: row.get("last_username_change")?,
        created_at: row.get("created_at")?,
    })
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub university: Option<&'a str>,
    pub bio: Option<&'a str>,
}

/// Insert a new account. Username uniqueness is checked by the caller first
/// for a friendly message; the UNIQUE constraint is the real guard.
pub fn create_user(pool: &DbPool, new: &NewUser) -> AppResult<String> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, password_hash, university, bio)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, new.username, new.password_hash, new.university, new.bio],
    )?;
    Ok(id)
}

pub fn find_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    match conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], |row| {
        user_from_row(row)
    }) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT * FROM users WHERE username = ?1",
        params![username],
        |row| user_from_row(row),
    ) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn username_taken(pool: &DbPool, username: &str) -> AppResult<bool> {
    let conn = pool.get()?;
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn update_profile_fields(
    pool: &DbPool,
    user_id: &str,
    university: Option<&str>,
    bio: Option<&str>,
) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE users SET university = ?1, bio = ?2 WHERE id = ?3",
        params![university, bio, user_id],
    )?;
    Ok(())
}

/// Rename the account and stamp the cooldown clock.
pub fn change_username(pool: &DbPool, user_id: &str, new_username: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE users SET username = ?1, last_username_change = ?2 WHERE id = ?3",
        params![new_username, chrono::Utc::now().to_rfc3339(), user_id],
    )?;
    Ok(())
}

pub fn set_password_hash(pool: &DbPool, user_id: &str, password_hash: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}

/// One row of the admin panel's banned-user list. NULL fields come back as
/// empty strings for rendering.
#[derive(Debug, Clone)]
pub struct BannedUserRow {
    pub id: String,
    pub username: String,
    pub reason: String,
    pub expires_at: String,
    pub appeal: String,
}

pub fn list_banned(pool: &DbPool) -> AppResult<Vec<BannedUserRow>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, COALESCE(ban_reason, ''), COALESCE(ban_expires_at, ''),
                COALESCE(ban_appeal_reason, '')
         FROM users WHERE is_banned = 1 ORDER BY username",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BannedUserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            reason: row.get(2)?,
            expires_at: row.get(3)?,
            appeal: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Delete the account. Foreign-key cascades remove the user's posts,
/// comments, votes, academic features, views, sessions, and reports in
/// either role. Irreversible.
pub fn delete_user(pool: &DbPool, user_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
