use rusqlite::params;

use crate::db::models::{AcademicFeatureType, VoteDirection};
use crate::error::AppResult;
use crate::state::DbPool;

/// The viewer's own recorded votes on one post, for rendering button state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserVotes {
    pub main_vote: Option<i64>,
    pub realism_score: Option<i64>,
    pub is_experience: bool,
    pub is_wish_knew: bool,
}

/// Apply an up/down vote. One row per (user, post): voting the same
/// direction again retracts the vote, the opposite direction flips it.
pub fn toggle_vote(
    pool: &DbPool,
    user_id: &str,
    post_id: &str,
    direction: VoteDirection,
) -> AppResult<()> {
    let conn = pool.get()?;
    let value = direction.value();

    let existing: Option<i64> = match conn.query_row(
        "SELECT value FROM votes WHERE user_id = ?1 AND post_id = ?2",
        params![user_id, post_id],
        |row| row.get(0),
    ) {
        Ok(v) => Some(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    match existing {
        Some(v) if v == value => {
            conn.execute(
                "DELETE FROM votes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
        }
        Some(_) => {
            conn.execute(
                "UPDATE votes SET value = ?1 WHERE user_id = ?2 AND post_id = ?3",
                params![value, user_id, post_id],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO votes (id, user_id, post_id, value) VALUES (?1, ?2, ?3, ?4)",
                params![uuid::Uuid::now_v7().to_string(), user_id, post_id, value],
            )?;
        }
    }

    Ok(())
}

/// Record an academic annotation. Presence flags toggle off on resubmit;
/// the realism score overwrites in place.
pub fn vote_academic(
    pool: &DbPool,
    user_id: &str,
    post_id: &str,
    feature: AcademicFeatureType,
    value: i64,
) -> AppResult<()> {
    let conn = pool.get()?;
    let value = if feature.is_flag() { 1 } else { value };

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM academic_features
         WHERE user_id = ?1 AND post_id = ?2 AND type = ?3",
        params![user_id, post_id, feature.as_slug()],
        |row| row.get(0),
    )?;

    if exists {
        if feature.is_flag() {
            conn.execute(
                "DELETE FROM academic_features
                 WHERE user_id = ?1 AND post_id = ?2 AND type = ?3",
                params![user_id, post_id, feature.as_slug()],
            )?;
        } else {
            conn.execute(
                "UPDATE academic_features SET value = ?1
                 WHERE user_id = ?2 AND post_id = ?3 AND type = ?4",
                params![value, user_id, post_id, feature.as_slug()],
            )?;
        }
    } else {
        conn.execute(
            "INSERT INTO academic_features (id, user_id, post_id, type, value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::now_v7().to_string(),
                user_id,
                post_id,
                feature.as_slug(),
                value
            ],
        )?;
    }

    Ok(())
}

pub fn user_votes(pool: &DbPool, user_id: &str, post_id: &str) -> AppResult<UserVotes> {
    let conn = pool.get()?;
    let mut votes = UserVotes::default();

    votes.main_vote = match conn.query_row(
        "SELECT value FROM votes WHERE user_id = ?1 AND post_id = ?2",
        params![user_id, post_id],
        |row| row.get(0),
    ) {
        Ok(v) => Some(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    let mut stmt = conn.prepare(
        "SELECT type, value FROM academic_features WHERE user_id = ?1 AND post_id = ?2",
    )?;
    let rows = stmt.query_map(params![user_id, post_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, value) = row?;
        match kind.as_str() {
            "realism_score" => votes.realism_score = Some(value),
            "is_experience" => votes.is_experience = true,
            "is_wish_knew" => votes.is_wish_knew = true,
            _ => {}
        }
    }

    Ok(votes)
}
