use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// One row of the admin report queue, names resolved for display.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: String,
    pub reporter: String,
    pub reported_user: Option<String>,
    pub reported_post_id: Option<String>,
    pub reported_post_title: Option<String>,
    pub reason: String,
    pub created_at: String,
}

pub fn report_user(pool: &DbPool, reporter_id: &str, reported_user_id: &str, reason: &str) -> AppResult<String> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO reports (id, reporter_id, reported_user_id, reason)
         VALUES (?1, ?2, ?3, ?4)",
        params![id, reporter_id, reported_user_id, reason],
    )?;
    Ok(id)
}

/// Reporting a post also records its author, so the report stays actionable
/// if the post is later deleted.
pub fn report_post(
    pool: &DbPool,
    reporter_id: &str,
    reported_post_id: &str,
    reported_user_id: &str,
    reason: &str,
) -> AppResult<String> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO reports (id, reporter_id, reported_post_id, reported_user_id, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, reporter_id, reported_post_id, reported_user_id, reason],
    )?;
    Ok(id)
}

pub fn list_unresolved(pool: &DbPool) -> AppResult<Vec<ReportRow>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT r.id, ur.username, tu.username, r.reported_post_id, p.title,
                r.reason, r.created_at
         FROM reports r
         JOIN users ur ON ur.id = r.reporter_id
         LEFT JOIN users tu ON tu.id = r.reported_user_id
         LEFT JOIN posts p ON p.id = r.reported_post_id
         WHERE r.is_resolved = 0
         ORDER BY r.created_at DESC, r.rowid DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ReportRow {
            id: row.get(0)?,
            reporter: row.get(1)?,
            reported_user: row.get(2)?,
            reported_post_id: row.get(3)?,
            reported_post_title: row.get(4)?,
            reason: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn resolve(pool: &DbPool, report_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE reports SET is_resolved = 1 WHERE id = ?1",
        params![report_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PostCategory;
    use crate::db::posts::create_post;
    use crate::db::test_pool;
    use crate::db::users::{create_user, NewUser};

    fn user(pool: &DbPool, name: &str) -> String {
        create_user(
            pool,
            &NewUser {
                username: name,
                password_hash: "h",
                university: None,
                bio: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn reported_user_appears_in_queue_until_resolved() {
        let pool = test_pool();
        let alice = user(&pool, "alice");
        let bob = user(&pool, "bob");

        let id = report_user(&pool, &alice, &bob, "spam").unwrap();

        let queue = list_unresolved(&pool).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].reporter, "alice");
        assert_eq!(queue[0].reported_user.as_deref(), Some("bob"));
        assert_eq!(queue[0].reason, "spam");

        resolve(&pool, &id).unwrap();
        assert!(list_unresolved(&pool).unwrap().is_empty());
    }

    #[test]
    fn post_report_denormalizes_author() {
        let pool = test_pool();
        let alice = user(&pool, "alice");
        let bob = user(&pool, "bob");
        let post = create_post(&pool, &bob, "Bad post", "b", PostCategory::General).unwrap();

        report_post(&pool, &alice, &post, &bob, "rude").unwrap();

        let queue = list_unresolved(&pool).unwrap();
        assert_eq!(queue[0].reported_post_title.as_deref(), Some("Bad post"));
        assert_eq!(queue[0].reported_user.as_deref(), Some("bob"));
    }

    #[test]
    fn resolving_missing_report_is_not_found() {
        let pool = test_pool();
        assert!(matches!(resolve(&pool, "ghost"), Err(AppError::NotFound)));
    }
}
