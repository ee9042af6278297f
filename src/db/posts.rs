use rusqlite::params;

use crate::db::models::{Post, PostCategory};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// One row of the front-page listing, author and counters resolved.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: PostCategory,
    pub author: String,
    pub created_at: String,
    pub view_count: i64,
    pub score: i64,
    pub comment_count: i64,
}

/// Aggregates shown on the post detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostStats {
    pub score: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub realism_average: f64,
    pub experience_count: i64,
    pub wish_knew_count: i64,
}

pub fn create_post(
    pool: &DbPool,
    author_id: &str,
    title: &str,
    body: &str,
    category: PostCategory,
) -> AppResult<String> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO posts (id, author_id, title, body, category)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, author_id, title, body, category.as_slug()],
    )?;
    Ok(id)
}

pub fn get_post(pool: &DbPool, id: &str) -> AppResult<Option<Post>> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT id, author_id, title, body, category, view_count, created_at
         FROM posts WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
            ))
        },
    ) {
        Ok((id, author_id, title, body, category, view_count, created_at)) => {
            let category = PostCategory::from_slug(&category)
                .ok_or_else(|| AppError::Internal(format!("bad category in store: {}", category)))?;
            Ok(Some(Post {
                id,
                author_id,
                title,
                body,
                category,
                view_count,
                created_at,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Paginated front-page listing. Posts by currently-banned authors are
/// excluded; `query` does a case-insensitive substring match on title and
/// body. Returns the page plus the total matching count.
pub fn list_posts(
    pool: &DbPool,
    page: i64,
    per_page: i64,
    query: &str,
    category: Option<PostCategory>,
) -> AppResult<(Vec<PostSummary>, i64)> {
    let conn = pool.get()?;
    let page = page.max(1);
    let offset = (page - 1) * per_page;
    let cat_slug = category.map(|c| c.as_slug()).unwrap_or("");

    let total: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM posts p JOIN users u ON u.id = p.author_id
         WHERE u.is_banned = 0
           AND (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.body LIKE '%' || ?1 || '%')
           AND (?2 = '' OR p.category = ?2)",
        params![query, cat_slug],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.body, p.category, p.created_at, p.view_count, u.username,
                (SELECT COALESCE(SUM(v.value), 0) FROM votes v WHERE v.post_id = p.id),
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
         FROM posts p JOIN users u ON u.id = p.author_id
         WHERE u.is_banned = 0
           AND (?1 = '' OR p.title LIKE '%' || ?1 || '%' OR p.body LIKE '%' || ?1 || '%')
           AND (?2 = '' OR p.category = ?2)
         ORDER BY p.created_at DESC, p.rowid DESC
         LIMIT ?3 OFFSET ?4",
    )?;

    let rows = stmt.query_map(params![query, cat_slug, per_page, offset], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, i64>(7)?,
            row.get::<_, i64>(8)?,
        ))
    })?;

    let mut posts = Vec::new();
    for row in rows {
        let (id, title, body, category, created_at, view_count, author, score, comment_count) =
            row?;
        let category = PostCategory::from_slug(&category)
            .ok_or_else(|| AppError::Internal(format!("bad category in store: {}", category)))?;
        posts.push(PostSummary {
            id,
            title,
            body,
            category,
            author,
            created_at,
            view_count,
            score,
            comment_count,
        });
    }

    Ok((posts, total))
}

pub fn delete_post(pool: &DbPool, post_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Count a view at most once per (user, post). The unique constraint keeps
/// concurrent duplicates out; the counter only moves when the insert lands.
pub fn record_view(pool: &DbPool, post_id: &str, user_id: &str) -> AppResult<bool> {
    let conn = pool.get()?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO post_views (id, post_id, user_id) VALUES (?1, ?2, ?3)",
        params![uuid::Uuid::now_v7().to_string(), post_id, user_id],
    )?;
    if inserted == 0 {
        return Ok(false);
    }
    conn.execute(
        "UPDATE posts SET view_count = view_count + 1 WHERE id = ?1",
        params![post_id],
    )?;
    Ok(true)
}

pub fn post_stats(pool: &DbPool, post_id: &str) -> AppResult<PostStats> {
    let conn = pool.get()?;
    let (score, like_count, dislike_count): (i64, i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(value), 0),
                COALESCE(SUM(value = 1), 0),
                COALESCE(SUM(value = -1), 0)
         FROM votes WHERE post_id = ?1",
        params![post_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let realism_average: f64 = conn.query_row(
        "SELECT COALESCE(AVG(value), 0.0) FROM academic_features
         WHERE post_id = ?1 AND type = 'realism_score'",
        params![post_id],
        |row| row.get(0),
    )?;
    // One decimal, 0 when nobody has scored yet.
    let realism_average = (realism_average * 10.0).round() / 10.0;

    let (experience_count, wish_knew_count): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(type = 'is_experience'), 0),
                COALESCE(SUM(type = 'is_wish_knew'), 0)
         FROM academic_features WHERE post_id = ?1",
        params![post_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(PostStats {
        score,
        like_count,
        dislike_count,
        realism_average,
        experience_count,
        wish_knew_count,
    })
}
