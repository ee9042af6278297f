use rusqlite::params;
use std::collections::{HashMap, HashSet};

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// A top-level comment with its direct replies, ready to render.
/// One level of nesting is shown; deeper descendants stay in the store
/// but are not materialized here.
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub id: String,
    pub author_id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
    pub replies: Vec<CommentReply>,
}

#[derive(Debug, Clone)]
pub struct CommentReply {
    pub id: String,
    pub author_id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Insert a comment. A supplied parent id is honored only when the parent
/// exists and belongs to the same post; otherwise the comment is silently
/// demoted to top-level (no error surfaced).
pub fn add_comment(
    pool: &DbPool,
    post_id: &str,
    author_id: &str,
    body: &str,
    parent_id: Option<&str>,
) -> AppResult<String> {
    let conn = pool.get()?;

    let parent_id = match parent_id {
        Some(candidate) => {
            let parent_post: Option<String> = match conn.query_row(
                "SELECT post_id FROM comments WHERE id = ?1",
                params![candidate],
                |row| row.get(0),
            ) {
                Ok(p) => Some(p),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };
            match parent_post {
                Some(p) if p == post_id => Some(candidate),
                _ => None,
            }
        }
        None => None,
    };

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, body, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, post_id, author_id, body, parent_id],
    )?;
    Ok(id)
}

pub fn get_comment(pool: &DbPool, id: &str) -> AppResult<Option<Comment>> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT id, post_id, author_id, body, parent_id, created_at
         FROM comments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                body: row.get(3)?,
                parent_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    ) {
        Ok(comment) => Ok(Some(comment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The rendered comment forest for a post. Comments by currently-banned
/// authors are dropped at every depth, so a hidden parent hides its
/// replies with it. Top-level comments sort newest-first, replies
/// oldest-first.
pub fn visible_comments(pool: &DbPool, post_id: &str) -> AppResult<Vec<CommentNode>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.author_id, u.username, c.body, c.parent_id, c.created_at
         FROM comments c JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1 AND u.is_banned = 0
         ORDER BY c.created_at ASC, c.rowid ASC",
    )?;

    struct Row {
        id: String,
        author_id: String,
        author: String,
        body: String,
        parent_id: Option<String>,
        created_at: String,
    }

    let rows: Vec<Row> = stmt
        .query_map(params![post_id], |row| {
            Ok(Row {
                id: row.get(0)?,
                author_id: row.get(1)?,
                author: row.get(2)?,
                body: row.get(3)?,
                parent_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    let top_ids: HashSet<&str> = rows
        .iter()
        .filter(|r| r.parent_id.is_none())
        .map(|r| r.id.as_str())
        .collect();

    let mut replies: HashMap<String, Vec<CommentReply>> = HashMap::new();
    for row in rows.iter() {
        if let Some(parent) = row.parent_id.as_deref() {
            // Replies attach only to visible top-level parents; anything
            // deeper (or orphaned by the ban filter) is not rendered.
            if top_ids.contains(parent) {
                replies.entry(parent.to_string()).or_default().push(CommentReply {
                    id: row.id.clone(),
                    author_id: row.author_id.clone(),
                    author: row.author.clone(),
                    body: row.body.clone(),
                    created_at: row.created_at.clone(),
                });
            }
        }
    }

    let mut nodes: Vec<CommentNode> = rows
        .iter()
        .filter(|r| r.parent_id.is_none())
        .map(|r| CommentNode {
            id: r.id.clone(),
            author_id: r.author_id.clone(),
            author: r.author.clone(),
            body: r.body.clone(),
            created_at: r.created_at.clone(),
            replies: replies.remove(&r.id).unwrap_or_default(),
        })
        .collect();

    // Rows arrive oldest-first; the top level renders newest-first.
    nodes.reverse();
    Ok(nodes)
}

pub fn delete_comment(pool: &DbPool, comment_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
