use crate::error::{Error, Result};
use crate::models::{Comment, CommentWithAuthor, CreateComment, UserSummary};
use crate::services::ownership::ensure_owner;
use crate::Database;
use rusqlite::{Connection, OptionalExtension};

pub const MAX_COMMENT_LENGTH: usize = 1000;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.author_id, c.post_id, c.created_at, u.username, u.avatar
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<CommentWithAuthor> {
    let comment = Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        post_id: row.get(3)?,
        created_at: row.get(4)?,
    };
    let author = UserSummary {
        id: comment.author_id,
        username: row.get(5)?,
        avatar: row.get(6)?,
    };
    Ok(CommentWithAuthor { comment, author })
}

/// Returns the trimmed body when it is 1 to 1000 characters long.
pub fn validate_comment(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation("Comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(Error::validation(format!(
            "Comment must be {} characters or less",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(content.to_string())
}

fn post_state(conn: &Connection, post_id: i64) -> Result<Option<(bool, i64)>> {
    let state = conn
        .query_row(
            "SELECT published, author_id FROM posts WHERE id = ?",
            [post_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(state)
}

/// Newest first. Comments of a draft are only listed for the draft's author.
pub fn list_comments(
    db: &Database,
    post_id: i64,
    viewer_id: Option<i64>,
) -> Result<Vec<CommentWithAuthor>> {
    let conn = db.get()?;
    match post_state(&conn, post_id)? {
        Some((published, author_id)) if published || viewer_id == Some(author_id) => {}
        _ => return Err(Error::not_found("Post not found")),
    }

    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ? ORDER BY c.created_at DESC, c.id DESC",
        COMMENT_SELECT
    ))?;
    let comments = stmt
        .query_map([post_id], row_to_comment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

/// Comments may only be attached to published posts.
pub fn create_comment(
    db: &Database,
    author_id: i64,
    input: CreateComment,
) -> Result<CommentWithAuthor> {
    let content = validate_comment(&input.content)?;

    let conn = db.get()?;
    match post_state(&conn, input.post_id)? {
        Some((true, _)) => {}
        _ => return Err(Error::not_found("Post not found")),
    }

    conn.execute(
        "INSERT INTO comments (content, author_id, post_id) VALUES (?, ?, ?)",
        (&content, author_id, input.post_id),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(comment_id = id, post_id = input.post_id, "Comment created");

    let comment = conn.query_row(
        &format!("{} WHERE c.id = ?", COMMENT_SELECT),
        [id],
        row_to_comment,
    )?;
    Ok(comment)
}

pub fn delete_comment(db: &Database, principal_id: i64, comment_id: i64) -> Result<()> {
    let conn = db.get()?;
    let author_id: i64 = conn
        .query_row(
            "SELECT author_id FROM comments WHERE id = ?",
            [comment_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::not_found("Comment not found"))?;
    ensure_owner(principal_id, author_id)?;

    conn.execute("DELETE FROM comments WHERE id = ?", [comment_id])?;
    tracing::info!(comment_id, "Comment deleted");
    Ok(())
}
