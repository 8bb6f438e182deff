use crate::error::Result;
use crate::models::Tag;
use crate::Database;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

pub const MAX_TAGS_PER_POST: usize = 5;
pub const TAG_LIST_LIMIT: usize = 100;

/// Trims, drops leading `#` characters and lowercases a single tag.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Normalizes a user-typed tag list into at most five distinct names,
/// keeping first-seen order and discarding empties.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for tag in raw {
        let name = normalize_tag(tag.as_ref());
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        names.push(name);
        if names.len() == MAX_TAGS_PER_POST {
            break;
        }
    }
    names
}

pub fn upsert_tag(conn: &Connection, name: &str) -> Result<Tag> {
    conn.execute(
        "INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
        [name],
    )?;
    let tag = conn.query_row("SELECT id, name FROM tags WHERE name = ?", [name], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(tag)
}

/// Replaces the post's whole tag set with `names`. Previously linked tags
/// that are not in `names` are unlinked, never merged.
pub fn replace_post_tags(conn: &Connection, post_id: i64, names: &[String]) -> Result<Vec<Tag>> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?", [post_id])?;

    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = upsert_tag(conn, name)?;
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)",
            (post_id, tag.id),
        )?;
        tags.push(tag);
    }
    Ok(tags)
}

/// Batch-loads the tags of several posts, keyed by post id.
pub fn tags_for_posts(conn: &Connection, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut tags_by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(tags_by_post);
    }

    let placeholders = post_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT pt.post_id, t.id, t.name
         FROM tags t
         JOIN post_tags pt ON t.id = pt.tag_id
         WHERE pt.post_id IN ({})
         ORDER BY t.name",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(post_ids.iter()), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;

    for row in rows {
        let (post_id, tag) = row?;
        tags_by_post.entry(post_id).or_default().push(tag);
    }
    Ok(tags_by_post)
}

pub fn list_tag_names(db: &Database, limit: usize) -> Result<Vec<String>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name ASC LIMIT ?")?;
    let names = stmt
        .query_map([limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}
