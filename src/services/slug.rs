use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use slug::slugify;

/// Used when a title has no characters that survive slugification.
pub const FALLBACK_SLUG: &str = "post";

pub fn generate_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn validate_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > 250 {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn disambiguate(slug: &str, epoch_millis: i64) -> String {
    format!("{}-{}", slug, epoch_millis)
}

/// Picks the slug for `title`. A candidate held by another post gets the
/// current epoch-millisecond timestamp appended; one held by `current_post`
/// itself is kept.
///
/// Two writers racing on the same title, or two collisions within the same
/// millisecond, can produce the same slug. The UNIQUE index on `posts.slug`
/// makes the later insert fail.
pub fn assign_slug(conn: &Connection, title: &str, current_post: Option<i64>) -> Result<String> {
    let candidate = generate_slug(title);
    if is_free(conn, &candidate, current_post)? {
        return Ok(candidate);
    }

    Ok(disambiguate(&candidate, chrono::Utc::now().timestamp_millis()))
}

fn is_free(conn: &Connection, slug: &str, current_post: Option<i64>) -> Result<bool> {
    let holder: Option<i64> = conn
        .query_row("SELECT id FROM posts WHERE slug = ?", [slug], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(holder.is_none() || holder == current_post)
}
