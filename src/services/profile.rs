use crate::error::{Error, Result};
use crate::models::{Profile, UpdateProfile, User};
use crate::services::auth::{row_to_user, USER_COLUMNS};
use crate::services::posts::{load_posts, PostQuery};
use crate::Database;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;

pub const MAX_BIO_LENGTH: usize = 500;

pub fn validate_bio(bio: &str) -> Result<()> {
    if bio.chars().count() > MAX_BIO_LENGTH {
        return Err(Error::validation(format!(
            "Bio must be {} characters or less",
            MAX_BIO_LENGTH
        )));
    }
    Ok(())
}

/// Accepts absolute `http` and `https` URLs only.
pub fn validate_link(value: &str, message: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(Error::validation(message)),
    }
}

pub fn validate_update(input: &UpdateProfile) -> Result<()> {
    if let Some(Some(ref bio)) = input.bio {
        validate_bio(bio)?;
    }
    if let Some(Some(ref avatar)) = input.avatar {
        validate_link(avatar, "Avatar must be a valid URL")?;
    }
    if let Some(Some(ref link)) = input.social_link {
        validate_link(link, "Social link must be a valid URL")?;
    }
    Ok(())
}

/// Applies the fields present in `input` to the user's own row.
pub fn update_profile(db: &Database, user_id: i64, input: UpdateProfile) -> Result<User> {
    validate_update(&input)?;

    let mut assignments: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    let fields = [
        ("bio = ?", input.bio),
        ("avatar = ?", input.avatar),
        ("social_link = ?", input.social_link),
    ];
    for (assignment, value) in fields {
        if let Some(value) = value {
            assignments.push(assignment);
            params.push(value.map(Value::Text).unwrap_or(Value::Null));
        }
    }

    let conn = db.get()?;
    if !assignments.is_empty() {
        let sql = format!("UPDATE users SET {} WHERE id = ?", assignments.join(", "));
        params.push(Value::Integer(user_id));
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
    }

    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
        [user_id],
        row_to_user,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("User not found"))
}

/// Public fields plus the user's published posts, newest first.
pub fn get_public_profile(db: &Database, username: &str) -> Result<Option<Profile>> {
    let conn = db.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
            [username],
            row_to_user,
        )
        .optional()?;

    let Some(user) = user else {
        return Ok(None);
    };

    let posts = load_posts(&conn, &PostQuery::published_by(user.id))?;
    Ok(Some(Profile {
        id: user.id,
        username: user.username,
        bio: user.bio,
        avatar: user.avatar,
        social_link: user.social_link,
        created_at: user.created_at,
        posts,
    }))
}
