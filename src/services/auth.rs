use crate::db::{format_timestamp, now_timestamp};
use crate::error::{Error, Result};
use crate::models::User;
use crate::Database;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use rusqlite::{Connection, OptionalExtension};
use std::sync::OnceLock;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;

pub(crate) const USER_COLUMNS: &str =
    "id, email, username, password_hash, bio, avatar, social_link, created_at";

pub(crate) fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        bio: row.get(4)?,
        avatar: row.get(5)?,
        social_link: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::validation("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(Error::validation(format!(
            "Username must be {} characters or less",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::validation(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(Error::validation("Email cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(Error::validation(format!(
            "Email must be {} characters or less",
            MAX_EMAIL_LENGTH
        )));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(Error::validation("Invalid email format"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::validation(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::validation(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::validation("Password must contain at least one number"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    validate_password(password)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => {
            burn_dummy_verify(password);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// A real argon2 hash of a throwaway password, built on first use so its
/// parameters always match `Argon2::default()`.
pub(crate) fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(b"lity-unknown-account", &salt)
                .ok()
                .map(|hash| hash.to_string())
        })
        .as_deref()
}

// Keeps the unknown-account path as slow as a real verification.
fn burn_dummy_verify(password: &str) {
    if let Some(dummy) = dummy_hash().and_then(|h| PasswordHash::new(h).ok()) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &dummy);
    }
}

pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn ensure_identity_free(conn: &Connection, email: &str, username: &str) -> Result<()> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ? OR username = ?",
        (email, username),
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(Error::validation("Email or username is already taken"));
    }
    Ok(())
}

pub fn create_user(db: &Database, email: &str, username: &str, password: &str) -> Result<i64> {
    let email = email.trim().to_lowercase();
    let username = username.trim();
    validate_email(&email)?;
    validate_username(username)?;
    let password_hash = hash_password(password)?;

    let conn = db.get()?;
    ensure_identity_free(&conn, &email, username)?;
    conn.execute(
        "INSERT INTO users (email, username, password_hash) VALUES (?, ?, ?)",
        (&email, username, &password_hash),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Creates the account, or resets username and password on an existing email.
pub fn upsert_user(db: &Database, email: &str, username: &str, password: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    let username = username.trim();
    validate_email(&email)?;
    validate_username(username)?;
    let password_hash = hash_password(password)?;

    let conn = db.get()?;
    let held_elsewhere: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ? AND email != ?",
        (username, &email),
        |row| row.get(0),
    )?;
    if held_elsewhere > 0 {
        return Err(Error::validation("Email or username is already taken"));
    }
    conn.execute(
        r#"
        INSERT INTO users (email, username, password_hash) VALUES (?1, ?2, ?3)
        ON CONFLICT(email) DO UPDATE SET username = ?2, password_hash = ?3
        "#,
        (&email, username, &password_hash),
    )?;
    let user = conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
        [&email],
        row_to_user,
    )?;
    Ok(user)
}

pub fn update_password(db: &Database, username: &str, password: &str) -> Result<()> {
    let password_hash = hash_password(password)?;
    let conn = db.get()?;
    let affected = conn.execute(
        "UPDATE users SET password_hash = ? WHERE username = ?",
        (&password_hash, username),
    )?;
    if affected == 0 {
        return Err(Error::not_found("User not found"));
    }
    Ok(())
}

pub fn authenticate(db: &Database, email: &str, password: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    let conn = db.get()?;
    let user: Option<User> = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
            [&email],
            row_to_user,
        )
        .optional()?;

    match user {
        Some(u) if verify_password(password, &u.password_hash) => Ok(Some(u)),
        Some(_) => Ok(None),
        None => {
            burn_dummy_verify(password);
            Ok(None)
        }
    }
}

pub fn create_session(db: &Database, user_id: i64, lifetime: chrono::Duration) -> Result<String> {
    let token = generate_session_token();
    let expires_at = chrono::Utc::now()
        .checked_add_signed(lifetime)
        .map(format_timestamp)
        .ok_or_else(|| anyhow::anyhow!("Session lifetime {} is out of range", lifetime))?;
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, ?)",
        (user_id, &token, &expires_at),
    )?;
    Ok(token)
}

pub fn validate_session(db: &Database, token: &str) -> Result<Option<User>> {
    let conn = db.get()?;
    let user = conn
        .query_row(
            r#"
            SELECT u.id, u.email, u.username, u.password_hash, u.bio, u.avatar, u.social_link, u.created_at
            FROM users u
            JOIN sessions s ON s.user_id = u.id
            WHERE s.token = ? AND s.expires_at > ?
            "#,
            (token, now_timestamp()),
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn delete_session(db: &Database, token: &str) -> Result<()> {
    let conn = db.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?", [token])?;
    Ok(())
}

pub fn cleanup_expired_sessions(db: &Database) -> Result<usize> {
    let conn = db.get()?;
    let purged = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?",
        [now_timestamp()],
    )?;
    Ok(purged)
}

pub fn list_users(db: &Database) -> Result<Vec<User>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn get_user(db: &Database, id: i64) -> Result<Option<User>> {
    let conn = db.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}
