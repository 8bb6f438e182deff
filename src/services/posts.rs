use crate::db::now_timestamp;
use crate::error::{Error, Result};
use crate::models::{CreatePost, Post, PostFilter, PostWithRelations, UpdatePost, UserSummary};
use crate::services::markdown::{MarkdownRenderer, EXCERPT_LENGTH};
use crate::services::ownership::ensure_owner;
use crate::services::slug::assign_slug;
use crate::services::tags::{self, normalize_tag, normalize_tags, MAX_TAGS_PER_POST};
use crate::Database;
use rusqlite::types::Value;
use rusqlite::Connection;

pub const LIST_LIMIT: usize = 50;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MIN_CONTENT_LENGTH: usize = 10;

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.content, p.published, p.author_id, p.created_at, p.updated_at,
           u.username, u.avatar,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

/// Read query over posts. Every set field narrows the result.
#[derive(Debug, Default, Clone)]
pub struct PostQuery {
    pub id: Option<i64>,
    pub slug: Option<String>,
    pub author_id: Option<i64>,
    pub published_only: bool,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

impl PostQuery {
    /// The public listing: published posts only, newest first, capped at 50.
    pub fn public(filter: &PostFilter) -> Self {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let tag = filter
            .tag
            .as_deref()
            .map(normalize_tag)
            .filter(|t| !t.is_empty());

        Self {
            published_only: true,
            search,
            tag,
            limit: Some(LIST_LIMIT),
            ..Self::default()
        }
    }

    pub fn published_by(author_id: i64) -> Self {
        Self {
            author_id: Some(author_id),
            published_only: true,
            ..Self::default()
        }
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_slug(slug: &str) -> Self {
        Self {
            slug: Some(slug.to_string()),
            ..Self::default()
        }
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(POST_SELECT);
        sql.push_str(" WHERE 1=1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(id) = self.id {
            sql.push_str(" AND p.id = ?");
            params.push(Value::Integer(id));
        }
        if let Some(ref slug) = self.slug {
            sql.push_str(" AND p.slug = ?");
            params.push(Value::Text(slug.clone()));
        }
        if let Some(author_id) = self.author_id {
            sql.push_str(" AND p.author_id = ?");
            params.push(Value::Integer(author_id));
        }
        if self.published_only {
            sql.push_str(" AND p.published = 1");
        }
        if let Some(ref search) = self.search {
            sql.push_str(r" AND p.title LIKE ? ESCAPE '\'");
            params.push(Value::Text(format!("%{}%", escape_like(search))));
        }
        if let Some(ref tag) = self.tag {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND t.name = ?)",
            );
            params.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(limit as i64));
        }

        (sql, params)
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::validation(format!(
            "Title must be {} characters or less",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<()> {
    if content.chars().count() < MIN_CONTENT_LENGTH {
        return Err(Error::validation(format!(
            "Content must be at least {} characters",
            MIN_CONTENT_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_tag_input(tags: &[String]) -> Result<()> {
    if tags.len() > MAX_TAGS_PER_POST {
        return Err(Error::validation(format!(
            "A post can have at most {} tags",
            MAX_TAGS_PER_POST
        )));
    }
    Ok(())
}

pub fn validate_create(input: &CreatePost) -> Result<()> {
    validate_title(&input.title)?;
    validate_content(&input.content)?;
    validate_tag_input(&input.tags)
}

pub fn validate_update(input: &UpdatePost) -> Result<()> {
    if let Some(ref title) = input.title {
        validate_title(title)?;
    }
    if let Some(ref content) = input.content {
        validate_content(content)?;
    }
    if let Some(ref tags) = input.tags {
        validate_tag_input(tags)?;
    }
    Ok(())
}

/// Drafts are only visible to their author.
pub fn is_visible_to(post: &Post, viewer_id: Option<i64>) -> bool {
    post.published || viewer_id == Some(post.author_id)
}

pub fn create_post(db: &Database, author_id: i64, input: CreatePost) -> Result<PostWithRelations> {
    validate_create(&input)?;
    let title = input.title.trim().to_string();
    let tag_names = normalize_tags(&input.tags);
    let now = now_timestamp();

    let mut conn = db.get()?;
    let tx = conn.transaction()?;
    let slug = assign_slug(&tx, &title, None)?;
    tx.execute(
        r#"
        INSERT INTO posts (title, slug, content, published, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        (
            &title,
            &slug,
            &input.content,
            input.published,
            author_id,
            &now,
            &now,
        ),
    )?;
    let post_id = tx.last_insert_rowid();
    tags::replace_post_tags(&tx, post_id, &tag_names)?;
    tx.commit()?;

    tracing::info!(post_id, slug = %slug, "Post created");
    load_required(&conn, post_id)
}

pub fn update_post(
    db: &Database,
    principal_id: i64,
    post_id: i64,
    input: UpdatePost,
) -> Result<PostWithRelations> {
    validate_update(&input)?;

    let mut conn = db.get()?;
    let current = load_one(&conn, &PostQuery::by_id(post_id))?
        .ok_or_else(|| Error::not_found("Post not found"))?
        .post;
    ensure_owner(principal_id, current.author_id)?;

    let tx = conn.transaction()?;

    let (title, slug) = match input.title.as_deref().map(str::trim) {
        Some(title) if title != current.title => {
            let slug = assign_slug(&tx, title, Some(post_id))?;
            (title.to_string(), slug)
        }
        _ => (current.title, current.slug),
    };
    let content = input.content.unwrap_or(current.content);
    let published = input.published.unwrap_or(current.published);

    tx.execute(
        r#"
        UPDATE posts SET title = ?, slug = ?, content = ?, published = ?, updated_at = ?
        WHERE id = ?
        "#,
        (&title, &slug, &content, published, now_timestamp(), post_id),
    )?;

    if let Some(raw_tags) = input.tags {
        tags::replace_post_tags(&tx, post_id, &normalize_tags(&raw_tags))?;
    }
    tx.commit()?;

    tracing::info!(post_id, slug = %slug, "Post updated");
    load_required(&conn, post_id)
}

pub fn delete_post(db: &Database, principal_id: i64, post_id: i64) -> Result<()> {
    let conn = db.get()?;
    let author_id = post_author(&conn, post_id)?.ok_or_else(|| Error::not_found("Post not found"))?;
    ensure_owner(principal_id, author_id)?;

    conn.execute("DELETE FROM posts WHERE id = ?", [post_id])?;
    tracing::info!(post_id, "Post deleted");
    Ok(())
}

pub fn get_post(db: &Database, post_id: i64) -> Result<Option<PostWithRelations>> {
    let conn = db.get()?;
    load_one(&conn, &PostQuery::by_id(post_id))
}

pub fn get_post_by_slug(db: &Database, slug: &str) -> Result<Option<PostWithRelations>> {
    let conn = db.get()?;
    load_one(&conn, &PostQuery::by_slug(slug))
}

pub fn list_posts(db: &Database, filter: &PostFilter) -> Result<Vec<PostWithRelations>> {
    let conn = db.get()?;
    load_posts(&conn, &PostQuery::public(filter))
}

fn post_author(conn: &Connection, post_id: i64) -> Result<Option<i64>> {
    use rusqlite::OptionalExtension;
    let author_id = conn
        .query_row("SELECT author_id FROM posts WHERE id = ?", [post_id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(author_id)
}

fn load_required(conn: &Connection, post_id: i64) -> Result<PostWithRelations> {
    load_one(conn, &PostQuery::by_id(post_id))?
        .ok_or_else(|| Error::Internal(anyhow::anyhow!("post {} vanished after write", post_id)))
}

fn load_one(conn: &Connection, query: &PostQuery) -> Result<Option<PostWithRelations>> {
    Ok(load_posts(conn, query)?.into_iter().next())
}

pub(crate) fn load_posts(conn: &Connection, query: &PostQuery) -> Result<Vec<PostWithRelations>> {
    let (sql, params) = query.to_sql();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            let post = Post {
                id: row.get(0)?,
                title: row.get(1)?,
                slug: row.get(2)?,
                content: row.get(3)?,
                published: row.get(4)?,
                author_id: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            };
            let author = UserSummary {
                id: post.author_id,
                username: row.get(8)?,
                avatar: row.get(9)?,
            };
            let comment_count: i64 = row.get(10)?;
            Ok((post, author, comment_count))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let post_ids: Vec<i64> = rows.iter().map(|(post, _, _)| post.id).collect();
    let mut tags_by_post = tags::tags_for_posts(conn, &post_ids)?;

    let renderer = MarkdownRenderer::new();
    let posts = rows
        .into_iter()
        .map(|(post, author, comment_count)| PostWithRelations {
            content_html: renderer.render(&post.content),
            excerpt: renderer.generate_excerpt(&post.content, EXCERPT_LENGTH),
            tags: tags_by_post.remove(&post.id).unwrap_or_default(),
            author,
            comment_count,
            post,
        })
        .collect();

    Ok(posts)
}
