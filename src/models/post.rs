use super::{Tag, UserSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub content_html: String,
    pub excerpt: String,
    pub author: UserSummary,
    pub tags: Vec<Tag>,
    pub comment_count: i64,
}

impl PostWithRelations {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

/// Query string accepted by the post listing.
#[derive(Debug, Default, Deserialize)]
pub struct PostFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
}
