//! Blog post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageSlot;

/// News / blog post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Markdown source
    pub content: String,
    /// Rendered content
    pub content_html: String,
    /// Object path in the `blog-images` bucket
    pub cover_image: Option<String>,
    pub is_published: bool,
    /// Set the first time the post is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blog post with its cover URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPostView {
    #[serde(flatten)]
    pub post: BlogPost,
    pub cover_image_url: Option<String>,
}

/// Editor form for a blog post
#[derive(Debug, Clone, Deserialize)]
pub struct BlogPostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<ImageSlot>,
    #[serde(default)]
    pub is_published: bool,
}
