//! Portfolio gallery models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageSlot;

/// A past project shown in the portfolio gallery
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioItem {
    pub id: i64,
    pub title: String,
    pub client: String,
    pub category: String,
    pub description: String,
    /// Object path in the `portfolio-gallery-images` bucket
    pub image_path: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Portfolio item with its public image URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioItemView {
    #[serde(flatten)]
    pub item: PortfolioItem,
    pub image_url: Option<String>,
}

/// Editor form for one portfolio item
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioItemInput {
    pub title: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<ImageSlot>,
    /// Position in the gallery; appended at the end when absent
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Row values ready to be written, with the image already committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioItemRecord {
    pub title: String,
    pub client: String,
    pub category: String,
    pub description: String,
    pub image_path: Option<String>,
    pub sort_order: i32,
}
