//! Event models
//!
//! Events are the exhibitions and conferences shown on the public site.
//! Each may belong to one category and carries a gallery of images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageSlot;

/// A category events are grouped under (e.g. "Trade Shows")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventCategory {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub sort_order: i32,
}

/// Input for creating an event category
#[derive(Debug, Clone, Deserialize)]
pub struct EventCategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    /// URL slug (unique)
    pub slug: String,
    pub title: String,
    /// Short teaser shown on cards
    pub summary: String,
    /// Markdown source
    pub description: String,
    /// Rendered description
    pub description_html: String,
    pub venue: String,
    pub city: String,
    pub starts_at: DateTime<Utc>,
    /// Last day of a multi-day event
    pub ends_at: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    /// Object path in the `event-images` bucket
    pub cover_image: Option<String>,
    pub registration_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// An event is upcoming until its last day has passed
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.unwrap_or(self.starts_at) >= now
    }
}

/// Event as returned to clients, with presentation fields resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    /// Formatted date range, e.g. `MARCH 5 - APRIL 7, 2025`
    pub date_label: String,
    pub cover_image_url: Option<String>,
    pub category: Option<EventCategory>,
}

/// Editor form for an event.
///
/// Dates accept RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
/// Saving replaces every editable field.
#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub city: String,
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub cover_image: Option<ImageSlot>,
    #[serde(default)]
    pub registration_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// Event list filters
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Category slug
    pub category: Option<String>,
    /// Only events that have not ended yet
    pub upcoming: bool,
    /// Include unpublished drafts (admin listings)
    pub include_drafts: bool,
}

/// Gallery image attached to an event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventImage {
    pub id: i64,
    pub event_id: i64,
    /// Object path in the `event-images` bucket
    pub path: String,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Gallery image with its public URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventImageView {
    #[serde(flatten)]
    pub image: EventImage,
    pub url: String,
}

/// Input for attaching a gallery image
#[derive(Debug, Clone, Deserialize)]
pub struct EventImageInput {
    pub image: ImageSlot,
    #[serde(default)]
    pub caption: Option<String>,
}
