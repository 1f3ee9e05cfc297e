//! Page section models
//!
//! Sections are the singleton content blocks of the marketing pages (About,
//! Conference, Portfolio intro, Events intro). Some carry a list of child
//! items such as dedication points or conference services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ImageSlot;

/// Known page sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    AboutDescription,
    AboutDedication,
    ConferenceManagement,
    PortfolioIntro,
    EventsIntro,
}

impl SectionKey {
    pub const ALL: [SectionKey; 5] = [
        SectionKey::AboutDescription,
        SectionKey::AboutDedication,
        SectionKey::ConferenceManagement,
        SectionKey::PortfolioIntro,
        SectionKey::EventsIntro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::AboutDescription => "about_description",
            SectionKey::AboutDedication => "about_dedication",
            SectionKey::ConferenceManagement => "conference_management",
            SectionKey::PortfolioIntro => "portfolio_intro",
            SectionKey::EventsIntro => "events_intro",
        }
    }

    /// Storage bucket holding this section's images
    pub fn bucket(&self) -> &'static str {
        match self {
            SectionKey::AboutDescription | SectionKey::AboutDedication => "about-dedication",
            SectionKey::ConferenceManagement => "conference-management",
            SectionKey::PortfolioIntro => "portfolio-gallery-images",
            SectionKey::EventsIntro => "event-images",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown section: {}", s))
    }
}

/// Section record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Section {
    #[serde(rename = "key")]
    pub section_key: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub image_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Child row of a section
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SectionItem {
    pub id: i64,
    pub section_key: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_path: Option<String>,
    pub sort_order: i32,
}

/// Section item with its public image URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItemView {
    #[serde(flatten)]
    pub item: SectionItem,
    pub image_url: Option<String>,
}

/// Section as returned to clients.
///
/// A section that was never saved is returned empty rather than missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    pub key: SectionKey,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<SectionItemView>,
}

/// Editor form for a section
#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image: Option<ImageSlot>,
    /// Replaces all child items when present
    #[serde(default)]
    pub items: Option<Vec<SectionItemInput>>,
}

/// Editor form for one section item
#[derive(Debug, Clone, Deserialize)]
pub struct SectionItemInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub image: Option<ImageSlot>,
}

/// Section values ready to be written
#[derive(Debug, Clone)]
pub struct SectionRecord {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub image_path: Option<String>,
}

/// Section item values ready to be written
#[derive(Debug, Clone)]
pub struct SectionItemRecord {
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_path: Option<String>,
}
