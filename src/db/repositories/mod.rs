//! Database repositories
//!
//! One repository per table group. Each exposes a trait used by the
//! services and an sqlx implementation that works on SQLite and MySQL.

pub mod blog_post;
pub mod event;
pub mod event_category;
pub mod event_image;
pub mod portfolio;
pub mod section;
pub mod session;
pub mod settings;
pub mod user;

pub use blog_post::{BlogPostRepository, SqlxBlogPostRepository};
pub use event::{EventRepository, SqlxEventRepository};
pub use event_category::{EventCategoryRepository, SqlxEventCategoryRepository};
pub use event_image::{EventImageRepository, SqlxEventImageRepository};
pub use portfolio::{PortfolioRepository, SqlxPortfolioRepository};
pub use section::{SectionRepository, SqlxSectionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};
