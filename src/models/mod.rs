//! Data models
//!
//! Database rows, editor inputs and the client-facing views built from them.

mod blog_post;
mod company_profile;
mod event;
mod image;
mod pagination;
mod portfolio;
mod section;
mod session;
mod user;

pub use blog_post::{BlogPost, BlogPostInput, BlogPostView};
pub use company_profile::{CompanyProfile, CompanyProfileInput, CompanyProfileView};
pub use event::{
    Event, EventCategory, EventCategoryInput, EventFilter, EventImage, EventImageInput,
    EventImageView, EventInput, EventView,
};
pub use image::ImageSlot;
pub use pagination::{ListParams, PagedResult};
pub use portfolio::{PortfolioItem, PortfolioItemInput, PortfolioItemRecord, PortfolioItemView};
pub use section::{
    Section, SectionInput, SectionItem, SectionItemInput, SectionItemRecord, SectionItemView,
    SectionKey, SectionRecord, SectionView,
};
pub use session::Session;
pub use user::{CreateUserInput, User, UserRole};
