//! Services layer - Business logic
//!
//! Services validate editor input, commit staged images, coordinate
//! repositories with the object store and keep the read cache coherent.

pub mod blog;
pub mod company_profile;
pub mod date_range;
pub mod error;
pub mod event;
pub mod image;
pub mod markdown;
pub mod notification;
pub mod password;
pub mod portfolio;
pub mod rate_limiter;
pub mod rpc;
pub mod section;
pub mod slug;
pub mod staging;
pub mod user;

pub use blog::BlogService;
pub use company_profile::CompanyProfileService;
pub use date_range::{format_date_range, format_date_range_iso, DateRangeError};
pub use error::{friendly_message, DbErrorKind, ServiceError};
pub use event::{EventQuery, EventService};
pub use image::{ImageObject, ImageService, RemoveImagesInput};
pub use markdown::MarkdownRenderer;
pub use notification::{Notice, NoticeKind, NotificationCenter};
pub use password::{hash_password, verify_password};
pub use portfolio::PortfolioService;
pub use rate_limiter::{LoginRateLimiter, Throttled};
pub use rpc::{Procedure, RpcService};
pub use section::SectionService;
pub use slug::{slug_candidate, slugify};
pub use staging::{PendingUpload, StagingError, StagingService};
pub use user::{LoginInput, UserService, UserServiceError};
