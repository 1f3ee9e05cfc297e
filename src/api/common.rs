//! Common API utilities and shared types

use serde::Deserialize;

use crate::api::middleware::AppState;
use crate::models::ListParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for public listings
pub fn default_per_page() -> u32 {
    12
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Tell the editor a change was saved
pub async fn notify_saved(state: &AppState, message: impl Into<String>) {
    state.notifications.success(message).await;
}
