//! Named read procedures
//!
//! The public site fetches some blocks by procedure name rather than by
//! resource route. Every procedure takes no arguments and returns a JSON
//! array of rows.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::SectionKey;
use crate::services::error::ServiceError;
use crate::services::event::EventService;
use crate::services::portfolio::PortfolioService;
use crate::services::section::SectionService;

/// Rows returned by `get_upcoming_events`
const UPCOMING_EVENTS_LIMIT: u32 = 12;

/// Known procedures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    AboutDedicationSection,
    AboutDescriptionSection,
    ConferenceManagementServices,
    PortfolioItems,
    UpcomingEvents,
    EventCategories,
}

impl Procedure {
    pub const ALL: [Procedure; 6] = [
        Procedure::AboutDedicationSection,
        Procedure::AboutDescriptionSection,
        Procedure::ConferenceManagementServices,
        Procedure::PortfolioItems,
        Procedure::UpcomingEvents,
        Procedure::EventCategories,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Procedure::AboutDedicationSection => "get_about_dedication_section",
            Procedure::AboutDescriptionSection => "get_about_description_section",
            Procedure::ConferenceManagementServices => "get_conference_management_services",
            Procedure::PortfolioItems => "get_portfolio_items",
            Procedure::UpcomingEvents => "get_upcoming_events",
            Procedure::EventCategories => "get_event_categories",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Procedure {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Procedure::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ServiceError::NotFound(format!("Procedure {}", s)))
    }
}

/// Dispatches procedure calls to the content services
pub struct RpcService {
    events: Arc<EventService>,
    portfolio: Arc<PortfolioService>,
    sections: Arc<SectionService>,
}

impl RpcService {
    pub fn new(
        events: Arc<EventService>,
        portfolio: Arc<PortfolioService>,
        sections: Arc<SectionService>,
    ) -> Self {
        Self {
            events,
            portfolio,
            sections,
        }
    }

    /// Call a procedure by name. Unknown names are `NotFound`.
    pub async fn call(&self, name: &str) -> Result<Vec<Value>, ServiceError> {
        let procedure: Procedure = name.parse()?;
        tracing::debug!("RPC {}", procedure);

        match procedure {
            Procedure::AboutDedicationSection => self.section_row(SectionKey::AboutDedication).await,
            Procedure::AboutDescriptionSection => self.section_row(SectionKey::AboutDescription).await,
            Procedure::ConferenceManagementServices => {
                let section = self.sections.get(SectionKey::ConferenceManagement).await?;
                rows(&section.items)
            }
            Procedure::PortfolioItems => rows(&self.portfolio.list().await?),
            Procedure::UpcomingEvents => rows(&self.events.upcoming(UPCOMING_EVENTS_LIMIT).await?),
            Procedure::EventCategories => rows(&self.events.list_categories().await?),
        }
    }

    /// A section as a single row; empty when it was never saved
    async fn section_row(&self, key: SectionKey) -> Result<Vec<Value>, ServiceError> {
        let section = self.sections.get(key).await?;
        if section.updated_at.is_none() {
            return Ok(Vec::new());
        }
        rows(std::slice::from_ref(&section))
    }
}

fn rows<T: Serialize>(items: &[T]) -> Result<Vec<Value>, ServiceError> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(|e| ServiceError::Internal(e.into())))
        .collect()
}
