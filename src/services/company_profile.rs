//! Company profile service
//!
//! The profile is stored as key/value rows in the settings table.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::SettingsRepository;
use crate::models::{CompanyProfile, CompanyProfileInput, CompanyProfileView};
use crate::services::error::ServiceError;
use crate::services::staging::StagingService;
use anyhow::Context;
use std::sync::Arc;

/// Bucket holding the logo
pub const COMPANY_BUCKET: &str = "company-assets";

const LOGO_PREFIX: &str = "logo";
const CACHE_KEY: &str = "company_profile";

pub struct CompanyProfileService {
    repo: Arc<dyn SettingsRepository>,
    staging: Arc<StagingService>,
    cache: Arc<Cache>,
}

impl CompanyProfileService {
    pub fn new(repo: Arc<dyn SettingsRepository>, staging: Arc<StagingService>, cache: Arc<Cache>) -> Self {
        Self { repo, staging, cache }
    }

    pub async fn get(&self) -> Result<CompanyProfileView, ServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<CompanyProfileView>(CACHE_KEY).await {
            return Ok(cached);
        }
        let view = self.to_view(self.load().await?);
        let _ = self.cache.set(CACHE_KEY, &view, self.cache.default_ttl()).await;
        Ok(view)
    }

    /// Replace the profile. A missing logo clears it.
    pub async fn update(&self, input: CompanyProfileInput) -> Result<CompanyProfileView, ServiceError> {
        let company_name = input.company_name.trim().to_string();
        if company_name.is_empty() {
            return Err(ServiceError::validation("Company name cannot be empty"));
        }
        let email = input.email.trim().to_string();
        if !email.is_empty() && !email.contains('@') {
            return Err(ServiceError::validation("Invalid email format"));
        }

        let previous = self.load().await?;
        let logo = self
            .staging
            .commit_optional(input.logo.as_ref(), COMPANY_BUCKET, LOGO_PREFIX)
            .await?;

        let profile = CompanyProfile {
            company_name,
            tagline: input.tagline.trim().to_string(),
            description: input.description,
            email,
            phone: input.phone.trim().to_string(),
            address: input.address.trim().to_string(),
            logo,
        };
        self.repo
            .set_many(&profile.to_settings())
            .await
            .map_err(ServiceError::db)?;

        self.staging
            .remove_superseded(COMPANY_BUCKET, previous.logo.as_deref(), profile.logo.as_deref())
            .await;
        let _ = self.cache.delete(CACHE_KEY).await;

        tracing::info!("Updated company profile");
        Ok(self.to_view(profile))
    }

    async fn load(&self) -> Result<CompanyProfile, ServiceError> {
        let settings = self
            .repo
            .get_many(&CompanyProfile::KEYS)
            .await
            .context("Failed to load company profile")?;
        Ok(CompanyProfile::from_settings(&settings))
    }

    fn to_view(&self, profile: CompanyProfile) -> CompanyProfileView {
        CompanyProfileView {
            logo_url: profile
                .logo
                .as_deref()
                .map(|path| self.staging.public_url(COMPANY_BUCKET, path)),
            profile,
        }
    }
}
