//! Company profile model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ImageSlot;

/// Contact details and branding shown in the site header and footer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    pub tagline: String,
    pub description: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Object path in the `company-assets` bucket
    pub logo: Option<String>,
}

impl CompanyProfile {
    pub const KEY_COMPANY_NAME: &'static str = "company_name";
    pub const KEY_TAGLINE: &'static str = "company_tagline";
    pub const KEY_DESCRIPTION: &'static str = "company_description";
    pub const KEY_EMAIL: &'static str = "company_email";
    pub const KEY_PHONE: &'static str = "company_phone";
    pub const KEY_ADDRESS: &'static str = "company_address";
    pub const KEY_LOGO: &'static str = "company_logo";

    pub const KEYS: [&'static str; 7] = [
        Self::KEY_COMPANY_NAME,
        Self::KEY_TAGLINE,
        Self::KEY_DESCRIPTION,
        Self::KEY_EMAIL,
        Self::KEY_PHONE,
        Self::KEY_ADDRESS,
        Self::KEY_LOGO,
    ];

    /// Build from stored settings; missing keys become empty
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let get = |key: &str| settings.get(key).cloned().unwrap_or_default();
        Self {
            company_name: get(Self::KEY_COMPANY_NAME),
            tagline: get(Self::KEY_TAGLINE),
            description: get(Self::KEY_DESCRIPTION),
            email: get(Self::KEY_EMAIL),
            phone: get(Self::KEY_PHONE),
            address: get(Self::KEY_ADDRESS),
            logo: settings
                .get(Self::KEY_LOGO)
                .filter(|v| !v.is_empty())
                .cloned(),
        }
    }

    /// Flatten into settings rows; an absent logo is stored as empty
    pub fn to_settings(&self) -> HashMap<String, String> {
        HashMap::from([
            (Self::KEY_COMPANY_NAME.to_string(), self.company_name.clone()),
            (Self::KEY_TAGLINE.to_string(), self.tagline.clone()),
            (Self::KEY_DESCRIPTION.to_string(), self.description.clone()),
            (Self::KEY_EMAIL.to_string(), self.email.clone()),
            (Self::KEY_PHONE.to_string(), self.phone.clone()),
            (Self::KEY_ADDRESS.to_string(), self.address.clone()),
            (Self::KEY_LOGO.to_string(), self.logo.clone().unwrap_or_default()),
        ])
    }
}

/// Company profile with the logo URL resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfileView {
    #[serde(flatten)]
    pub profile: CompanyProfile,
    pub logo_url: Option<String>,
}

/// Editor form for the company profile
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyProfileInput {
    pub company_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub logo: Option<ImageSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip() {
        let profile = CompanyProfile {
            company_name: "Halls & Booths".to_string(),
            email: "hello@example.com".to_string(),
            logo: Some("logo/a.png".to_string()),
            ..Default::default()
        };
        assert_eq!(CompanyProfile::from_settings(&profile.to_settings()), profile);
    }

    #[test]
    fn test_empty_logo_is_none() {
        let profile = CompanyProfile::default();
        let restored = CompanyProfile::from_settings(&profile.to_settings());
        assert!(restored.logo.is_none());
    }
}
