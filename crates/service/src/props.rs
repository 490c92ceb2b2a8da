//! Presentation-ready branding and defaults consumed by page rendering.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::branding::BrandingAssetManager;
use crate::errors::ServiceError;
use crate::identity::Requester;
use crate::settings::keys::{COMPANY_ADDRESS, COMPANY_NAME};
use crate::settings::ResolvedBundle;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingView {
    pub logo_dark_url: Option<String>,
    pub logo_light_url: Option<String>,
    pub favicon_url: Option<String>,
    pub favicon_v: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDefaultsView {
    pub company_name: Option<String>,
    pub company_address: Option<String>,
}

impl SettingsDefaultsView {
    pub fn from_bundle(bundle: &ResolvedBundle) -> Self {
        Self {
            company_name: bundle.get(COMPANY_NAME).cloned(),
            company_address: bundle.get(COMPANY_ADDRESS).cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedProps {
    pub branding: BrandingView,
    #[serde(rename = "settingsDefaults")]
    pub settings_defaults: SettingsDefaultsView,
}

/// Resolve both cached bundles for the requester and shape them for rendering.
#[instrument(skip_all, fields(user_id = requester.map(|r| r.id)))]
pub async fn shared_props(manager: &BrandingAssetManager, requester: Option<&Requester>) -> Result<SharedProps, ServiceError> {
    let settings = manager.settings();
    let branding = settings.branding(requester).await?;
    let defaults = settings.salary_slip_defaults(requester).await?;
    Ok(SharedProps {
        branding: manager.present(&branding).await,
        settings_defaults: SettingsDefaultsView::from_bundle(&defaults),
    })
}
