//! Read-only previews of how a listing will appear once published

pub mod market;
pub mod seo;
pub mod social;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::form::FormData;
use crate::validation::property::image_url;
use crate::wizard::WizardKind;

pub use market::{compare, ComparisonScope, MarketComparison, MarketError, MarketPosition};
pub use seo::SeoPreview;
pub use social::SocialCard;

/// Site details the previews are rendered for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PreviewSettings {
    pub base_url: String,
    pub site_name: String,
    /// Prefix for formatted prices, e.g. `US$`
    pub currency: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            base_url: "https://example.com".to_string(),
            site_name: "Listings".to_string(),
            currency: "US$".to_string(),
        }
    }
}

/// Lead image: the cover for blog posts, else the first gallery entry
pub fn first_image(kind: WizardKind, data: &FormData) -> Option<&str> {
    match kind {
        WizardKind::Blog => {
            let cover = data.text("coverImage");
            (!cover.is_empty()).then_some(cover)
        }
        _ => data.get_array("images")?.iter().find_map(image_url),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPreview {
    pub seo: SeoPreview,
    pub social: SocialCard,
}

pub fn build(kind: WizardKind, data: &FormData, settings: &PreviewSettings) -> ListingPreview {
    let seo = seo::build(kind, data, settings);
    let social = social::build(kind, data, &seo, settings);
    ListingPreview { seo, social }
}
