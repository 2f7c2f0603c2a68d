//! Open Graph and Twitter card preview

use serde::Serialize;

use super::seo::SeoPreview;
use super::{first_image, PreviewSettings};
use crate::form::text::{format_amount, truncate_at_word};
use crate::form::FormData;
use crate::wizard::WizardKind;

const CARD_DESCRIPTION_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialCard {
    pub og_type: &'static str,
    pub title: String,
    pub description: String,
    pub url: String,
    pub site_name: String,
    pub image: Option<String>,
    pub twitter_card: &'static str,
    /// Formatted asking price, absent for blog posts and unpriced listings
    pub price: Option<String>,
}

impl SocialCard {
    /// `(property, content)` pairs for `<meta>` tags
    pub fn meta_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("og:type", self.og_type.to_string()),
            ("og:title", self.title.clone()),
            ("og:description", self.description.clone()),
            ("og:url", self.url.clone()),
            ("og:site_name", self.site_name.clone()),
            ("twitter:card", self.twitter_card.to_string()),
            ("twitter:title", self.title.clone()),
        ];
        if let Some(image) = &self.image {
            tags.push(("og:image", image.clone()));
            tags.push(("twitter:image", image.clone()));
        }
        if let Some(price) = &self.price {
            tags.push(("product:price:amount", price.clone()));
        }
        tags
    }
}

pub fn build(kind: WizardKind, data: &FormData, seo: &SeoPreview, settings: &PreviewSettings) -> SocialCard {
    let image = first_image(kind, data).map(str::to_string);
    let description_source = match kind {
        WizardKind::Blog => data.text("content"),
        _ => data.text("description"),
    };
    let price = match kind {
        WizardKind::Blog => None,
        _ => data
            .get_f64("price")
            .filter(|p| *p > 0.0)
            .map(|p| format!("{} {}", settings.currency, format_amount(p))),
    };

    SocialCard {
        og_type: if kind == WizardKind::Blog { "article" } else { "website" },
        title: seo.title.clone(),
        description: truncate_at_word(description_source, CARD_DESCRIPTION_MAX),
        url: seo.canonical_url.clone(),
        site_name: settings.site_name.clone(),
        twitter_card: if image.is_some() { "summary_large_image" } else { "summary" },
        image,
        price,
    }
}
