//! Search-engine snippet preview and score

use serde::Serialize;

use super::{first_image, PreviewSettings};
use crate::form::fields::{Address, Characteristic, LandType, PropertyType};
use crate::form::text::{slugify, truncate_at_word};
use crate::form::FormData;
use crate::wizard::WizardKind;

pub const TITLE_MAX: usize = 60;
pub const DESCRIPTION_MAX: usize = 160;
const TITLE_SHORT: usize = 30;
const DESCRIPTION_SHORT: usize = 70;
const MAX_KEYWORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPreview {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub canonical_url: String,
    pub keywords: Vec<String>,
    /// 0 to 100
    pub score: u8,
    pub issues: Vec<String>,
}

fn path_segment(kind: WizardKind) -> &'static str {
    match kind {
        WizardKind::Property => "properties",
        WizardKind::Land => "land",
        WizardKind::Blog => "blog",
    }
}

fn first_non_empty<'a>(data: &'a FormData, keys: &[&str]) -> &'a str {
    keys.iter()
        .map(|k| data.text(k))
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Slug from an explicit `slug` field, else title plus city
pub fn listing_slug(data: &FormData) -> String {
    let explicit = slugify(data.text("slug"), '-');
    if !explicit.is_empty() {
        return explicit;
    }
    let city = Address::from_form(data).city;
    slugify(&format!("{} {}", data.text("title"), city), '-')
}

fn keywords(kind: WizardKind, data: &FormData) -> Vec<String> {
    let address = Address::from_form(data);
    let mut candidates = Vec::new();
    match kind {
        WizardKind::Property => {
            if let Some(t) = PropertyType::from_key(data.text("propertyType")) {
                candidates.push(t.display_name().to_string());
            }
        }
        WizardKind::Land => {
            candidates.push("land".to_string());
            if let Some(t) = LandType::from_key(data.text("landType")) {
                candidates.push(format!("{} land", t.as_str()));
            }
        }
        WizardKind::Blog => candidates.push(data.text("category").to_string()),
    }
    candidates.push(address.city);
    candidates.push(address.province);
    candidates.extend(Characteristic::selected_names(data, "characteristics"));

    let mut out: Vec<String> = Vec::new();
    for keyword in candidates {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out.truncate(MAX_KEYWORDS);
    out
}

/// Build the snippet a search engine would show for the listing
pub fn build(kind: WizardKind, data: &FormData, settings: &PreviewSettings) -> SeoPreview {
    let mut issues = Vec::new();
    let mut score: i32 = 100;
    let mut penalize = |points: i32, issue: String| {
        score -= points;
        issues.push(issue);
    };

    let raw_title = first_non_empty(data, &["metaTitle", "title"]).trim();
    let title = truncate_at_word(raw_title, TITLE_MAX);
    let title_len = raw_title.chars().count();
    if raw_title.is_empty() {
        penalize(30, "Title is missing".to_string());
    } else if title_len < TITLE_SHORT {
        penalize(10, format!("Title is short ({title_len} characters); aim for {TITLE_SHORT}-{TITLE_MAX}"));
    } else if title_len > TITLE_MAX {
        penalize(10, format!("Title will be cut at {TITLE_MAX} characters"));
    }

    let raw_description = first_non_empty(data, &["metaDescription", "description", "content"]).trim();
    let description = truncate_at_word(raw_description, DESCRIPTION_MAX);
    let description_len = raw_description.chars().count();
    if raw_description.is_empty() {
        penalize(30, "Description is missing".to_string());
    } else if description_len < DESCRIPTION_SHORT {
        penalize(10, format!("Description is short ({description_len} characters)"));
    } else if description_len > DESCRIPTION_MAX {
        penalize(5, format!("Description will be cut at {DESCRIPTION_MAX} characters"));
    }

    let slug = listing_slug(data);
    if slug.is_empty() {
        penalize(10, "No slug can be derived; add a title".to_string());
    }

    if first_image(kind, data).is_none() {
        penalize(15, "No image for search results".to_string());
    }

    let keywords = keywords(kind, data);
    if keywords.is_empty() {
        penalize(5, "No keywords; set a type and location".to_string());
    }

    let canonical_url = format!(
        "{}/{}/{}",
        settings.base_url.trim_end_matches('/'),
        path_segment(kind),
        slug
    );

    SeoPreview {
        title,
        description,
        slug,
        canonical_url,
        keywords,
        score: score.clamp(0, 100) as u8,
        issues,
    }
}
