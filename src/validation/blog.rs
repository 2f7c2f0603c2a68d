//! Blog post steps: Content, Media, SEO, Preview

use once_cell::sync::Lazy;
use regex::Regex;

use super::{len_between, text_len, Checks, StepDefinition, StepRegistry, StepValidation};
use crate::form::FormData;

pub const CONTENT_MIN: usize = 300;
pub const META_TITLE_MAX: usize = 60;
pub const META_DESCRIPTION_MIN: usize = 50;
pub const META_DESCRIPTION_MAX: usize = 160;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

pub fn registry() -> StepRegistry {
    StepRegistry::new(vec![
        StepDefinition::new(1, "content", "Content", validate_content),
        StepDefinition::new(2, "media", "Media", validate_cover),
        StepDefinition::new(3, "seo", "SEO", validate_seo),
        StepDefinition::new(4, "preview", "Preview", |data| {
            StepValidation::combine(&[
                validate_content(data),
                validate_cover(data),
                validate_seo(data),
            ])
        }),
    ])
}

pub fn validate_content(data: &FormData) -> StepValidation {
    Checks::new()
        .require(
            "title",
            len_between(data, "title", 10, 100),
            "Title must be between 10 and 100 characters",
        )
        .require(
            "content",
            text_len(data, "content") >= CONTENT_MIN,
            format!("Content must be at least {CONTENT_MIN} characters"),
        )
        .require(
            "category",
            !data.text("category").is_empty(),
            "Select a category",
        )
        .finish()
}

pub fn validate_cover(data: &FormData) -> StepValidation {
    Checks::new()
        .require(
            "coverImage",
            !data.text("coverImage").is_empty(),
            "Add a cover image",
        )
        .finish()
}

pub fn validate_seo(data: &FormData) -> StepValidation {
    Checks::new()
        .require(
            "metaTitle",
            len_between(data, "metaTitle", 1, META_TITLE_MAX),
            format!("Meta title must be 1 to {META_TITLE_MAX} characters"),
        )
        .require(
            "metaDescription",
            len_between(
                data,
                "metaDescription",
                META_DESCRIPTION_MIN,
                META_DESCRIPTION_MAX,
            ),
            format!(
                "Meta description must be between {META_DESCRIPTION_MIN} and {META_DESCRIPTION_MAX} characters"
            ),
        )
        .require(
            "slug",
            SLUG_RE.is_match(data.text("slug")),
            "Slug may only contain lowercase letters, digits and hyphens",
        )
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        let ok = FormData::new().with("slug", "mercado-inmobiliario-2024");
        let bad = FormData::new().with("slug", "Mercado Inmobiliario");
        assert!(!validate_seo(&ok).field_errors.contains_key("slug"));
        assert!(validate_seo(&bad).field_errors.contains_key("slug"));
    }

    #[test]
    fn test_complete_post_passes_preview() {
        let data = FormData::new()
            .with("title", "Cómo invertir en Punta Cana")
            .with("content", "c".repeat(400))
            .with("category", "inversion")
            .with("coverImage", "https://cdn.example.com/cover.jpg")
            .with("metaTitle", "Invertir en Punta Cana")
            .with("metaDescription", "m".repeat(120))
            .with("slug", "invertir-en-punta-cana");

        let result = registry().validate(4, &data);
        assert!(result.valid, "{:?}", result.field_errors);
    }
}
