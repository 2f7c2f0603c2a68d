//! Property listing steps: General Info, Location, Media, Preview

use serde_json::Value;

use super::location::validate_location;
use super::{len_between, positive, Checks, StepDefinition, StepRegistry, StepValidation, ValidationRules};
use crate::form::{Characteristic, FormData, PropertyType};

pub const TITLE_MIN: usize = 10;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 50;
pub const DESCRIPTION_MAX: usize = 2000;

pub fn registry(rules: &ValidationRules) -> StepRegistry {
    let location_rules = rules.clone();
    let media_rules = rules.clone();
    let preview_rules = rules.clone();
    StepRegistry::new(vec![
        StepDefinition::new(1, "general", "General Info", validate_general_info),
        StepDefinition::new(2, "location", "Location", move |data| {
            validate_location(data, &location_rules.bounds)
        }),
        StepDefinition::new(3, "media", "Media", move |data| {
            validate_media(data, media_rules.max_images)
        }),
        StepDefinition::new(4, "preview", "Preview", move |data| {
            validate_preview(data, &preview_rules)
        }),
    ])
}

pub fn validate_general_info(data: &FormData) -> StepValidation {
    let property_type = PropertyType::from_key(data.text("propertyType"));
    let has_characteristic = Characteristic::list_from(data, "characteristics")
        .iter()
        .any(|c| c.selected);

    let mut checks = Checks::new();
    checks
        .require(
            "title",
            len_between(data, "title", TITLE_MIN, TITLE_MAX),
            format!("Title must be between {TITLE_MIN} and {TITLE_MAX} characters"),
        )
        .require(
            "description",
            len_between(data, "description", DESCRIPTION_MIN, DESCRIPTION_MAX),
            format!(
                "Description must be between {DESCRIPTION_MIN} and {DESCRIPTION_MAX} characters"
            ),
        )
        .require("price", positive(data, "price"), "Price must be greater than 0")
        .require(
            "surface",
            positive(data, "surface"),
            "Surface must be greater than 0",
        )
        .require(
            "propertyType",
            property_type.is_some(),
            "Select a valid property type",
        )
        .require(
            "characteristics",
            has_characteristic,
            "Select at least one characteristic",
        );

    for key in ["bedrooms", "bathrooms", "parkingSpots"] {
        if data.contains_key(key) {
            let bad = data.get_f64(key).is_none_or(|n| n < 0.0 || n.fract() != 0.0);
            checks.reject_if(key, bad, format!("{key} must be a whole number"));
        }
    }

    checks.finish()
}

/// Count gallery entries that carry a usable URL
pub fn image_count(data: &FormData, key: &str) -> usize {
    data.get_array(key)
        .map(|items| items.iter().filter(|item| image_url(item).is_some()).count())
        .unwrap_or(0)
}

/// URL of a gallery entry: a plain string or an object with `url`
pub fn image_url(item: &Value) -> Option<&str> {
    let url = match item {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj.get("url")?.as_str()?,
        _ => return None,
    };
    let url = url.trim();
    (!url.is_empty()).then_some(url)
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

pub fn validate_media(data: &FormData, max_images: usize) -> StepValidation {
    let images = image_count(data, "images");

    let mut checks = Checks::new();
    checks
        .require("images", images >= 1, "Add at least one image")
        .reject_if(
            "images",
            images > max_images,
            format!("At most {max_images} images are allowed"),
        );

    let video = data.text("videoUrl");
    checks.reject_if(
        "videoUrl",
        !video.is_empty() && !is_http_url(video),
        "Video URL must start with http:// or https://",
    );

    checks.finish()
}

pub fn validate_preview(data: &FormData, rules: &ValidationRules) -> StepValidation {
    StepValidation::combine(&[
        validate_general_info(data),
        validate_location(data, &rules.bounds),
        validate_media(data, rules.max_images),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn general_info() -> FormData {
        FormData::new()
            .with("title", "Casa familiar en Santiago")
            .with("description", "x".repeat(60))
            .with("price", 150_000)
            .with("surface", 200)
            .with("propertyType", "house")
            .with(
                "characteristics",
                json!([{"id": "1", "name": "Pool", "selected": true}]),
            )
    }

    #[test]
    fn test_complete_general_info_is_valid() {
        let result = validate_general_info(&general_info());
        assert!(result.valid, "{:?}", result.field_errors);
        assert_eq!(result.completion_percent, 100);
    }

    #[test]
    fn test_title_only_is_incomplete() {
        let data = FormData::new().with("title", "A valid ten+ char title");
        let result = validate_general_info(&data);

        assert!(!result.valid);
        assert_eq!(result.completion_percent, 16);
        assert!(!result.field_errors.contains_key("title"));
        assert!(result.field_errors.contains_key("price"));
    }

    #[test]
    fn test_title_length_bounds() {
        let short = general_info().with("title", "Too short");
        let long = general_info().with("title", "y".repeat(101));
        let edge = general_info().with("title", "y".repeat(100));

        assert!(!validate_general_info(&short).valid);
        assert!(!validate_general_info(&long).valid);
        assert!(validate_general_info(&edge).valid);
    }

    #[test]
    fn test_unselected_characteristics_do_not_count() {
        let data = general_info().with(
            "characteristics",
            json!([{"id": "1", "name": "Pool", "selected": false}]),
        );
        let result = validate_general_info(&data);
        assert_eq!(
            result.field_errors["characteristics"],
            "Select at least one characteristic"
        );
    }

    #[test]
    fn test_unknown_property_type_is_rejected() {
        let result = validate_general_info(&general_info().with("propertyType", "castle"));
        assert!(result.field_errors.contains_key("propertyType"));
    }

    #[test]
    fn test_fractional_bedrooms_are_rejected() {
        let result = validate_general_info(&general_info().with("bedrooms", 2.5));
        assert!(!result.valid);
        assert_eq!(result.completion_percent, 100);
    }

    #[test]
    fn test_media_requires_an_image() {
        let empty = validate_media(&FormData::new(), 30);
        assert!(!empty.valid);

        let data = FormData::new().with(
            "images",
            json!(["https://cdn.example.com/1.jpg", {"url": "https://cdn.example.com/2.jpg"}, ""]),
        );
        assert_eq!(image_count(&data, "images"), 2);
        assert!(validate_media(&data, 30).valid);
        assert!(!validate_media(&data, 1).valid);
    }

    #[test]
    fn test_media_video_url_scheme() {
        let data = FormData::new()
            .with("images", json!(["https://cdn.example.com/1.jpg"]))
            .with("videoUrl", "ftp://video");
        assert!(!validate_media(&data, 30).valid);
    }
}
