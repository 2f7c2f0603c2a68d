//! Land listing steps

use super::location::validate_location;
use super::property::{validate_media, DESCRIPTION_MAX, DESCRIPTION_MIN, TITLE_MAX, TITLE_MIN};
use super::{len_between, positive, Checks, StepDefinition, StepRegistry, StepValidation, ValidationRules};
use crate::form::{FormData, LandType};

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
            StepValidation::combine(&[
                validate_general_info(data),
                validate_location(data, &preview_rules.bounds),
                validate_media(data, preview_rules.max_images),
            ])
        }),
    ])
}

/// Land listings need a zoning type instead of a property type; amenities are optional
pub fn validate_general_info(data: &FormData) -> StepValidation {
    Checks::new()
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
            "landType",
            LandType::from_key(data.text("landType")).is_some(),
            "Select a valid land type",
        )
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_land_general_info() {
        let data = FormData::new()
            .with("title", "Solar frente al mar")
            .with("description", "d".repeat(80))
            .with("price", 90_000)
            .with("surface", 1200)
            .with("landType", "touristic");

        let result = validate_general_info(&data);
        assert!(result.valid, "{:?}", result.field_errors);
    }

    #[test]
    fn test_land_rejects_property_types() {
        let data = FormData::new().with("landType", "house");
        let result = validate_general_info(&data);
        assert!(result.field_errors.contains_key("landType"));
    }
}
