//! Location step rules shared by the property and land wizards

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Checks, StepValidation};
use crate::form::{Address, Coordinates, FormData};

/// Latitude/longitude box of the supported country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CountryBounds {
    pub country: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl CountryBounds {
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

impl Default for CountryBounds {
    fn default() -> Self {
        // Dominican Republic
        Self {
            country: "Dominican Republic".to_string(),
            min_lat: 17.36,
            max_lat: 19.98,
            min_lng: -72.01,
            max_lng: -68.32,
        }
    }
}

pub fn validate_location(data: &FormData, bounds: &CountryBounds) -> StepValidation {
    let address = Address::from_form(data);
    let coordinates = Coordinates::from_form(data);

    let mut checks = Checks::new();
    checks
        .require(
            "address.street",
            !address.street.trim().is_empty(),
            "Street is required",
        )
        .require(
            "address.city",
            !address.city.trim().is_empty(),
            "City is required",
        )
        .require(
            "address.province",
            !address.province.trim().is_empty(),
            "Province is required",
        );

    match coordinates {
        Some(point) => checks.require(
            "coordinates",
            bounds.contains(point),
            format!("Location must be within {}", bounds.country),
        ),
        None => checks.require("coordinates", false, "Select the location on the map"),
    };

    checks.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn located(lat: f64, lng: f64) -> FormData {
        FormData::new()
            .with(
                "address",
                json!({"street": "Av. Winston Churchill 12", "city": "Santo Domingo", "province": "Distrito Nacional"}),
            )
            .with("coordinates", json!({"lat": lat, "lng": lng}))
    }

    #[test]
    fn test_valid_location() {
        let result = validate_location(&located(18.47, -69.93), &CountryBounds::default());
        assert!(result.valid, "{:?}", result.field_errors);
        assert_eq!(result.completion_percent, 100);
    }

    #[test]
    fn test_coordinates_outside_country_are_rejected() {
        // Madrid
        let result = validate_location(&located(40.41, -3.70), &CountryBounds::default());
        assert!(!result.valid);
        assert_eq!(
            result.field_errors["coordinates"],
            "Location must be within Dominican Republic"
        );
        assert_eq!(result.completion_percent, 75);
    }

    #[test]
    fn test_blank_address_parts_are_missing() {
        let data = FormData::new().with("address", json!({"street": "  ", "city": "Moca"}));
        let result = validate_location(&data, &CountryBounds::default());

        assert!(result.field_errors.contains_key("address.street"));
        assert!(result.field_errors.contains_key("address.province"));
        assert!(!result.field_errors.contains_key("address.city"));
        assert_eq!(result.completion_percent, 25);
    }
}
