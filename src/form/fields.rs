//! Typed views over well-known listing fields

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::FormData;

/// Kind of property offered in a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PropertyType {
    House,
    Apartment,
    Villa,
    Penthouse,
    Townhouse,
    Land,
    Commercial,
    Office,
}

impl PropertyType {
    pub fn all() -> &'static [PropertyType] {
        &[
            PropertyType::House,
            PropertyType::Apartment,
            PropertyType::Villa,
            PropertyType::Penthouse,
            PropertyType::Townhouse,
            PropertyType::Land,
            PropertyType::Commercial,
            PropertyType::Office,
        ]
    }

    /// Wire value stored in form data
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Villa => "villa",
            PropertyType::Penthouse => "penthouse",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Land => "land",
            PropertyType::Commercial => "commercial",
            PropertyType::Office => "office",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Villa => "Villa",
            PropertyType::Penthouse => "Penthouse",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::Land => "Land",
            PropertyType::Commercial => "Commercial",
            PropertyType::Office => "Office",
        }
    }

    /// Parse the exact wire value
    pub fn from_key(key: &str) -> Option<PropertyType> {
        Self::all().iter().copied().find(|t| t.as_str() == key)
    }

    /// Parse loose user input, including common Spanish names
    pub fn parse_loose(input: &str) -> Option<PropertyType> {
        let key = input.trim().to_lowercase();
        match key.as_str() {
            "house" | "casa" | "home" => Some(PropertyType::House),
            "apartment" | "apartamento" | "departamento" | "apt" | "flat" | "condo" => {
                Some(PropertyType::Apartment)
            }
            "villa" => Some(PropertyType::Villa),
            "penthouse" | "pent house" | "ph" => Some(PropertyType::Penthouse),
            "townhouse" | "town house" | "adosado" => Some(PropertyType::Townhouse),
            "land" | "lot" | "terreno" | "solar" | "lote" => Some(PropertyType::Land),
            "commercial" | "local" | "local comercial" | "retail" => {
                Some(PropertyType::Commercial)
            }
            "office" | "oficina" => Some(PropertyType::Office),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Zoning of a land listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LandType {
    Residential,
    Commercial,
    Agricultural,
    Industrial,
    Touristic,
}

impl LandType {
    pub fn all() -> &'static [LandType] {
        &[
            LandType::Residential,
            LandType::Commercial,
            LandType::Agricultural,
            LandType::Industrial,
            LandType::Touristic,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LandType::Residential => "residential",
            LandType::Commercial => "commercial",
            LandType::Agricultural => "agricultural",
            LandType::Industrial => "industrial",
            LandType::Touristic => "touristic",
        }
    }

    pub fn from_key(key: &str) -> Option<LandType> {
        Self::all().iter().copied().find(|t| t.as_str() == key)
    }
}

/// A selectable amenity such as "Pool" or "Garage"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub selected: bool,
}

impl Characteristic {
    pub fn selected(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            selected: true,
        }
    }

    /// All characteristics stored under `key`, skipping malformed entries
    pub fn list_from(data: &FormData, key: &str) -> Vec<Characteristic> {
        data.get_array(key)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of the selected characteristics under `key`
    pub fn selected_names(data: &FormData, key: &str) -> Vec<String> {
        Self::list_from(data, key)
            .into_iter()
            .filter(|c| c.selected)
            .map(|c| c.name)
            .collect()
    }
}

/// Postal address of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    /// Read the `address` object, defaulting missing parts to empty strings
    pub fn from_form(data: &FormData) -> Address {
        data.get("address")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Geographic point of a listing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn from_form(data: &FormData) -> Option<Coordinates> {
        let obj = data.get_object("coordinates")?;
        Some(Coordinates {
            lat: obj.get("lat")?.as_f64()?,
            lng: obj.get("lng")?.as_f64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_type_loose_parsing() {
        assert_eq!(PropertyType::parse_loose(" Casa "), Some(PropertyType::House));
        assert_eq!(
            PropertyType::parse_loose("departamento"),
            Some(PropertyType::Apartment)
        );
        assert_eq!(PropertyType::parse_loose("Terreno"), Some(PropertyType::Land));
        assert_eq!(PropertyType::parse_loose("castle"), None);
    }

    #[test]
    fn test_property_type_wire_value_round_trips_through_serde() {
        let value = serde_json::to_value(PropertyType::Penthouse).unwrap();
        assert_eq!(value, json!("penthouse"));
        assert_eq!(PropertyType::from_key("penthouse"), Some(PropertyType::Penthouse));
    }

    #[test]
    fn test_selected_characteristics() {
        let data = FormData::new().with(
            "characteristics",
            json!([
                {"id": "1", "name": "Pool", "selected": true},
                {"id": "2", "name": "Garage", "selected": false},
                "garbage"
            ]),
        );
        assert_eq!(
            Characteristic::selected_names(&data, "characteristics"),
            vec!["Pool".to_string()]
        );
    }

    #[test]
    fn test_address_defaults_missing_parts() {
        let data = FormData::new().with("address", json!({"city": "Punta Cana"}));
        let address = Address::from_form(&data);
        assert_eq!(address.city, "Punta Cana");
        assert!(address.street.is_empty());
    }

    #[test]
    fn test_coordinates_require_both_axes() {
        let data = FormData::new().with("coordinates", json!({"lat": 18.5}));
        assert!(Coordinates::from_form(&data).is_none());
    }
}
