//! Price-per-m² comparison against comparable listings

use serde::Serialize;
use thiserror::Error;

use crate::form::fields::Address;
use crate::form::FormData;

/// Percent band around the median treated as "at market"
pub const AT_MARKET_BAND: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    #[error("listing needs a price, surface and property type to compare")]
    IncompleteSubject,

    #[error("no comparable {0} listings with price and surface")]
    NoComparables(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    Below,
    At,
    Above,
}

impl std::fmt::Display for MarketPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MarketPosition::Below => "below market",
            MarketPosition::At => "at market",
            MarketPosition::Above => "above market",
        };
        write!(f, "{label}")
    }
}

/// Which comparables were used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonScope {
    /// Same property type and city
    SameCity,
    /// Same property type anywhere; used when the city has no comparables
    PropertyType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketComparison {
    pub price_per_m2: f64,
    pub scope: ComparisonScope,
    pub comparable_count: usize,
    pub median_price_per_m2: f64,
    pub mean_price_per_m2: f64,
    /// Subject relative to the median, in percent
    pub percent_diff: f64,
    pub position: MarketPosition,
}

struct Listing {
    property_type: String,
    city: String,
    price_per_m2: f64,
}

impl Listing {
    fn from_form(data: &FormData) -> Option<Listing> {
        let price = data.get_f64("price").filter(|p| *p > 0.0)?;
        let surface = data.get_f64("surface").filter(|s| *s > 0.0)?;
        let property_type = data.text("propertyType").to_lowercase();
        if property_type.is_empty() {
            return None;
        }
        Some(Listing {
            property_type,
            city: Address::from_form(data).city.trim().to_lowercase(),
            price_per_m2: price / surface,
        })
    }
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn position_for(percent_diff: f64) -> MarketPosition {
    if percent_diff < -AT_MARKET_BAND {
        MarketPosition::Below
    } else if percent_diff > AT_MARKET_BAND {
        MarketPosition::Above
    } else {
        MarketPosition::At
    }
}

/// Compare `subject` with listings of the same property type
///
/// Comparables in the subject's city are preferred; when there are none the
/// comparison falls back to every listing of the same type. Comparables
/// missing a price, surface or type are skipped.
pub fn compare(subject: &FormData, comparables: &[FormData]) -> Result<MarketComparison, MarketError> {
    let subject = Listing::from_form(subject).ok_or(MarketError::IncompleteSubject)?;
    let same_type: Vec<Listing> = comparables
        .iter()
        .filter_map(Listing::from_form)
        .filter(|c| c.property_type == subject.property_type)
        .collect();

    let same_city: Vec<f64> = same_type
        .iter()
        .filter(|c| !subject.city.is_empty() && c.city == subject.city)
        .map(|c| c.price_per_m2)
        .collect();

    let (scope, mut values) = if same_city.is_empty() {
        (
            ComparisonScope::PropertyType,
            same_type.iter().map(|c| c.price_per_m2).collect::<Vec<_>>(),
        )
    } else {
        (ComparisonScope::SameCity, same_city)
    };
    if values.is_empty() {
        return Err(MarketError::NoComparables(subject.property_type));
    }

    values.sort_by(f64::total_cmp);
    let median = median(&values);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let percent_diff = (subject.price_per_m2 - median) / median * 100.0;

    tracing::debug!(
        scope = ?scope,
        comparables = values.len(),
        median,
        percent_diff,
        "market comparison"
    );

    Ok(MarketComparison {
        price_per_m2: subject.price_per_m2,
        scope,
        comparable_count: values.len(),
        median_price_per_m2: median,
        mean_price_per_m2: mean,
        percent_diff,
        position: position_for(percent_diff),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(property_type: &str, city: &str, price: f64, surface: f64) -> FormData {
        FormData::new()
            .with("propertyType", property_type)
            .with("price", price)
            .with("surface", surface)
            .with("address", json!({"city": city}))
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[1.0, 2.0, 9.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 4.0, 9.0]), 3.0);
    }

    #[test]
    fn test_position_thresholds() {
        assert_eq!(position_for(-10.5), MarketPosition::Below);
        assert_eq!(position_for(-10.0), MarketPosition::At);
        assert_eq!(position_for(0.0), MarketPosition::At);
        assert_eq!(position_for(10.0), MarketPosition::At);
        assert_eq!(position_for(10.01), MarketPosition::Above);
    }

    #[test]
    fn test_compare_prefers_same_city() {
        let subject = listing("apartment", "Santiago", 240_000.0, 120.0); // 2000/m²
        let comparables = vec![
            listing("apartment", "Santiago", 180_000.0, 100.0), // 1800
            listing("apartment", "santiago ", 220_000.0, 100.0), // 2200
            listing("apartment", "Santiago", 150_000.0, 100.0), // 1500
            listing("apartment", "Punta Cana", 500_000.0, 100.0),
            listing("house", "Santiago", 100_000.0, 100.0),
        ];
        let result = compare(&subject, &comparables).unwrap();

        assert_eq!(result.scope, ComparisonScope::SameCity);
        assert_eq!(result.comparable_count, 3);
        assert_eq!(result.median_price_per_m2, 1800.0);
        assert!((result.mean_price_per_m2 - 1833.33).abs() < 0.01);
        assert!((result.percent_diff - 11.11).abs() < 0.01);
        assert_eq!(result.position, MarketPosition::Above);
    }

    #[test]
    fn test_compare_falls_back_to_type() {
        let subject = listing("villa", "Cabrera", 450_000.0, 300.0); // 1500
        let comparables = vec![
            listing("villa", "Las Terrenas", 480_000.0, 300.0), // 1600
            listing("villa", "Sosúa", 600_000.0, 400.0),         // 1500
        ];
        let result = compare(&subject, &comparables).unwrap();

        assert_eq!(result.scope, ComparisonScope::PropertyType);
        assert_eq!(result.median_price_per_m2, 1550.0);
        assert_eq!(result.position, MarketPosition::At);
    }

    #[test]
    fn test_compare_errors() {
        let incomplete = FormData::new().with("propertyType", "house");
        assert_eq!(compare(&incomplete, &[]), Err(MarketError::IncompleteSubject));

        let subject = listing("office", "Santo Domingo", 100_000.0, 50.0);
        let comparables = vec![listing("house", "Santo Domingo", 1.0, 1.0), FormData::new()];
        assert_eq!(
            compare(&subject, &comparables),
            Err(MarketError::NoComparables("office".to_string()))
        );
    }
}
