//! Coercion of raw CSV cells into form values

use serde_json::{json, Value};

use super::headers::ValueKind;
use crate::form::fields::{LandType, PropertyType};
use crate::form::text::slugify;

const CURRENCY_MARKERS: &[&str] = &["usd", "us$", "rd$", "dop", "eur", "$", "€", "m²", "m2"];

/// Parse a money or area amount
///
/// Accepts currency markers and thousands separators in either convention.
/// When both `.` and `,` appear the later one is the decimal mark; a lone
/// separator followed by exactly three digits is a thousands separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_lowercase();
    for marker in CURRENCY_MARKERS {
        s = s.replace(marker, "");
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace() && *c != '\'').collect();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-')) {
        return None;
    }

    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => s.replace(',', ""),
        (Some(_), Some(_)) => s.replace('.', "").replace(',', "."),
        (Some(_), None) => resolve_single_separator(&s, '.'),
        (None, Some(_)) => resolve_single_separator(&s, ','),
        (None, None) => s,
    };
    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

fn resolve_single_separator(s: &str, sep: char) -> String {
    let groups: Vec<&str> = s.split(sep).collect();
    let thousands = groups.len() > 2 || groups.last().is_some_and(|g| g.len() == 3);
    if thousands {
        groups.concat()
    } else {
        s.replace(sep, ".")
    }
}

/// Split a `;` or `|` separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([';', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Convert one cell for `kind`
///
/// Blank cells yield `Ok(None)`. Errors carry a message fit for a row report.
pub fn coerce(kind: ValueKind, raw: &str) -> Result<Option<Value>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let value = match kind {
        ValueKind::Text => Value::String(raw.to_string()),
        ValueKind::Amount => {
            let amount = parse_amount(raw).ok_or_else(|| format!("invalid amount '{raw}'"))?;
            if amount < 0.0 {
                return Err(format!("amount '{raw}' is negative"));
            }
            json!(amount)
        }
        ValueKind::Count => {
            let n = parse_amount(raw).ok_or_else(|| format!("invalid number '{raw}'"))?;
            if n < 0.0 || n.fract() != 0.0 {
                return Err(format!("'{raw}' is not a whole number"));
            }
            json!(n as u64)
        }
        ValueKind::Coordinate => {
            let n: f64 = raw
                .replace(',', ".")
                .parse()
                .map_err(|_| format!("invalid coordinate '{raw}'"))?;
            json!(n)
        }
        ValueKind::PropertyType => {
            let t = PropertyType::parse_loose(raw)
                .ok_or_else(|| format!("unknown property type '{raw}'"))?;
            Value::String(t.as_str().to_string())
        }
        ValueKind::LandType => {
            let key = slugify(raw, '_');
            let t = LandType::from_key(&key)
                .or_else(|| land_type_synonym(&key))
                .ok_or_else(|| format!("unknown land type '{raw}'"))?;
            Value::String(t.as_str().to_string())
        }
        ValueKind::Characteristics => {
            let items: Vec<Value> = split_list(raw)
                .into_iter()
                .map(|name| json!({"id": slugify(&name, '-'), "name": name, "selected": true}))
                .collect();
            Value::Array(items)
        }
        ValueKind::Images => {
            let urls = split_list(raw);
            if let Some(bad) = urls.iter().find(|u| !is_http_url(u)) {
                return Err(format!("image '{bad}' is not an http(s) URL"));
            }
            json!(urls)
        }
        ValueKind::Url => {
            if !is_http_url(raw) {
                return Err(format!("'{raw}' is not an http(s) URL"));
            }
            Value::String(raw.to_string())
        }
    };
    Ok(Some(value))
}

fn land_type_synonym(key: &str) -> Option<LandType> {
    match key {
        "residencial" => Some(LandType::Residential),
        "comercial" => Some(LandType::Commercial),
        "agricola" | "agricultural_land" | "finca" => Some(LandType::Agricultural),
        "industrial" => Some(LandType::Industrial),
        "turistico" | "turistica" | "tourism" | "tourist" => Some(LandType::Touristic),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("150000"), Some(150_000.0));
        assert_eq!(parse_amount("US$ 150,000"), Some(150_000.0));
        assert_eq!(parse_amount("RD$1.250.000"), Some(1_250_000.0));
        assert_eq!(parse_amount("1,250,000.50"), Some(1_250_000.5));
        assert_eq!(parse_amount("1.250.000,50"), Some(1_250_000.5));
        assert_eq!(parse_amount("185.5 m²"), Some(185.5));
        assert_eq!(parse_amount("2,5"), Some(2.5));
        assert_eq!(parse_amount("€ 99"), Some(99.0));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("call for price"), None);
        assert_eq!(parse_amount("12abc"), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("Pool; Gym | ;Garden "), vec!["Pool", "Gym", "Garden"]);
        assert!(split_list(" ; | ").is_empty());
    }

    #[test]
    fn test_coerce_blank_is_none() {
        assert_eq!(coerce(ValueKind::Amount, "   "), Ok(None));
    }

    #[test]
    fn test_coerce_counts() {
        assert_eq!(coerce(ValueKind::Count, "3"), Ok(Some(json!(3))));
        assert!(coerce(ValueKind::Count, "2.5").is_err());
        assert!(coerce(ValueKind::Count, "-1").is_err());
    }

    #[test]
    fn test_coerce_property_type_synonyms() {
        assert_eq!(coerce(ValueKind::PropertyType, "Casa"), Ok(Some(json!("house"))));
        assert_eq!(
            coerce(ValueKind::PropertyType, "Apartamento"),
            Ok(Some(json!("apartment")))
        );
        assert_eq!(
            coerce(ValueKind::PropertyType, "castle"),
            Err("unknown property type 'castle'".to_string())
        );
    }

    #[test]
    fn test_coerce_land_type() {
        assert_eq!(coerce(ValueKind::LandType, "Agrícola"), Ok(Some(json!("agricultural"))));
        assert_eq!(coerce(ValueKind::LandType, "touristic"), Ok(Some(json!("touristic"))));
    }

    #[test]
    fn test_coerce_characteristics() {
        let value = coerce(ValueKind::Characteristics, "Piscina; Aire acondicionado")
            .unwrap()
            .unwrap();
        assert_eq!(
            value,
            json!([
                {"id": "piscina", "name": "Piscina", "selected": true},
                {"id": "aire-acondicionado", "name": "Aire acondicionado", "selected": true}
            ])
        );
    }

    #[test]
    fn test_coerce_images_require_http() {
        assert!(coerce(ValueKind::Images, "https://a.example/1.jpg|https://a.example/2.jpg").is_ok());
        assert!(coerce(ValueKind::Images, "https://a.example/1.jpg;file.jpg").is_err());
    }

    #[test]
    fn test_coerce_coordinate_with_decimal_comma() {
        assert_eq!(coerce(ValueKind::Coordinate, "18,47"), Ok(Some(json!(18.47))));
        assert_eq!(coerce(ValueKind::Coordinate, "-69.93"), Ok(Some(json!(-69.93))));
    }
}
