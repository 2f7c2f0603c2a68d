//! Column header normalization and alias lookup

use std::collections::HashMap;

use csv::StringRecord;
use once_cell::sync::Lazy;

use crate::form::text::slugify;

/// How a column's raw text becomes a form value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    /// Money or area, tolerant of currency symbols and separators
    Amount,
    /// Non-negative whole number
    Count,
    Coordinate,
    PropertyType,
    LandType,
    /// `;` or `|` separated names
    Characteristics,
    /// `;` or `|` separated URLs
    Images,
    Url,
}

/// A form field a column maps to; dotted names address nested objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: ValueKind,
}

impl Field {
    const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind }
    }

    /// `("address", "city")` for `address.city`
    pub fn split(&self) -> (&'static str, Option<&'static str>) {
        match self.name.split_once('.') {
            Some((parent, child)) => (parent, Some(child)),
            None => (self.name, None),
        }
    }
}

static FIELDS: &[(Field, &[&str])] = &[
    (Field::new("title", ValueKind::Text), &["title", "titulo", "name", "nombre", "listing_title"]),
    (
        Field::new("description", ValueKind::Text),
        &["description", "descripcion", "desc", "details", "detalles"],
    ),
    (
        Field::new("price", ValueKind::Amount),
        &["price", "precio", "asking_price", "price_usd", "precio_usd", "price_rd", "precio_rd", "valor"],
    ),
    (
        Field::new("surface", ValueKind::Amount),
        &["surface", "area", "size", "sqm", "m2", "superficie", "metros", "metros_cuadrados", "area_m2", "surface_m2"],
    ),
    (
        Field::new("propertyType", ValueKind::PropertyType),
        &["property_type", "propertytype", "type", "tipo", "tipo_de_propiedad", "tipo_propiedad"],
    ),
    (
        Field::new("landType", ValueKind::LandType),
        &["land_type", "landtype", "zoning", "tipo_de_terreno", "tipo_terreno", "uso_de_suelo"],
    ),
    (Field::new("bedrooms", ValueKind::Count), &["bedrooms", "beds", "habitaciones", "dormitorios", "recamaras"]),
    (Field::new("bathrooms", ValueKind::Count), &["bathrooms", "baths", "banos"]),
    (
        Field::new("parkingSpots", ValueKind::Count),
        &["parking_spots", "parkingspots", "parking", "parqueos", "estacionamientos"],
    ),
    (
        Field::new("characteristics", ValueKind::Characteristics),
        &["characteristics", "features", "amenities", "caracteristicas", "amenidades"],
    ),
    (Field::new("images", ValueKind::Images), &["images", "photos", "imagenes", "fotos", "image_urls"]),
    (Field::new("videoUrl", ValueKind::Url), &["video_url", "videourl", "video"]),
    (Field::new("address.street", ValueKind::Text), &["street", "address", "calle", "direccion", "address_street"]),
    (Field::new("address.city", ValueKind::Text), &["city", "ciudad", "municipio", "address_city"]),
    (
        Field::new("address.province", ValueKind::Text),
        &["province", "provincia", "state", "region", "address_province"],
    ),
    (
        Field::new("address.postalCode", ValueKind::Text),
        &["postal_code", "postalcode", "zip", "zip_code", "codigo_postal"],
    ),
    (Field::new("coordinates.lat", ValueKind::Coordinate), &["lat", "latitude", "latitud"]),
    (Field::new("coordinates.lng", ValueKind::Coordinate), &["lng", "lon", "long", "longitude", "longitud"]),
    (Field::new("content", ValueKind::Text), &["content", "body", "contenido", "cuerpo"]),
    (Field::new("category", ValueKind::Text), &["category", "categoria"]),
    (Field::new("coverImage", ValueKind::Url), &["cover_image", "coverimage", "cover", "portada"]),
    (Field::new("slug", ValueKind::Text), &["slug"]),
    (Field::new("metaTitle", ValueKind::Text), &["meta_title", "metatitle", "seo_title"]),
    (
        Field::new("metaDescription", ValueKind::Text),
        &["meta_description", "metadescription", "seo_description"],
    ),
];

static ALIASES: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    FIELDS
        .iter()
        .flat_map(|(field, aliases)| aliases.iter().map(move |alias| (*alias, *field)))
        .collect()
});

/// Trim, lowercase, fold accents and collapse non-alphanumeric runs to `_`
pub fn normalize_header(raw: &str) -> String {
    slugify(raw, '_')
}

/// Canonical field for a raw header, if it is a known alias
pub fn lookup(raw: &str) -> Option<Field> {
    ALIASES.get(normalize_header(raw).as_str()).copied()
}

/// Header row resolved to canonical fields
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    /// One entry per column, None for unknown or duplicate columns
    pub columns: Vec<Option<Field>>,
    /// Raw text of headers that matched no alias
    pub unknown: Vec<String>,
}

impl HeaderMap {
    pub fn from_record(headers: &StringRecord) -> Self {
        let mut map = HeaderMap::default();
        for raw in headers.iter() {
            let field = lookup(raw);
            match field {
                Some(f) if map.columns.iter().flatten().any(|seen| seen.name == f.name) => {
                    // First column wins
                    tracing::debug!(header = raw, field = f.name, "duplicate column ignored");
                    map.columns.push(None);
                }
                Some(f) => map.columns.push(Some(f)),
                None => {
                    if !raw.trim().is_empty() {
                        map.unknown.push(raw.trim().to_string());
                    }
                    map.columns.push(None);
                }
            }
        }
        map
    }

    pub fn known_count(&self) -> usize {
        self.columns.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Tipo de Propiedad "), "tipo_de_propiedad");
        assert_eq!(normalize_header("Baños"), "banos");
        assert_eq!(normalize_header("Price (USD)"), "price_usd");
        assert_eq!(normalize_header("parkingSpots"), "parkingspots");
    }

    #[test]
    fn test_lookup_english_and_spanish_aliases() {
        assert_eq!(lookup("Precio").unwrap().name, "price");
        assert_eq!(lookup("Habitaciones").unwrap().name, "bedrooms");
        assert_eq!(lookup("Ciudad").unwrap().name, "address.city");
        assert_eq!(lookup("Latitud").unwrap().kind, ValueKind::Coordinate);
        assert_eq!(lookup("M2").unwrap().name, "surface");
        assert!(lookup("Agent phone").is_none());
    }

    #[test]
    fn test_field_split() {
        assert_eq!(lookup("city").unwrap().split(), ("address", Some("city")));
        assert_eq!(lookup("title").unwrap().split(), ("title", None));
    }

    #[test]
    fn test_header_map_reports_unknown_and_duplicates() {
        let headers = StringRecord::from(vec!["Título", "Agente", "Price", "Precio", ""]);
        let map = HeaderMap::from_record(&headers);

        assert_eq!(map.columns.len(), 5);
        assert_eq!(map.columns[0].map(|f| f.name), Some("title"));
        assert!(map.columns[1].is_none());
        assert_eq!(map.columns[2].map(|f| f.name), Some("price"));
        assert!(map.columns[3].is_none());
        assert_eq!(map.unknown, vec!["Agente".to_string()]);
        assert_eq!(map.known_count(), 2);
    }

    #[test]
    fn test_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for (_, aliases) in FIELDS {
            for alias in *aliases {
                assert!(seen.insert(*alias), "alias {alias} listed twice");
                assert_eq!(normalize_header(alias), *alias);
            }
        }
    }
}
