//! Text helpers shared by the importer and the previews

/// Replace accented Latin letters with their plain ASCII base
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Lowercase ASCII slug with runs of anything else collapsed into `sep`
///
/// ```
/// use listing_wizard::form::text::slugify;
/// assert_eq!(slugify("Villa en Punta Cana!", '-'), "villa-en-punta-cana");
/// ```
pub fn slugify(input: &str, sep: char) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;
    for c in fold_accents(input).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push(sep);
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Cut `input` to at most `max` characters, preferring a word boundary and
/// marking the cut with `…`. The ellipsis counts toward `max`.
pub fn truncate_at_word(input: &str, max: usize) -> String {
    let input = input.trim();
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let budget: String = input.chars().take(max - 1).collect();
    let cut = match budget.rfind(char::is_whitespace) {
        // Only back off to a word boundary if it keeps most of the text
        Some(idx) if idx >= budget.len() / 2 => &budget[..idx],
        _ => budget.as_str(),
    };
    format!("{}…", cut.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '.'))
}

/// Whole-number amount with `,` thousands separators, e.g. `1,250,000`
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Baño, Habitación, Ñandú"), "Bano, Habitacion, Nandu");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Precio (RD$) ", '_'), "precio_rd");
        assert_eq!(slugify("Área m²", '_'), "area_m");
        assert_eq!(slugify("---", '-'), "");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(1_250_000.0), "1,250,000");
        assert_eq!(format_amount(-45_000.0), "-45,000");
    }

    #[test]
    fn test_truncate_short_input_untouched() {
        assert_eq!(truncate_at_word("Casa en Sosúa", 60), "Casa en Sosúa");
    }

    #[test]
    fn test_truncate_cuts_at_word_boundary() {
        let out = truncate_at_word("Hermosa villa frente al mar con piscina privada", 20);
        assert_eq!(out, "Hermosa villa…");
        assert!(out.chars().count() <= 20);
    }

    #[test]
    fn test_truncate_long_single_word() {
        let out = truncate_at_word(&"a".repeat(30), 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }
}
