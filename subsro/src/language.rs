/// Catch-all catalog code for languages the catalog does not list
pub const OTHER_LANGUAGE: &str = "alt";

/// Map a free-form 2 or 3 letter code to the catalog's language code.
///
/// The catalog knows `ro, en, ita, fra, ger, ung, gre, por, spa`; anything
/// else maps to `alt`.
pub fn to_catalog_code(code: &str) -> &'static str {
    match code.trim().to_ascii_lowercase().as_str() {
        "ro" | "ron" | "rum" | "rom" => "ro",
        "en" | "eng" => "en",
        "it" | "ita" => "ita",
        "fr" | "fra" | "fre" => "fra",
        "de" | "deu" | "ger" => "ger",
        "hu" | "hun" | "ung" => "ung",
        "el" | "ell" | "gre" => "gre",
        "pt" | "por" => "por",
        "es" | "spa" => "spa",
        _ => OTHER_LANGUAGE,
    }
}

/// Map a catalog language code to the ISO 639-2 code reported to the host.
///
/// Codes outside the catalog table map to `und`.
pub fn to_iso639_2(catalog_code: &str) -> &'static str {
    match catalog_code.trim().to_ascii_lowercase().as_str() {
        "ro" => "rom",
        "en" => "eng",
        "ita" => "ita",
        "fra" => "fra",
        "ger" => "ger",
        "ung" => "hun",
        "gre" => "gre",
        "por" => "por",
        "spa" => "spa",
        _ => "und",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_letter_codes() {
        assert_eq!(to_catalog_code("ro"), "ro");
        assert_eq!(to_catalog_code("EN"), "en");
        assert_eq!(to_catalog_code("it"), "ita");
        assert_eq!(to_catalog_code("fr"), "fra");
        assert_eq!(to_catalog_code("de"), "ger");
        assert_eq!(to_catalog_code("hu"), "ung");
        assert_eq!(to_catalog_code("el"), "gre");
        assert_eq!(to_catalog_code("pt"), "por");
        assert_eq!(to_catalog_code("es"), "spa");
    }

    #[test]
    fn test_three_letter_codes() {
        assert_eq!(to_catalog_code("rum"), "ro");
        assert_eq!(to_catalog_code("ron"), "ro");
        assert_eq!(to_catalog_code("eng"), "en");
        assert_eq!(to_catalog_code("fre"), "fra");
        assert_eq!(to_catalog_code("deu"), "ger");
        assert_eq!(to_catalog_code("hun"), "ung");
    }

    #[test]
    fn test_unknown_maps_to_alt() {
        assert_eq!(to_catalog_code("jpn"), "alt");
        assert_eq!(to_catalog_code(""), "alt");
    }

    #[test]
    fn test_iso_output() {
        assert_eq!(to_iso639_2("ro"), "rom");
        assert_eq!(to_iso639_2("en"), "eng");
        assert_eq!(to_iso639_2("ung"), "hun");
        assert_eq!(to_iso639_2("spa"), "spa");
        assert_eq!(to_iso639_2("alt"), "und");
        assert_eq!(to_iso639_2("xx"), "und");
    }

    #[test]
    fn test_catalog_round_trip_is_stable() {
        for code in ["ro", "en", "ita", "fra", "ger", "ung", "gre", "por", "spa"] {
            assert_eq!(to_catalog_code(to_iso639_2(code)), code);
        }
    }
}
