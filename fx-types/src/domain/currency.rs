//! Currency code normalization.
//!
//! Codes travel as plain `String`s because the upstream source decides which
//! codes exist. These helpers give every layer the same canonical form.

/// Trims and uppercases a currency code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Normalizes a target-currency list: uppercased, sorted, deduplicated.
///
/// Two requests for the same set of targets produce the same list
/// regardless of the order the caller supplied them in.
pub fn normalize_targets(targets: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = targets
        .iter()
        .map(|t| normalize_code(t))
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" usd "), "USD");
        assert_eq!(normalize_code("Eur"), "EUR");
    }

    #[test]
    fn test_normalize_targets_sorts_and_dedups() {
        let targets = vec!["gbp".to_string(), "EUR".to_string(), "GBP".to_string()];
        assert_eq!(normalize_targets(&targets), vec!["EUR", "GBP"]);
    }

    #[test]
    fn test_normalize_targets_drops_blank_entries() {
        let targets = vec!["  ".to_string(), "jpy".to_string()];
        assert_eq!(normalize_targets(&targets), vec!["JPY"]);
    }
}
