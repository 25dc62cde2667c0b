//! Given-name extraction and normalization
//!
//! Produces the canonical given-name token used as the gender-inference
//! key. Names reduced to a single character (bare initials like "K" or
//! "J.") cannot be classified and are marked as such here, before any
//! inference tier sees them.

/// Normalized given-name token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GivenName {
    /// Usable inference key
    Token(String),
    /// Too short to classify; the token is still stored so the author
    /// slot is preserved, but no tier is ever consulted for it
    TooShort(String),
}

impl GivenName {
    pub fn as_str(&self) -> &str {
        match self {
            GivenName::Token(token) | GivenName::TooShort(token) => token,
        }
    }

    pub fn is_classifiable(&self) -> bool {
        matches!(self, GivenName::Token(_))
    }
}

/// Extract and normalize the given-name token from a raw author name.
///
/// Handles "Given Middle Last", "Last, Given" and single-token names.
/// Pure; malformed input yields `TooShort`, never an error.
pub fn normalize_given_name(raw: &str) -> GivenName {
    // "Last, Given" puts the given name after the first comma
    let given_part = match raw.split_once(',') {
        Some((_, after)) => after,
        None => raw,
    };

    let token = given_part
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    let token = token.trim_matches('.').to_string();

    if token.chars().count() <= 1 {
        GivenName::TooShort(token)
    } else {
        GivenName::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_first_ordering() {
        assert_eq!(
            normalize_given_name("Maria Garcia"),
            GivenName::Token("maria".to_string())
        );
        assert_eq!(
            normalize_given_name("Anne Marie van der Berg"),
            GivenName::Token("anne".to_string())
        );
    }

    #[test]
    fn family_first_ordering() {
        assert_eq!(
            normalize_given_name("Garcia, Maria"),
            GivenName::Token("maria".to_string())
        );
        assert_eq!(
            normalize_given_name("van der Berg,  Anne Marie"),
            GivenName::Token("anne".to_string())
        );
    }

    #[test]
    fn case_and_whitespace_collapse() {
        assert_eq!(
            normalize_given_name("  MARIA   Garcia "),
            GivenName::Token("maria".to_string())
        );
    }

    #[test]
    fn initials_are_too_short() {
        assert_eq!(
            normalize_given_name("K Tanaka"),
            GivenName::TooShort("k".to_string())
        );
        assert_eq!(
            normalize_given_name("J. Smith"),
            GivenName::TooShort("j".to_string())
        );
        assert!(!normalize_given_name("K").is_classifiable());
    }

    #[test]
    fn empty_and_degenerate_input() {
        assert_eq!(
            normalize_given_name(""),
            GivenName::TooShort(String::new())
        );
        assert_eq!(
            normalize_given_name("   "),
            GivenName::TooShort(String::new())
        );
        assert_eq!(
            normalize_given_name(","),
            GivenName::TooShort(String::new())
        );
    }

    #[test]
    fn hyphenated_given_names_survive() {
        assert_eq!(
            normalize_given_name("Jean-Pierre Dupont"),
            GivenName::Token("jean-pierre".to_string())
        );
    }
}
