pub mod current_user;
pub mod donations;
pub mod health;
pub mod token_refresh;
pub mod user_login;
pub mod user_logout;
pub mod user_register;

// common functions for the handlers
use regex::Regex;

pub(crate) const MISSING_PAYLOAD: &str = "Missing payload";
pub(crate) const ALL_FIELDS_REQUIRED: &str = "All fields are required";
pub(crate) const INVALID_CONTACT: &str = "Invalid contact number. It must be 10 digits long.";

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Postal codes compare case-insensitively with whitespace collapsed.
pub(crate) fn normalize_postal(postal: &str) -> String {
    postal
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Exactly ten ASCII digits, nothing else.
pub(crate) fn valid_contact(contact: &str) -> bool {
    Regex::new(r"^[0-9]{10}$").is_ok_and(|re| re.is_match(contact))
}

/// Missing and whitespace-only inputs are treated the same.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn normalize_postal_collapses_and_uppercases() {
        assert_eq!(normalize_postal("  m5v   2t6 "), "M5V 2T6");
        assert_eq!(normalize_postal("560001"), "560001");
    }

    #[test]
    fn valid_contact_requires_exactly_ten_digits() {
        assert!(valid_contact("9876543210"));
        assert!(valid_contact("0000000000"));

        assert!(!valid_contact("12345"));
        assert!(!valid_contact("12345678901"));
        assert!(!valid_contact("abcdefghij"));
        assert!(!valid_contact("98765 43210"));
        assert!(!valid_contact(" 9876543210"));
        assert!(!valid_contact("987654321a"));
        // Non-ASCII digits are not decimal digits here.
        assert!(!valid_contact("٩٨٧٦٥٤٣٢١٠"));
    }

    #[test]
    fn is_blank_covers_missing_and_whitespace() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some(" \t ")));
        assert!(!is_blank(Some("x")));
    }
}
