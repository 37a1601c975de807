//! Form validation helpers.
//!
//! Handlers embed a [`Validator`] in their form structs, run the checks they
//! need, and re-render the page with the collected errors when
//! [`Validator::valid`] is false.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Loose RFC 5322-style email check, as browsers apply it.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

#[derive(Debug, Clone, Default, Serialize)]
pub struct Validator {
    pub field_errors: HashMap<String, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record an error for `field`. The first error per field wins.
    pub fn add_field_error(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// At most `n` characters (not bytes).
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules() {
        assert!(not_blank("x"));
        assert!(!not_blank("  \t"));
        assert!(max_chars("héllo", 5));
        assert!(!max_chars("héllo!", 5));
        assert!(min_chars("12345678", 8));
        assert!(!min_chars("1234567", 8));
        assert!(permitted_value(&7, &[1, 7, 365]));
        assert!(!permitted_value(&30, &[1, 7, 365]));
    }

    #[test]
    fn email_pattern() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(matches("a.b+c@sub.example.co.uk", &EMAIL_RX));
        assert!(!matches("alice@", &EMAIL_RX));
        assert!(!matches("alice.example.com", &EMAIL_RX));
        assert!(!matches("alice@-example.com", &EMAIL_RX));
    }

    #[test]
    fn first_field_error_wins() {
        let mut v = Validator::default();
        assert!(v.valid());

        v.check_field(false, "title", "This field cannot be blank");
        v.check_field(false, "title", "This field cannot be more than 100 characters long");
        v.check_field(true, "content", "This field cannot be blank");

        assert!(!v.valid());
        assert_eq!(v.field_errors.len(), 1);
        assert_eq!(v.field_errors["title"], "This field cannot be blank");
    }

    #[test]
    fn non_field_errors_invalidate() {
        let mut v = Validator::default();
        v.add_non_field_error("Email or password is incorrect");
        assert!(!v.valid());
    }
}
