use lazy_static::lazy_static;
use regex::Regex;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // TLD must be at least 3 characters, so "a@b.co" is rejected.
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{3,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const PASSWORD_SYMBOLS: &str = "@$!%*#?&";

/// At least 8 characters with a letter, a digit and one of `@$!%*#?&`;
/// anything outside that alphabet fails outright.
pub(crate) fn is_strong_password(password: &str) -> bool {
    if password.len() < 8 {
        return false;
    }
    let mut has_letter = false;
    let mut has_digit = false;
    let mut has_symbol = false;
    for c in password.chars() {
        if c.is_ascii_alphabetic() {
            has_letter = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if PASSWORD_SYMBOLS.contains(c) {
            has_symbol = true;
        } else {
            return false;
        }
    }
    has_letter && has_digit && has_symbol
}
