//! Phone number formatting for the sign-up screen.

use std::sync::LazyLock;

use regex::Regex;

/// Number of national digits kept; extra keystrokes are dropped.
pub const PHONE_DIGITS: usize = 10;

static NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]").expect("static regex is valid"));

/// Remove everything that is not an ASCII digit.
pub fn strip_non_digits(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Format raw keystrokes as `(<cc>) DDD-DDD-DDDD`, grouping as digits arrive.
///
/// Letters and punctuation are dropped and anything past the tenth digit is
/// truncated, so reformatting the output yields the same string.
pub fn format_phone_number(raw: &str, country_code: &str) -> String {
    let mut digits = strip_non_digits(raw);
    digits.truncate(PHONE_DIGITS);

    match digits.len() {
        0 => String::new(),
        1..=3 => format!("({country_code}) {digits}"),
        4..=6 => format!("({country_code}) {}-{}", &digits[..3], &digits[3..]),
        _ => format!(
            "({country_code}) {}-{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..]
        ),
    }
}

/// National digits of a formatted or raw number.
///
/// A leading `(<country_code>)` group, as produced by
/// [`format_phone_number`], is skipped before digits are collected.
pub fn phone_digits(value: &str, country_code: &str) -> String {
    let trimmed = value.trim_start();
    let prefix = format!("({country_code})");
    let national = trimmed.strip_prefix(prefix.as_str()).unwrap_or(trimmed);
    let mut digits = strip_non_digits(national);
    digits.truncate(PHONE_DIGITS);
    digits
}

/// Whether the value holds a full ten-digit national number.
pub fn is_complete_phone(value: &str, country_code: &str) -> bool {
    phone_digits(value, country_code).len() == PHONE_DIGITS
}
