// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization to the digits-only international form.

/// Country code prepended to local numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "55";

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalizes a phone number to international digits.
///
/// Strips every non-digit and leading zeros, then prefixes 10/11-digit local
/// numbers (area code + subscriber) with [`DEFAULT_COUNTRY_CODE`]. Returns
/// `None` when the result cannot be a valid E.164 number.
///
/// The function is idempotent on its own output.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits = digits_of(raw);
    let normalized = match digits.len() {
        10 | 11 => format!("{DEFAULT_COUNTRY_CODE}{digits}"),
        _ => digits,
    };
    within_length(normalized)
}

/// Normalizes a number already in international form, such as a sender id
/// reported by the provider. No country code is added.
pub fn normalize_international(raw: &str) -> Option<String> {
    within_length(digits_of(raw))
}

fn digits_of(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').to_string()
}

fn within_length(digits: String) -> Option<String> {
    (MIN_DIGITS..=MAX_DIGITS)
        .contains(&digits.len())
        .then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn local_numbers_get_country_code() {
        assert_eq!(
            normalize_phone("(11) 98765-4321").as_deref(),
            Some("5511987654321")
        );
        assert_eq!(normalize_phone("1133334444").as_deref(), Some("551133334444"));
    }

    #[test]
    fn international_numbers_are_kept() {
        assert_eq!(
            normalize_phone("+55 11 98765-4321").as_deref(),
            Some("5511987654321")
        );
        assert_eq!(normalize_phone("+1 415 555 0100 12").as_deref(), Some("1415555010012"));
    }

    #[test]
    fn provider_numbers_are_not_prefixed() {
        assert_eq!(normalize_international("14155550100").as_deref(), Some("14155550100"));
        assert_eq!(normalize_international("+44 7700 900123").as_deref(), Some("447700900123"));
        assert_eq!(normalize_international("not-a-phone"), None);
    }

    #[test]
    fn leading_zeros_are_dropped() {
        assert_eq!(normalize_phone("011987654321").as_deref(), Some("5511987654321"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("abc"), None);
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("1234567890123456"), None);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[0-9 ()+-]{0,24}") {
            if let Some(once) = normalize_phone(&raw) {
                prop_assert_eq!(normalize_phone(&once), Some(once.clone()));
            }
        }

        #[test]
        fn local_numbers_grow_by_two_digits(local in "[1-9][0-9]{9,10}") {
            let normalized = normalize_phone(&local).unwrap();
            prop_assert_eq!(normalized.len(), local.len() + 2);
            prop_assert!(normalized.starts_with(DEFAULT_COUNTRY_CODE));
        }
    }
}
