//! Display handle generation.
//!
//! Every user gets a short numeric handle (e.g. `482913`) that other members
//! type when sending an invitation. Handles are allocated from entropy with a
//! store-side uniqueness check; the allocation loop is bounded, falling back
//! to a 7-digit space before giving up entirely.

/// Attempts per handle space before moving on.
pub const MAX_ATTEMPTS: u32 = 20;

/// Map raw entropy onto the 6-digit space `100000..=999999`.
pub fn handle_from_entropy(entropy: u32) -> String {
  (100_000 + entropy % 900_000).to_string()
}

/// Fallback space once 6 digits are too contended: `1000000..=9999999`.
pub fn widened_handle_from_entropy(entropy: u32) -> String {
  (1_000_000 + entropy % 9_000_000).to_string()
}

/// A handle as accepted from callers: 6 or 7 digits, no leading zero.
pub fn is_valid_handle(s: &str) -> bool {
  (s.len() == 6 || s.len() == 7)
    && !s.starts_with('0')
    && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn six_digit_space() {
    assert_eq!(handle_from_entropy(0), "100000");
    assert_eq!(handle_from_entropy(899_999), "999999");
    assert_eq!(handle_from_entropy(900_000), "100000");
  }

  #[test]
  fn widened_space_is_seven_digits() {
    assert_eq!(widened_handle_from_entropy(0), "1000000");
    assert_eq!(widened_handle_from_entropy(8_999_999), "9999999");
  }

  #[test]
  fn handle_validation() {
    assert!(is_valid_handle("123456"));
    assert!(is_valid_handle("1234567"));
    assert!(!is_valid_handle("012345"));
    assert!(!is_valid_handle("12345"));
    assert!(!is_valid_handle("12345678"));
    assert!(!is_valid_handle("12a456"));
  }
}
