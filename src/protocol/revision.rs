//! Firmware revision numbering.
//!
//! Revisions are bijective base-21 numerals over an alphabet without the
//! easily confused letters: 1 is `A`, 21 is `Z`, 22 is `AA`. Zero is shown as
//! `X*`.

/// Symbols used for revision strings.
pub const REVISION_ALPHABET: [char; 21] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'M', 'N', 'P', 'R', 'T', 'U', 'V', 'W',
    'X', 'Y', 'Z',
];

/// Display string for revision 0.
pub const UNRELEASED_REVISION: &str = "X*";

/// Convert a raw revision number to its display string.
///
/// ```
/// use puffco_rust_ble::protocol::revision::decode_revision;
///
/// assert_eq!(decode_revision(0), "X*");
/// assert_eq!(decode_revision(22), "AA");
/// ```
pub fn decode_revision(value: u32) -> String {
    if value == 0 {
        return UNRELEASED_REVISION.to_string();
    }

    let base = REVISION_ALPHABET.len() as i64;
    let mut digits = Vec::new();
    let mut i = value as i64 - 1;
    while i >= 0 {
        digits.push(REVISION_ALPHABET[(i % base) as usize]);
        i = i / base - 1;
    }

    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_zero() {
        assert_eq!(decode_revision(0), "X*");
    }

    #[test]
    fn test_single_symbols() {
        for (i, symbol) in REVISION_ALPHABET.iter().enumerate() {
            assert_eq!(decode_revision(i as u32 + 1), symbol.to_string());
        }
        assert_eq!(decode_revision(1), "A");
        assert_eq!(decode_revision(9), "J");
        assert_eq!(decode_revision(21), "Z");
    }

    #[test]
    fn test_length_boundaries() {
        assert_eq!(decode_revision(22), "AA");
        assert_eq!(decode_revision(23), "AB");
        assert_eq!(decode_revision(42), "AZ");
        assert_eq!(decode_revision(43), "BA");
        assert_eq!(decode_revision(462), "ZZ");
        assert_eq!(decode_revision(463), "AAA");
    }

    #[test]
    fn test_no_excluded_letters() {
        for value in 1..2000 {
            let text = decode_revision(value);
            assert!(!text.contains(&['I', 'L', 'O', 'Q', 'S'][..]), "{} -> {}", value, text);
        }
    }

    #[test]
    fn test_two_symbol_range_is_exhaustive() {
        let mut previous = decode_revision(22);
        for value in 23..=462 {
            let current = decode_revision(value);
            assert_eq!(current.len(), 2);
            assert!(current > previous);
            previous = current;
        }
    }

    proptest! {
        #[test]
        fn prop_increment_is_monotonic_within_length(value in 1u32..1_000_000) {
            let current = decode_revision(value);
            let next = decode_revision(value + 1);
            if current.len() == next.len() {
                prop_assert!(next > current);
            } else {
                prop_assert_eq!(next.len(), current.len() + 1);
            }
        }
    }
}
