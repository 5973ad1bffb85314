//! Key classification.
//!
//! Counts ideographs and detects kana by testing each code point against fixed
//! inclusive intervals. Counting is over `char`s, so supplementary-plane ideographs
//! (extensions B through G) count once, not twice.

use crate::types::Classification;

/// CJK Unified Ideographs, base block plus extensions A through G.
const IDEOGRAPH_RANGES: [(u32, u32); 8] = [
    (0x4E00, 0x9FFF),   // CJK Unified Ideographs
    (0x3400, 0x4DBF),   // Extension A
    (0x20000, 0x2A6DF), // Extension B
    (0x2A700, 0x2B73F), // Extension C
    (0x2B740, 0x2B81F), // Extension D
    (0x2B820, 0x2CEAF), // Extension E
    (0x2CEB0, 0x2EBEF), // Extension F
    (0x30000, 0x3134F), // Extension G
];

/// Hiragana and Katakana blocks.
const KANA_RANGES: [(u32, u32); 2] = [
    (0x3040, 0x309F), // Hiragana
    (0x30A0, 0x30FF), // Katakana
];

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let cp = c as u32;
    ranges.iter().any(|&(low, high)| low <= cp && cp <= high)
}

/// Returns true if `c` is a CJK Unified Ideograph (base block or extensions A-G).
pub fn is_ideograph(c: char) -> bool {
    in_ranges(c, &IDEOGRAPH_RANGES)
}

/// Returns true if `c` is Hiragana or Katakana.
pub fn is_kana(c: char) -> bool {
    in_ranges(c, &KANA_RANGES)
}

/// Classifies a key. Total over all strings; the empty key yields all zeros.
pub fn classify(key: &str) -> Classification {
    key.chars().fold(Classification::default(), |mut acc, c| {
        acc.length += 1;
        if is_ideograph(c) {
            acc.ideograph_count += 1;
        }
        if is_kana(c) {
            acc.has_kana = true;
        }
        acc
    })
}

/// Returns the first ideograph in `key`, if any.
pub(crate) fn first_ideograph(key: &str) -> Option<char> {
    key.chars().find(|&c| is_ideograph(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(ideograph_count: usize, has_kana: bool, length: usize) -> Classification {
        Classification {
            ideograph_count,
            has_kana,
            length,
        }
    }

    #[test]
    fn test_classify_single_ideograph() {
        assert_eq!(classify("好"), class(1, false, 1));
    }

    #[test]
    fn test_classify_hiragana() {
        assert_eq!(classify("ひらがな"), class(0, true, 4));
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(classify(""), class(0, false, 0));
    }

    #[test]
    fn test_classify_extension_b_counts_once() {
        // U+20000 is a surrogate pair in UTF-16
        assert_eq!(classify("𠀀"), class(1, false, 1));
        assert_eq!(classify("\u{20000}\u{3134F}"), class(2, false, 2));
    }

    #[test]
    fn test_classify_mixed() {
        assert_eq!(classify("見る"), class(1, true, 2));
        assert_eq!(classify("地図の"), class(2, true, 3));
        assert_eq!(classify("好123"), class(1, false, 4));
        assert_eq!(classify("カタカナ"), class(0, true, 4));
        assert_eq!(classify("romaji"), class(0, false, 6));
    }

    #[test]
    fn test_ideograph_range_boundaries() {
        assert!(is_ideograph('\u{4E00}'));
        assert!(is_ideograph('\u{9FFF}'));
        assert!(!is_ideograph('\u{4DFF}'));
        assert!(!is_ideograph('\u{A000}'));

        assert!(is_ideograph('\u{3400}'));
        assert!(is_ideograph('\u{4DBF}'));
        assert!(!is_ideograph('\u{33FF}'));
        assert!(!is_ideograph('\u{4DC0}'));

        assert!(is_ideograph('\u{20000}'));
        assert!(is_ideograph('\u{2A6DF}'));
        assert!(!is_ideograph('\u{1FFFF}'));
        assert!(!is_ideograph('\u{2A6E0}'));

        assert!(is_ideograph('\u{2A700}'));
        assert!(is_ideograph('\u{2EBEF}'));
        assert!(!is_ideograph('\u{2EBF0}'));
        assert!(is_ideograph('\u{30000}'));
        assert!(is_ideograph('\u{3134F}'));
        assert!(!is_ideograph('\u{31350}'));
    }

    #[test]
    fn test_kana_boundaries() {
        assert!(!is_kana('\u{303F}'));
        assert!(is_kana('\u{3040}'));
        assert!(is_kana('\u{309F}'));
        assert!(is_kana('\u{30A0}'));
        assert!(is_kana('\u{30FF}'));
        assert!(!is_kana('\u{3100}'));
        assert!(!is_kana('好'));
        assert!(!is_ideograph('あ'));
    }

    #[test]
    fn test_first_ideograph() {
        assert_eq!(first_ideograph("お茶"), Some('茶'));
        assert_eq!(first_ideograph("abc"), None);
        assert_eq!(first_ideograph(""), None);
    }
}
