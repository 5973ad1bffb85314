//! Stable 32-bit rolling hash shared by the build tooling and lookup clients.
//!
//! `h = h * 31 + unit (mod 2^32)` over the UTF-16 code units of the key, left to
//! right, starting from zero. Any change here silently misroutes every hashed key.

/// Computes the stable hash of `key`.
pub fn stable_hash(key: &str) -> u32 {
    key.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_fixtures() {
        assert_eq!(stable_hash(""), 0);
        assert_eq!(stable_hash("好"), 22_909);
        assert_eq!(stable_hash("学生"), 755_321);
        assert_eq!(stable_hash("你好"), 652_829);
    }

    #[test]
    fn test_hash_iterates_utf16_units() {
        // U+20000 encodes as D840 DC00
        assert_eq!(stable_hash("𠀀"), 0xD840 * 31 + 0xDC00);
        assert_eq!(stable_hash("𠀀"), 1_772_480);
    }

    #[test]
    fn test_hash_unsigned_wraparound() {
        // exceeds i32::MAX, so a signed implementation would go negative here
        assert_eq!(stable_hash("日本語学校"), 3_436_902_738);
        assert_eq!(stable_hash("hello world this is long"), 3_601_484_812);
    }

    #[test]
    fn test_hash_ascii() {
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("ab"), 97 * 31 + 98);
    }
}
