use crate::constants::{SHORT_LINK_ALPHABET, SHORT_LINK_MIN_LENGTH};

/*
Short links

The alphabet is shuffled with the salt; its first character only ever pads,
the remaining ones are base-61 digits. Id 125 with an unshuffled alphabet:

    125 = 2 * 61 + 3  ->  "de"  ->  "aaaaaade"
*/

#[derive(Debug, Clone)]
pub struct ShortLinkCodec {
    padding: char,
    digits: Vec<char>,
    min_length: usize,
}

impl ShortLinkCodec {
    pub fn new(salt: &str) -> Self {
        Self::with_min_length(salt, SHORT_LINK_MIN_LENGTH)
    }

    pub fn with_min_length(salt: &str, min_length: usize) -> Self {
        let mut alphabet: Vec<char> = SHORT_LINK_ALPHABET.chars().collect();
        let salt: Vec<char> = salt.chars().collect();
        consistent_shuffle(&mut alphabet, &salt);

        let padding = alphabet.remove(0);

        Self {
            padding,
            digits: alphabet,
            min_length,
        }
    }

    pub fn encode(&self, id: u64) -> String {
        let base = self.digits.len() as u64;
        let mut value = id;
        let mut code: Vec<char> = vec![];

        loop {
            code.push(self.digits[(value % base) as usize]);
            value /= base;
            if value == 0 {
                break;
            }
        }

        while code.len() < self.min_length {
            code.push(self.padding);
        }

        code.iter().rev().collect()
    }

    /// Only canonical codes, exactly what `encode` produces, are accepted.
    pub fn decode(&self, code: &str) -> Option<u64> {
        let base = self.digits.len() as u64;
        let digits = code.trim_start_matches(self.padding);
        if digits.is_empty() {
            return None;
        }

        let mut value: u64 = 0;
        for c in digits.chars() {
            let digit = self.digits.iter().position(|d| *d == c)? as u64;
            value = value.checked_mul(base)?.checked_add(digit)?;
        }

        if self.encode(value) != code {
            return None;
        }

        Some(value)
    }

    pub fn encode_recipe(&self, recipe_id: i32) -> Option<String> {
        u64::try_from(recipe_id).ok().map(|id| self.encode(id))
    }

    pub fn decode_recipe(&self, code: &str) -> Option<i32> {
        self.decode(code).and_then(|id| i32::try_from(id).ok())
    }
}

fn consistent_shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() || alphabet.len() < 2 {
        return;
    }

    let mut v = 0;
    let mut p = 0;
    let mut i = alphabet.len() - 1;

    while i > 0 {
        v %= salt.len();
        let a = salt[v] as usize;
        p += a;
        let j = (a + v + p) % i;
        alphabet.swap(i, j);

        i -= 1;
        v += 1;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(60)]
    #[case(61)]
    #[case(125)]
    #[case(3_721)]
    #[case(i32::MAX as u64)]
    #[case(u64::MAX)]
    fn decode_reverses_encode(#[case] id: u64) {
        let codec = ShortLinkCodec::new("random_salt");
        let code = codec.encode(id);

        assert!(code.len() >= SHORT_LINK_MIN_LENGTH);
        assert_eq!(codec.decode(&code), Some(id));
    }

    #[test]
    fn unsalted_layout() {
        let codec = ShortLinkCodec::new("");
        assert_eq!(codec.encode(125), "aaaaaade");
        assert_eq!(codec.encode(0), "aaaaaaab");
    }

    #[test]
    fn salt_changes_codes() {
        let a = ShortLinkCodec::new("one");
        let b = ShortLinkCodec::new("two");

        assert_ne!(a.encode(42), b.encode(42));
        assert_ne!(b.decode(&a.encode(42)), Some(42));
    }

    #[test]
    fn distinct_ids_get_distinct_codes() {
        let codec = ShortLinkCodec::new("random_salt");
        let mut codes: Vec<String> = (0..2_000).map(|id| codec.encode(id)).collect();
        codes.sort();
        codes.dedup();

        assert_eq!(codes.len(), 2_000);
    }

    #[rstest]
    #[case("")]
    #[case("!!!!!!!!")]
    #[case("abc-defg")]
    fn garbage_is_rejected(#[case] code: &str) {
        assert_eq!(ShortLinkCodec::new("random_salt").decode(code), None);
    }

    #[test]
    fn padding_only_and_non_canonical_codes_are_rejected() {
        let codec = ShortLinkCodec::new("");

        assert_eq!(codec.decode("aaaaaaaa"), None);
        // "b" is the zero digit, so this spells 125 with a redundant leading zero
        assert_eq!(codec.decode("aaaaabde"), None);
        assert_eq!(codec.decode("aaaaaade"), Some(125));
    }

    #[test]
    fn overflow_is_rejected() {
        let codec = ShortLinkCodec::new("");
        let code = "9".repeat(40);

        assert_eq!(codec.decode(&code), None);
    }

    #[test]
    fn recipe_ids_must_fit() {
        let codec = ShortLinkCodec::new("random_salt");

        assert_eq!(codec.encode_recipe(-1), None);
        let big = codec.encode(u64::from(u32::MAX));
        assert_eq!(codec.decode_recipe(&big), None);

        let code = codec.encode_recipe(17);
        assert_eq!(code.and_then(|c| codec.decode_recipe(&c)), Some(17));
    }
}
