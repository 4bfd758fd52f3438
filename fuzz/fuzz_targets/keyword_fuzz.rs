//! Fuzz test for keyword normalization
//!
//! Arbitrary text must normalize without panicking into a sorted,
//! de-duplicated list of non-empty lowercase terms, and normalizing the
//! rejoined terms must give the same list back.
//!
//! Run with: cargo +nightly fuzz run keyword_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use snipvault_core::{normalize_keyword, tokenize};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let terms = normalize_keyword(input);

        for term in &terms {
            assert!(!term.is_empty(), "empty term from {:?}", input);
            assert!(
                term.chars().all(|c| c.is_alphanumeric() || c == '_'),
                "separator leaked into term {:?}",
                term
            );
        }
        assert!(
            terms.windows(2).all(|w| w[0] < w[1]),
            "terms not sorted and unique: {:?}",
            terms
        );

        let rejoined = terms.join(" ");
        assert_eq!(normalize_keyword(&rejoined), terms);

        // Every normalized term is produced by plain tokenization too.
        let tokens = tokenize(input);
        assert!(terms.iter().all(|t| tokens.contains(t)));
    }
});
