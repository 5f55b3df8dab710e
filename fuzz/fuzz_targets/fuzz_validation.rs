//! Fuzz testing for the input guard and output encoder.
//!
//! This fuzz target tests the robustness of the validation module against
//! arbitrary input strings. It ensures that validation functions:
//!
//! - Never panic on any input
//! - Always return a valid Result (Ok or Err)
//! - Handle edge cases like empty strings, long strings, multibyte
//!   characters, and pathological whitespace
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `validate_nlp_prompt`: prompt normalization, length bounds, blocklist
//! - `sanitize_nlp_summary`: tag stripping, truncation, entity escaping
//! - `validate_email` / `validate_lead_field`: lead-form field validation

#![no_main]

use crestline_api::validation::{
    sanitize_nlp_summary, validate_email, validate_lead_field, validate_lead_message,
    validate_nlp_prompt,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Prompt guard: must never panic, and a sanitized result must
        // respect the normalization contract.
        if let Ok(sanitized) = validate_nlp_prompt(s) {
            assert!(!sanitized.is_empty());
            assert!(!sanitized.contains("  "));
            assert!(sanitized.chars().count() <= 500);
        }

        // Output encoder: no tags survive, and the budget holds even for
        // multibyte input.
        let encoded = sanitize_nlp_summary(s);
        assert!(!encoded.contains('<'));

        // Lead-form validators (shouldn't panic)
        let _ = validate_email(s);
        let _ = validate_lead_field(s, "Name");
        let _ = validate_lead_message(s);
    }
});
