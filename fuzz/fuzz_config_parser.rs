//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`. Any config that parses must
//! also satisfy the budget ordering that validation promises.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = maktaba_config::AppConfig::parse(s) {
            assert!(config.budget.per_request_ceiling >= 1);
            assert!(config.budget.ceiling >= config.budget.per_request_ceiling);
        }
    }
});
