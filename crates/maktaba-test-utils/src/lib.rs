#![deny(unsafe_code)]

//! Shared test utilities for the Maktaba workspace.
//!
//! Provides a scripted completion provider, a counting user store, config
//! builders, and tracing helpers so that individual crate tests stay concise
//! and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! maktaba-test-utils = { workspace = true }
//! ```
//!
//! Only integration tests (`tests/`) should use it from `maktaba-core`;
//! unit tests inside the crate would see a second copy of its types.

pub mod config;
pub mod provider;
pub mod session;
pub mod store;
pub mod tracing_setup;
