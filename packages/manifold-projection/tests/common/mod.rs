//! Common test utilities
//!
//! Shared fixtures and assertions for the integration suites.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
