//! Feature slices
//!
//! Each slice follows the same split where it applies:
//! `domain` (pure types), `ports` (traits), `application` (use cases),
//! `infrastructure` (adapters over external crates).

pub mod augment;
pub mod invalidation;
pub mod parsing;
pub mod projection_cache;
pub mod source_producer;
