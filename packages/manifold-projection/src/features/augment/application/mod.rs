mod augment_service;

pub use augment_service::{AugmentService, SynthesisSettings};
