//! Service layer: the inference client plus the pure logic the handlers use.

pub mod availability;
pub mod extraction;
pub mod inference;
pub mod prompts;

pub use inference::{GenerationOptions, InferenceClient, InferenceError};
