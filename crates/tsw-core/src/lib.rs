#![deny(missing_docs)]
#![doc = "Core error surface for the tuning sweep engine."]

pub mod errors;

pub use errors::{ErrorInfo, SweepError};
