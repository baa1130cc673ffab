//! Host-language surfaces over the engine.
#[cfg(feature = "python")]
pub mod python;
