//! Shared leaf types for the analysis client.
//!
//! ## Architecture
//!
//! - **common** (this crate): Types every other crate depends on
//! - **client-core**: Startup coordination, launching and connecting
//! - **analysis-client**: Command-line wiring with logging
//!
//! Kept deliberately free of runtime dependencies so that error types in
//! any layer can carry an [`ErrorLocation`].

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
