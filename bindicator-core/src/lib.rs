//! Core types and the concurrent aggregation engine of the bindicator service.

/// Bounded, expiring result caches and the caching gateway decorator.
pub mod cache;
/// Domain models and identifiers shared by providers and the server.
pub mod model;
/// Provider traits, error taxonomy and the clock.
pub mod ports;
/// Public response shapes.
pub mod response;
/// Aggregation engine used by the server.
pub mod service;

#[cfg(test)]
mod testing;

pub use cache::*;
pub use model::*;
pub use ports::*;
pub use response::*;
pub use service::*;
