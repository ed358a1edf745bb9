//! sf-core: stable foundation for stackflow.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real, finiteness checks, iterate norms, polynomials)
//! - grid (node/element helpers for 1-D flow paths)
//! - constants (physical constants and the operating point passed to every component)
//! - error (shared error types)

pub mod constants;
pub mod error;
pub mod grid;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use constants::{OperatingPoint, PhysicalConstants};
pub use error::{SfError, SfResult};
pub use numeric::*;
pub use units::*;
