//! rf-core: stable foundation for resflow.
//!
//! Contains:
//! - ids (compact cell/well ids and 1-based control period ids)
//! - numeric (Real + tolerances + float helpers)
//! - timing (wall-clock step timer)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{RfError, RfResult};
pub use ids::*;
pub use numeric::*;
pub use timing::Timer;
