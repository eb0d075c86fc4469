//! rf-schedule: timestep planning for resflow.
//!
//! Turns a history segment plus forecast segments into an ordered, immutable
//! list of timesteps, each tagged with the development phase (control period)
//! active at its midpoint. Resolving the phase for a step afterwards is an
//! O(1) lookup.

pub mod error;
pub mod phases;
pub mod plan;
pub mod segment;

pub use error::{ScheduleError, ScheduleResult};
pub use phases::{PhaseBoundary, PhaseBoundaryTable};
pub use plan::{TimestepPlan, TimestepPlanEntry};
pub use segment::{MAX_STEPS_PER_SEGMENT, SegmentConfig, TimestepSegment};
