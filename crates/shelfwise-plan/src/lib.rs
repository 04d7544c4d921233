//! Planning for shelfwise.
//!
//! [`Planner`] scans a root, fingerprints and groups its files, and emits an
//! [`OrganizationPlan`]. [`optimize_plan`] makes every destination distinct,
//! and [`Validator`] checks the result before anything is moved.

mod optimize;
mod planner;
mod validate;

pub use optimize::optimize_plan;
pub use planner::Planner;
pub use validate::{ValidationReport, Validator, available_space};

pub use shelfwise_core::OrganizationPlan;
