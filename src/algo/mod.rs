//! Algorithm implementations for view updates.
//!
//! - `reconcile`: keyed list reconciliation for loopers

mod reconcile;

pub use reconcile::{plan, Plan, Planned, ReconcileStats};
