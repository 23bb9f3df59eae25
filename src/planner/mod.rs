//! Planning module for reconciliation decisions.
//!
//! This module holds the pure half of the reconciler: the transition tables
//! that pick an action and the diff engine that reports field changes.

mod action;
mod diff;

pub use action::{Action, Converged, plan_disk, plan_instance};
pub use diff::DiffEngine;
