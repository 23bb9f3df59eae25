//! Reconciliation module.
//!
//! This module converges resources toward their declared state: the
//! per-kind capability trait, the name-based locator, the generic
//! reconciler and the whole-manifest runner built on it.

mod apply;
mod engine;
mod kind;
mod locator;
mod outcome;

#[cfg(test)]
mod testing;

pub use apply::{AppliedResource, ApplyReport, ManifestRunner};
pub use engine::Reconciler;
pub use kind::{DesiredResource, ObservedResource, Page, ResourceApi};
pub use locator::{ResourceLocator, name_filter};
pub use outcome::ReconcileOutcome;
