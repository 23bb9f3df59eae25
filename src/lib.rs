// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Compute Converge
//!
//! Idempotent convergence of Yandex Cloud compute disks and instances toward
//! a declared state.
//!
//! ## Overview
//!
//! Each resource in the manifest names a target lifecycle (`present`,
//! `absent`, and for instances also `stopped` or `restarted`). A pass locates
//! the resource by name, decides the single action that moves it toward the
//! target, issues it, and waits for the resulting long-running operation.
//! Running the same manifest twice makes no further changes.
//!
//! ## Architecture
//!
//! 1. **Desired State**: Declared in `converge.yaml`
//! 2. **Observed State**: Located by name through the compute API
//! 3. **Reconciler**: Plans one action per resource and waits for it to finish
//!
//! ## Modules
//!
//! - [`config`]: Manifest parsing, credentials and validation
//! - [`cloud`]: Retrying API client, resource services and the operation waiter
//! - [`planner`]: Action planning and the disk diff
//! - [`reconciler`]: Locator, state machine and manifest runner
//! - [`error`]: Error hierarchy
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! defaults:
//!   folder_id: b1g-folder
//!
//! disks:
//!   - name: boot-1
//!     type_id: network-ssd
//!     zone_id: ru-central1-a
//!     size: 21474836480
//!     image_id: fd8kdq6d0p8sij7h5qe3
//!
//! instances:
//!   - name: web-1
//!     zone_id: ru-central1-a
//!     resources:
//!       memory: 2147483648
//!       cores: 2
//!     boot_disk:
//!       disk_name: boot-1
//!     network_interfaces:
//!       - subnet_id: e9b-subnet
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cloud::{CloudSdk, OperationWaiter, RetryPolicy, WaitPolicy};
pub use config::{ConfigValidator, Credentials, Manifest, ManifestParser};
pub use error::{ConvergeError, Result};
pub use planner::{Action, DiffEngine};
pub use reconciler::{
    ManifestRunner, ReconcileOutcome, Reconciler, ResourceApi, ResourceLocator,
};
