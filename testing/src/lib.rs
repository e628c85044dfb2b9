//! Shared test fixtures for the staticconf workspace.
//!
//! - [`MockConfiguration`]: scoped override of one namespace, restored when
//!   the guard drops (also while unwinding from a failed assertion)
//! - [`RegistryGuard`]: snapshot of a whole registry, restored on drop
//! - [`ConfigFile`]: a temporary configuration file that can be rewritten
//! - [`unique_namespace`]: collision-free namespace names for parallel tests

mod fixtures;
mod mock;

pub use fixtures::*;
pub use mock::MockConfiguration;
