//! Environment-layered settings.
//!
//! Resolution runs once at startup, in this order:
//! 1. **Bindings** - process environment, layered over an optional `.env` file
//! 2. **Base** - every setting with its default, parameterized by bindings
//! 3. **Profile overlay** - `development` or `production`, an ordered list of
//!    assign/merge operations applied to a private copy of the base
//! 4. **Validation** - inter-key consistency checks, then the route table,
//!    periodic jobs, task routes and error-reporting plan are built from the
//!    result
//!
//! The result is an immutable [`Settings`] shared through `Arc`.
//!
//! ## Merge Strategy
//! - `Assign` replaces one key (or adds it to an existing map)
//! - `Merge` sets the named sub-keys of a composite key, keeping the others
//! - Arrays are replaced, never concatenated
//!
//! ## Profile Selection
//! - `PRIMEPASS_SETTINGS` - `development` or `production`
//!   (`primepass.settings.<name>` is accepted too)
//! - No selector is an error; there is no default profile

mod base;
mod development;
mod env;
mod loader;
mod merge;
mod production;
mod profile;
mod types;
mod validate;

pub use base::{DEFAULT_REDIS_URL, DEFAULT_SECRET_KEY, base_settings};
pub use env::Bindings;
pub use loader::{ResolvedSettings, SettingsLoader, resolve};
pub use merge::{OverlayOp, apply_overlay};
pub use profile::{PROFILE_ENV, Profile, ResolveOptions, select_profile};
pub use types::*;
pub use validate::validate;
