//! Access policy model and engine.
//!
//! A [`Policy`] is a set of [`Grant`]s, each giving one [`Origin`] (or every
//! origin) one [`Permission`] on the resources a [`ResourceMatcher`]
//! selects. Anything not granted is denied.
//!
//! The [`PolicyEngine`] holds the policy in force behind a lock-free,
//! atomically swappable cell. No policy installed means enforcement is
//! disabled and every query is allowed.
//!
//! # Example
//!
//! ```
//! use policy::{Origin, Permission, Policy, PolicyEngine, Resource};
//!
//! let engine = PolicyEngine::new();
//! engine.install(Policy::new().grant("plugin-a", "/tmp/*", Permission::Write)?);
//!
//! let target = Resource::path("/tmp/a.txt")?;
//! assert!(engine.evaluate(&Origin::new("plugin-a"), &target, Permission::Write).is_allowed());
//! assert!(!engine.evaluate(&Origin::new("plugin-b"), &target, Permission::Write).is_allowed());
//! # Ok::<(), policy::Error>(())
//! ```

mod engine;
mod error;
mod origin;
mod permission;
mod policy;
pub mod resource;

pub use engine::PolicyEngine;
pub use error::{Error, Result};
pub use origin::{Origin, OriginMatcher};
pub use permission::Permission;
pub use policy::{Decision, Grant, GrantEntry, Policy, PolicyFile};
pub use resource::{Endpoint, Resource, ResourceMatcher};
