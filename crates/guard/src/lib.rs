//! Call-chain access control for filesystem and socket operations.
//!
//! Code running on behalf of an extension tags itself with an
//! [`Origin`](policy::Origin) via [`context::enter`]. Every guarded
//! primitive ([`Fs`], [`Net`]) asks the [`Interceptor`] first; the
//! interceptor resolves the chain of origins on the current thread and
//! requires *every* origin in it to hold the permissions the operation
//! needs. One unauthorized origin anywhere in the chain denies the call,
//! so trusted helper code cannot be used as a proxy by untrusted callers.
//!
//! With no policy installed in the [`PolicyEngine`](policy::PolicyEngine)
//! every operation proceeds unchecked.
//!
//! # Example
//!
//! ```no_run
//! use guard::{Interceptor, context};
//! use policy::{Permission, Policy, PolicyEngine};
//!
//! let engine = PolicyEngine::new();
//! engine.install(Policy::new().grant("plugin-a", "/tmp/*", Permission::Write)?);
//! let interceptor = Interceptor::new(engine);
//!
//! let _origin = context::enter("plugin-a");
//! interceptor.fs().write("/tmp/a.txt", "hello")?;
//!
//! let _helper = context::enter("plugin-b");
//! let err = interceptor.fs().write("/tmp/a.txt", "hello").unwrap_err();
//! assert!(err.is_access_denied());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Coverage
//!
//! Only the operations in [`Operation`] are guarded, and only when routed
//! through these wrappers or [`Interceptor::intercept`]. Callers that reach
//! `std::fs` or `std::net` directly are not checked.

pub mod canonical;
pub mod context;
mod error;
pub mod fs;
mod interceptor;
pub mod net;
mod registry;

pub use context::{CallChain, OriginResolver, StaticResolver, ThreadContext};
pub use error::{Error, Result, Violation};
pub use fs::Fs;
pub use interceptor::{Arg, Interceptor, Verdict};
pub use net::Net;
pub use registry::{AccessKind, Family, Operation};
