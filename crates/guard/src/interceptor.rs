//! Enforcement of the access policy at guarded operations.

use crate::canonical;
use crate::context::{self, BoundaryGuard, CallChain, CheckGuard, OriginResolver, ThreadContext};
use crate::error::{Error, Result, Violation};
use crate::fs::Fs;
use crate::net::Net;
use crate::registry::{Family, Operation};
use policy::{Policy, PolicyEngine, Resource};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One argument of an intercepted call, as seen by the interceptor.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Str(&'a str),
    Path(&'a Path),
    Socket(SocketAddr),
    /// Unresolved host name and port.
    Host(&'a str, u16),
    /// Anything that cannot name a resource (buffers, flags, options).
    Other,
}

impl Arg<'_> {
    fn names_resource(&self, family: Family) -> bool {
        match (family, self) {
            (Family::Filesystem, Arg::Str(_) | Arg::Path(_)) => true,
            (Family::Socket, Arg::Socket(_) | Arg::Host(..) | Arg::Path(_)) => true,
            _ => false,
        }
    }

    fn to_resource(self) -> Result<Option<Resource>> {
        Ok(match self {
            Arg::Str(s) => Some(canonical::path_resource(Path::new(s))?),
            Arg::Path(p) => Some(canonical::path_resource(p)?),
            Arg::Socket(addr) => Some(Resource::from(addr)),
            Arg::Host(host, port) => Some(Resource::endpoint(host, port)),
            Arg::Other => None,
        })
    }
}

/// How an intercepted call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No policy installed.
    Disabled,
    /// The operation name is not in the registry.
    Unguarded,
    /// No argument names a resource; the call was not checked.
    Unresolvable,
    /// Every origin in the chain holds every required permission.
    Allowed,
}

/// Checks guarded operations against the installed policy.
///
/// Cloning is cheap; clones share the policy engine and resolver.
#[derive(Clone)]
pub struct Interceptor {
    engine: PolicyEngine,
    resolver: Arc<dyn OriginResolver>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Interceptor {
    /// Interceptor resolving chains from the thread-local context.
    pub fn new(engine: PolicyEngine) -> Self {
        Self::with_resolver(engine, ThreadContext)
    }

    pub fn with_resolver(engine: PolicyEngine, resolver: impl OriginResolver + 'static) -> Self {
        Self {
            engine,
            resolver: Arc::new(resolver),
        }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Mark a trust boundary on the current thread. Chains resolved while
    /// the guard is alive exclude every frame entered before it.
    ///
    /// Only host code may call this: anything running inside the boundary
    /// is judged without the origins that called it.
    pub fn trust_boundary(&self) -> BoundaryGuard {
        context::boundary()
    }

    /// Guarded filesystem primitives.
    pub fn fs(&self) -> Fs<'_> {
        Fs::new(self)
    }

    /// Guarded socket primitives.
    pub fn net(&self) -> Net<'_> {
        Net::new(self)
    }

    /// Intercept a call by operation name. Unknown names pass through.
    pub fn intercept_named(&self, name: &str, args: &[Arg<'_>]) -> Result<Verdict> {
        match Operation::from_name(name) {
            Some(operation) => self.intercept(operation, args),
            None => {
                trace!(operation = name, "operation not guarded");
                Ok(Verdict::Unguarded)
            }
        }
    }

    /// Check `operation` before it runs.
    ///
    /// The resource is the first argument that can name one for the
    /// operation's family. Returns `Err(Error::AccessDenied)` if any origin
    /// in the chain lacks any required permission; the caller must then
    /// not perform the operation.
    pub fn intercept(&self, operation: Operation, args: &[Arg<'_>]) -> Result<Verdict> {
        // One snapshot per call: the whole chain is judged by one policy.
        let policy = self.engine.current();

        // A check started while another is running on this thread (from
        // inside a resolver, say) belongs to the interceptor itself.
        let check = CheckGuard::begin();
        let chain = policy.as_ref().map(|_| {
            if check.is_nested() {
                CallChain::default()
            } else {
                self.resolver.resolve()
            }
        });

        // Guarded operations reached from here on belong to the interceptor
        // itself and resolve to an empty chain.
        let _boundary = context::boundary();

        let family = operation.family();
        debug!(operation = %operation, family = %family, "guarded operation intercepted");

        let (Some(policy), Some(chain)) = (policy, chain) else {
            trace!(operation = %operation, "no access policy installed, skipping check");
            return Ok(Verdict::Disabled);
        };

        let Some(index) = args.iter().position(|a| a.names_resource(family)) else {
            debug!(operation = %operation, "no resource argument, skipping check");
            return Ok(Verdict::Unresolvable);
        };

        let unchecked = args[index + 1..]
            .iter()
            .filter(|a| a.names_resource(family))
            .count();
        if unchecked > 0 {
            warn!(
                operation = %operation,
                unchecked,
                "only the first resource argument is checked"
            );
        }

        let Some(resource) = args[index].to_resource()? else {
            return Ok(Verdict::Unresolvable);
        };

        check_chain(&policy, &chain, operation, &resource)?;
        Ok(Verdict::Allowed)
    }
}

/// Every origin must hold every permission; the first gap denies.
fn check_chain(
    policy: &Policy,
    chain: &CallChain,
    operation: Operation,
    resource: &Resource,
) -> Result<()> {
    for origin in chain {
        for &permission in operation.required() {
            if !policy.implies(origin, resource, permission) {
                warn!(
                    operation = %operation,
                    resource = %resource,
                    permission = %permission,
                    origin = %origin,
                    "access denied"
                );
                return Err(Error::AccessDenied(Violation {
                    kind: operation.access_kind(),
                    operation,
                    resource: resource.clone(),
                    permission,
                    origin: origin.clone(),
                }));
            }
        }
    }
    Ok(())
}
