//! Hot-swappable policy handle.

use crate::{Decision, Origin, Permission, Policy, Resource};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::info;

/// Shared handle to the policy currently in force.
///
/// Clones share the same cell. Reads are lock-free; [`install`] and
/// [`unset`] replace the whole policy with one atomic pointer store, so a
/// reader sees either the old policy or the new one, never a mix.
///
/// [`install`]: PolicyEngine::install
/// [`unset`]: PolicyEngine::unset
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    current: Arc<ArcSwapOption<Policy>>,
}

impl PolicyEngine {
    /// Create an engine with no policy: enforcement is disabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: Policy) -> Self {
        let engine = Self::new();
        engine.install(policy);
        engine
    }

    /// Install or replace the policy.
    pub fn install(&self, policy: Policy) {
        let grants = policy.len();
        self.current.store(Some(Arc::new(policy)));
        info!(grants, "access policy installed");
    }

    /// Remove the policy, disabling enforcement.
    pub fn unset(&self) {
        self.current.store(None);
        info!("access policy unset, enforcement disabled");
    }

    /// Snapshot of the policy in force, if any.
    pub fn current(&self) -> Option<Arc<Policy>> {
        self.current.load_full()
    }

    pub fn is_enabled(&self) -> bool {
        self.current.load().is_some()
    }

    /// Evaluate one origin against the current policy.
    ///
    /// With no policy installed everything is allowed.
    pub fn evaluate(
        &self,
        origin: &Origin,
        resource: &Resource,
        permission: Permission,
    ) -> Decision {
        let guard = self.current.load();
        match &*guard {
            Some(policy) => policy.check(origin, resource, permission),
            None => Decision::Allow,
        }
    }
}
