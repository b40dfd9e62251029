//! Per-thread execution context and origin resolution.
//!
//! Code announces which origin it is running as with [`enter`]; the
//! returned guard restores the previous context when dropped. Nesting
//! `enter` calls builds the stack that [`resolve`] turns into a
//! [`CallChain`], innermost origin first, stopping at the nearest trust
//! boundary or the bottom of the stack.
//!
//! Boundaries cut every frame beneath them out of the chain, so only host
//! code may create one, through [`Interceptor::trust_boundary`].
//!
//! [`Interceptor::trust_boundary`]: crate::Interceptor::trust_boundary

use policy::Origin;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

enum Frame {
    Origin(Origin),
    Boundary,
}

thread_local! {
    // Each frame is tagged with the id of the scope that pushed it.
    static FRAMES: RefCell<Vec<(u64, Frame)>> = const { RefCell::new(Vec::new()) };
    static NEXT_SCOPE: Cell<u64> = const { Cell::new(0) };
    static INTERCEPTING: Cell<bool> = const { Cell::new(false) };
}

/// Ordered origins responsible for a call, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallChain(Vec<Origin>);

impl CallChain {
    /// Build a chain from origins listed innermost first.
    pub fn new(origins: impl IntoIterator<Item = Origin>) -> Self {
        Self(origins.into_iter().collect())
    }

    pub fn origins(&self) -> &[Origin] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Origin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn innermost(&self) -> Option<&Origin> {
        self.0.first()
    }

    pub fn outermost(&self) -> Option<&Origin> {
        self.0.last()
    }
}

impl<'a> IntoIterator for &'a CallChain {
    type Item = &'a Origin;
    type IntoIter = std::slice::Iter<'a, Origin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Source of call chains for the interceptor.
pub trait OriginResolver: Send + Sync {
    /// The chain for the call being intercepted on the current thread.
    fn resolve(&self) -> CallChain;
}

/// Resolves chains from the thread-local context built by [`enter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

impl OriginResolver for ThreadContext {
    fn resolve(&self) -> CallChain {
        resolve()
    }
}

/// Always returns the same chain.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver(CallChain);

impl StaticResolver {
    pub fn new(chain: CallChain) -> Self {
        Self(chain)
    }
}

impl OriginResolver for StaticResolver {
    fn resolve(&self) -> CallChain {
        self.0.clone()
    }
}

/// Removes the frames it pushed, and only those, on drop.
///
/// Guards may be dropped in any order; a guard outliving the one entered
/// before it keeps its origin on the stack.
struct Scope {
    id: u64,
    // Frames live on one thread's stack; the guard must stay there too.
    _not_send: PhantomData<*const ()>,
}

impl Scope {
    fn push(frames: impl IntoIterator<Item = Frame>) -> Self {
        let id = NEXT_SCOPE.with(|next| {
            let id = next.get();
            next.set(id.wrapping_add(1));
            id
        });
        FRAMES.with(|f| f.borrow_mut().extend(frames.into_iter().map(|frame| (id, frame))));
        Self {
            id,
            _not_send: PhantomData,
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // The thread-local may already be gone during thread teardown.
        let _ = FRAMES.try_with(|f| f.borrow_mut().retain(|(id, _)| *id != self.id));
    }
}

/// Marks the current thread as inside an interceptor check until dropped.
pub(crate) struct CheckGuard {
    nested: bool,
    _not_send: PhantomData<*const ()>,
}

impl CheckGuard {
    pub(crate) fn begin() -> Self {
        let nested = INTERCEPTING.with(|flag| flag.replace(true));
        Self {
            nested,
            _not_send: PhantomData,
        }
    }

    /// Whether another check was already running on this thread.
    pub(crate) fn is_nested(&self) -> bool {
        self.nested
    }
}

impl Drop for CheckGuard {
    fn drop(&mut self) {
        let _ = INTERCEPTING.try_with(|flag| flag.set(self.nested));
    }
}

/// Guard returned by [`enter`].
#[must_use = "the origin is only in effect while the guard is alive"]
pub struct OriginGuard {
    _scope: Scope,
}

/// Guard returned by [`Interceptor::trust_boundary`].
///
/// [`Interceptor::trust_boundary`]: crate::Interceptor::trust_boundary
#[must_use = "the boundary is only in effect while the guard is alive"]
pub struct BoundaryGuard {
    _scope: Scope,
}

/// Guard returned by [`ContextSnapshot::attach`].
#[must_use = "the attached chain is only in effect while the guard is alive"]
pub struct AttachGuard {
    _scope: Scope,
}

/// Run as `origin` until the guard is dropped.
pub fn enter(origin: impl Into<Origin>) -> OriginGuard {
    OriginGuard {
        _scope: Scope::push([Frame::Origin(origin.into())]),
    }
}

/// Mark a trust boundary. Chains resolved while the guard is alive stop
/// here and never include frames entered before it.
pub(crate) fn boundary() -> BoundaryGuard {
    BoundaryGuard {
        _scope: Scope::push([Frame::Boundary]),
    }
}

/// Walk the current thread's context, innermost origin first.
///
/// Re-entering the origin already on top adds nothing to the chain.
pub fn resolve() -> CallChain {
    FRAMES.with(|f| {
        let frames = f.borrow();
        let mut chain: Vec<Origin> = Vec::new();
        for (_, frame) in frames.iter().rev() {
            match frame {
                Frame::Boundary => break,
                Frame::Origin(origin) => {
                    if chain.last() != Some(origin) {
                        chain.push(origin.clone());
                    }
                }
            }
        }
        CallChain(chain)
    })
}

/// The current chain, in a form that can cross threads.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    chain: CallChain,
}

/// Capture the current thread's chain.
pub fn snapshot() -> ContextSnapshot {
    ContextSnapshot { chain: resolve() }
}

impl ContextSnapshot {
    pub fn chain(&self) -> &CallChain {
        &self.chain
    }

    /// Replay the captured origins on the current thread, on top of
    /// whatever that thread is already running as.
    pub fn attach(&self) -> AttachGuard {
        let frames = self.chain.iter().rev().cloned().map(Frame::Origin);
        AttachGuard {
            _scope: Scope::push(frames),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn names(chain: &CallChain) -> Vec<&str> {
        chain.iter().map(Origin::as_str).collect()
    }

    #[test]
    fn test_empty_context() {
        assert!(resolve().is_empty());
    }

    #[test]
    fn test_nested_origins_innermost_first() {
        let _c = enter("c");
        let _b = enter("b");
        let _a = enter("a");
        let chain = resolve();
        assert_eq!(names(&chain), ["a", "b", "c"]);
        assert_eq!(chain.innermost().map(Origin::as_str), Some("a"));
        assert_eq!(chain.outermost().map(Origin::as_str), Some("c"));
    }

    #[test]
    fn test_guard_drop_restores_context() {
        let _outer = enter("outer");
        {
            let _inner = enter("inner");
            assert_eq!(names(&resolve()), ["inner", "outer"]);
        }
        assert_eq!(names(&resolve()), ["outer"]);
    }

    #[test]
    fn test_out_of_order_drop_keeps_live_origins() {
        let outer = enter("outer");
        let inner = enter("inner");
        drop(outer);
        assert_eq!(names(&resolve()), ["inner"]);
        drop(inner);
        assert!(resolve().is_empty());
    }

    #[test]
    fn test_guard_held_in_struct_outlives_caller_scope() {
        struct Extension {
            _origin: OriginGuard,
        }

        let host = enter("host");
        let ext = Extension {
            _origin: enter("plugin"),
        };
        drop(host);
        let _helper = enter("helper");
        assert_eq!(names(&resolve()), ["helper", "plugin"]);
        drop(ext);
        assert_eq!(names(&resolve()), ["helper"]);
    }

    #[test]
    fn test_out_of_order_boundary_drop() {
        let _host = enter("host");
        let boundary = boundary();
        let _plugin = enter("plugin");
        drop(boundary);
        assert_eq!(names(&resolve()), ["plugin", "host"]);
    }

    #[test]
    fn test_check_guard_nesting() {
        let outer = CheckGuard::begin();
        assert!(!outer.is_nested());
        {
            let inner = CheckGuard::begin();
            assert!(inner.is_nested());
        }
        assert!(CheckGuard::begin().is_nested());
        drop(outer);
        assert!(!CheckGuard::begin().is_nested());
    }

    #[test]
    fn test_boundary_stops_walk() {
        let _host = enter("host");
        let _boundary = boundary();
        let _plugin = enter("plugin");
        assert_eq!(names(&resolve()), ["plugin"]);
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let _a1 = enter("a");
        let _a2 = enter("a");
        let _b = enter("b");
        let _a3 = enter("a");
        assert_eq!(names(&resolve()), ["a", "b", "a"]);
    }

    #[test]
    fn test_context_is_per_thread() {
        let _a = enter("a");
        let other = thread::spawn(|| resolve().len()).join().unwrap();
        assert_eq!(other, 0);
    }

    #[test]
    fn test_snapshot_attach_on_other_thread() {
        let _c = enter("c");
        let _a = enter("a");
        let snapshot = snapshot();

        let chain = thread::spawn(move || {
            let _worker = enter("worker");
            let _attached = snapshot.attach();
            resolve()
        })
        .join()
        .unwrap();

        assert_eq!(names(&chain), ["a", "c", "worker"]);
    }

    #[test]
    fn test_static_resolver() {
        let chain = CallChain::new([Origin::new("x"), Origin::new("y")]);
        let resolver = StaticResolver::new(chain.clone());
        assert_eq!(resolver.resolve(), chain);
    }
}
