//! Nested scopes bounding call visibility and rule lifetime.
//!
//! Scopes form a per-thread stack. While a scope is current, rules configured through it
//! are registered on the target manager and remembered by the scope; closing the scope
//! removes exactly those rules again. Every recorded call is appended to the manager's
//! history and to every open scope, so a scope sees the calls made while it (or any scope
//! nested inside it) was current.
//!
//! The root of every thread's stack is implicit and never closed. It registers no rules
//! for cleanup and answers call queries with the manager's complete history.
//!
//! # Examples
//!
//! ```rust
//! use dotfake::scope::FakeScope;
//!
//! assert!(FakeScope::is_root());
//! {
//!     let _scope = FakeScope::create();
//!     assert_eq!(FakeScope::depth(), 1);
//! }
//! assert!(FakeScope::is_root());
//! ```

use std::{
    cell::RefCell,
    collections::HashMap,
    marker::PhantomData,
    rc::Rc,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::{
    call::CompletedCall,
    dummy::{FakeObjectContainer, NullFakeObjectContainer},
    manager::FakeManager,
    rules::{CallRuleMetadata, FakeRule},
};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

struct ScopeFrame {
    id: u64,
    container: Arc<dyn FakeObjectContainer>,
    calls: Vec<Arc<CompletedCall>>,
    calls_by_manager: HashMap<u64, Vec<Arc<CompletedCall>>>,
    rules: Vec<(Arc<FakeManager>, Arc<CallRuleMetadata>)>,
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeFrame>> = const { RefCell::new(Vec::new()) };
}

/// Entry point to the current thread's scope stack
pub struct FakeScope;

impl FakeScope {
    /// Opens a child of the current scope without a container of its own
    #[must_use = "the scope closes when the guard is dropped"]
    pub fn create() -> FakeScopeGuard {
        Self::create_with_container(Arc::new(NullFakeObjectContainer))
    }

    /// Opens a child of the current scope resolving dummies through `container` first
    #[must_use = "the scope closes when the guard is dropped"]
    pub fn create_with_container(container: Arc<dyn FakeObjectContainer>) -> FakeScopeGuard {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        let depth = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            scopes.push(ScopeFrame {
                id,
                container,
                calls: Vec::new(),
                calls_by_manager: HashMap::new(),
                rules: Vec::new(),
            });
            scopes.len()
        });
        debug!(scope = id, depth, "opened scope");

        FakeScopeGuard {
            id,
            _not_send: PhantomData,
        }
    }

    /// Returns true while no scope is open on this thread
    #[must_use]
    pub fn is_root() -> bool {
        Self::depth() == 0
    }

    /// Number of open scopes on this thread
    #[must_use]
    pub fn depth() -> usize {
        SCOPES.with(|scopes| scopes.borrow().len())
    }

    /// Containers of the open scopes, innermost first
    #[must_use]
    pub fn containers() -> Vec<Arc<dyn FakeObjectContainer>> {
        SCOPES.with(|scopes| {
            scopes
                .borrow()
                .iter()
                .rev()
                .map(|frame| frame.container.clone())
                .collect()
        })
    }

    /// Adds `rule` in front of the user rules of `manager`, removed again when the current
    /// scope closes
    pub fn add_rule_first(
        manager: &Arc<FakeManager>,
        rule: Arc<dyn FakeRule>,
    ) -> Arc<CallRuleMetadata> {
        let metadata = manager.add_rule_first(rule);
        Self::track_rule(manager, &metadata);
        metadata
    }

    /// Adds `rule` behind the user rules of `manager`, removed again when the current
    /// scope closes
    pub fn add_rule_last(
        manager: &Arc<FakeManager>,
        rule: Arc<dyn FakeRule>,
    ) -> Arc<CallRuleMetadata> {
        let metadata = manager.add_rule_last(rule);
        Self::track_rule(manager, &metadata);
        metadata
    }

    fn track_rule(manager: &Arc<FakeManager>, metadata: &Arc<CallRuleMetadata>) {
        SCOPES.with(|scopes| {
            if let Some(frame) = scopes.borrow_mut().last_mut() {
                frame.rules.push((manager.clone(), metadata.clone()));
            }
        });
    }

    /// Records `call` on `manager` and in every open scope
    pub fn add_intercepted_call(manager: &FakeManager, call: Arc<CompletedCall>) {
        manager.record(call.clone());
        SCOPES.with(|scopes| {
            for frame in scopes.borrow_mut().iter_mut() {
                frame.calls.push(call.clone());
                frame
                    .calls_by_manager
                    .entry(manager.id())
                    .or_default()
                    .push(call.clone());
            }
        });
    }

    /// The calls of `manager` visible from the current scope.
    ///
    /// Inside a scope these are the calls made while the scope was open; at the root it is
    /// the manager's complete history.
    #[must_use]
    pub fn calls_within_current_scope(manager: &FakeManager) -> Vec<Arc<CompletedCall>> {
        let scoped = SCOPES.with(|scopes| {
            scopes.borrow().last().map(|frame| {
                frame
                    .calls_by_manager
                    .get(&manager.id())
                    .cloned()
                    .unwrap_or_default()
            })
        });
        scoped.unwrap_or_else(|| manager.recorded_calls())
    }

    /// Every call recorded while the current scope was open, across all fakes
    ///
    /// The root keeps no flat call list and returns an empty list.
    #[must_use]
    pub fn all_calls() -> Vec<Arc<CompletedCall>> {
        SCOPES.with(|scopes| {
            scopes
                .borrow()
                .last()
                .map(|frame| frame.calls.clone())
                .unwrap_or_default()
        })
    }
}

/// Closes its scope when dropped.
///
/// Scopes are thread-local, the guard can not be sent to another thread.
pub struct FakeScopeGuard {
    id: u64,
    _not_send: PhantomData<Rc<()>>,
}

impl FakeScopeGuard {
    /// Identity of the scope
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Starts ordered assertions over the calls of this scope
    ///
    /// See [`crate::assertion::OrderedAssertions`].
    #[must_use = "ordered assertions end when the guard is dropped"]
    pub fn ordered_assertions(
        &self,
        max_rendered_calls: usize,
    ) -> crate::assertion::OrderedAssertions {
        crate::assertion::OrderedAssertions::begin(max_rendered_calls)
    }
}

impl Drop for FakeScopeGuard {
    fn drop(&mut self) {
        let frame = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            if scopes.last().is_some_and(|frame| frame.id == self.id) {
                scopes.pop()
            } else {
                None
            }
        });

        let Some(frame) = frame else {
            debug!(scope = self.id, "scope closed out of order");
            return;
        };

        // Rules may already be gone when the configuration was cleared or the rule was
        // consumed by an assertion
        let mut removed = 0usize;
        for (manager, rule) in &frame.rules {
            if manager.remove_rule(rule).is_ok() {
                removed += 1;
            }
        }
        debug!(scope = self.id, calls = frame.calls.len(), removed, "closed scope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        call::InterceptedCall,
        test::{factories::sample_types, fake_of, FixedRule},
        value::Value,
        Result,
    };

    #[test]
    fn test_closing_scope_removes_only_its_rules() {
        let types = sample_types();
        let (_fake, manager) = fake_of(&types.foo);

        let outer =
            FakeScope::add_rule_first(&manager, Arc::new(FixedRule::new(Value::I4(1), None)));
        {
            let _scope = FakeScope::create();
            FakeScope::add_rule_first(&manager, Arc::new(FixedRule::new(Value::I4(2), None)));
            FakeScope::add_rule_last(&manager, Arc::new(FixedRule::new(Value::I4(3), None)));
            assert_eq!(manager.user_rules().len(), 3);
        }

        let remaining = manager.user_rules();
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &outer));
    }

    #[test]
    fn test_calls_are_visible_per_scope() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        let baz = types.foo.find_methods("Baz").pop().unwrap();
        let invoke = || -> Result<()> {
            let mut call = InterceptedCall::new(&baz, &fake, args![])?;
            manager.intercept(&mut call)
        };

        invoke()?;
        {
            let _outer = FakeScope::create();
            invoke()?;
            {
                let _inner = FakeScope::create();
                invoke()?;
                assert_eq!(FakeScope::calls_within_current_scope(&manager).len(), 1);
                assert_eq!(FakeScope::all_calls().len(), 1);
            }
            assert_eq!(FakeScope::calls_within_current_scope(&manager).len(), 2);
        }
        assert_eq!(FakeScope::calls_within_current_scope(&manager).len(), 3);
        assert!(FakeScope::all_calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_closing_tolerates_removed_rules() {
        let types = sample_types();
        let (_fake, manager) = fake_of(&types.foo);
        {
            let _scope = FakeScope::create();
            FakeScope::add_rule_first(&manager, Arc::new(FixedRule::new(Value::I4(2), None)));
            manager.clear_user_rules();
        }
        assert!(manager.user_rules().is_empty());
        assert!(FakeScope::is_root());
    }

    #[test]
    fn test_root_rules_are_not_tracked() {
        let types = sample_types();
        let (_fake, manager) = fake_of(&types.foo);
        FakeScope::add_rule_first(&manager, Arc::new(FixedRule::new(Value::I4(2), None)));
        {
            let _scope = FakeScope::create();
        }
        assert_eq!(manager.user_rules().len(), 1);
    }
}
