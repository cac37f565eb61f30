//! Behavior rules applied to intercepted calls.
//!
//! A [`FakeRule`] decides whether it applies to a call and, when selected, produces the
//! call's outcome. Every rule on a manager is wrapped in a [`CallRuleMetadata`] that
//! counts how often the rule was applied; a rule with a call limit is skipped once the
//! limit is reached but stays in the chain.
//!
//! # Built-in Rules
//!
//! | Rule | Position | Applies to |
//! |------|----------|------------|
//! | [`EventRule`] | pre | `add_X`/`remove_X` event accessors |
//! | [`ObjectMemberRule`] | post | `Equals`, `GetHashCode`, `ToString` |
//! | [`AutoFakePropertyRule`] | post | property getters without stored state |
//! | [`PropertySetterRule`] | post | property setters without stored state |
//! | [`DefaultReturnValueRule`] | post | every call (innermost fallback) |
//! | [`PropertyBehaviorRule`] | user | getter/setter of one property, synthesized |
//! | [`StrictFakeRule`] | user | every non-`Object` call of a strict fake |
//! | [`WrappedObjectRule`] | user | every call of a wrapping fake |
//!
//! User configured rules live in [`crate::configuration`].

mod default_value;
mod event;
mod object_member;
mod property;
mod strict;
mod wrapped;

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub(crate) use default_value::default_value;
pub use default_value::DefaultReturnValueRule;
pub use event::EventRule;
pub use object_member::ObjectMemberRule;
pub use property::{AutoFakePropertyRule, PropertyBehaviorRule, PropertySetterRule};
pub use strict::StrictFakeRule;
pub use wrapped::WrappedObjectRule;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    Result,
};

/// A behavior that can be applied to calls on a fake.
///
/// # Thread Safety
///
/// Rules are shared between the manager and the scope that registered them and must be
/// `Send + Sync`. Rules with state use interior mutability.
pub trait FakeRule: Send + Sync {
    /// Returns true if the rule wants to handle `call`
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool;

    /// Produces the outcome of `call`
    ///
    /// # Errors
    ///
    /// Errors propagate to the caller of the faked member; the call is still recorded.
    fn apply(&self, call: &mut InterceptedCall) -> Result<()>;

    /// How often the rule may be applied, `None` for unlimited
    fn number_of_times_to_call(&self) -> Option<usize> {
        None
    }

    /// Short description for logs
    fn description(&self) -> String;
}

/// A rule registered on a manager, together with its invocation counter
pub struct CallRuleMetadata {
    rule: Arc<dyn FakeRule>,
    called_number_of_times: AtomicUsize,
}

impl CallRuleMetadata {
    /// Wraps `rule` with a fresh counter
    pub fn new(rule: Arc<dyn FakeRule>) -> Arc<Self> {
        Arc::new(CallRuleMetadata {
            rule,
            called_number_of_times: AtomicUsize::new(0),
        })
    }

    /// The wrapped rule
    #[must_use]
    pub fn rule(&self) -> &Arc<dyn FakeRule> {
        &self.rule
    }

    /// How often the rule has been applied
    #[must_use]
    pub fn called_number_of_times(&self) -> usize {
        self.called_number_of_times.load(Ordering::Acquire)
    }

    /// Counts one application
    pub fn record_call(&self) {
        self.called_number_of_times.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns true while the rule has not reached its call limit
    #[must_use]
    pub fn has_not_been_called_specified_number_of_times(&self) -> bool {
        match self.rule.number_of_times_to_call() {
            Some(limit) => self.called_number_of_times() < limit,
            None => true,
        }
    }

    /// Returns true if this metadata wraps the rule at `rule`
    #[must_use]
    pub fn wraps<R: ?Sized>(&self, rule: *const R) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.rule), rule)
    }
}

impl fmt::Debug for CallRuleMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRuleMetadata")
            .field("rule", &self.rule.description())
            .field("called", &self.called_number_of_times())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LimitedRule(Option<usize>);

    impl FakeRule for LimitedRule {
        fn is_applicable_to(&self, _call: &dyn FakeObjectCall) -> bool {
            true
        }

        fn apply(&self, _call: &mut InterceptedCall) -> Result<()> {
            Ok(())
        }

        fn number_of_times_to_call(&self) -> Option<usize> {
            self.0
        }

        fn description(&self) -> String {
            "limited".to_string()
        }
    }

    #[test]
    fn test_limited_rule_exhausts() {
        let metadata = CallRuleMetadata::new(Arc::new(LimitedRule(Some(2))));
        assert!(metadata.has_not_been_called_specified_number_of_times());
        metadata.record_call();
        assert!(metadata.has_not_been_called_specified_number_of_times());
        metadata.record_call();
        assert!(!metadata.has_not_been_called_specified_number_of_times());
        assert_eq!(metadata.called_number_of_times(), 2);
    }

    #[test]
    fn test_unlimited_rule_never_exhausts() {
        let metadata = CallRuleMetadata::new(Arc::new(LimitedRule(None)));
        for _ in 0..100 {
            metadata.record_call();
        }
        assert!(metadata.has_not_been_called_specified_number_of_times());
    }

    #[test]
    fn test_wraps_identity() {
        let rule: Arc<dyn FakeRule> = Arc::new(LimitedRule(None));
        let metadata = CallRuleMetadata::new(rule.clone());
        let other: Arc<dyn FakeRule> = Arc::new(LimitedRule(None));
        assert!(metadata.wraps(Arc::as_ptr(&rule)));
        assert!(!metadata.wraps(Arc::as_ptr(&other)));
    }
}
