//! The call dispatch engine of a fake.
//!
//! Every fake owns exactly one [`FakeManager`]. The proxy hands each intercepted call to
//! [`FakeManager::intercept`], which walks the rule chain and applies the first rule that
//! wants the call and has not reached its call limit.
//!
//! # Rule Chain
//!
//! The chain is assembled in three parts:
//!
//! 1. **Pre rules** (fixed): [`crate::rules::EventRule`]
//! 2. **User rules** (mutable, most recently added first): configured calls, property
//!    state, strict and wrapping rules
//! 3. **Post rules** (fixed): [`crate::rules::ObjectMemberRule`],
//!    [`crate::rules::AutoFakePropertyRule`], [`crate::rules::PropertySetterRule`] and finally
//!    [`crate::rules::DefaultReturnValueRule`], which applies to every call
//!
//! Because the default rule always applies, selection always terminates with a rule.
//!
//! # Lazy Attachment
//!
//! Proxies carry a [`FakeTag`]; the manager is built by the tag's
//! [`CallProcessorProvider`] on first use, exactly once, even under concurrent first
//! access.

mod listener;
mod tag;

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, RwLock, Weak},
};

use tracing::{debug, trace};

pub use listener::InterceptionListener;
pub use tag::{CallProcessorProvider, FakeManagerProvider, FakeTag};

use crate::{
    call::{describe_call, CompletedCall, InterceptedCall},
    config::FakeConfig,
    dummy::DummyValueResolver,
    rules::{
        AutoFakePropertyRule, CallRuleMetadata, DefaultReturnValueRule, EventRule, FakeRule,
        ObjectMemberRule, PropertySetterRule,
    },
    scope::FakeScope,
    typesystem::{TypeRc, TypeRef},
    value::{Instance, ObjectRef, Value},
    Error, Result,
};

/// Dispatches the calls of one fake through its rule chain and keeps its call history.
///
/// The manager only holds a weak reference to its proxy, so a fake is dropped together
/// with its manager once the test lets go of it.
pub struct FakeManager {
    id: u64,
    fake_type: TypeRc,
    proxy: Weak<Instance>,
    config: FakeConfig,
    resolver: Arc<dyn DummyValueResolver>,
    pre_rules: Vec<Arc<CallRuleMetadata>>,
    user_rules: RwLock<VecDeque<Arc<CallRuleMetadata>>>,
    post_rules: Vec<Arc<CallRuleMetadata>>,
    default_rule: Arc<CallRuleMetadata>,
    recorded: boxcar::Vec<Arc<CompletedCall>>,
    listeners: RwLock<Vec<Arc<dyn InterceptionListener>>>,
}

impl FakeManager {
    /// Creates the manager of `proxy`
    ///
    /// ## Arguments
    /// * 'proxy'       - The fake this manager dispatches for
    /// * 'resolver'    - Produces dummies for unconfigured return values
    /// * 'config'      - Recording and rendering settings
    pub fn new(
        proxy: &ObjectRef,
        resolver: Arc<dyn DummyValueResolver>,
        config: FakeConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<FakeManager>| FakeManager {
            id: proxy.id(),
            fake_type: proxy.type_def().clone(),
            proxy: Arc::downgrade(proxy),
            config,
            pre_rules: vec![CallRuleMetadata::new(Arc::new(EventRule::new()))],
            user_rules: RwLock::new(VecDeque::new()),
            post_rules: vec![
                CallRuleMetadata::new(Arc::new(ObjectMemberRule)),
                CallRuleMetadata::new(Arc::new(AutoFakePropertyRule::new(
                    resolver.clone(),
                    this.clone(),
                ))),
                CallRuleMetadata::new(Arc::new(PropertySetterRule::new(this.clone()))),
            ],
            default_rule: CallRuleMetadata::new(Arc::new(DefaultReturnValueRule::new(
                resolver.clone(),
            ))),
            resolver,
            recorded: boxcar::Vec::new(),
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// Returns the manager of `object`, attaching it on first use
    ///
    /// Returns `None` if `object` is not a fake.
    pub fn of(object: &ObjectRef) -> Option<Arc<FakeManager>> {
        object.fake_tag().map(|tag| tag.manager(object))
    }

    /// Identity of the managed fake, shared with
    /// [`crate::call::FakeObjectCall::faked_object_id`]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The type the fake was created for
    #[must_use]
    pub fn fake_type(&self) -> &TypeRc {
        &self.fake_type
    }

    /// The managed fake, `None` once it was dropped
    #[must_use]
    pub fn object(&self) -> Option<ObjectRef> {
        self.proxy.upgrade()
    }

    /// Settings this manager was created with
    #[must_use]
    pub fn config(&self) -> &FakeConfig {
        &self.config
    }

    /// The value an unconfigured member of type `ty` returns
    pub fn default_value(&self, ty: &TypeRef) -> Value {
        crate::rules::default_value(self.resolver.as_ref(), ty)
    }

    /// The resolver used for unconfigured values
    pub fn resolver(&self) -> &Arc<dyn DummyValueResolver> {
        &self.resolver
    }

    /// Processes one intercepted call.
    ///
    /// Selects the first applicable, non-exhausted rule, counts and applies it. The call is
    /// recorded (unless the rule suppressed recording) even when the rule fails, and the
    /// rule's error is returned afterwards.
    ///
    /// # Errors
    /// Returns whatever the applied rule failed with.
    pub fn intercept(&self, call: &mut InterceptedCall) -> Result<()> {
        let listeners: Vec<Arc<dyn InterceptionListener>> = read_lock!(self.listeners).clone();
        for listener in listeners.iter().rev() {
            listener.on_before_call_intercepted(call);
        }

        let rule = self.select_rule(call);
        rule.record_call();
        let outcome = rule.rule().apply(call);

        let completed = Arc::new(call.as_completed());
        if call.should_record() && self.config.record_calls {
            FakeScope::add_intercepted_call(self, completed.clone());
        }

        for listener in &listeners {
            listener.on_after_call_intercepted(&completed, rule.rule().as_ref());
        }

        trace!(
            fake = self.id,
            call = %describe_call(call),
            rule = %rule.rule().description(),
            failed = outcome.is_err(),
            "intercepted call"
        );
        outcome
    }

    fn select_rule(&self, call: &InterceptedCall) -> Arc<CallRuleMetadata> {
        // Rules may add, move or remove user rules while applying, so they run against a
        // snapshot of the chain
        let user_rules: Vec<Arc<CallRuleMetadata>> =
            read_lock!(self.user_rules).iter().cloned().collect();

        self.pre_rules
            .iter()
            .chain(user_rules.iter())
            .chain(self.post_rules.iter())
            .find(|rule| {
                rule.has_not_been_called_specified_number_of_times()
                    && rule.rule().is_applicable_to(call)
            })
            .cloned()
            .unwrap_or_else(|| self.default_rule.clone())
    }

    /// Adds `rule` in front of all user rules, it takes precedence over every rule
    /// configured earlier
    pub fn add_rule_first(&self, rule: Arc<dyn FakeRule>) -> Arc<CallRuleMetadata> {
        let metadata = CallRuleMetadata::new(rule);
        write_lock!(self.user_rules).push_front(metadata.clone());
        metadata
    }

    /// Adds `rule` behind all user rules
    pub fn add_rule_last(&self, rule: Arc<dyn FakeRule>) -> Arc<CallRuleMetadata> {
        let metadata = CallRuleMetadata::new(rule);
        write_lock!(self.user_rules).push_back(metadata.clone());
        metadata
    }

    /// Moves the user rule wrapping `rule` to the front, keeping its call counter
    pub fn move_rule_to_front<R: ?Sized>(&self, rule: *const R) {
        let mut rules = write_lock!(self.user_rules);
        if let Some(position) = rules.iter().position(|metadata| metadata.wraps(rule)) {
            if let Some(metadata) = rules.remove(position) {
                rules.push_front(metadata);
            }
        }
    }

    /// Removes a user rule
    ///
    /// # Errors
    /// Returns [`Error::RuleNotFound`] if the rule is not registered on this manager.
    pub fn remove_rule(&self, rule: &Arc<CallRuleMetadata>) -> Result<()> {
        let mut rules = write_lock!(self.user_rules);
        let position = rules
            .iter()
            .position(|known| Arc::ptr_eq(known, rule))
            .ok_or(Error::RuleNotFound)?;
        rules.remove(position);
        debug!(fake = self.id, rule = %rule.rule().description(), "removed rule");
        Ok(())
    }

    /// Returns true if `rule` is one of the user rules
    #[must_use]
    pub fn contains_rule(&self, rule: &Arc<CallRuleMetadata>) -> bool {
        read_lock!(self.user_rules)
            .iter()
            .any(|known| Arc::ptr_eq(known, rule))
    }

    /// The user rules, most significant first
    #[must_use]
    pub fn user_rules(&self) -> Vec<Arc<CallRuleMetadata>> {
        read_lock!(self.user_rules).iter().cloned().collect()
    }

    /// Removes every user rule, restoring the unconfigured behavior
    pub fn clear_user_rules(&self) {
        write_lock!(self.user_rules).clear();
        debug!(fake = self.id, "cleared configuration");
    }

    /// Registers a listener notified around every intercepted call
    pub fn add_interception_listener(&self, listener: Arc<dyn InterceptionListener>) {
        write_lock!(self.listeners).push(listener);
    }

    /// Every call recorded on this fake, in call order
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<Arc<CompletedCall>> {
        self.recorded.iter().map(|(_, call)| call.clone()).collect()
    }

    pub(crate) fn record(&self, call: Arc<CompletedCall>) {
        self.recorded.push(call);
    }
}

impl fmt::Debug for FakeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeManager")
            .field("id", &self.id)
            .field("fake_type", &self.fake_type.fullname())
            .field("user_rules", &read_lock!(self.user_rules).len())
            .field("recorded", &self.recorded.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        args,
        call::FakeObjectCall,
        test::{factories::sample_types, fake_of, FixedRule},
    };

    #[test]
    fn test_unconfigured_call_returns_default() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        let get = types.foo.find_methods("Get").pop().unwrap();

        let mut call = InterceptedCall::new(&get, &fake, args![])?;
        manager.intercept(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::I4(0)));
        assert_eq!(manager.recorded_calls().len(), 1);
        Ok(())
    }

    #[test]
    fn test_most_recent_rule_wins_until_exhausted() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        let get = types.foo.find_methods("Get").pop().unwrap();

        manager.add_rule_first(Arc::new(FixedRule::new(Value::I4(1), None)));
        manager.add_rule_first(Arc::new(FixedRule::new(Value::I4(2), Some(1))));

        let mut results = Vec::new();
        for _ in 0..3 {
            let mut call = InterceptedCall::new(&get, &fake, args![])?;
            manager.intercept(&mut call)?;
            results.push(call.return_value().cloned());
        }
        assert_eq!(
            results,
            vec![Some(Value::I4(2)), Some(Value::I4(1)), Some(Value::I4(1))]
        );
        Ok(())
    }

    #[test]
    fn test_remove_rule() -> Result<()> {
        let types = sample_types();
        let (_fake, manager) = fake_of(&types.foo);
        let first = manager.add_rule_first(Arc::new(FixedRule::new(Value::I4(1), None)));
        let last = manager.add_rule_last(Arc::new(FixedRule::new(Value::I4(2), None)));

        assert_eq!(manager.user_rules().len(), 2);
        assert!(Arc::ptr_eq(&manager.user_rules()[1], &last));

        manager.remove_rule(&first)?;
        assert!(!manager.contains_rule(&first));
        assert!(matches!(manager.remove_rule(&first), Err(Error::RuleNotFound)));

        manager.clear_user_rules();
        assert!(manager.user_rules().is_empty());
        Ok(())
    }

    #[test]
    fn test_move_rule_to_front_keeps_counter() {
        let types = sample_types();
        let (_fake, manager) = fake_of(&types.foo);
        let rule: Arc<dyn FakeRule> = Arc::new(FixedRule::new(Value::I4(1), None));
        let moved = manager.add_rule_first(rule.clone());
        moved.record_call();
        manager.add_rule_first(Arc::new(FixedRule::new(Value::I4(2), None)));

        manager.move_rule_to_front(Arc::as_ptr(&rule));
        let front = manager.user_rules().remove(0);
        assert!(Arc::ptr_eq(&front, &moved));
        assert_eq!(front.called_number_of_times(), 1);
    }

    #[test]
    fn test_failed_call_is_still_recorded() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        manager.add_rule_first(Arc::new(crate::rules::StrictFakeRule));
        let baz = types.foo.find_methods("Baz").pop().unwrap();

        let mut call = InterceptedCall::new(&baz, &fake, args![])?;
        assert!(matches!(
            manager.intercept(&mut call),
            Err(Error::ExpectationFailed(_))
        ));
        assert_eq!(manager.recorded_calls().len(), 1);
        Ok(())
    }

    #[test]
    fn test_property_state_through_chain() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        let getter = types.foo.find_methods("get_Name").pop().unwrap();
        let setter = types.foo.find_methods("set_Name").pop().unwrap();

        let mut get = InterceptedCall::new(&getter, &fake, args![])?;
        manager.intercept(&mut get)?;
        assert_eq!(get.return_value(), Some(&Value::Null));
        assert_eq!(manager.user_rules().len(), 1);

        let mut set = InterceptedCall::new(&setter, &fake, args!["stored"])?;
        manager.intercept(&mut set)?;

        let mut get = InterceptedCall::new(&getter, &fake, args![])?;
        manager.intercept(&mut get)?;
        assert_eq!(get.return_value(), Some(&Value::from("stored")));
        assert_eq!(manager.user_rules().len(), 1);
        Ok(())
    }

    struct CountingListener {
        before: AtomicUsize,
        after: AtomicUsize,
    }

    impl InterceptionListener for CountingListener {
        fn on_before_call_intercepted(&self, _call: &dyn FakeObjectCall) {
            self.before.fetch_add(1, Ordering::SeqCst);
        }

        fn on_after_call_intercepted(&self, _call: &CompletedCall, rule: &dyn FakeRule) {
            assert_eq!(rule.description(), "Default return value");
            self.after.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_listeners_are_notified() -> Result<()> {
        let types = sample_types();
        let (fake, manager) = fake_of(&types.foo);
        let listener = Arc::new(CountingListener {
            before: AtomicUsize::new(0),
            after: AtomicUsize::new(0),
        });
        manager.add_interception_listener(listener.clone());

        let baz = types.foo.find_methods("Baz").pop().unwrap();
        let mut call = InterceptedCall::new(&baz, &fake, args![])?;
        manager.intercept(&mut call)?;

        assert_eq!(listener.before.load(Ordering::SeqCst), 1);
        assert_eq!(listener.after.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_recording_can_be_disabled() -> Result<()> {
        let types = sample_types();
        let (fake, _) = fake_of(&types.foo);
        let manager =
            FakeManager::new(&fake, Arc::new(crate::test::NoDummies), FakeConfig::minimal());
        let baz = types.foo.find_methods("Baz").pop().unwrap();

        let mut call = InterceptedCall::new(&baz, &fake, args![])?;
        manager.intercept(&mut call)?;
        assert!(manager.recorded_calls().is_empty());
        Ok(())
    }
}
