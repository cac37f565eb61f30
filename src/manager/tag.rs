use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{
    call::{ArgumentCollection, InterceptedCall},
    config::FakeConfig,
    dummy::DummyValueResolver,
    manager::FakeManager,
    rules::{StrictFakeRule, WrappedObjectRule},
    typesystem::MethodRc,
    value::{Invocable, ObjectRef, Value},
    Result,
};

/// Builds the call processor of a freshly generated proxy.
///
/// Handed to the [`crate::creation::ProxyGenerator`] together with the type to proxy; the
/// proxy's [`FakeTag`] asks it for a manager on the first intercepted call.
pub trait CallProcessorProvider: Send + Sync {
    /// Creates the manager for `proxy`
    fn create_manager(&self, proxy: &ObjectRef) -> Arc<FakeManager>;
}

/// The provider used by [`crate::FakeContext`]: a manager with the context's dummy
/// resolver, plus the strict and wrapping rules requested through the fake options
pub struct FakeManagerProvider {
    resolver: Arc<dyn DummyValueResolver>,
    config: FakeConfig,
    strict: bool,
    wrapped: Option<Arc<dyn Invocable>>,
}

impl FakeManagerProvider {
    /// Creates a provider for loose fakes
    pub fn new(resolver: Arc<dyn DummyValueResolver>, config: FakeConfig) -> Self {
        FakeManagerProvider {
            resolver,
            strict: config.strict_by_default,
            config,
            wrapped: None,
        }
    }

    /// Makes the created fakes strict
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict |= strict;
        self
    }

    /// Makes the created fakes forward their calls to `wrapped`
    #[must_use]
    pub fn wrapping(mut self, wrapped: Option<Arc<dyn Invocable>>) -> Self {
        self.wrapped = wrapped;
        self
    }
}

impl CallProcessorProvider for FakeManagerProvider {
    fn create_manager(&self, proxy: &ObjectRef) -> Arc<FakeManager> {
        let manager = FakeManager::new(proxy, self.resolver.clone(), self.config);

        // Added directly instead of through the current scope, closing a scope must not
        // turn a strict fake loose
        if let Some(wrapped) = &self.wrapped {
            manager.add_rule_last(Arc::new(WrappedObjectRule::new(wrapped.clone())));
        }
        if self.strict {
            manager.add_rule_last(Arc::new(StrictFakeRule));
        }

        debug!(
            fake = manager.id(),
            fake_type = %manager.fake_type().fullname(),
            strict = self.strict,
            wrapping = self.wrapped.is_some(),
            "attached manager"
        );
        manager
    }
}

/// Links a proxy to its manager.
///
/// The manager is created on first use. Concurrent first calls block on the
/// initialization and all observe the same manager.
pub struct FakeTag {
    provider: Arc<dyn CallProcessorProvider>,
    manager: OnceLock<Arc<FakeManager>>,
}

impl FakeTag {
    /// Creates a tag whose manager will be built by `provider`
    pub fn new(provider: Arc<dyn CallProcessorProvider>) -> Self {
        FakeTag {
            provider,
            manager: OnceLock::new(),
        }
    }

    /// The manager of `proxy`, created on first access
    pub fn manager(&self, proxy: &ObjectRef) -> Arc<FakeManager> {
        self.manager
            .get_or_init(|| self.provider.create_manager(proxy))
            .clone()
    }

    /// Returns true once the manager has been created
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.manager.get().is_some()
    }

    /// Forwards a call of `method` on `proxy` to its manager.
    ///
    /// Returns the call's return value and its final arguments, carrying the values
    /// written to out and ref parameters.
    ///
    /// # Errors
    /// Returns [`crate::Error::ArgumentCountMismatch`] if `arguments` do not fit `method`,
    /// otherwise whatever the applied rule failed with.
    pub fn process(
        &self,
        proxy: &ObjectRef,
        method: &MethodRc,
        arguments: Vec<Value>,
    ) -> Result<(Value, ArgumentCollection)> {
        let manager = self.manager(proxy);
        let mut call = InterceptedCall::new(method, proxy, arguments)?;
        manager.intercept(&mut call)?;
        Ok(call.into_result())
    }
}

impl fmt::Debug for FakeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTag")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use super::*;
    use crate::{
        test::{factories::sample_types, NoDummies},
        value::Instance,
    };

    fn tagged_proxy(strict: bool) -> (crate::test::factories::SampleTypes, ObjectRef) {
        let types = sample_types();
        let provider =
            FakeManagerProvider::new(Arc::new(NoDummies), FakeConfig::default()).strict(strict);
        let proxy = Instance::proxy(&types.foo, Vec::new(), FakeTag::new(Arc::new(provider)));
        (types, proxy)
    }

    #[test]
    fn test_manager_is_attached_lazily() {
        let (_types, proxy) = tagged_proxy(false);
        let tag = proxy.fake_tag().unwrap();
        assert!(!tag.is_attached());

        let first = tag.manager(&proxy);
        let second = tag.manager(&proxy);
        assert!(tag.is_attached());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), proxy.id());
    }

    #[test]
    fn test_concurrent_first_access_creates_one_manager() {
        let (_types, proxy) = tagged_proxy(false);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let proxy = proxy.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    FakeManager::of(&proxy).unwrap()
                })
            })
            .collect();

        let managers: Vec<Arc<FakeManager>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for manager in &managers[1..] {
            assert!(Arc::ptr_eq(&managers[0], manager));
        }
    }

    #[test]
    fn test_strict_provider_adds_rule() -> Result<()> {
        let (types, proxy) = tagged_proxy(true);
        let tag = proxy.fake_tag().unwrap();
        assert_eq!(tag.manager(&proxy).user_rules().len(), 1);

        let get = types.foo.find_methods("Get").pop().unwrap();
        assert!(tag.process(&proxy, &get, Vec::new()).is_err());

        let to_string = types.foo.find_methods("ToString").pop().unwrap();
        let (text, _) = tag.process(&proxy, &to_string, Vec::new())?;
        assert_eq!(text, Value::from("Faked Acme.IFoo"));
        Ok(())
    }
}
