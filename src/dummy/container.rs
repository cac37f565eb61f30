use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{
    dummy::{DummyFactory, FakeConfigurator},
    fake::Fake,
    typesystem::TypeRc,
    value::Value,
    Result,
};

/// Source of dummies and fake configuration consulted during resolution and fake creation
pub trait FakeObjectContainer: Send + Sync {
    /// Produces a dummy of `ty`, `None` if the container does not know the type
    fn try_create_dummy(&self, ty: &TypeRc) -> Option<Value>;

    /// Applies the container's default configuration to a new fake of `ty`
    ///
    /// # Errors
    /// Errors abort the creation of the fake.
    fn configure_fake(&self, _ty: &TypeRc, _fake: &Fake) -> Result<()> {
        Ok(())
    }
}

/// A container without any dummies or configuration, used by scopes created without one
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFakeObjectContainer;

impl FakeObjectContainer for NullFakeObjectContainer {
    fn try_create_dummy(&self, _ty: &TypeRc) -> Option<Value> {
        None
    }
}

/// A container holding registered [`DummyFactory`]s and [`FakeConfigurator`]s.
///
/// Registration is possible at any time and from any thread.
#[derive(Default)]
pub struct DynamicContainer {
    factories: RwLock<Vec<Arc<dyn DummyFactory>>>,
    configurators: RwLock<Vec<Arc<dyn FakeConfigurator>>>,
}

impl DynamicContainer {
    /// Creates an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dummy factory
    pub fn register_factory(&self, factory: Arc<dyn DummyFactory>) {
        write_lock!(self.factories).push(factory);
    }

    /// Registers a fake configurator
    pub fn register_configurator(&self, configurator: Arc<dyn FakeConfigurator>) {
        write_lock!(self.configurators).push(configurator);
    }

    /// Number of registered factories
    #[must_use]
    pub fn factory_count(&self) -> usize {
        read_lock!(self.factories).len()
    }

    /// The factory responsible for `ty`: highest priority first, first registered on ties
    fn factory_for(&self, ty: &TypeRc) -> Option<Arc<dyn DummyFactory>> {
        let factories = read_lock!(self.factories);
        let mut best: Option<&Arc<dyn DummyFactory>> = None;
        for factory in factories.iter().filter(|factory| factory.can_create(ty)) {
            match best {
                Some(current) if current.priority() >= factory.priority() => {}
                _ => best = Some(factory),
            }
        }
        best.cloned()
    }
}

impl FakeObjectContainer for DynamicContainer {
    fn try_create_dummy(&self, ty: &TypeRc) -> Option<Value> {
        let factory = self.factory_for(ty)?;
        match factory.create(ty) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(type_name = %ty.fullname(), %error, "dummy factory failed");
                None
            }
        }
    }

    fn configure_fake(&self, ty: &TypeRc, fake: &Fake) -> Result<()> {
        let mut configurators: Vec<Arc<dyn FakeConfigurator>> = read_lock!(self.configurators)
            .iter()
            .filter(|configurator| configurator.can_configure(ty))
            .cloned()
            .collect();
        configurators.sort_by_key(|configurator| std::cmp::Reverse(configurator.priority()));

        for configurator in configurators {
            configurator.configure(fake)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{DummyPriority, TypedDummyFactory},
        test::factories::sample_types,
    };

    #[test]
    fn test_highest_priority_wins() {
        let types = sample_types();
        let i4 = types.registry.i4();
        let container = DynamicContainer::new();
        container.register_factory(Arc::new(TypedDummyFactory::new(&i4, |_| Ok(Value::I4(1)))));
        container.register_factory(Arc::new(
            TypedDummyFactory::new(&i4, |_| Ok(Value::I4(2))).with_priority(DummyPriority::HIGH),
        ));
        container.register_factory(Arc::new(
            TypedDummyFactory::new(&i4, |_| Ok(Value::I4(3))).with_priority(DummyPriority::HIGH),
        ));

        assert_eq!(container.factory_count(), 3);
        assert_eq!(container.try_create_dummy(&i4), Some(Value::I4(2)));
        assert_eq!(container.try_create_dummy(&types.registry.string()), None);
    }

    #[test]
    fn test_failing_factory_yields_nothing() {
        let types = sample_types();
        let i4 = types.registry.i4();
        let container = DynamicContainer::new();
        container.register_factory(Arc::new(TypedDummyFactory::new(&i4, |_| {
            Err(crate::Error::Thrown("no".to_string()))
        })));
        assert_eq!(container.try_create_dummy(&i4), None);
    }

    #[test]
    fn test_null_container() {
        let types = sample_types();
        assert!(NullFakeObjectContainer.try_create_dummy(&types.foo).is_none());
    }
}
