use std::{cmp::Reverse, sync::Arc};

use tracing::debug;

use crate::{
    call::ArgumentCollection,
    dummy::{FakeObjectContainer, ResolutionSession},
    typesystem::{TypeFlavor, TypeRc},
    value::{Instance, LazyValue, ObjectRef, Value},
};

/// Creates fakes on behalf of the resolver, resolving constructor arguments within the
/// same session
pub(crate) trait FakeSource {
    fn try_create_fake(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<ObjectRef>;
}

/// Resolves dummies of arbitrary types
pub(crate) struct DummyResolver<'a> {
    containers: Vec<Arc<dyn FakeObjectContainer>>,
    fakes: &'a dyn FakeSource,
}

impl<'a> DummyResolver<'a> {
    /// Creates a resolver consulting `containers` in order before the built-in strategies
    pub(crate) fn new(
        containers: Vec<Arc<dyn FakeObjectContainer>>,
        fakes: &'a dyn FakeSource,
    ) -> Self {
        DummyResolver { containers, fakes }
    }

    /// Resolves a dummy of `ty` within `session`
    pub(crate) fn resolve(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        if let Some(value) = session.cached(ty) {
            return Some(value);
        }

        if let Err(error) = session.enter(ty) {
            session.note_failure(error.to_string());
            return None;
        }
        let value = self.resolve_uncached(ty, session);
        session.leave(ty, value.as_ref());
        value
    }

    fn resolve_uncached(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        if let Some(value) = self
            .containers
            .iter()
            .find_map(|container| container.try_create_dummy(ty))
        {
            return Some(value);
        }

        match ty.flavor {
            TypeFlavor::Void | TypeFlavor::Delegate => {
                session.note_failure(format!("{} can not have a dummy", ty.fullname()));
                None
            }
            flavor if flavor.is_value_type() => Some(Value::default_for(ty)),
            TypeFlavor::String => Some(Value::String(String::new())),
            TypeFlavor::Object => Some(Value::Object(Instance::constructed(
                ty,
                ArgumentCollection::empty(),
            ))),
            TypeFlavor::Lazy => self.resolve_lazy(ty, session),
            _ => self.resolve_object(ty, session),
        }
    }

    fn resolve_lazy(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        let Some(element) = ty.element_type() else {
            session.note_failure(format!("{} has no element type", ty.fullname()));
            return None;
        };
        let value = self.resolve(&element, session)?;
        Some(Value::Lazy(LazyValue::new(ty, move || value.clone())))
    }

    fn resolve_object(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        if ty.can_be_proxied() {
            if let Some(fake) = self.fakes.try_create_fake(ty, session) {
                return Some(Value::Object(fake));
            }
        }

        if ty.flavor != TypeFlavor::Class || ty.is_abstract() {
            session.note_failure(format!("{} can not be faked or constructed", ty.fullname()));
            return None;
        }
        self.construct(ty, session)
    }

    fn construct(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        let mut constructors: Vec<_> = ty
            .constructors
            .iter()
            .map(|(_, ctor)| ctor.clone())
            .collect();
        constructors.sort_by_key(|ctor| Reverse(ctor.params.len()));

        'constructors: for constructor in constructors {
            let mut arguments = Vec::with_capacity(constructor.params.len());
            for param in &constructor.params {
                let resolved = param
                    .param_type
                    .upgrade()
                    .and_then(|param_type| self.resolve(&param_type, session));
                match resolved {
                    Some(value) => arguments.push(value),
                    None => {
                        session.note_failure(format!(
                            "Constructor with signature {} of {} failed: no dummy for {}",
                            constructor.signature(),
                            ty.fullname(),
                            param.param_type.fullname()
                        ));
                        continue 'constructors;
                    }
                }
            }

            match constructor.invoke(arguments) {
                Ok(arguments) => return Some(Value::Object(Instance::constructed(ty, arguments))),
                Err(error) => {
                    debug!(
                        type_name = %ty.fullname(),
                        signature = %constructor.signature(),
                        %error,
                        "could not construct dummy"
                    );
                    session.note_failure(format!(
                        "Constructor with signature {} of {} failed: {error}",
                        constructor.signature(),
                        ty.fullname()
                    ));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{DynamicContainer, TypedDummyFactory},
        test::factories::{resolution_types, sample_types},
    };

    struct NoFakes;

    impl FakeSource for NoFakes {
        fn try_create_fake(
            &self,
            _ty: &TypeRc,
            _session: &mut ResolutionSession,
        ) -> Option<ObjectRef> {
            None
        }
    }

    fn resolve(ty: &TypeRc) -> Option<Value> {
        let resolver = DummyResolver::new(Vec::new(), &NoFakes);
        resolver.resolve(ty, &mut ResolutionSession::new(64))
    }

    #[test]
    fn test_builtin_types() {
        let types = sample_types();
        assert_eq!(resolve(&types.registry.i4()), Some(Value::I4(0)));
        assert_eq!(resolve(&types.registry.string()), Some(Value::from("")));
        assert!(resolve(&types.registry.void()).is_none());
        assert!(matches!(resolve(&types.registry.object()), Some(Value::Object(_))));
    }

    #[test]
    fn test_delegates_never_resolve() {
        let types = sample_types();
        assert!(resolve(&types.handler).is_none());
    }

    #[test]
    fn test_widest_constructor_wins() {
        let types = resolution_types();
        let Some(Value::Object(instance)) = resolve(&types.multiple_widths) else {
            panic!("expected an instance");
        };
        assert_eq!(instance.constructor_arguments().map(ArgumentCollection::len), Some(2));
    }

    #[test]
    fn test_falls_back_to_narrower_constructor() {
        let types = resolution_types();
        let Some(Value::Object(instance)) = resolve(&types.throwing_wide) else {
            panic!("expected an instance");
        };
        assert_eq!(instance.constructor_arguments().map(ArgumentCollection::len), Some(0));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let types = resolution_types();
        let mut session = ResolutionSession::new(64);
        let resolver = DummyResolver::new(Vec::new(), &NoFakes);
        assert!(resolver.resolve(&types.self_dependent, &mut session).is_none());
        assert!(session
            .failures()
            .iter()
            .any(|failure| failure.contains("circular dependency")));
    }

    #[test]
    fn test_lazy_wraps_element() {
        let types = sample_types();
        let lazy = types.registry.lazy_of(&types.registry.i4());
        let Some(Value::Lazy(value)) = resolve(&lazy) else {
            panic!("expected a lazy value");
        };
        assert!(!value.is_value_created());
        assert_eq!(value.value(), &Value::I4(0));
    }

    #[test]
    fn test_containers_come_first() {
        let types = sample_types();
        let i4 = types.registry.i4();
        let container = DynamicContainer::new();
        container.register_factory(Arc::new(TypedDummyFactory::new(&i4, |_| Ok(Value::I4(7)))));
        let resolver = DummyResolver::new(vec![Arc::new(container)], &NoFakes);
        assert_eq!(
            resolver.resolve(&i4, &mut ResolutionSession::new(64)),
            Some(Value::I4(7))
        );
    }
}
