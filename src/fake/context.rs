use std::sync::{Arc, Weak};

use tracing::debug;

use crate::{
    assertion::OrderedAssertions,
    config::FakeConfig,
    creation::{DynamicProxyGenerator, FakeObjectCreator, FakeOptions, ProxyGenerator},
    dummy::{
        DummyResolver, DummyValueResolver, DynamicContainer, FakeObjectContainer, FakeSource,
        ResolutionSession,
    },
    fake::Fake,
    manager::FakeManagerProvider,
    scope::FakeScope,
    typesystem::{TypeRc, TypeRegistry},
    value::{ObjectRef, Value},
    Error, Result,
};

struct ContextInner {
    registry: Arc<TypeRegistry>,
    container: Arc<DynamicContainer>,
    creator: FakeObjectCreator,
    config: FakeConfig,
    this: Weak<ContextInner>,
}

impl ContextInner {
    /// Containers of the open scopes, innermost first, followed by the context's own
    fn containers(&self) -> Vec<Arc<dyn FakeObjectContainer>> {
        let mut containers = FakeScope::containers();
        containers.push(self.container.clone());
        containers
    }

    fn resolve(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<Value> {
        DummyResolver::new(self.containers(), self).resolve(ty, session)
    }

    fn create(
        &self,
        ty: &TypeRc,
        options: &FakeOptions,
        session: &mut ResolutionSession,
    ) -> Result<Fake> {
        let resolver: Arc<dyn DummyValueResolver> = self
            .this
            .upgrade()
            .ok_or_else(|| {
                configuration_error!("The fake context was dropped while creating a fake")
            })?;
        let provider = FakeManagerProvider::new(resolver, self.config)
            .strict(options.strict)
            .wrapping(options.wrapped.clone());

        let containers = self.containers();
        let dummies = DummyResolver::new(containers.clone(), self);
        let object = self.creator.create_fake(
            ty,
            options,
            Arc::new(provider),
            &mut |param_type| dummies.resolve(param_type, session),
        )?;

        let fake = Fake::from_object(&object).ok_or_else(|| Error::FakeCreation {
            type_name: ty.fullname(),
            reasons: vec!["The generated proxy is not a fake".to_string()],
        })?;

        for container in &containers {
            container.configure_fake(ty, &fake)?;
        }
        for action in &options.on_created {
            action(&fake)?;
        }

        debug!(
            fake = fake.manager().id(),
            fake_type = %ty.fullname(),
            strict = options.strict,
            interfaces = options.additional_interfaces.len(),
            "created fake"
        );
        Ok(fake)
    }
}

impl DummyValueResolver for ContextInner {
    fn try_resolve_dummy(&self, ty: &TypeRc) -> Option<Value> {
        let mut session = ResolutionSession::new(self.config.max_resolution_depth);
        self.resolve(ty, &mut session)
    }
}

impl FakeSource for ContextInner {
    fn try_create_fake(&self, ty: &TypeRc, session: &mut ResolutionSession) -> Option<ObjectRef> {
        match self.create(ty, &FakeOptions::default(), session) {
            Ok(fake) => Some(fake.object().clone()),
            Err(error) => {
                session.note_failure(error.to_string());
                None
            }
        }
    }
}

/// Creates fakes and dummies.
///
/// A context owns the [`TypeRegistry`] the faked types live in, a [`DynamicContainer`]
/// for registering dummy factories and fake configurators, and the [`FakeConfig`] every
/// fake it creates is built with. Cloning a context is cheap, clones share everything.
///
/// ```rust
/// use dotfake::{FakeConfig, FakeContext, Value};
///
/// let context = FakeContext::builder().config(FakeConfig::strict()).build();
/// let types = context.types();
/// let clock = types.interface("Acme", "IClock").method("Now", &types.i8(), []).build()?;
///
/// let fake = context.fake(&clock)?;
/// assert!(fake.call("Now", vec![]).is_err());
///
/// fake.call_to("Now")?.returns(1_700_000_000i64)?;
/// assert_eq!(fake.call("Now", vec![])?, Value::I8(1_700_000_000));
/// # Ok::<(), dotfake::Error>(())
/// ```
#[derive(Clone)]
pub struct FakeContext {
    inner: Arc<ContextInner>,
}

impl FakeContext {
    /// A context with a fresh registry and the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A context with a fresh registry and `config`
    #[must_use]
    pub fn with_config(config: FakeConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// A context faking the types of `registry`
    #[must_use]
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self::builder().registry(registry).build()
    }

    /// Starts building a customized context
    #[must_use]
    pub fn builder() -> FakeContextBuilder {
        FakeContextBuilder::default()
    }

    /// The registry to declare faked types in
    #[must_use]
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    /// The configuration fakes are created with
    #[must_use]
    pub fn config(&self) -> &FakeConfig {
        &self.inner.config
    }

    /// The container dummy factories and fake configurators are registered with
    #[must_use]
    pub fn container(&self) -> &Arc<DynamicContainer> {
        &self.inner.container
    }

    /// Creates a fake of `ty` with the default options
    ///
    /// # Errors
    /// Returns [`Error::FakeCreation`] listing why every attempted constructor failed.
    pub fn fake(&self, ty: &TypeRc) -> Result<Fake> {
        self.fake_with(ty, FakeOptions::new())
    }

    /// Creates a fake of `ty` with `options`
    ///
    /// # Errors
    /// Returns [`Error::FakeCreation`] listing why every attempted constructor failed,
    /// [`Error::Configuration`] for contradicting options, or whatever a fake
    /// configurator or creation callback failed with.
    pub fn fake_with(&self, ty: &TypeRc, options: FakeOptions) -> Result<Fake> {
        let mut session = ResolutionSession::new(self.inner.config.max_resolution_depth);
        self.inner.create(ty, &options, &mut session)
    }

    /// Resolves a dummy of `ty`
    ///
    /// # Errors
    /// Returns [`Error::DummyCreation`] with every failed resolution step if no dummy can
    /// be made.
    pub fn dummy(&self, ty: &TypeRc) -> Result<Value> {
        let mut session = ResolutionSession::new(self.inner.config.max_resolution_depth);
        match self.inner.resolve(ty, &mut session) {
            Some(value) => Ok(value),
            None => {
                let reason = if session.failures().is_empty() {
                    "no resolution strategy applies".to_string()
                } else {
                    session.failures().join("\n")
                };
                Err(Error::DummyCreation {
                    type_name: ty.fullname(),
                    reason,
                })
            }
        }
    }

    /// Resolves a dummy of `ty`, `None` if no dummy can be made
    #[must_use]
    pub fn try_dummy(&self, ty: &TypeRc) -> Option<Value> {
        self.inner.try_resolve_dummy(ty)
    }

    /// Starts an ordered assertion context on the current thread
    #[must_use]
    pub fn ordered_assertions(&self) -> OrderedAssertions {
        OrderedAssertions::begin(self.inner.config.max_rendered_calls)
    }
}

impl Default for FakeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeContext")
            .field("types", &self.inner.registry.len())
            .field("factories", &self.inner.container.factory_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`FakeContext`]
#[derive(Default)]
pub struct FakeContextBuilder {
    config: Option<FakeConfig>,
    registry: Option<Arc<TypeRegistry>>,
    generator: Option<Arc<dyn ProxyGenerator>>,
}

impl FakeContextBuilder {
    /// Uses `config` for every fake
    #[must_use]
    pub fn config(mut self, config: FakeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Fakes the types of `registry` instead of a fresh one
    #[must_use]
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Generates proxies through `generator`
    #[must_use]
    pub fn proxy_generator(mut self, generator: Arc<dyn ProxyGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Builds the context
    #[must_use]
    pub fn build(self) -> FakeContext {
        let registry = self.registry.unwrap_or_default();
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(DynamicProxyGenerator));
        let config = self.config.unwrap_or_default();

        FakeContext {
            inner: Arc::new_cyclic(|this| ContextInner {
                registry,
                container: Arc::new(DynamicContainer::new()),
                creator: FakeObjectCreator::new(generator),
                config,
                this: this.clone(),
            }),
        }
    }
}
