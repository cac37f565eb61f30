use std::{fmt, sync::Arc};

use crate::{
    fake::Fake,
    typesystem::TypeRc,
    value::{Invocable, Value},
    Result,
};

type CreatedAction = Arc<dyn Fn(&Fake) -> Result<()> + Send + Sync>;

/// Settings for one fake.
///
/// ```rust
/// use dotfake::{args, creation::FakeOptions};
///
/// let options = FakeOptions::new()
///     .with_constructor_arguments(args![1, "two"])
///     .strict();
/// assert!(options.is_strict());
/// ```
#[derive(Clone, Default)]
pub struct FakeOptions {
    pub(crate) constructor_arguments: Option<Vec<Value>>,
    pub(crate) additional_interfaces: Vec<TypeRc>,
    pub(crate) wrapped: Option<Arc<dyn Invocable>>,
    pub(crate) strict: bool,
    pub(crate) on_created: Vec<CreatedAction>,
}

impl FakeOptions {
    /// Default options: loose, parameterless construction
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the proxy with exactly these base constructor arguments
    #[must_use]
    pub fn with_constructor_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.constructor_arguments = Some(arguments);
        self
    }

    /// Makes the fake implement `interface` on top of the faked type
    #[must_use]
    pub fn implements(mut self, interface: &TypeRc) -> Self {
        self.additional_interfaces.push(interface.clone());
        self
    }

    /// Forwards every unconfigured call to `wrapped`
    #[must_use]
    pub fn wrapping<W>(mut self, wrapped: W) -> Self
    where
        W: Invocable + 'static,
    {
        self.wrapped = Some(Arc::new(wrapped));
        self
    }

    /// Rejects every unconfigured call
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Runs `action` on the fake right after it was created
    #[must_use]
    pub fn on_fake_created<F>(mut self, action: F) -> Self
    where
        F: Fn(&Fake) -> Result<()> + Send + Sync + 'static,
    {
        self.on_created.push(Arc::new(action));
        self
    }

    /// Returns true for strict fakes
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl fmt::Debug for FakeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeOptions")
            .field("constructor_arguments", &self.constructor_arguments)
            .field(
                "additional_interfaces",
                &self
                    .additional_interfaces
                    .iter()
                    .map(|interface| interface.fullname())
                    .collect::<Vec<_>>(),
            )
            .field("wrapping", &self.wrapped.is_some())
            .field("strict", &self.strict)
            .field("on_created", &self.on_created.len())
            .finish()
    }
}
