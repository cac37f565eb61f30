//! Dummy values: placeholder values for arbitrary types.
//!
//! A dummy is any value of a requested type whose content does not matter to the test:
//! an argument the code under test needs, the return value of an unconfigured member, or
//! a constructor argument needed to create a fake of a class.
//!
//! # Resolution Order
//!
//! 1. A [`DummyFactory`] claiming the type, consulted through the [`FakeObjectContainer`]s
//!    of the open scopes (innermost first) and the context's [`DynamicContainer`]
//! 2. `void` and delegate types never resolve
//! 3. Value types resolve to their zero value, `System.String` to `""`
//! 4. `System.Lazy<T>` resolves if `T` resolves, deferring to the resolved `T`
//! 5. Interfaces and non-sealed classes resolve to a fake
//! 6. Classes resolve by running a constructor with dummy arguments, widest constructor
//!    first
//!
//! A [`ResolutionSession`] spans one top level request. It caches resolved types and
//! rejects circular constructor dependencies instead of recursing forever.
//!
//! # Examples
//!
//! ```rust
//! use dotfake::{FakeContext, Value};
//!
//! let context = FakeContext::new();
//! assert_eq!(context.dummy(&context.types().i4())?, Value::I4(0));
//! assert_eq!(context.dummy(&context.types().string())?, Value::from(""));
//! assert!(context.try_dummy(&context.types().void()).is_none());
//! # Ok::<(), dotfake::Error>(())
//! ```

mod container;
mod resolver;
mod session;

use std::sync::Arc;

pub use container::{DynamicContainer, FakeObjectContainer, NullFakeObjectContainer};
pub(crate) use resolver::{DummyResolver, FakeSource};
pub use session::ResolutionSession;

use crate::{
    fake::Fake,
    typesystem::{Token, TypeRc},
    value::Value,
    Result,
};

/// Produces dummies, used by the rules answering unconfigured calls
pub trait DummyValueResolver: Send + Sync {
    /// Resolves a dummy of `ty`, `None` if no dummy can be made
    fn try_resolve_dummy(&self, ty: &TypeRc) -> Option<Value>;
}

/// Priority of a [`DummyFactory`] or [`FakeConfigurator`].
///
/// When several factories claim a type, the one with the highest priority wins; between
/// equal priorities the first registered one wins.
///
/// ```rust
/// use dotfake::dummy::DummyPriority;
///
/// assert!(DummyPriority::HIGHEST > DummyPriority::HIGH);
/// assert_eq!(DummyPriority::default(), DummyPriority::NORMAL);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DummyPriority(pub i32);

impl DummyPriority {
    /// Highest priority (value: 1000).
    pub const HIGHEST: Self = Self(1000);

    /// High priority (value: 500).
    pub const HIGH: Self = Self(500);

    /// Normal priority - default (value: 0).
    pub const NORMAL: Self = Self(0);

    /// Low priority (value: -500).
    pub const LOW: Self = Self(-500);

    /// Lowest priority (value: -1000).
    pub const LOWEST: Self = Self(-1000);
}

impl Default for DummyPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Creates dummies of the types it claims
pub trait DummyFactory: Send + Sync {
    /// Returns true if the factory produces dummies of `ty`
    fn can_create(&self, ty: &TypeRc) -> bool;

    /// Produces a dummy of `ty`
    ///
    /// # Errors
    /// A failing factory makes the resolution fall through to the built-in strategies.
    fn create(&self, ty: &TypeRc) -> Result<Value>;

    /// Priority among factories claiming the same type
    fn priority(&self) -> DummyPriority {
        DummyPriority::NORMAL
    }
}

/// Applies default configuration to newly created fakes of the types it claims
pub trait FakeConfigurator: Send + Sync {
    /// Returns true if fakes of `ty` should be configured
    fn can_configure(&self, ty: &TypeRc) -> bool;

    /// Configures the freshly created `fake`
    ///
    /// # Errors
    /// Errors abort the creation of the fake.
    fn configure(&self, fake: &Fake) -> Result<()>;

    /// Order among configurators, higher runs first
    fn priority(&self) -> DummyPriority {
        DummyPriority::NORMAL
    }
}

type CreateFn = Arc<dyn Fn(&TypeRc) -> Result<Value> + Send + Sync>;

/// A [`DummyFactory`] for exactly one type, backed by a closure
///
/// ```rust
/// use std::sync::Arc;
/// use dotfake::{dummy::TypedDummyFactory, FakeContext, Value};
///
/// let context = FakeContext::new();
/// let i4 = context.types().i4();
/// context
///     .container()
///     .register_factory(Arc::new(TypedDummyFactory::new(&i4, |_| Ok(Value::I4(42)))));
/// assert_eq!(context.dummy(&i4)?, Value::I4(42));
/// # Ok::<(), dotfake::Error>(())
/// ```
#[derive(Clone)]
pub struct TypedDummyFactory {
    token: Token,
    priority: DummyPriority,
    create: CreateFn,
}

impl TypedDummyFactory {
    /// Creates a factory producing dummies of `ty` through `create`
    pub fn new<F>(ty: &TypeRc, create: F) -> Self
    where
        F: Fn(&TypeRc) -> Result<Value> + Send + Sync + 'static,
    {
        TypedDummyFactory {
            token: ty.token,
            priority: DummyPriority::NORMAL,
            create: Arc::new(create),
        }
    }

    /// Sets the priority of the factory
    #[must_use]
    pub fn with_priority(mut self, priority: DummyPriority) -> Self {
        self.priority = priority;
        self
    }
}

impl DummyFactory for TypedDummyFactory {
    fn can_create(&self, ty: &TypeRc) -> bool {
        ty.token == self.token
    }

    fn create(&self, ty: &TypeRc) -> Result<Value> {
        (self.create)(ty)
    }

    fn priority(&self) -> DummyPriority {
        self.priority
    }
}
