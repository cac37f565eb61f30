use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{
    call::ArgumentCollection,
    manager::FakeTag,
    typesystem::{MethodRc, TypeRc},
    value::Value,
    Error, Result,
};

/// Shared reference to an [`Instance`]
pub type ObjectRef = Arc<Instance>;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// What kind of object an [`Instance`] is
pub enum InstanceKind {
    /// A generated proxy, its calls are routed to the attached manager
    Fake(FakeTag),
    /// An object built by running one of its type's constructors
    Constructed {
        /// The arguments the constructor ran with
        arguments: ArgumentCollection,
    },
}

/// An object of a reference type
pub struct Instance {
    ty: TypeRc,
    interfaces: Vec<TypeRc>,
    id: u64,
    kind: InstanceKind,
}

impl Instance {
    /// Creates an object produced by a constructor of `ty`
    pub fn constructed(ty: &TypeRc, arguments: ArgumentCollection) -> ObjectRef {
        Arc::new(Instance {
            ty: ty.clone(),
            interfaces: Vec::new(),
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            kind: InstanceKind::Constructed { arguments },
        })
    }

    /// Creates a proxy of `ty` that additionally implements `interfaces`
    pub fn proxy(ty: &TypeRc, interfaces: Vec<TypeRc>, tag: FakeTag) -> ObjectRef {
        Arc::new(Instance {
            ty: ty.clone(),
            interfaces,
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            kind: InstanceKind::Fake(tag),
        })
    }

    /// The runtime type of the object
    #[must_use]
    pub fn type_def(&self) -> &TypeRc {
        &self.ty
    }

    /// Interfaces implemented on top of the runtime type
    #[must_use]
    pub fn additional_interfaces(&self) -> &[TypeRc] {
        &self.interfaces
    }

    /// Process wide unique identity
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identity based hash code, stable for the lifetime of the object
    #[must_use]
    pub fn hash_code(&self) -> i32 {
        // Fold the 64 bit identity, spreading consecutive ids apart
        let mixed = self.id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ((mixed >> 32) ^ mixed) as i32
    }

    /// The kind of the object
    #[must_use]
    pub fn kind(&self) -> &InstanceKind {
        &self.kind
    }

    /// Returns true for generated proxies
    #[must_use]
    pub fn is_fake(&self) -> bool {
        matches!(self.kind, InstanceKind::Fake(_))
    }

    /// The fake tag of a proxy
    #[must_use]
    pub fn fake_tag(&self) -> Option<&FakeTag> {
        match &self.kind {
            InstanceKind::Fake(tag) => Some(tag),
            InstanceKind::Constructed { .. } => None,
        }
    }

    /// The arguments a constructed object was built with
    #[must_use]
    pub fn constructor_arguments(&self) -> Option<&ArgumentCollection> {
        match &self.kind {
            InstanceKind::Constructed { arguments } => Some(arguments),
            InstanceKind::Fake(_) => None,
        }
    }

    /// Returns true if the object can be used where `target` is expected
    #[must_use]
    pub fn is_instance_of(&self, target: &TypeRc) -> bool {
        self.ty.is_assignable_to(target)
            || self
                .interfaces
                .iter()
                .any(|interface| interface.is_assignable_to(target))
    }

    /// The member of this object's type `method` dispatches to, `method` itself if the
    /// type does not declare or inherit one with the same signature
    fn dispatch_target(&self, method: &MethodRc) -> MethodRc {
        self.ty
            .all_methods()
            .into_iter()
            .find(|candidate| candidate.has_same_signature(method))
            .unwrap_or_else(|| method.clone())
    }

    /// Finds the implementation of `method` on this object's type
    fn implementation_of(&self, method: &MethodRc) -> Option<MethodRc> {
        self.ty
            .all_methods()
            .into_iter()
            .find(|candidate| candidate.has_same_signature(method) && candidate.body().is_some())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InstanceKind::Fake(_) => write!(f, "Faked {}", self.ty.fullname()),
            InstanceKind::Constructed { .. } => write!(f, "{}", self.ty.fullname()),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.fullname())
            .field("id", &self.id)
            .field("fake", &self.is_fake())
            .finish_non_exhaustive()
    }
}

/// An object calls can be made on.
///
/// Constructed instances run the base implementation of the invoked member. Fakes route
/// interceptable members through their manager and run the base implementation of the
/// others, the way a generated proxy would.
pub trait Invocable: Send + Sync {
    /// Invokes `method`, writing out and ref values back into `arguments`
    ///
    /// # Errors
    /// Returns whatever the implementation fails with, [`Error::NoBaseImplementation`] if
    /// the object does not implement `method`.
    fn invoke(&self, method: &MethodRc, arguments: &mut [Value]) -> Result<Value>;
}

impl Invocable for ObjectRef {
    fn invoke(&self, method: &MethodRc, arguments: &mut [Value]) -> Result<Value> {
        if arguments.len() != method.params.len() {
            return Err(Error::ArgumentCountMismatch {
                arguments: arguments.len(),
                names: method.params.len(),
            });
        }

        // Proxies forward every interceptable member into their manager, as the member
        // of the proxied type a call through an interface dispatches to
        if let Some(tag) = self.fake_tag() {
            let target = self.dispatch_target(method);
            if target.is_interceptable() {
                let (value, processed) = tag.process(self, &target, arguments.to_vec())?;
                for (slot, value) in arguments.iter_mut().zip(processed.into_values()) {
                    *slot = value;
                }
                return Ok(value);
            }
        }

        let implementation = self
            .implementation_of(method)
            .ok_or_else(|| Error::NoBaseImplementation(method.fullname()))?;
        match implementation.body() {
            Some(body) => body(self, arguments),
            None => Err(Error::NoBaseImplementation(method.fullname())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::sample_types;

    #[test]
    fn test_constructed_instance() {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());
        assert!(!widget.is_fake());
        assert!(widget.fake_tag().is_none());
        assert!(widget.constructor_arguments().is_some());
        assert_eq!(widget.to_string(), "Acme.Widget");
        assert!(widget.is_instance_of(&types.runnable));
    }

    #[test]
    fn test_identity_is_unique() {
        let types = sample_types();
        let first = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let second = Instance::constructed(&types.widget, ArgumentCollection::empty());
        assert_ne!(first.id(), second.id());
        assert_eq!(first.hash_code(), first.hash_code());
    }

    #[test]
    fn test_invoke_real_object() -> Result<()> {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());

        let run = types.runnable.find_methods("Run").pop().unwrap();
        let result = widget.invoke(&run, &mut [])?;
        assert_eq!(result, Value::Void);

        let describe = types.widget.find_methods("Describe").pop().unwrap();
        let text = widget.invoke(&describe, &mut [])?;
        assert_eq!(text, Value::from("widget"));

        let get = types.foo.find_methods("Get").pop().unwrap();
        assert!(matches!(
            widget.invoke(&get, &mut []),
            Err(Error::NoBaseImplementation(_))
        ));
        Ok(())
    }
}
