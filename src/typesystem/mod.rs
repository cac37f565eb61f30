//! Runtime type model for faked types.
//!
//! Rust has no runtime reflection, so the types a test wants to fake are described at
//! runtime through this module. A [`TypeDef`] carries everything the engine needs to know:
//! which members exist, which of them a proxy can intercept, which constructors are
//! available for proxy and dummy construction, and how values of the type default.
//!
//! # Key Components
//!
//! - [`TypeDef`]: Core type representation (interfaces, classes, value types, delegates)
//! - [`TypeRegistry`]: Central registry owning every type, pre-populated with `System` types
//! - [`TypeBuilder`]: Builder pattern for defining types and their members
//! - [`Method`], [`Property`], [`Event`], [`Constructor`]: Members of a type
//! - [`TypeFlavor`]: Kind of a type (primitive, class, interface, ...)
//!
//! # Examples
//!
//! ```rust
//! use dotfake::typesystem::{param, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let foo = registry
//!     .interface("Acme", "IFoo")
//!     .method("Bar", &registry.void(), [param("x", &registry.i4())])
//!     .property("Name", &registry.string())
//!     .build()?;
//!
//! assert_eq!(foo.fullname(), "Acme.IFoo");
//! assert_eq!(foo.find_methods("Bar").len(), 1);
//! assert!(foo.find_property("Name").is_some());
//! # Ok::<(), dotfake::Error>(())
//! ```

mod base;
mod builder;
mod members;
mod registry;
mod token;

use std::sync::{Arc, OnceLock};

pub use base::{TypeArg, TypeAttributes, TypeFlavor, TypeRef};
pub use builder::{out_param, param, ref_param, ParameterSpec, TypeBuilder};
pub use members::{
    constructor_body, method_body, Constructor, ConstructorBody, ConstructorRc, Event, EventRc,
    Field, Method, MethodBody, MethodModifiers, MethodRc, MethodSemantics, ObjectMember,
    ParamAttributes, Parameter, Property, PropertyRc,
};
pub use registry::TypeRegistry;
pub use token::{Token, TokenTable};

use crate::{value::Value, Error, Result};

/// Reference to a `TypeDef`
pub type TypeRc = Arc<TypeDef>;

/// Represents a type that can be faked, used as an argument or returned from a faked member.
pub struct TypeDef {
    /// Token
    pub token: Token,
    /// Kind of the type
    pub flavor: TypeFlavor,
    /// Namespace (can be empty)
    pub namespace: String,
    /// Type name
    pub name: String,
    /// Abstract / sealed flags
    pub flags: TypeAttributes,
    /// This types base aka 'extends'
    base: OnceLock<TypeRef>,
    /// All interfaces this type implements
    pub interfaces: boxcar::Vec<TypeRef>,
    /// All methods declared by this type, accessors included
    pub methods: boxcar::Vec<MethodRc>,
    /// All constructors of this type
    pub constructors: boxcar::Vec<ConstructorRc>,
    /// All properties declared by this type
    pub properties: boxcar::Vec<PropertyRc>,
    /// All events declared by this type
    pub events: boxcar::Vec<EventRc>,
    /// Instance fields (value types)
    pub fields: boxcar::Vec<Field>,
    /// Generic arguments of a constructed type (e.g. the `T` of `Lazy<T>`)
    pub generic_args: boxcar::Vec<TypeRef>,
}

impl TypeDef {
    /// Create a new instance of a `TypeDef`
    pub fn new(
        token: Token,
        flavor: TypeFlavor,
        namespace: String,
        name: String,
        flags: TypeAttributes,
    ) -> Self {
        TypeDef {
            token,
            flavor,
            namespace,
            name,
            flags,
            base: OnceLock::new(),
            interfaces: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            constructors: boxcar::Vec::new(),
            properties: boxcar::Vec::new(),
            events: boxcar::Vec::new(),
            fields: boxcar::Vec::new(),
            generic_args: boxcar::Vec::new(),
        }
    }

    /// Access the base type of this type, if it exists
    pub fn base(&self) -> Option<TypeRc> {
        self.base.get().and_then(TypeRef::upgrade)
    }

    /// Set the base type of this type. Only the first call has an effect.
    pub fn set_base(&self, base: &TypeRc) {
        self.base.set(TypeRef::new(base)).ok();
    }

    /// Returns the full name (Namespace.Name) of the type
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }

    /// Returns true for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flavor == TypeFlavor::Interface
    }

    /// Returns true for `System.Void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.flavor == TypeFlavor::Void
    }

    /// Returns true if the type can not be derived from
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
            || self.flavor.is_value_type()
            || matches!(
                self.flavor,
                TypeFlavor::Void | TypeFlavor::String | TypeFlavor::Delegate | TypeFlavor::Lazy
            )
    }

    /// Returns true if the type can not be instantiated directly
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT) || self.is_interface()
    }

    /// Returns true if a proxy can be generated for this type
    #[must_use]
    pub fn can_be_proxied(&self) -> bool {
        match self.flavor {
            TypeFlavor::Interface => true,
            TypeFlavor::Class | TypeFlavor::Object => !self.is_sealed(),
            _ => false,
        }
    }

    /// The `T` of a `Lazy<T>`
    #[must_use]
    pub fn element_type(&self) -> Option<TypeRc> {
        self.generic_args.get(0).and_then(TypeRef::upgrade)
    }

    /// The `Invoke` signature of a delegate type
    #[must_use]
    pub fn delegate_invoke(&self) -> Option<MethodRc> {
        if self.flavor != TypeFlavor::Delegate {
            return None;
        }
        self.methods
            .iter()
            .map(|(_, method)| method)
            .find(|method| method.name == "Invoke")
            .cloned()
    }

    /// All methods callable on an instance of this type.
    ///
    /// Own methods come first, followed by interface members not implemented by an own
    /// method, followed by inherited members (ending with the `System.Object` members).
    #[must_use]
    pub fn all_methods(&self) -> Vec<MethodRc> {
        let mut methods: Vec<MethodRc> = Vec::new();
        self.collect_methods(&mut methods, 0);
        methods
    }

    fn collect_methods(&self, methods: &mut Vec<MethodRc>, depth: usize) {
        // Type graphs are built through the builder and can not be circular, but a
        // malicious set of weak references should not hang the process either
        if depth > 64 {
            return;
        }

        for (_, method) in self.methods.iter() {
            if !methods.iter().any(|known| known.has_same_signature(method)) {
                methods.push(method.clone());
            }
        }

        for (_, interface) in self.interfaces.iter() {
            if let Some(interface) = interface.upgrade() {
                interface.collect_methods(methods, depth + 1);
            }
        }

        if let Some(base) = self.base() {
            base.collect_methods(methods, depth + 1);
        }
    }

    /// Finds all callable methods with the given name (overloads)
    #[must_use]
    pub fn find_methods(&self, name: &str) -> Vec<MethodRc> {
        self.all_methods()
            .into_iter()
            .filter(|method| method.name == name)
            .collect()
    }

    /// Selects the overload of `name` that accepts `arguments`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if no overload takes the given arguments.
    pub fn resolve_method(&self, name: &str, arguments: &[Value]) -> Result<MethodRc> {
        let candidates: Vec<MethodRc> = self
            .find_methods(name)
            .into_iter()
            .filter(|method| method.params.len() == arguments.len())
            .collect();

        if candidates.len() == 1 {
            return Ok(candidates[0].clone());
        }

        candidates
            .iter()
            .find(|method| {
                method.params.iter().zip(arguments).all(|(param, value)| {
                    param
                        .param_type
                        .upgrade()
                        .is_some_and(|param_type| value.is_assignable_to(&param_type))
                })
            })
            .cloned()
            .ok_or_else(|| Error::MemberNotFound {
                type_name: self.fullname(),
                member: format!("{name}/{}", arguments.len()),
            })
    }

    /// Finds a property by name, including inherited and interface properties
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<PropertyRc> {
        if let Some((_, property)) = self
            .properties
            .iter()
            .find(|(_, property)| property.name == name)
        {
            return Some(property.clone());
        }

        self.interfaces
            .iter()
            .filter_map(|(_, interface)| interface.upgrade())
            .chain(self.base())
            .find_map(|parent| parent.find_property(name))
    }

    /// Finds an event by name, including inherited and interface events
    #[must_use]
    pub fn find_event(&self, name: &str) -> Option<EventRc> {
        if let Some((_, event)) = self.events.iter().find(|(_, event)| event.name == name) {
            return Some(event.clone());
        }

        self.interfaces
            .iter()
            .filter_map(|(_, interface)| interface.upgrade())
            .chain(self.base())
            .find_map(|parent| parent.find_event(name))
    }

    /// Returns true if a value of this type can be used where `target` is expected
    #[must_use]
    pub fn is_assignable_to(&self, target: &TypeDef) -> bool {
        if std::ptr::eq(self, target) || self.token == target.token {
            return true;
        }
        if target.flavor == TypeFlavor::Object {
            return !self.is_void();
        }

        self.interfaces
            .iter()
            .filter_map(|(_, interface)| interface.upgrade())
            .chain(self.base())
            .any(|parent| parent.is_assignable_to(target))
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("token", &self.token)
            .field("name", &self.fullname())
            .field("flavor", &self.flavor)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
