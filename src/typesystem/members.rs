//! Members of runtime types: methods, accessors, properties, events, constructors and fields.
//!
//! Members are immutable once built. Every type reference a member holds is a weak
//! [`TypeRef`], the [`crate::typesystem::TypeRegistry`] keeps the types alive.
//!
//! # Key Types
//! - [`Method`]: an invocable member, including property and event accessors
//! - [`Parameter`] and [`ParamAttributes`]: method and constructor parameters
//! - [`MethodModifiers`]: virtual/abstract/final flags deciding interceptability
//! - [`MethodSemantics`]: what role a method plays (accessor, `System.Object` member, ...)
//! - [`Property`], [`Event`], [`Constructor`], [`Field`]

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use strum::Display;

use crate::{
    call::ArgumentCollection,
    typesystem::{Token, TypeRc, TypeRef},
    value::{ObjectRef, Value},
    Result,
};

/// Reference to a `Method`
pub type MethodRc = Arc<Method>;
/// Reference to a `Property`
pub type PropertyRc = Arc<Property>;
/// Reference to an `Event`
pub type EventRc = Arc<Event>;
/// Reference to a `Constructor`
pub type ConstructorRc = Arc<Constructor>;

/// Base implementation of a method.
///
/// Receives the instance the method runs on and the argument values; out and ref
/// parameters are written back through the mutable slice.
pub type MethodBody = Arc<dyn Fn(&ObjectRef, &mut [Value]) -> Result<Value> + Send + Sync>;

/// Body of a constructor, returning an error models a constructor that threw.
pub type ConstructorBody = Arc<dyn Fn(&ArgumentCollection) -> Result<()> + Send + Sync>;

/// Wraps a closure into a [`MethodBody`]
pub fn method_body<F>(body: F) -> MethodBody
where
    F: Fn(&ObjectRef, &mut [Value]) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// Wraps a closure into a [`ConstructorBody`]
pub fn constructor_body<F>(body: F) -> ConstructorBody
where
    F: Fn(&ArgumentCollection) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(body)
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method modifiers and properties
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special (accessor)
        const SPECIAL_NAME = 0x0800;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Parameter attributes
    pub struct ParamAttributes: u16 {
        /// Parameter is an output parameter
        const OUT = 0x0002;
        /// Parameter is passed by reference
        const BY_REF = 0x0004;
    }
}

/// The `System.Object` members every fake carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ObjectMember {
    /// `bool Equals(object obj)`
    Equals,
    /// `int GetHashCode()`
    GetHashCode,
    /// `string ToString()`
    ToString,
}

/// The role a method plays on its declaring type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSemantics {
    /// An ordinary method
    Normal,
    /// Getter of the named property
    Getter(String),
    /// Setter of the named property
    Setter(String),
    /// Handler registration of the named event
    AddOn(String),
    /// Handler removal of the named event
    RemoveOn(String),
    /// One of the `System.Object` members
    ObjectMember(ObjectMember),
}

/// A method, constructor parameter or accessor parameter
#[derive(Clone, Debug)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub param_type: TypeRef,
    /// Out/ref flags
    pub flags: ParamAttributes,
}

impl Parameter {
    /// Returns true for `out` and `ref` parameters
    #[must_use]
    pub fn is_out_or_ref(&self) -> bool {
        self.flags
            .intersects(ParamAttributes::OUT | ParamAttributes::BY_REF)
    }
}

/// An invocable member of a type
pub struct Method {
    /// Token
    pub token: Token,
    /// Method name, accessors follow the `get_X`/`set_X`/`add_X`/`remove_X` convention
    pub name: String,
    /// The type that declares this method
    pub declaring_type: TypeRef,
    /// Parameters, in declaration order
    pub params: Vec<Parameter>,
    /// Declared return type
    pub return_type: TypeRef,
    /// Modifiers
    pub modifiers: MethodModifiers,
    /// Role of the method
    pub semantics: MethodSemantics,
    body: Option<MethodBody>,
}

impl Method {
    /// Create a new instance of a `Method`
    pub fn new(
        token: Token,
        name: String,
        declaring_type: TypeRef,
        params: Vec<Parameter>,
        return_type: TypeRef,
        modifiers: MethodModifiers,
        semantics: MethodSemantics,
        body: Option<MethodBody>,
    ) -> Self {
        Method {
            token,
            name,
            declaring_type,
            params,
            return_type,
            modifiers,
            semantics,
            body,
        }
    }

    /// Returns the full name (Namespace.Type.Method) of the method
    #[must_use]
    pub fn fullname(&self) -> String {
        format!("{}.{}", self.declaring_type.fullname(), self.name)
    }

    /// The base implementation, if the method has one
    #[must_use]
    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    /// The resolved return type
    #[must_use]
    pub fn return_type(&self) -> Option<TypeRc> {
        self.return_type.upgrade()
    }

    /// Returns true if the method does not produce a value
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.return_type.fullname() == "System.Void"
    }

    /// Returns true if a generated proxy can redirect calls of this method
    ///
    /// Interface members are abstract and virtual, class members must be virtual and not
    /// sealed. Static methods are never interceptable.
    #[must_use]
    pub fn is_interceptable(&self) -> bool {
        self.modifiers
            .intersects(MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT)
            && !self
                .modifiers
                .intersects(MethodModifiers::FINAL | MethodModifiers::STATIC)
    }

    /// Returns true if the method has no implementation
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(MethodModifiers::ABSTRACT) || self.body.is_none()
    }

    /// Name of the property this method is the getter of
    #[must_use]
    pub fn property_getter_of(&self) -> Option<&str> {
        match &self.semantics {
            MethodSemantics::Getter(property) => Some(property),
            _ => None,
        }
    }

    /// Name of the property this method is the setter of
    #[must_use]
    pub fn property_setter_of(&self) -> Option<&str> {
        match &self.semantics {
            MethodSemantics::Setter(property) => Some(property),
            _ => None,
        }
    }

    /// The `System.Object` member this method represents
    #[must_use]
    pub fn object_member(&self) -> Option<ObjectMember> {
        match self.semantics {
            MethodSemantics::ObjectMember(member) => Some(member),
            _ => None,
        }
    }

    /// Name of the event this method registers or removes handlers for
    #[must_use]
    pub fn event_accessor_of(&self) -> Option<&str> {
        match &self.semantics {
            MethodSemantics::AddOn(event) | MethodSemantics::RemoveOn(event) => Some(event),
            _ => None,
        }
    }

    /// Parameter names in declaration order
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.params.iter().map(|param| param.name.clone()).collect()
    }

    /// Returns true if `other` denotes the same member (same name and parameter types)
    ///
    /// Used to match a class member against the interface member it implements.
    #[must_use]
    pub fn has_same_signature(&self, other: &Method) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(lhs, rhs)| lhs.param_type.fullname() == rhs.param_type.fullname())
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("token", &self.token)
            .field("name", &self.fullname())
            .field("params", &self.params.len())
            .field("modifiers", &self.modifiers)
            .field("semantics", &self.semantics)
            .finish()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type.fullname(), self.fullname())?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            if param.flags.contains(ParamAttributes::OUT) {
                write!(f, "out ")?;
            } else if param.flags.contains(ParamAttributes::BY_REF) {
                write!(f, "ref ")?;
            }
            write!(f, "{} {}", param.param_type.fullname(), param.name)?;
        }
        write!(f, ")")
    }
}

/// A property with its accessors
#[derive(Debug)]
pub struct Property {
    /// Token
    pub token: Token,
    /// Property name
    pub name: String,
    /// Declared type
    pub property_type: TypeRef,
    /// `get_X` accessor
    pub getter: Option<MethodRc>,
    /// `set_X` accessor
    pub setter: Option<MethodRc>,
}

/// An event with its accessors
#[derive(Debug)]
pub struct Event {
    /// Token
    pub token: Token,
    /// Event name
    pub name: String,
    /// The delegate type of handlers
    pub handler_type: TypeRef,
    /// `add_X` accessor
    pub add: MethodRc,
    /// `remove_X` accessor
    pub remove: MethodRc,
}

/// A constructor of a class or value type
pub struct Constructor {
    /// Token
    pub token: Token,
    /// Parameters, in declaration order
    pub params: Vec<Parameter>,
    body: Option<ConstructorBody>,
}

impl Constructor {
    /// Create a new instance of a `Constructor`
    pub fn new(token: Token, params: Vec<Parameter>, body: Option<ConstructorBody>) -> Self {
        Constructor {
            token,
            params,
            body,
        }
    }

    /// Parameter names in declaration order
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.params.iter().map(|param| param.name.clone()).collect()
    }

    /// Parameter type list rendered as `(A, B)`
    #[must_use]
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self
            .params
            .iter()
            .map(|param| param.param_type.fullname())
            .collect();
        format!("({})", types.join(", "))
    }

    /// Runs the constructor body against `arguments`
    ///
    /// # Errors
    /// Returns [`crate::Error::ArgumentCountMismatch`] if the arguments do not fit the
    /// parameter list, or whatever error the body produced.
    pub fn invoke(&self, arguments: Vec<Value>) -> Result<ArgumentCollection> {
        let arguments = ArgumentCollection::new(arguments, self.parameter_names())?;
        if let Some(body) = &self.body {
            body(&arguments)?;
        }
        Ok(arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("token", &self.token)
            .field("signature", &self.signature())
            .finish()
    }
}

/// An instance field of a value type
#[derive(Clone, Debug)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Declared type
    pub field_type: TypeRef,
}
