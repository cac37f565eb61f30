use std::sync::{Arc, Weak};

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::typesystem::{TypeDef, TypeRc};

/// A smart reference to a `TypeDef` that holds a weak reference.
///
/// Types refer to each other (members returning their own declaring type, constructors
/// taking a parent of the same type, ...). The [`crate::typesystem::TypeRegistry`] owns every
/// type strongly, all cross references are weak to keep those cycles from leaking.
#[derive(Clone, Debug)]
pub struct TypeRef {
    weak_ref: Weak<TypeDef>,
    fullname: Arc<str>,
}

impl TypeRef {
    /// Create a new `TypeRef` from a strong reference
    pub fn new(strong_ref: &TypeRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
            fullname: Arc::from(strong_ref.fullname().as_str()),
        }
    }

    /// Get a strong reference to the type, returning None if the type has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced type is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// The full name of the referenced type, available even after the type was dropped
    #[must_use]
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Returns true if both references point at the same type
    #[must_use]
    pub fn is(&self, other: &TypeRc) -> bool {
        std::ptr::eq(self.weak_ref.as_ptr(), Arc::as_ptr(other))
    }
}

impl From<&TypeRc> for TypeRef {
    fn from(strong_ref: &TypeRc) -> Self {
        Self::new(strong_ref)
    }
}

/// A type argument handed to the [`crate::typesystem::TypeBuilder`].
///
/// Besides already registered types, a builder member may refer to the type that is
/// currently being built, e.g. a constructor taking a parent node of the same type.
#[derive(Clone, Debug)]
pub enum TypeArg {
    /// An already registered type
    Type(TypeRc),
    /// The type under construction
    This,
}

impl From<&TypeRc> for TypeArg {
    fn from(value: &TypeRc) -> Self {
        TypeArg::Type(value.clone())
    }
}

impl From<TypeRc> for TypeArg {
    fn from(value: TypeRc) -> Self {
        TypeArg::Type(value)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type attributes that influence whether and how a type can be faked
    pub struct TypeAttributes: u32 {
        /// Type can not be instantiated directly
        const ABSTRACT = 0x0080;
        /// Type can not be derived from, so no proxy can be generated for it
        const SEALED = 0x0100;
    }
}

#[allow(missing_docs)]
/// Represents the kind of a type in the runtime type model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TypeFlavor {
    // Base primitive types
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    I,
    U,
    Object,
    String,

    // Type categories
    Class,
    Interface,
    ValueType,
    Delegate,

    /// Deferred wrapper around its single generic argument
    Lazy,
}

impl TypeFlavor {
    /// Check if this is a primitive type
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeFlavor::Void
                | TypeFlavor::Boolean
                | TypeFlavor::Char
                | TypeFlavor::I1
                | TypeFlavor::U1
                | TypeFlavor::I2
                | TypeFlavor::U2
                | TypeFlavor::I4
                | TypeFlavor::U4
                | TypeFlavor::I8
                | TypeFlavor::U8
                | TypeFlavor::R4
                | TypeFlavor::R8
                | TypeFlavor::I
                | TypeFlavor::U
                | TypeFlavor::Object
                | TypeFlavor::String
        )
    }

    /// Check if this is a value type
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            TypeFlavor::Boolean
                | TypeFlavor::Char
                | TypeFlavor::I1
                | TypeFlavor::U1
                | TypeFlavor::I2
                | TypeFlavor::U2
                | TypeFlavor::I4
                | TypeFlavor::U4
                | TypeFlavor::I8
                | TypeFlavor::U8
                | TypeFlavor::R4
                | TypeFlavor::R8
                | TypeFlavor::I
                | TypeFlavor::U
                | TypeFlavor::ValueType
        )
    }

    /// Check if this is a reference type
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        matches!(
            self,
            TypeFlavor::Object
                | TypeFlavor::String
                | TypeFlavor::Class
                | TypeFlavor::Interface
                | TypeFlavor::Delegate
                | TypeFlavor::Lazy
        )
    }

    /// Namespace and name of the built-in type backing a primitive flavor
    #[must_use]
    pub fn clr_name(&self) -> Option<(&'static str, &'static str)> {
        let name = match self {
            TypeFlavor::Void => "Void",
            TypeFlavor::Boolean => "Boolean",
            TypeFlavor::Char => "Char",
            TypeFlavor::I1 => "SByte",
            TypeFlavor::U1 => "Byte",
            TypeFlavor::I2 => "Int16",
            TypeFlavor::U2 => "UInt16",
            TypeFlavor::I4 => "Int32",
            TypeFlavor::U4 => "UInt32",
            TypeFlavor::I8 => "Int64",
            TypeFlavor::U8 => "UInt64",
            TypeFlavor::R4 => "Single",
            TypeFlavor::R8 => "Double",
            TypeFlavor::I => "IntPtr",
            TypeFlavor::U => "UIntPtr",
            TypeFlavor::Object => "Object",
            TypeFlavor::String => "String",
            _ => return None,
        };
        Some(("System", name))
    }
}
