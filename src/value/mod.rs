//! Dynamic values flowing through faked calls.
//!
//! Arguments, return values, property values and dummies are all represented as [`Value`].
//! Reference types travel as [`ObjectRef`] (shared [`Instance`]s compared by identity),
//! value types as primitives or [`StructValue`]s compared by content.
//!
//! # Key Types
//!
//! - [`Value`]: the dynamic value itself
//! - [`Instance`] / [`ObjectRef`]: an object, either a fake proxy or a constructed instance
//! - [`Delegate`] and [`Raise`]: event handlers and the marker that raises an event
//! - [`LazyValue`]: a deferred value, the dummy of `System.Lazy<T>`
//! - [`Invocable`]: a real object calls can be forwarded to
//!
//! # Examples
//!
//! ```rust
//! use dotfake::{typesystem::TypeRegistry, Value};
//!
//! let registry = TypeRegistry::new();
//! assert_eq!(Value::default_for(&registry.i4()), Value::I4(0));
//! assert_eq!(Value::default_for(&registry.string()), Value::Null);
//! assert!(Value::from("text").is_assignable_to(&registry.object()));
//! assert_eq!(Value::from("text").to_string(), "\"text\"");
//! ```

mod delegate;
mod instance;
mod wrappers;

use std::{fmt, sync::Arc};

pub use delegate::{Delegate, HandlerFn, Raise};
pub use instance::{Instance, InstanceKind, Invocable, ObjectRef};
pub use wrappers::{LazyValue, StructValue};

use crate::typesystem::{TypeFlavor, TypeRc};

/// A dynamically typed value
#[derive(Clone, Debug)]
pub enum Value {
    /// The absence of a value, returned by `void` methods
    Void,
    /// The null reference
    Null,
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Char`
    Char(char),
    /// `System.SByte`
    I1(i8),
    /// `System.Byte`
    U1(u8),
    /// `System.Int16`
    I2(i16),
    /// `System.UInt16`
    U2(u16),
    /// `System.Int32`
    I4(i32),
    /// `System.UInt32`
    U4(u32),
    /// `System.Int64`
    I8(i64),
    /// `System.UInt64`
    U8(u64),
    /// `System.Single`
    R4(f32),
    /// `System.Double`
    R8(f64),
    /// `System.IntPtr`
    I(isize),
    /// `System.UIntPtr`
    U(usize),
    /// `System.String`
    String(String),
    /// A reference type instance
    Object(ObjectRef),
    /// A user defined value type
    Struct(StructValue),
    /// A `System.Lazy<T>`
    Lazy(LazyValue),
    /// A delegate, either a handler or a [`Raise`] marker
    Delegate(Delegate),
}

impl Value {
    /// Returns the default (zero) value of `ty`
    ///
    /// Value types produce their zero value, reference types `Null` and `System.Void`
    /// produces `Void`.
    #[must_use]
    pub fn default_for(ty: &TypeRc) -> Value {
        match ty.flavor {
            TypeFlavor::Void => Value::Void,
            TypeFlavor::Boolean => Value::Boolean(false),
            TypeFlavor::Char => Value::Char('\0'),
            TypeFlavor::I1 => Value::I1(0),
            TypeFlavor::U1 => Value::U1(0),
            TypeFlavor::I2 => Value::I2(0),
            TypeFlavor::U2 => Value::U2(0),
            TypeFlavor::I4 => Value::I4(0),
            TypeFlavor::U4 => Value::U4(0),
            TypeFlavor::I8 => Value::I8(0),
            TypeFlavor::U8 => Value::U8(0),
            TypeFlavor::R4 => Value::R4(0.0),
            TypeFlavor::R8 => Value::R8(0.0),
            TypeFlavor::I => Value::I(0),
            TypeFlavor::U => Value::U(0),
            TypeFlavor::ValueType => Value::Struct(StructValue::zeroed(ty)),
            TypeFlavor::Object
            | TypeFlavor::String
            | TypeFlavor::Class
            | TypeFlavor::Interface
            | TypeFlavor::Delegate
            | TypeFlavor::Lazy => Value::Null,
        }
    }

    /// Returns true if this value can be passed where `target` is expected
    #[must_use]
    pub fn is_assignable_to(&self, target: &TypeRc) -> bool {
        let flavor = target.flavor;
        if flavor == TypeFlavor::Object {
            return !matches!(self, Value::Void);
        }

        match self {
            Value::Void => flavor == TypeFlavor::Void,
            Value::Null => flavor.is_reference_type(),
            Value::Boolean(_) => flavor == TypeFlavor::Boolean,
            Value::Char(_) => flavor == TypeFlavor::Char,
            Value::I1(_) => flavor == TypeFlavor::I1,
            Value::U1(_) => flavor == TypeFlavor::U1,
            Value::I2(_) => flavor == TypeFlavor::I2,
            Value::U2(_) => flavor == TypeFlavor::U2,
            Value::I4(_) => flavor == TypeFlavor::I4,
            Value::U4(_) => flavor == TypeFlavor::U4,
            Value::I8(_) => flavor == TypeFlavor::I8,
            Value::U8(_) => flavor == TypeFlavor::U8,
            Value::R4(_) => flavor == TypeFlavor::R4,
            Value::R8(_) => flavor == TypeFlavor::R8,
            Value::I(_) => flavor == TypeFlavor::I,
            Value::U(_) => flavor == TypeFlavor::U,
            Value::String(_) => flavor == TypeFlavor::String,
            Value::Object(instance) => instance.is_instance_of(target),
            Value::Struct(value) => value.type_def().token == target.token,
            Value::Lazy(lazy) => lazy.type_def().token == target.token,
            Value::Delegate(_) => flavor == TypeFlavor::Delegate,
        }
    }

    /// Returns true for `Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `Void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// The boolean payload
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// The `System.Int32` payload
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I4(value) => Some(*value),
            _ => None,
        }
    }

    /// Any integral payload widened to `i64`
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I1(value) => Some(i64::from(*value)),
            Value::U1(value) => Some(i64::from(*value)),
            Value::I2(value) => Some(i64::from(*value)),
            Value::U2(value) => Some(i64::from(*value)),
            Value::I4(value) => Some(i64::from(*value)),
            Value::U4(value) => Some(i64::from(*value)),
            Value::I8(value) => Some(*value),
            _ => None,
        }
    }

    /// The string payload
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// The object payload
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The delegate payload
    #[must_use]
    pub fn as_delegate(&self) -> Option<&Delegate> {
        match self {
            Value::Delegate(delegate) => Some(delegate),
            _ => None,
        }
    }

    /// The lazy payload
    #[must_use]
    pub fn as_lazy(&self) -> Option<&LazyValue> {
        match self {
            Value::Lazy(lazy) => Some(lazy),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Boolean(lhs), Value::Boolean(rhs)) => lhs == rhs,
            (Value::Char(lhs), Value::Char(rhs)) => lhs == rhs,
            (Value::I1(lhs), Value::I1(rhs)) => lhs == rhs,
            (Value::U1(lhs), Value::U1(rhs)) => lhs == rhs,
            (Value::I2(lhs), Value::I2(rhs)) => lhs == rhs,
            (Value::U2(lhs), Value::U2(rhs)) => lhs == rhs,
            (Value::I4(lhs), Value::I4(rhs)) => lhs == rhs,
            (Value::U4(lhs), Value::U4(rhs)) => lhs == rhs,
            (Value::I8(lhs), Value::I8(rhs)) => lhs == rhs,
            (Value::U8(lhs), Value::U8(rhs)) => lhs == rhs,
            (Value::R4(lhs), Value::R4(rhs)) => lhs == rhs,
            (Value::R8(lhs), Value::R8(rhs)) => lhs == rhs,
            (Value::I(lhs), Value::I(rhs)) => lhs == rhs,
            (Value::U(lhs), Value::U(rhs)) => lhs == rhs,
            (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
            (Value::Object(lhs), Value::Object(rhs)) => Arc::ptr_eq(lhs, rhs),
            (Value::Struct(lhs), Value::Struct(rhs)) => lhs == rhs,
            (Value::Lazy(lhs), Value::Lazy(rhs)) => lhs.same_as(rhs),
            (Value::Delegate(lhs), Value::Delegate(rhs)) => lhs.same_as(rhs),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "<VOID>"),
            Value::Null => write!(f, "<NULL>"),
            Value::Boolean(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            Value::Char(value) => write!(f, "'{value}'"),
            Value::I1(value) => write!(f, "{value}"),
            Value::U1(value) => write!(f, "{value}"),
            Value::I2(value) => write!(f, "{value}"),
            Value::U2(value) => write!(f, "{value}"),
            Value::I4(value) => write!(f, "{value}"),
            Value::U4(value) => write!(f, "{value}"),
            Value::I8(value) => write!(f, "{value}"),
            Value::U8(value) => write!(f, "{value}"),
            Value::R4(value) => write!(f, "{value}"),
            Value::R8(value) => write!(f, "{value}"),
            Value::I(value) => write!(f, "{value}"),
            Value::U(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "\"{value}\""),
            Value::Object(object) => write!(f, "{object}"),
            Value::Struct(value) => write!(f, "{}", value.type_def().fullname()),
            Value::Lazy(lazy) => write!(f, "{}", lazy.type_def().fullname()),
            Value::Delegate(delegate) => write!(f, "{delegate}"),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    char => Char,
    i8 => I1,
    u8 => U1,
    i16 => I2,
    u16 => U2,
    i32 => I4,
    u32 => U4,
    i64 => I8,
    u64 => U8,
    f32 => R4,
    f64 => R8,
    isize => I,
    usize => U,
    String => String,
    ObjectRef => Object,
    StructValue => Struct,
    LazyValue => Lazy,
    Delegate => Delegate,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&ObjectRef> for Value {
    fn from(value: &ObjectRef) -> Self {
        Value::Object(value.clone())
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
