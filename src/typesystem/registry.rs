//! Central type registry.
//!
//! This module provides the `TypeRegistry`, a thread-safe registry owning every type known
//! to a [`crate::FakeContext`]. Types refer to each other through weak
//! [`crate::typesystem::TypeRef`]s; the registry is what keeps them alive.
//!
//! # Registry Architecture
//!
//! - **Token-based lookup**: Primary index using tokens (`SkipMap`, ordered by registration)
//! - **Name-based lookup**: Secondary index by full name (`DashMap`)
//! - **Built-ins**: `System.Void`, `System.Object`, `System.String` and every primitive are
//!   registered on construction, `System.Object` carrying `Equals`, `GetHashCode` and
//!   `ToString`
//! - **Constructed types**: `Lazy<T>` instances are created on demand and deduplicated by name
//!
//! # Examples
//!
//! ```rust
//! use dotfake::typesystem::{TypeFlavor, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let int32 = registry.get_by_fullname("System.Int32").unwrap();
//! assert_eq!(int32.flavor, TypeFlavor::I4);
//!
//! let lazy = registry.lazy_of(&int32);
//! assert_eq!(lazy.fullname(), "System.Lazy`1[System.Int32]");
//! assert!(std::sync::Arc::ptr_eq(&lazy, &registry.lazy_of(&int32)));
//! ```

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    typesystem::{
        method_body, Constructor, Method, MethodModifiers, MethodSemantics, ObjectMember,
        ParamAttributes,
        Parameter, Token, TokenTable, TypeAttributes, TypeBuilder, TypeDef, TypeFlavor, TypeRc,
        TypeRef,
    },
    value::Value,
    Result,
};

/// Strong references to the types every registry starts with
struct Builtins {
    void: TypeRc,
    boolean: TypeRc,
    char: TypeRc,
    i1: TypeRc,
    u1: TypeRc,
    i2: TypeRc,
    u2: TypeRc,
    i4: TypeRc,
    u4: TypeRc,
    i8: TypeRc,
    u8: TypeRc,
    r4: TypeRc,
    r8: TypeRc,
    i: TypeRc,
    u: TypeRc,
    object: TypeRc,
    string: TypeRc,
}

/// Central registry managing all types known to a fake context
pub struct TypeRegistry {
    /// Primary storage, keyed by token
    types: SkipMap<Token, TypeRc>,
    /// Full name index
    by_fullname: DashMap<String, TypeRc>,
    /// Next free row per token table
    next_type: AtomicU32,
    next_method: AtomicU32,
    next_property: AtomicU32,
    next_event: AtomicU32,
    builtins: Builtins,
}

impl TypeRegistry {
    /// Create a new registry with all built-in types
    pub fn new() -> Self {
        let types = SkipMap::new();
        let by_fullname = DashMap::new();
        let next_type = AtomicU32::new(1);

        let make = |flavor: TypeFlavor| -> TypeRc {
            let (namespace, name) = flavor.clr_name().unwrap_or(("System", "Object"));
            let row = next_type.fetch_add(1, Ordering::Relaxed);
            let flags = if flavor == TypeFlavor::Object {
                TypeAttributes::empty()
            } else {
                TypeAttributes::SEALED
            };
            let type_def = Arc::new(TypeDef::new(
                Token::from_parts(TokenTable::TypeDef, row),
                flavor,
                namespace.to_string(),
                name.to_string(),
                flags,
            ));
            types.insert(type_def.token, type_def.clone());
            by_fullname.insert(type_def.fullname(), type_def.clone());
            type_def
        };

        let builtins = Builtins {
            void: make(TypeFlavor::Void),
            boolean: make(TypeFlavor::Boolean),
            char: make(TypeFlavor::Char),
            i1: make(TypeFlavor::I1),
            u1: make(TypeFlavor::U1),
            i2: make(TypeFlavor::I2),
            u2: make(TypeFlavor::U2),
            i4: make(TypeFlavor::I4),
            u4: make(TypeFlavor::U4),
            i8: make(TypeFlavor::I8),
            u8: make(TypeFlavor::U8),
            r4: make(TypeFlavor::R4),
            r8: make(TypeFlavor::R8),
            i: make(TypeFlavor::I),
            u: make(TypeFlavor::U),
            object: make(TypeFlavor::Object),
            string: make(TypeFlavor::String),
        };

        let registry = TypeRegistry {
            types,
            by_fullname,
            next_type,
            next_method: AtomicU32::new(1),
            next_property: AtomicU32::new(1),
            next_event: AtomicU32::new(1),
            builtins,
        };
        registry.populate_object();
        registry
    }

    /// Adds the `System.Object` members and its parameterless constructor
    fn populate_object(&self) {
        let object = &self.builtins.object;
        let declaring = TypeRef::new(object);
        let modifiers = MethodModifiers::VIRTUAL;

        object.methods.push(Arc::new(Method::new(
            self.next_token(TokenTable::MethodDef),
            "Equals".to_string(),
            declaring.clone(),
            vec![Parameter {
                name: "obj".to_string(),
                param_type: TypeRef::new(object),
                flags: ParamAttributes::empty(),
            }],
            TypeRef::new(&self.builtins.boolean),
            modifiers,
            MethodSemantics::ObjectMember(ObjectMember::Equals),
            Some(method_body(|this, arguments| {
                let same = matches!(
                    arguments.first(),
                    Some(Value::Object(other)) if Arc::ptr_eq(other, this)
                );
                Ok(Value::Boolean(same))
            })),
        )));

        object.methods.push(Arc::new(Method::new(
            self.next_token(TokenTable::MethodDef),
            "GetHashCode".to_string(),
            declaring.clone(),
            Vec::new(),
            TypeRef::new(&self.builtins.i4),
            modifiers,
            MethodSemantics::ObjectMember(ObjectMember::GetHashCode),
            Some(method_body(|this, _| Ok(Value::I4(this.hash_code())))),
        )));

        object.methods.push(Arc::new(Method::new(
            self.next_token(TokenTable::MethodDef),
            "ToString".to_string(),
            declaring,
            Vec::new(),
            TypeRef::new(&self.builtins.string),
            modifiers,
            MethodSemantics::ObjectMember(ObjectMember::ToString),
            Some(method_body(|this, _| {
                Ok(Value::String(this.type_def().fullname()))
            })),
        )));

        object.constructors.push(Arc::new(Constructor::new(
            self.next_token(TokenTable::MethodDef),
            Vec::new(),
            None,
        )));
    }

    /// Allocates the next token of `table`
    pub fn next_token(&self, table: TokenTable) -> Token {
        let counter = match table {
            TokenTable::TypeDef => &self.next_type,
            TokenTable::MethodDef => &self.next_method,
            TokenTable::Property => &self.next_property,
            TokenTable::Event => &self.next_event,
        };
        Token::from_parts(table, counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a new type
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if a type with the same full name exists.
    pub fn insert(&self, type_def: TypeDef) -> Result<TypeRc> {
        match self.by_fullname.entry(type_def.fullname()) {
            Entry::Occupied(entry) => Err(configuration_error!(
                "A type named {} is already registered",
                entry.key()
            )),
            Entry::Vacant(entry) => {
                let type_rc = Arc::new(type_def);
                self.types.insert(type_rc.token, type_rc.clone());
                entry.insert(type_rc.clone());
                Ok(type_rc)
            }
        }
    }

    /// Look up a type by token
    pub fn get(&self, token: &Token) -> Option<TypeRc> {
        self.types.get(token).map(|entry| entry.value().clone())
    }

    /// Look up a type by its full name
    pub fn get_by_fullname(&self, fullname: &str) -> Option<TypeRc> {
        self.by_fullname.get(fullname).map(|entry| entry.value().clone())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no types are registered (never the case after construction)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered types in registration order
    pub fn all_types(&self) -> Vec<TypeRc> {
        self.types.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns the built-in type for a primitive flavor
    pub fn primitive(&self, flavor: TypeFlavor) -> Option<TypeRc> {
        let builtins = &self.builtins;
        let type_rc = match flavor {
            TypeFlavor::Void => &builtins.void,
            TypeFlavor::Boolean => &builtins.boolean,
            TypeFlavor::Char => &builtins.char,
            TypeFlavor::I1 => &builtins.i1,
            TypeFlavor::U1 => &builtins.u1,
            TypeFlavor::I2 => &builtins.i2,
            TypeFlavor::U2 => &builtins.u2,
            TypeFlavor::I4 => &builtins.i4,
            TypeFlavor::U4 => &builtins.u4,
            TypeFlavor::I8 => &builtins.i8,
            TypeFlavor::U8 => &builtins.u8,
            TypeFlavor::R4 => &builtins.r4,
            TypeFlavor::R8 => &builtins.r8,
            TypeFlavor::I => &builtins.i,
            TypeFlavor::U => &builtins.u,
            TypeFlavor::Object => &builtins.object,
            TypeFlavor::String => &builtins.string,
            _ => return None,
        };
        Some(type_rc.clone())
    }

    /// `System.Void`
    pub fn void(&self) -> TypeRc {
        self.builtins.void.clone()
    }

    /// `System.Object`
    pub fn object(&self) -> TypeRc {
        self.builtins.object.clone()
    }

    /// `System.String`
    pub fn string(&self) -> TypeRc {
        self.builtins.string.clone()
    }

    /// `System.Boolean`
    pub fn boolean(&self) -> TypeRc {
        self.builtins.boolean.clone()
    }

    /// `System.Char`
    pub fn char(&self) -> TypeRc {
        self.builtins.char.clone()
    }

    /// `System.Int32`
    pub fn i4(&self) -> TypeRc {
        self.builtins.i4.clone()
    }

    /// `System.Int64`
    pub fn i8(&self) -> TypeRc {
        self.builtins.i8.clone()
    }

    /// `System.Double`
    pub fn r8(&self) -> TypeRc {
        self.builtins.r8.clone()
    }

    /// Returns the `Lazy<T>` type for `element`, creating it on first use
    pub fn lazy_of(&self, element: &TypeRc) -> TypeRc {
        let fullname = format!("System.Lazy`1[{}]", element.fullname());
        match self.by_fullname.entry(fullname) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let name = entry.key().trim_start_matches("System.").to_string();
                let lazy = TypeDef::new(
                    self.next_token(TokenTable::TypeDef),
                    TypeFlavor::Lazy,
                    "System".to_string(),
                    name,
                    TypeAttributes::SEALED,
                );
                lazy.generic_args.push(TypeRef::new(element));
                let lazy = Arc::new(lazy);
                lazy.set_base(&self.builtins.object);
                self.types.insert(lazy.token, lazy.clone());
                entry.insert(lazy.clone());
                lazy
            }
        }
    }

    /// Starts the definition of an interface
    pub fn interface(&self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, TypeFlavor::Interface, namespace, name)
    }

    /// Starts the definition of a class
    pub fn class(&self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, TypeFlavor::Class, namespace, name)
    }

    /// Starts the definition of a value type
    pub fn value_type(&self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, TypeFlavor::ValueType, namespace, name)
    }

    /// Starts the definition of a delegate type
    pub fn delegate(&self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, TypeFlavor::Delegate, namespace, name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
