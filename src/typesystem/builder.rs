//! Builder for runtime type definitions.
//!
//! This module provides the [`TypeBuilder`] struct, which offers a fluent API for describing
//! the interfaces, classes, value types and delegates a test wants to fake or use as
//! arguments. Members are collected first and attached when [`TypeBuilder::build`] registers
//! the type in its [`TypeRegistry`], so members can refer to the type under construction via
//! [`TypeArg::This`].
//!
//! # Example
//!
//! ```rust
//! use dotfake::typesystem::{param, TypeArg, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let node = registry
//!     .class("Acme", "Node")
//!     .constructor([param("parent", TypeArg::This)])
//!     .method("Next", TypeArg::This, [])
//!     .build()?;
//!
//! assert_eq!(node.constructors.count(), 1);
//! assert_eq!(node.find_methods("Next")[0].return_type.fullname(), "Acme.Node");
//! # Ok::<(), dotfake::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    typesystem::{
        Constructor, ConstructorBody, Event, Field, Method, MethodBody, MethodModifiers,
        MethodSemantics, ParamAttributes, Parameter, Property, TokenTable, TypeArg,
        TypeAttributes, TypeDef, TypeFlavor, TypeRc, TypeRef, TypeRegistry,
    },
    Result,
};

/// A parameter of a method or constructor that is still being built
#[derive(Clone, Debug)]
pub struct ParameterSpec {
    name: String,
    param_type: TypeArg,
    flags: ParamAttributes,
}

/// Describes an ordinary (by value) parameter
pub fn param(name: &str, param_type: impl Into<TypeArg>) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        param_type: param_type.into(),
        flags: ParamAttributes::empty(),
    }
}

/// Describes an `out` parameter
pub fn out_param(name: &str, param_type: impl Into<TypeArg>) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        param_type: param_type.into(),
        flags: ParamAttributes::OUT | ParamAttributes::BY_REF,
    }
}

/// Describes a `ref` parameter
pub fn ref_param(name: &str, param_type: impl Into<TypeArg>) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        param_type: param_type.into(),
        flags: ParamAttributes::BY_REF,
    }
}

struct MethodSpec {
    name: String,
    returns: TypeArg,
    params: Vec<ParameterSpec>,
    modifiers: MethodModifiers,
    body: Option<MethodBody>,
}

struct PropertySpec {
    name: String,
    property_type: TypeArg,
    writable: bool,
}

struct EventSpec {
    name: String,
    handler_type: TypeRc,
}

struct ConstructorSpec {
    params: Vec<ParameterSpec>,
    body: Option<ConstructorBody>,
}

/// Provides a fluent API for defining a type and its members
pub struct TypeBuilder<'a> {
    registry: &'a TypeRegistry,
    flavor: TypeFlavor,
    namespace: String,
    name: String,
    flags: TypeAttributes,
    base: Option<TypeRc>,
    interfaces: Vec<TypeRc>,
    methods: Vec<MethodSpec>,
    properties: Vec<PropertySpec>,
    events: Vec<EventSpec>,
    constructors: Vec<ConstructorSpec>,
    fields: Vec<(String, TypeArg)>,
}

impl<'a> TypeBuilder<'a> {
    /// Create a new builder for a type of `flavor`
    ///
    /// ## Arguments
    /// * 'registry'  - The registry the type is added to on [`TypeBuilder::build`]
    /// * 'flavor'    - Kind of type to build
    /// * 'namespace' - Namespace of the type
    /// * 'name'      - Name of the type
    pub fn new(
        registry: &'a TypeRegistry,
        flavor: TypeFlavor,
        namespace: &str,
        name: &str,
    ) -> Self {
        TypeBuilder {
            registry,
            flavor,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags: TypeAttributes::empty(),
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn default_modifiers(&self) -> MethodModifiers {
        if self.flavor == TypeFlavor::Interface {
            MethodModifiers::ABSTRACT | MethodModifiers::VIRTUAL
        } else {
            MethodModifiers::VIRTUAL
        }
    }

    /// Adds an overridable method without a base implementation
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        returns: impl Into<TypeArg>,
        params: impl IntoIterator<Item = ParameterSpec>,
    ) -> Self {
        let modifiers = self.default_modifiers();
        self.methods.push(MethodSpec {
            name: name.to_string(),
            returns: returns.into(),
            params: params.into_iter().collect(),
            modifiers,
            body: None,
        });
        self
    }

    /// Adds a virtual method with a base implementation
    #[must_use]
    pub fn method_with_body(
        mut self,
        name: &str,
        returns: impl Into<TypeArg>,
        params: impl IntoIterator<Item = ParameterSpec>,
        body: MethodBody,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            returns: returns.into(),
            params: params.into_iter().collect(),
            modifiers: MethodModifiers::VIRTUAL,
            body: Some(body),
        });
        self
    }

    /// Adds a method that proxies can not override
    #[must_use]
    pub fn non_virtual_method(
        mut self,
        name: &str,
        returns: impl Into<TypeArg>,
        params: impl IntoIterator<Item = ParameterSpec>,
        body: MethodBody,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            returns: returns.into(),
            params: params.into_iter().collect(),
            modifiers: MethodModifiers::empty(),
            body: Some(body),
        });
        self
    }

    /// Adds a read/write property with `get_X` and `set_X` accessors
    #[must_use]
    pub fn property(mut self, name: &str, property_type: impl Into<TypeArg>) -> Self {
        self.properties.push(PropertySpec {
            name: name.to_string(),
            property_type: property_type.into(),
            writable: true,
        });
        self
    }

    /// Adds a property that only has a `get_X` accessor
    #[must_use]
    pub fn readonly_property(mut self, name: &str, property_type: impl Into<TypeArg>) -> Self {
        self.properties.push(PropertySpec {
            name: name.to_string(),
            property_type: property_type.into(),
            writable: false,
        });
        self
    }

    /// Adds an event with `add_X` and `remove_X` accessors taking a `handler_type` delegate
    #[must_use]
    pub fn event(mut self, name: &str, handler_type: &TypeRc) -> Self {
        self.events.push(EventSpec {
            name: name.to_string(),
            handler_type: handler_type.clone(),
        });
        self
    }

    /// Adds a constructor that accepts any argument of the right types
    #[must_use]
    pub fn constructor(mut self, params: impl IntoIterator<Item = ParameterSpec>) -> Self {
        self.constructors.push(ConstructorSpec {
            params: params.into_iter().collect(),
            body: None,
        });
        self
    }

    /// Adds a constructor running `body`, an error returned from the body means the
    /// constructor threw
    #[must_use]
    pub fn constructor_with_body(
        mut self,
        params: impl IntoIterator<Item = ParameterSpec>,
        body: ConstructorBody,
    ) -> Self {
        self.constructors.push(ConstructorSpec {
            params: params.into_iter().collect(),
            body: Some(body),
        });
        self
    }

    /// Adds an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: &TypeRc) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Sets the base class
    #[must_use]
    pub fn base(mut self, base: &TypeRc) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Marks the type as sealed
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.flags |= TypeAttributes::SEALED;
        self
    }

    /// Marks the type as abstract
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.flags |= TypeAttributes::ABSTRACT;
        self
    }

    /// Adds an instance field (value types)
    #[must_use]
    pub fn field(mut self, name: &str, field_type: impl Into<TypeArg>) -> Self {
        self.fields.push((name.to_string(), field_type.into()));
        self
    }

    /// Sets the `Invoke` signature of a delegate type
    #[must_use]
    pub fn invoke_signature(
        mut self,
        returns: impl Into<TypeArg>,
        params: impl IntoIterator<Item = ParameterSpec>,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: "Invoke".to_string(),
            returns: returns.into(),
            params: params.into_iter().collect(),
            modifiers: MethodModifiers::VIRTUAL,
            body: None,
        });
        self
    }

    fn validate(&self) -> Result<()> {
        let fullname = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        };

        if let Some(base) = &self.base {
            if self.flavor != TypeFlavor::Class {
                return Err(configuration_error!(
                    "Only classes can declare a base class, {} is a {}",
                    fullname,
                    self.flavor
                ));
            }
            if base.is_sealed() || base.is_interface() {
                return Err(configuration_error!(
                    "{} can not derive from {}",
                    fullname,
                    base.fullname()
                ));
            }
        }

        if let Some(interface) = self.interfaces.iter().find(|i| !i.is_interface()) {
            return Err(configuration_error!(
                "{} can not implement {}, it is not an interface",
                fullname,
                interface.fullname()
            ));
        }

        if !self.constructors.is_empty()
            && matches!(self.flavor, TypeFlavor::Interface | TypeFlavor::Delegate)
        {
            return Err(configuration_error!(
                "{} is a {} and can not declare constructors",
                fullname,
                self.flavor
            ));
        }

        if let Some(event) = self
            .events
            .iter()
            .find(|event| event.handler_type.flavor != TypeFlavor::Delegate)
        {
            return Err(configuration_error!(
                "The handler type of event {} must be a delegate, got {}",
                event.name,
                event.handler_type.fullname()
            ));
        }

        Ok(())
    }

    /// Finalize, register and return the built type
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the definition is inconsistent (deriving
    /// from a sealed type, constructors on an interface, ...) or a type with the same full
    /// name is already registered.
    pub fn build(self) -> Result<TypeRc> {
        self.validate()?;

        let accessor_modifiers = self.default_modifiers() | MethodModifiers::SPECIAL_NAME;
        let registry = self.registry;
        let type_rc = registry.insert(TypeDef::new(
            registry.next_token(TokenTable::TypeDef),
            self.flavor,
            self.namespace,
            self.name,
            self.flags,
        ))?;

        let base = self.base.unwrap_or_else(|| registry.object());
        type_rc.set_base(&base);

        let resolve = |arg: &TypeArg| -> TypeRef {
            match arg {
                TypeArg::Type(ty) => TypeRef::new(ty),
                TypeArg::This => TypeRef::new(&type_rc),
            }
        };
        let parameters = |specs: &[ParameterSpec]| -> Vec<Parameter> {
            specs
                .iter()
                .map(|spec| Parameter {
                    name: spec.name.clone(),
                    param_type: resolve(&spec.param_type),
                    flags: spec.flags,
                })
                .collect()
        };
        let declaring = TypeRef::new(&type_rc);

        for interface in &self.interfaces {
            type_rc.interfaces.push(TypeRef::new(interface));
        }

        for spec in &self.methods {
            type_rc.methods.push(Arc::new(Method::new(
                registry.next_token(TokenTable::MethodDef),
                spec.name.clone(),
                declaring.clone(),
                parameters(&spec.params),
                resolve(&spec.returns),
                spec.modifiers,
                MethodSemantics::Normal,
                spec.body.clone(),
            )));
        }

        let void = TypeRef::new(&registry.void());
        for spec in &self.properties {
            let property_type = resolve(&spec.property_type);

            let getter = Arc::new(Method::new(
                registry.next_token(TokenTable::MethodDef),
                format!("get_{}", spec.name),
                declaring.clone(),
                Vec::new(),
                property_type.clone(),
                accessor_modifiers,
                MethodSemantics::Getter(spec.name.clone()),
                None,
            ));
            type_rc.methods.push(getter.clone());

            let setter = if spec.writable {
                let setter = Arc::new(Method::new(
                    registry.next_token(TokenTable::MethodDef),
                    format!("set_{}", spec.name),
                    declaring.clone(),
                    vec![Parameter {
                        name: "value".to_string(),
                        param_type: property_type.clone(),
                        flags: ParamAttributes::empty(),
                    }],
                    void.clone(),
                    accessor_modifiers,
                    MethodSemantics::Setter(spec.name.clone()),
                    None,
                ));
                type_rc.methods.push(setter.clone());
                Some(setter)
            } else {
                None
            };

            type_rc.properties.push(Arc::new(Property {
                token: registry.next_token(TokenTable::Property),
                name: spec.name.clone(),
                property_type,
                getter: Some(getter),
                setter,
            }));
        }

        for spec in &self.events {
            let handler_type = TypeRef::new(&spec.handler_type);
            let accessor = |prefix: &str, semantics: MethodSemantics| {
                Arc::new(Method::new(
                    registry.next_token(TokenTable::MethodDef),
                    format!("{prefix}_{}", spec.name),
                    declaring.clone(),
                    vec![Parameter {
                        name: "value".to_string(),
                        param_type: handler_type.clone(),
                        flags: ParamAttributes::empty(),
                    }],
                    void.clone(),
                    accessor_modifiers,
                    semantics,
                    None,
                ))
            };
            let add = accessor("add", MethodSemantics::AddOn(spec.name.clone()));
            let remove = accessor("remove", MethodSemantics::RemoveOn(spec.name.clone()));
            type_rc.methods.push(add.clone());
            type_rc.methods.push(remove.clone());

            type_rc.events.push(Arc::new(Event {
                token: registry.next_token(TokenTable::Event),
                name: spec.name.clone(),
                handler_type,
                add,
                remove,
            }));
        }

        for spec in &self.constructors {
            type_rc.constructors.push(Arc::new(Constructor::new(
                registry.next_token(TokenTable::MethodDef),
                parameters(&spec.params),
                spec.body.clone(),
            )));
        }

        // Classes without an explicit constructor get the implicit parameterless one
        if self.constructors.is_empty() && type_rc.flavor == TypeFlavor::Class {
            type_rc.constructors.push(Arc::new(Constructor::new(
                registry.next_token(TokenTable::MethodDef),
                Vec::new(),
                None,
            )));
        }

        for (name, field_type) in &self.fields {
            type_rc.fields.push(Field {
                name: name.clone(),
                field_type: resolve(field_type),
            });
        }

        Ok(type_rc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{typesystem::method_body, value::Value, Error};

    #[test]
    fn test_build_interface() -> Result<()> {
        let registry = TypeRegistry::new();
        let foo = registry
            .interface("Acme", "IFoo")
            .method("Bar", &registry.void(), [param("x", &registry.i4())])
            .property("Name", &registry.string())
            .build()?;

        assert_eq!(foo.flavor, TypeFlavor::Interface);
        assert!(foo.is_abstract());
        assert_eq!(foo.methods.count(), 3);
        assert_eq!(foo.constructors.count(), 0);
        assert!(foo
            .methods
            .iter()
            .all(|(_, method)| method.modifiers.contains(MethodModifiers::ABSTRACT)));
        assert!(Arc::ptr_eq(&foo.base().unwrap(), &registry.object()));
        Ok(())
    }

    #[test]
    fn test_build_class_gets_implicit_constructor() -> Result<()> {
        let registry = TypeRegistry::new();
        let plain = registry.class("Acme", "Plain").build()?;
        assert_eq!(plain.constructors.count(), 1);
        assert!(plain.constructors.get(0).unwrap().params.is_empty());
        Ok(())
    }

    #[test]
    fn test_self_referencing_members() -> Result<()> {
        let registry = TypeRegistry::new();
        let node = registry
            .class("Acme", "Node")
            .constructor([param("parent", TypeArg::This)])
            .build()?;
        let ctor = node.constructors.get(0).unwrap();
        assert!(ctor.params[0].param_type.is(&node));
        Ok(())
    }

    #[test]
    fn test_readonly_property_and_event() -> Result<()> {
        let registry = TypeRegistry::new();
        let handler = registry
            .delegate("System", "EventHandler")
            .invoke_signature(
                &registry.void(),
                [
                    param("sender", &registry.object()),
                    param("e", &registry.object()),
                ],
            )
            .build()?;
        let source = registry
            .interface("Acme", "ISource")
            .readonly_property("Count", &registry.i4())
            .event("Changed", &handler)
            .build()?;

        let count = source.find_property("Count").unwrap();
        assert!(count.getter.is_some());
        assert!(count.setter.is_none());

        let changed = source.find_event("Changed").unwrap();
        assert_eq!(changed.add.name, "add_Changed");
        assert_eq!(changed.remove.name, "remove_Changed");
        assert_eq!(handler.delegate_invoke().unwrap().params.len(), 2);
        Ok(())
    }

    #[test]
    fn test_method_bodies() -> Result<()> {
        let registry = TypeRegistry::new();
        let widget = registry
            .class("Acme", "Widget")
            .method_with_body(
                "Size",
                &registry.i4(),
                [],
                method_body(|_, _| Ok(Value::I4(3))),
            )
            .build()?;
        let size = widget.find_methods("Size").pop().unwrap();
        assert!(size.body().is_some());
        assert!(!size.is_abstract());
        assert!(size.is_interceptable());
        Ok(())
    }

    #[test]
    fn test_invalid_definitions() -> Result<()> {
        let registry = TypeRegistry::new();
        let sealed = registry.class("Acme", "Sealed").sealed().build()?;
        let iface = registry.interface("Acme", "IThing").build()?;

        let derived = registry.class("Acme", "Derived").base(&sealed).build();
        assert!(matches!(derived, Err(Error::Configuration { .. })));

        let bad_impl = registry.class("Acme", "BadImpl").implements(&sealed).build();
        assert!(matches!(bad_impl, Err(Error::Configuration { .. })));

        let ctor_on_iface = registry
            .interface("Acme", "IBad")
            .constructor([param("x", &registry.i4())])
            .build();
        assert!(matches!(ctor_on_iface, Err(Error::Configuration { .. })));

        let bad_event = registry
            .interface("Acme", "IEvents")
            .event("Changed", &iface)
            .build();
        assert!(matches!(bad_event, Err(Error::Configuration { .. })));
        Ok(())
    }
}
