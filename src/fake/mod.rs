//! Fakes and the context creating them.
//!
//! A [`Fake`] is the handle tests work with: it calls members on the faked object, reads
//! and writes its properties, subscribes to and raises its events, and is the entry point
//! for configuring and asserting on its calls.
//!
//! The [`FakeContext`] owns the type registry, the dummy container and the fake options
//! defaults, and creates fakes and dummies.
//!
//! # Examples
//!
//! ```rust
//! use dotfake::{args, typesystem::param, FakeContext, Repeated, Value};
//!
//! let context = FakeContext::new();
//! let types = context.types();
//! let store = types
//!     .interface("Acme", "IStore")
//!     .method("Load", &types.string(), [param("key", &types.string())])
//!     .property("Count", &types.i4())
//!     .build()?;
//!
//! let fake = context.fake(&store)?;
//! fake.call_to("Load")?.with_args(args!["a"])?.returns("alpha")?;
//!
//! assert_eq!(fake.call("Load", args!["a"])?, Value::from("alpha"));
//! assert_eq!(fake.call("Load", args!["b"])?, Value::from(""));
//!
//! fake.set("Count", 3)?;
//! assert_eq!(fake.get("Count")?, Value::I4(3));
//!
//! fake.call_to("Load")?.must_have_happened(Repeated::twice())?;
//! # Ok::<(), dotfake::Error>(())
//! ```

mod context;

use std::{iter, sync::Arc};

pub use context::{FakeContext, FakeContextBuilder};

use crate::{
    call::CompletedCall,
    configuration::{CallConfiguration, MethodSelector},
    manager::FakeManager,
    typesystem::{EventRc, MethodRc, PropertyRc, TypeRc},
    value::{Delegate, Invocable, ObjectRef, Value},
    Error, Result,
};

/// A faked object together with its manager
#[derive(Clone, Debug)]
pub struct Fake {
    object: ObjectRef,
    manager: Arc<FakeManager>,
}

impl Fake {
    /// The fake behind `object`, `None` if `object` is not a fake
    #[must_use]
    pub fn from_object(object: &ObjectRef) -> Option<Fake> {
        let manager = FakeManager::of(object)?;
        Some(Fake {
            object: object.clone(),
            manager,
        })
    }

    /// The faked object, to be handed to the code under test
    #[must_use]
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// The manager intercepting the fake's calls
    #[must_use]
    pub fn manager(&self) -> &Arc<FakeManager> {
        &self.manager
    }

    /// The faked type
    #[must_use]
    pub fn fake_type(&self) -> &TypeRc {
        self.object.type_def()
    }

    /// The faked type followed by the additional interfaces
    fn types(&self) -> impl Iterator<Item = &TypeRc> {
        iter::once(self.fake_type()).chain(self.object.additional_interfaces())
    }

    fn not_found(&self, member: &str) -> Error {
        Error::MemberNotFound {
            type_name: self.fake_type().fullname(),
            member: member.to_string(),
        }
    }

    fn resolve_method(&self, name: &str, arguments: &[Value]) -> Result<MethodRc> {
        let mut first_error = None;
        for ty in self.types() {
            match ty.resolve_method(name, arguments) {
                Ok(method) => return Ok(method),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| self.not_found(name)))
    }

    fn property(&self, name: &str) -> Result<PropertyRc> {
        self.types()
            .find_map(|ty| ty.find_property(name))
            .ok_or_else(|| self.not_found(name))
    }

    fn event(&self, name: &str) -> Result<EventRc> {
        self.types()
            .find_map(|ty| ty.find_event(name))
            .ok_or_else(|| self.not_found(name))
    }

    /// Calls the overload of `name` accepting `arguments` on the fake
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if no overload fits, otherwise whatever the call
    /// failed with.
    pub fn call(&self, name: &str, arguments: Vec<Value>) -> Result<Value> {
        let method = self.resolve_method(name, &arguments)?;
        let (value, _) = self.invoke_method(&method, arguments)?;
        Ok(value)
    }

    /// Calls `name` and writes out and ref values back into `arguments`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if no overload fits, otherwise whatever the call
    /// failed with.
    pub fn call_by_ref(&self, name: &str, arguments: &mut [Value]) -> Result<Value> {
        let method = self.resolve_method(name, arguments)?;
        self.object.invoke(&method, arguments)
    }

    /// Calls `method`, returning the return value and the final arguments
    ///
    /// # Errors
    /// Returns whatever the call failed with.
    pub fn invoke_method(
        &self,
        method: &MethodRc,
        arguments: Vec<Value>,
    ) -> Result<(Value, Vec<Value>)> {
        let mut arguments = arguments;
        let value = self.object.invoke(method, &mut arguments)?;
        Ok((value, arguments))
    }

    /// Reads the property `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no readable property `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let getter = self
            .property(name)?
            .getter
            .clone()
            .ok_or_else(|| self.not_found(&format!("get_{name}")))?;
        self.invoke_method(&getter, Vec::new()).map(|(value, _)| value)
    }

    /// Assigns the property `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no writable property `name`.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let setter = self
            .property(name)?
            .setter
            .clone()
            .ok_or_else(|| self.not_found(&format!("set_{name}")))?;
        self.invoke_method(&setter, vec![value.into()]).map(|_| ())
    }

    /// Subscribes `handler` to the event `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no event `name`.
    pub fn add_handler(&self, name: &str, handler: Delegate) -> Result<()> {
        let event = self.event(name)?;
        self.invoke_method(&event.add, vec![Value::Delegate(handler)])
            .map(|_| ())
    }

    /// Unsubscribes `handler` from the event `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no event `name`.
    pub fn remove_handler(&self, name: &str, handler: Delegate) -> Result<()> {
        let event = self.event(name)?;
        self.invoke_method(&event.remove, vec![Value::Delegate(handler)])
            .map(|_| ())
    }

    /// Raises the event `name` by subscribing a [`crate::Raise`] marker to it
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no event `name`, otherwise the
    /// first error a handler failed with.
    pub fn raise(&self, name: &str, raise: Value) -> Result<()> {
        let event = self.event(name)?;
        self.invoke_method(&event.add, vec![raise]).map(|_| ())
    }

    /// `Equals` on the fake
    ///
    /// # Errors
    /// Returns whatever a configured `Equals` fails with.
    pub fn equals(&self, other: impl Into<Value>) -> Result<bool> {
        let value = self.call("Equals", vec![other.into()])?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// `GetHashCode` on the fake
    ///
    /// # Errors
    /// Returns whatever a configured `GetHashCode` fails with.
    pub fn hash_code(&self) -> Result<i32> {
        let value = self.call("GetHashCode", Vec::new())?;
        Ok(value.as_i32().unwrap_or_default())
    }

    /// `ToString` on the fake
    ///
    /// # Errors
    /// Returns whatever a configured `ToString` fails with.
    pub fn describe(&self) -> Result<String> {
        let value = self.call("ToString", Vec::new())?;
        Ok(value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()))
    }

    /// Configures the calls to every interceptable overload of `name`.
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if the fake has no member `name`,
    /// [`Error::Configuration`] if none of its overloads can be intercepted.
    pub fn call_to(&self, name: &str) -> Result<CallConfiguration> {
        let methods: Vec<MethodRc> = self.types().flat_map(|ty| ty.find_methods(name)).collect();
        if methods.is_empty() {
            return Err(self.not_found(name));
        }
        self.configure(methods)
    }

    /// Configures the getter of the property `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if there is no such getter,
    /// [`Error::Configuration`] if it can not be intercepted.
    pub fn call_to_get(&self, name: &str) -> Result<CallConfiguration> {
        let getter = self
            .property(name)?
            .getter
            .clone()
            .ok_or_else(|| self.not_found(&format!("get_{name}")))?;
        self.configure(vec![getter])
    }

    /// Configures the setter of the property `name`
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if there is no such setter,
    /// [`Error::Configuration`] if it can not be intercepted.
    pub fn call_to_set(&self, name: &str) -> Result<CallConfiguration> {
        let setter = self
            .property(name)?
            .setter
            .clone()
            .ok_or_else(|| self.not_found(&format!("set_{name}")))?;
        self.configure(vec![setter])
    }

    /// Configures every call to the fake except the `System.Object` members
    #[must_use]
    pub fn call_to_any(&self) -> CallConfiguration {
        CallConfiguration::new(&self.manager, MethodSelector::Any)
    }

    fn configure(&self, methods: Vec<MethodRc>) -> Result<CallConfiguration> {
        let interceptable: Vec<MethodRc> = methods
            .iter()
            .filter(|method| method.is_interceptable())
            .cloned()
            .collect();
        if interceptable.is_empty() {
            return Err(configuration_error!(
                "The member {} can not be intercepted. Only interface members, virtual, \
                 abstract and overridable members can be configured",
                methods[0].fullname()
            ));
        }
        Ok(CallConfiguration::new(
            &self.manager,
            MethodSelector::Methods(interceptable),
        ))
    }

    /// Every call recorded on the fake, in call order
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<Arc<CompletedCall>> {
        self.manager.recorded_calls()
    }

    /// Removes every user configuration from the fake
    pub fn clear_configuration(&self) {
        self.manager.clear_user_rules();
    }
}

impl From<&Fake> for Value {
    fn from(fake: &Fake) -> Self {
        Value::Object(fake.object.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        args, test::factories::sample_types, value::Instance, call::ArgumentCollection,
        FakeContext, Raise,
    };

    #[test]
    fn test_from_object_rejects_real_objects() {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());
        assert!(Fake::from_object(&widget).is_none());
    }

    #[test]
    fn test_unknown_members() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake(&types.foo)?;

        assert!(matches!(fake.call("Missing", args![]), Err(Error::MemberNotFound { .. })));
        assert!(matches!(fake.call_to("Missing"), Err(Error::MemberNotFound { .. })));
        assert!(matches!(fake.get("Missing"), Err(Error::MemberNotFound { .. })));
        assert!(matches!(
            fake.raise("Missing", Raise::with(args![])),
            Err(Error::MemberNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_non_virtual_member_can_not_be_configured() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake(&types.widget)?;

        assert!(matches!(fake.call_to("Describe"), Err(Error::Configuration { .. })));
        assert_eq!(fake.call("Describe", args![])?, Value::from("widget"));
        assert!(fake.recorded_calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_events() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake(&types.foo)?;
        let raised = Arc::new(AtomicUsize::new(0));

        let counter = raised.clone();
        let handler = Delegate::handler(move |arguments| {
            assert_eq!(arguments.len(), 2);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Void)
        });

        fake.add_handler("Changed", handler.clone())?;
        fake.raise("Changed", Raise::with_event_args(Value::Null))?;
        assert_eq!(raised.load(Ordering::SeqCst), 1);

        fake.remove_handler("Changed", handler.clone())?;
        fake.raise("Changed", Raise::with_event_args(Value::Null))?;
        assert_eq!(raised.load(Ordering::SeqCst), 1);

        fake.add_handler("Changed", handler.clone())?;
        fake.add_handler("Changed", handler.clone())?;
        fake.remove_handler("Changed", handler)?;
        fake.raise("Changed", Raise::with_event_args(Value::Null))?;
        assert_eq!(raised.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_object_members() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake(&types.foo)?;
        let other = context.fake(&types.foo)?;

        assert!(fake.equals(&fake)?);
        assert!(!fake.equals(&other)?);
        assert_eq!(fake.hash_code()?, fake.object().hash_code());
        assert_eq!(fake.describe()?, "Faked Acme.IFoo");
        Ok(())
    }

    #[test]
    fn test_additional_interfaces_are_callable() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake_with(
            &types.foo,
            crate::FakeOptions::new().implements(&types.runnable),
        )?;

        fake.call_to("Run")?.throws_message("running");
        assert!(matches!(fake.call("Run", args![]), Err(Error::Thrown(_))));
        assert!(fake.object().is_instance_of(&types.runnable));
        Ok(())
    }

    #[test]
    fn test_clear_configuration() -> Result<()> {
        let types = sample_types();
        let context = FakeContext::with_registry(types.registry.clone());
        let fake = context.fake(&types.foo)?;

        fake.call_to("Get")?.returns(5)?;
        assert_eq!(fake.call("Get", args![])?, Value::I4(5));
        fake.clear_configuration();
        assert_eq!(fake.call("Get", args![])?, Value::I4(0));
        assert_eq!(fake.recorded_calls().len(), 2);
        Ok(())
    }
}
