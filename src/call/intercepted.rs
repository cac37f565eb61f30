use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use crate::{
    call::{ArgumentCollection, FakeObjectCall},
    typesystem::MethodRc,
    value::{Instance, ObjectRef, Value},
    Error, Result,
};

static NEXT_SEQUENCE_NUMBER: AtomicU64 = AtomicU64::new(1);

/// A call in flight, handed to the rule that was selected for it.
///
/// Rules set the return value, write out and ref arguments, run the base implementation
/// or ask for the call not to be recorded.
pub struct InterceptedCall {
    method: MethodRc,
    faked_object: ObjectRef,
    arguments: ArgumentCollection,
    return_value: Option<Value>,
    record: bool,
}

impl InterceptedCall {
    /// Creates the call record for `method` invoked on `faked_object`
    ///
    /// # Errors
    /// Returns [`Error::ArgumentCountMismatch`] if `arguments` do not fit the parameter list.
    pub fn new(method: &MethodRc, faked_object: &ObjectRef, arguments: Vec<Value>) -> Result<Self> {
        Ok(InterceptedCall {
            arguments: ArgumentCollection::new(arguments, method.parameter_names())?,
            method: method.clone(),
            faked_object: faked_object.clone(),
            return_value: None,
            record: true,
        })
    }

    /// The object the call was made on
    #[must_use]
    pub fn faked_object_ref(&self) -> &ObjectRef {
        &self.faked_object
    }

    /// Sets the value returned to the caller
    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = Some(value);
    }

    /// The return value set so far
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Overwrites an argument, visible to the caller for out and ref parameters
    ///
    /// # Errors
    /// Returns [`Error::ArgumentOutOfRange`] for an invalid `index`.
    pub fn set_argument_value(&mut self, index: usize, value: Value) -> Result<()> {
        self.arguments.set(index, value)
    }

    /// Runs the base implementation of the method, taking over its return value and
    /// out/ref arguments
    ///
    /// # Errors
    /// Returns [`Error::NoBaseImplementation`] for abstract members, or whatever the base
    /// implementation failed with.
    pub fn call_base_method(&mut self) -> Result<()> {
        let body = self
            .method
            .body()
            .cloned()
            .ok_or_else(|| Error::NoBaseImplementation(self.method.fullname()))?;

        let mut values = self.arguments.as_slice().to_vec();
        let result = body(&self.faked_object, &mut values)?;
        self.arguments.replace_all(values)?;
        self.return_value = Some(result);
        Ok(())
    }

    /// Keeps the call out of the recorded call history
    pub fn do_not_record(&mut self) {
        self.record = false;
    }

    /// Returns true unless a rule suppressed recording
    #[must_use]
    pub fn should_record(&self) -> bool {
        self.record
    }

    /// Freezes the call into its completed form
    #[must_use]
    pub fn as_completed(&self) -> CompletedCall {
        CompletedCall {
            method: self.method.clone(),
            faked_object: Arc::downgrade(&self.faked_object),
            fake_id: self.faked_object.id(),
            arguments: self.arguments.clone(),
            return_value: self.return_value.clone().unwrap_or(Value::Void),
            sequence_number: NEXT_SEQUENCE_NUMBER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Consumes the call, returning the return value and the final arguments
    #[must_use]
    pub fn into_result(self) -> (Value, ArgumentCollection) {
        let return_value = self.return_value.unwrap_or(Value::Void);
        (return_value, self.arguments)
    }
}

impl FakeObjectCall for InterceptedCall {
    fn method(&self) -> &MethodRc {
        &self.method
    }

    fn arguments(&self) -> &ArgumentCollection {
        &self.arguments
    }

    fn faked_object(&self) -> Option<ObjectRef> {
        Some(self.faked_object.clone())
    }

    fn faked_object_id(&self) -> u64 {
        self.faked_object.id()
    }
}

impl fmt::Debug for InterceptedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedCall")
            .field("method", &self.method.fullname())
            .field("arguments", &self.arguments)
            .field("return_value", &self.return_value)
            .finish_non_exhaustive()
    }
}

/// An immutable record of a call that has completed.
///
/// Recorded calls do not keep the fake alive. The sequence number is process wide and
/// orders calls across different fakes.
pub struct CompletedCall {
    method: MethodRc,
    faked_object: Weak<Instance>,
    fake_id: u64,
    arguments: ArgumentCollection,
    return_value: Value,
    sequence_number: u64,
}

impl CompletedCall {
    /// The value the call returned
    #[must_use]
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    /// Position of the call among every call intercepted by this process
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }
}

impl FakeObjectCall for CompletedCall {
    fn method(&self) -> &MethodRc {
        &self.method
    }

    fn arguments(&self) -> &ArgumentCollection {
        &self.arguments
    }

    fn faked_object(&self) -> Option<ObjectRef> {
        self.faked_object.upgrade()
    }

    fn faked_object_id(&self) -> u64 {
        self.fake_id
    }
}

impl fmt::Debug for CompletedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletedCall")
            .field("sequence_number", &self.sequence_number)
            .field("method", &self.method.fullname())
            .field("arguments", &self.arguments)
            .field("return_value", &self.return_value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, test::factories::sample_types, typesystem::TypeRc};

    fn method(ty: &TypeRc, name: &str) -> MethodRc {
        ty.find_methods(name).pop().unwrap()
    }

    #[test]
    fn test_argument_count_is_validated() {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let bar = method(&types.foo, "Bar");
        assert!(InterceptedCall::new(&bar, &widget, args![1]).is_err());
        assert!(InterceptedCall::new(&bar, &widget, args![1, "x"]).is_ok());
    }

    #[test]
    fn test_call_base_method() -> Result<()> {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());

        let mut describe =
            InterceptedCall::new(&method(&types.widget, "Describe"), &widget, args![])?;
        describe.call_base_method()?;
        assert_eq!(describe.return_value(), Some(&Value::from("widget")));

        let mut get = InterceptedCall::new(&method(&types.foo, "Get"), &widget, args![])?;
        assert!(matches!(
            get.call_base_method(),
            Err(Error::NoBaseImplementation(name)) if name == "Acme.IFoo.Get"
        ));
        Ok(())
    }

    #[test]
    fn test_completed_call_snapshot() -> Result<()> {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let mut call =
            InterceptedCall::new(&method(&types.foo, "TryParse"), &widget, args!["1", 0])?;
        call.set_argument_value(1, Value::I4(1))?;
        call.set_return_value(Value::Boolean(true));

        let first = call.as_completed();
        let second = call.as_completed();
        assert!(second.sequence_number() > first.sequence_number());
        assert_eq!(first.arguments().get(1)?, &Value::I4(1));
        assert_eq!(first.return_value(), &Value::Boolean(true));
        assert_eq!(first.faked_object_id(), widget.id());

        drop(call);
        drop(widget);
        assert!(first.faked_object().is_none());
        Ok(())
    }

    #[test]
    fn test_do_not_record() -> Result<()> {
        let types = sample_types();
        let widget = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let mut call = InterceptedCall::new(&method(&types.foo, "Get"), &widget, args![])?;
        assert!(call.should_record());
        call.do_not_record();
        assert!(!call.should_record());

        let (value, arguments) = call.into_result();
        assert_eq!(value, Value::Void);
        assert!(arguments.is_empty());
        Ok(())
    }
}
