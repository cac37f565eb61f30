use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    dummy::DummyValueResolver,
    manager::FakeManager,
    rules::{default_value::default_value, FakeRule},
    value::Value,
    Result,
};

/// Stores the value of one property of one fake.
///
/// Getter calls return the stored value, setter calls replace it. Every application moves
/// the rule to the front of its manager's user rules, so the most recently touched
/// property state wins over older configuration.
pub struct PropertyBehaviorRule {
    declaring_type: String,
    property: String,
    value: Mutex<Value>,
    manager: Weak<FakeManager>,
}

impl PropertyBehaviorRule {
    /// Creates the state rule for `property` holding `value`
    pub fn new(
        declaring_type: &str,
        property: &str,
        value: Value,
        manager: Weak<FakeManager>,
    ) -> Self {
        PropertyBehaviorRule {
            declaring_type: declaring_type.to_string(),
            property: property.to_string(),
            value: Mutex::new(value),
            manager,
        }
    }

    /// The currently stored value
    pub fn value(&self) -> Value {
        lock!(self.value).clone()
    }
}

impl FakeRule for PropertyBehaviorRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        let method = call.method();
        method.declaring_type.fullname() == self.declaring_type
            && (method.property_getter_of() == Some(self.property.as_str())
                || method.property_setter_of() == Some(self.property.as_str()))
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        if call.method().property_setter_of().is_some() {
            let assigned = call
                .arguments()
                .as_slice()
                .last()
                .cloned()
                .unwrap_or(Value::Null);
            *lock!(self.value) = assigned;
            call.set_return_value(Value::Void);
        } else {
            call.set_return_value(self.value());
        }

        if let Some(manager) = self.manager.upgrade() {
            manager.move_rule_to_front(self as *const Self);
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Property behavior of {}.{}", self.declaring_type, self.property)
    }
}

/// Gives unconfigured property getters a stable value.
///
/// The first read resolves a dummy of the property type and installs a
/// [`PropertyBehaviorRule`] holding it, so later reads return the same value.
pub struct AutoFakePropertyRule {
    resolver: Arc<dyn DummyValueResolver>,
    manager: Weak<FakeManager>,
}

impl AutoFakePropertyRule {
    /// Creates the rule for the manager behind `manager`
    pub fn new(resolver: Arc<dyn DummyValueResolver>, manager: Weak<FakeManager>) -> Self {
        AutoFakePropertyRule { resolver, manager }
    }
}

impl FakeRule for AutoFakePropertyRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        call.method().property_getter_of().is_some()
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let method = call.method().clone();
        let value = default_value(self.resolver.as_ref(), &method.return_type);

        if let (Some(property), Some(manager)) =
            (method.property_getter_of(), self.manager.upgrade())
        {
            trace!(property, "installing property behavior for getter");
            manager.add_rule_first(Arc::new(PropertyBehaviorRule::new(
                method.declaring_type.fullname(),
                property,
                value.clone(),
                self.manager.clone(),
            )));
        }

        call.set_return_value(value);
        Ok(())
    }

    fn description(&self) -> String {
        "Auto property getter".to_string()
    }
}

/// Makes unconfigured property setters store their value for later getter calls
pub struct PropertySetterRule {
    manager: Weak<FakeManager>,
}

impl PropertySetterRule {
    /// Creates the rule for the manager behind `manager`
    pub fn new(manager: Weak<FakeManager>) -> Self {
        PropertySetterRule { manager }
    }
}

impl FakeRule for PropertySetterRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        call.method().property_setter_of().is_some()
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let method = call.method().clone();
        let assigned = call
            .arguments()
            .as_slice()
            .last()
            .cloned()
            .unwrap_or(Value::Null);

        if let (Some(property), Some(manager)) =
            (method.property_setter_of(), self.manager.upgrade())
        {
            trace!(property, "installing property behavior for setter");
            manager.add_rule_first(Arc::new(PropertyBehaviorRule::new(
                method.declaring_type.fullname(),
                property,
                assigned,
                self.manager.clone(),
            )));
        }

        call.set_return_value(Value::Void);
        Ok(())
    }

    fn description(&self) -> String {
        "Property setter".to_string()
    }
}
