use std::{collections::HashMap, sync::Mutex};

use tracing::trace;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    rules::FakeRule,
    typesystem::MethodSemantics,
    value::{Delegate, Value},
    Result,
};

/// Handles event subscription on a fake.
///
/// `add_X` calls subscribe the handler, `remove_X` calls unsubscribe it by reference
/// identity. Subscribing a [`crate::Raise`] marker raises the event instead: every handler
/// subscribed at that moment is invoked with the marker's arguments. Raising is not
/// recorded as a call.
#[derive(Default)]
pub struct EventRule {
    handlers: Mutex<HashMap<String, Vec<Delegate>>>,
}

impl EventRule {
    /// Creates a rule without any subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handlers currently subscribed to `event`
    pub fn handler_count(&self, event: &str) -> usize {
        lock!(self.handlers).get(event).map_or(0, Vec::len)
    }

    fn raise(&self, event: &str, arguments: &[Value], call: &InterceptedCall) -> Result<()> {
        let expected = call
            .method()
            .declaring_type
            .upgrade()
            .and_then(|ty| ty.find_event(event))
            .and_then(|event| event.handler_type.upgrade())
            .and_then(|handler_type| handler_type.delegate_invoke())
            .map(|invoke| invoke.params.len());

        if let Some(expected) = expected {
            if expected != arguments.len() {
                return Err(configuration_error!(
                    "The event {} has a handler signature with {} parameters, \
                     but was raised with {} arguments",
                    event,
                    expected,
                    arguments.len()
                ));
            }
        }

        // Handlers may (un)subscribe while running, they see the list as it was
        let handlers = lock!(self.handlers).get(event).cloned().unwrap_or_default();
        trace!(event, handlers = handlers.len(), "raising event");
        for handler in &handlers {
            handler.invoke(arguments)?;
        }
        Ok(())
    }
}

impl FakeRule for EventRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        call.method().event_accessor_of().is_some()
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let semantics = call.method().semantics.clone();
        let delegate = match call.arguments().get(0)? {
            Value::Delegate(delegate) => Some(delegate.clone()),
            _ => None,
        };
        call.set_return_value(Value::Void);

        let Some(delegate) = delegate else {
            return Ok(());
        };

        match (semantics, delegate) {
            (MethodSemantics::AddOn(event), Delegate::Raiser(raise)) => {
                let arguments = raise.arguments_for(call.faked_object_ref());
                call.do_not_record();
                self.raise(&event, &arguments, call)
            }
            (MethodSemantics::AddOn(event), handler) => {
                lock!(self.handlers).entry(event).or_default().push(handler);
                Ok(())
            }
            (MethodSemantics::RemoveOn(event), handler) => {
                // Only the most recent subscription of the handler goes away
                if let Some(handlers) = lock!(self.handlers).get_mut(&event) {
                    if let Some(position) =
                        handlers.iter().rposition(|known| known.same_as(&handler))
                    {
                        handlers.remove(position);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn description(&self) -> String {
        "Event rule".to_string()
    }
}
