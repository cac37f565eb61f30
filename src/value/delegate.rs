use std::{fmt, sync::Arc};

use crate::{
    value::{ObjectRef, Value},
    Result,
};

/// The callable behind a [`Delegate::Handler`]
pub type HandlerFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A delegate value
///
/// Handlers are the callbacks subscribed to events. A [`Raise`] marker is not callable
/// itself; subscribing it to an event of a fake raises that event instead.
#[derive(Clone)]
pub enum Delegate {
    /// A callable handler
    Handler(HandlerFn),
    /// Raises the event it is subscribed to
    Raiser(Raise),
}

impl Delegate {
    /// Wraps a closure into a handler delegate
    pub fn handler<F>(handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Delegate::Handler(Arc::new(handler))
    }

    /// Invokes a handler
    ///
    /// # Errors
    /// Propagates the handler's error. Invoking a [`Raise`] marker is a
    /// [`crate::Error::Configuration`] error.
    pub fn invoke(&self, arguments: &[Value]) -> Result<Value> {
        match self {
            Delegate::Handler(handler) => handler(arguments),
            Delegate::Raiser(_) => Err(configuration_error!(
                "A Raise marker can only be subscribed to an event of a fake"
            )),
        }
    }

    /// Reference identity, used to unsubscribe handlers
    #[must_use]
    pub fn same_as(&self, other: &Delegate) -> bool {
        match (self, other) {
            (Delegate::Handler(lhs), Delegate::Handler(rhs)) => {
                std::ptr::addr_eq(Arc::as_ptr(lhs), Arc::as_ptr(rhs))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Handler(_) => write!(f, "System.Delegate"),
            Delegate::Raiser(raise) => write!(f, "{raise}"),
        }
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Handler(handler) => {
                write!(f, "Handler({:p})", Arc::as_ptr(handler).cast::<()>())
            }
            Delegate::Raiser(raise) => write!(f, "{raise:?}"),
        }
    }
}

/// Marker delegate raising the event it is subscribed to.
///
/// ```rust
/// use dotfake::{args, Raise, Value};
///
/// let raise = Raise::with(args![1, "changed"]);
/// assert!(matches!(raise, Value::Delegate(_)));
/// ```
#[derive(Clone, Debug)]
pub struct Raise {
    arguments: Vec<Value>,
    sender_first: bool,
}

impl Raise {
    /// Raises the event with exactly `arguments`
    #[must_use]
    pub fn with(arguments: Vec<Value>) -> Value {
        Value::Delegate(Delegate::Raiser(Raise {
            arguments,
            sender_first: false,
        }))
    }

    /// Raises a `(sender, e)` style event, the fake itself is passed as sender
    #[must_use]
    pub fn with_event_args(event_args: impl Into<Value>) -> Value {
        Value::Delegate(Delegate::Raiser(Raise {
            arguments: vec![event_args.into()],
            sender_first: true,
        }))
    }

    /// The arguments handlers receive when `sender` raises the event
    #[must_use]
    pub fn arguments_for(&self, sender: &ObjectRef) -> Vec<Value> {
        if self.sender_first {
            let mut arguments = Vec::with_capacity(self.arguments.len() + 1);
            arguments.push(Value::Object(sender.clone()));
            arguments.extend(self.arguments.iter().cloned());
            arguments
        } else {
            self.arguments.clone()
        }
    }
}

impl fmt::Display for Raise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        write!(f, "Raise.With({})", arguments.join(", "))
    }
}
