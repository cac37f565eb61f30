use std::{fmt, sync::Arc};

use crate::value::Value;

type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A condition on one argument of a configured or asserted call.
///
/// ```rust
/// use dotfake::{configuration::ArgumentConstraint, Value};
///
/// let positive =
///     ArgumentConstraint::that("positive", |value| value.as_i32().is_some_and(|v| v > 0));
/// assert!(positive.is_satisfied_by(&Value::I4(3)));
/// assert!(!positive.is_satisfied_by(&Value::I4(-3)));
/// assert!(ArgumentConstraint::ignored().is_satisfied_by(&Value::Null));
/// assert_eq!(ArgumentConstraint::from(Value::I4(1)).to_string(), "1");
/// ```
#[derive(Clone)]
pub enum ArgumentConstraint {
    /// The argument equals the value
    Equals(Value),
    /// Any argument
    Any,
    /// The argument satisfies a predicate
    Matches {
        /// The predicate
        predicate: ValuePredicate,
        /// Rendered as `<description>`
        description: String,
    },
}

impl ArgumentConstraint {
    /// An argument accepted by `predicate`
    pub fn that<F>(description: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        ArgumentConstraint::Matches {
            predicate: Arc::new(predicate),
            description: description.to_string(),
        }
    }

    /// Any argument
    #[must_use]
    pub fn ignored() -> Self {
        ArgumentConstraint::Any
    }

    /// Returns true if `value` satisfies the constraint
    #[must_use]
    pub fn is_satisfied_by(&self, value: &Value) -> bool {
        match self {
            ArgumentConstraint::Equals(expected) => expected == value,
            ArgumentConstraint::Any => true,
            ArgumentConstraint::Matches { predicate, .. } => predicate(value),
        }
    }

    /// The value an equality constraint compares with
    #[must_use]
    pub fn expected_value(&self) -> Option<&Value> {
        match self {
            ArgumentConstraint::Equals(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for ArgumentConstraint {
    fn from(value: Value) -> Self {
        ArgumentConstraint::Equals(value)
    }
}

impl fmt::Display for ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentConstraint::Equals(value) => write!(f, "{value}"),
            ArgumentConstraint::Any => write!(f, "<Ignored>"),
            ArgumentConstraint::Matches { description, .. } => write!(f, "<{description}>"),
        }
    }
}

impl fmt::Debug for ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgumentConstraint({self})")
    }
}
