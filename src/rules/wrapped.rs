use std::sync::Arc;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    rules::FakeRule,
    value::Invocable,
    Result,
};

/// Forwards every call of a wrapping fake to the wrapped object.
///
/// Out and ref values the wrapped object writes are copied back into the call.
pub struct WrappedObjectRule {
    wrapped: Arc<dyn Invocable>,
}

impl WrappedObjectRule {
    /// Creates a rule delegating to `wrapped`
    pub fn new(wrapped: Arc<dyn Invocable>) -> Self {
        WrappedObjectRule { wrapped }
    }
}

impl FakeRule for WrappedObjectRule {
    fn is_applicable_to(&self, _call: &dyn FakeObjectCall) -> bool {
        true
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let method = call.method().clone();
        let mut arguments = call.arguments().as_slice().to_vec();
        let result = self.wrapped.invoke(&method, &mut arguments)?;

        for (index, param) in method.params.iter().enumerate() {
            if param.is_out_or_ref() {
                if let Some(value) = arguments.get(index) {
                    call.set_argument_value(index, value.clone())?;
                }
            }
        }
        call.set_return_value(result);
        Ok(())
    }

    fn description(&self) -> String {
        "Wrapped object".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        call::ArgumentCollection,
        test::factories::sample_types,
        typesystem::MethodRc,
        value::{Instance, Value},
    };

    struct Parser;

    impl Invocable for Parser {
        fn invoke(&self, method: &MethodRc, arguments: &mut [Value]) -> Result<Value> {
            assert_eq!(method.name, "TryParse");
            let parsed = arguments[0].as_str().and_then(|text| text.parse::<i32>().ok());
            arguments[1] = Value::I4(parsed.unwrap_or_default());
            Ok(Value::Boolean(parsed.is_some()))
        }
    }

    #[test]
    fn test_forwards_and_copies_out_values() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let rule = WrappedObjectRule::new(Arc::new(Parser));
        let try_parse = types.foo.find_methods("TryParse").pop().unwrap();

        let mut call = InterceptedCall::new(&try_parse, &target, args!["42", 0])?;
        assert!(rule.is_applicable_to(&call));
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::Boolean(true)));
        assert_eq!(call.arguments().get(1)?, &Value::I4(42));
        Ok(())
    }

    #[test]
    fn test_forwards_to_real_object() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let real: Arc<dyn Invocable> = Arc::new(Instance::constructed(
            &types.widget,
            ArgumentCollection::empty(),
        ));
        let rule = WrappedObjectRule::new(real);
        let describe = types.widget.find_methods("Describe").pop().unwrap();

        let mut call = InterceptedCall::new(&describe, &target, args![])?;
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::from("widget")));
        Ok(())
    }
}
