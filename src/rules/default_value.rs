use std::sync::Arc;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    dummy::DummyValueResolver,
    rules::FakeRule,
    typesystem::{ParamAttributes, TypeRef},
    value::Value,
    Result,
};

/// The value an unconfigured member of type `ty` produces: a dummy where one can be
/// resolved, the zero value otherwise
pub(crate) fn default_value(resolver: &dyn DummyValueResolver, ty: &TypeRef) -> Value {
    match ty.upgrade() {
        Some(ty) if ty.is_void() => Value::Void,
        Some(ty) => resolver
            .try_resolve_dummy(&ty)
            .unwrap_or_else(|| Value::default_for(&ty)),
        None => Value::Null,
    }
}

/// Innermost fallback: always applicable, never exhausted.
///
/// Returns a dummy of the return type (or its default when no dummy can be made) and
/// fills `out` parameters the same way.
pub struct DefaultReturnValueRule {
    resolver: Arc<dyn DummyValueResolver>,
}

impl DefaultReturnValueRule {
    /// Creates the rule resolving values through `resolver`
    pub fn new(resolver: Arc<dyn DummyValueResolver>) -> Self {
        DefaultReturnValueRule { resolver }
    }
}

impl FakeRule for DefaultReturnValueRule {
    fn is_applicable_to(&self, _call: &dyn FakeObjectCall) -> bool {
        true
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let method = call.method().clone();
        for (index, param) in method.params.iter().enumerate() {
            if param.flags.contains(ParamAttributes::OUT) {
                let value = default_value(self.resolver.as_ref(), &param.param_type);
                call.set_argument_value(index, value)?;
            }
        }

        let value = default_value(self.resolver.as_ref(), &method.return_type);
        call.set_return_value(value);
        Ok(())
    }

    fn description(&self) -> String {
        "Default return value".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        call::ArgumentCollection,
        test::{factories::sample_types, NoDummies},
        value::Instance,
    };

    #[test]
    fn test_returns_defaults() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let rule = DefaultReturnValueRule::new(Arc::new(NoDummies));

        let get = types.foo.find_methods("Get").pop().unwrap();
        let mut call = InterceptedCall::new(&get, &target, args![])?;
        assert!(rule.is_applicable_to(&call));
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::I4(0)));

        let baz = types.foo.find_methods("Baz").pop().unwrap();
        let mut call = InterceptedCall::new(&baz, &target, args![])?;
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::Void));
        Ok(())
    }

    #[test]
    fn test_fills_out_parameters() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let rule = DefaultReturnValueRule::new(Arc::new(NoDummies));

        let try_parse = types.foo.find_methods("TryParse").pop().unwrap();
        let mut call = InterceptedCall::new(&try_parse, &target, args!["12", 99])?;
        rule.apply(&mut call)?;
        assert_eq!(call.arguments().get(0)?, &Value::from("12"));
        assert_eq!(call.arguments().get(1)?, &Value::I4(0));
        assert_eq!(call.return_value(), Some(&Value::Boolean(false)));
        Ok(())
    }
}
