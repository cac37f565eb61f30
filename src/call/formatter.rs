//! Renders calls the way they appear in failure messages.
//!
//! - ordinary methods: `Acme.IFoo.Bar(x: 1, name: "abc")`
//! - property getters: `Acme.IFoo.Name`
//! - property setters: `Acme.IFoo.Name = "abc"`

use crate::call::FakeObjectCall;

/// Describes a call with its argument values
#[must_use]
pub fn describe_call(call: &dyn FakeObjectCall) -> String {
    let method = call.method();
    let declaring_type = method.declaring_type.fullname();

    if let Some(property) = method.property_getter_of() {
        return format!("{declaring_type}.{property}");
    }

    if let Some(property) = method.property_setter_of() {
        let value = call
            .arguments()
            .as_slice()
            .last()
            .map(ToString::to_string)
            .unwrap_or_default();
        return format!("{declaring_type}.{property} = {value}");
    }

    let arguments: Vec<String> = call
        .arguments()
        .named()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    format!("{declaring_type}.{}({})", method.name, arguments.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        call::{ArgumentCollection, InterceptedCall},
        test::factories::sample_types,
        value::Instance,
        Result,
    };

    #[test]
    fn test_describe_method_call() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let bar = types.foo.find_methods("Bar").pop().unwrap();
        let call = InterceptedCall::new(&bar, &target, args![1, "abc"])?;
        assert_eq!(describe_call(&call), "Acme.IFoo.Bar(x: 1, name: \"abc\")");

        let get = types.foo.find_methods("Get").pop().unwrap();
        let call = InterceptedCall::new(&get, &target, args![])?;
        assert_eq!(describe_call(&call), "Acme.IFoo.Get()");
        Ok(())
    }

    #[test]
    fn test_describe_null_argument() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let bar = types.foo.find_methods("Bar").pop().unwrap();
        let call = InterceptedCall::new(&bar, &target, args![1, None::<&str>])?;
        assert_eq!(describe_call(&call), "Acme.IFoo.Bar(x: 1, name: <NULL>)");
        Ok(())
    }

    #[test]
    fn test_describe_property_access() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let getter = types.foo.find_methods("get_Name").pop().unwrap();
        let setter = types.foo.find_methods("set_Name").pop().unwrap();

        let get = InterceptedCall::new(&getter, &target, args![])?;
        assert_eq!(describe_call(&get), "Acme.IFoo.Name");

        let set = InterceptedCall::new(&setter, &target, args!["new"])?;
        assert_eq!(describe_call(&set), "Acme.IFoo.Name = \"new\"");
        Ok(())
    }
}
