use std::sync::Arc;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    rules::FakeRule,
    typesystem::ObjectMember,
    value::Value,
    Result,
};

/// Answers the `System.Object` members of a fake.
///
/// `Equals` is reference equality with the fake, `GetHashCode` the fake's identity hash
/// and `ToString` renders `Faked <type>`.
#[derive(Debug, Default)]
pub struct ObjectMemberRule;

impl FakeRule for ObjectMemberRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        call.method().object_member().is_some()
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let Some(member) = call.method().object_member() else {
            return Ok(());
        };

        let fake = call.faked_object_ref().clone();
        let value = match member {
            ObjectMember::Equals => {
                let other = call.arguments().get(0)?;
                Value::Boolean(matches!(other, Value::Object(other) if Arc::ptr_eq(other, &fake)))
            }
            ObjectMember::GetHashCode => Value::I4(fake.hash_code()),
            ObjectMember::ToString => Value::String(fake.to_string()),
        };
        call.set_return_value(value);
        Ok(())
    }

    fn description(&self) -> String {
        "Object members".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, call::ArgumentCollection, test::factories::sample_types, value::Instance};

    #[test]
    fn test_object_members() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let other = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let rule = ObjectMemberRule;

        let equals = types.foo.find_methods("Equals").pop().unwrap();
        let mut call = InterceptedCall::new(&equals, &target, args![&target])?;
        assert!(rule.is_applicable_to(&call));
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::Boolean(true)));

        let mut call = InterceptedCall::new(&equals, &target, args![&other])?;
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::Boolean(false)));

        let hash = types.foo.find_methods("GetHashCode").pop().unwrap();
        let mut call = InterceptedCall::new(&hash, &target, args![])?;
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::I4(target.hash_code())));

        let to_string = types.foo.find_methods("ToString").pop().unwrap();
        let mut call = InterceptedCall::new(&to_string, &target, args![])?;
        rule.apply(&mut call)?;
        assert_eq!(call.return_value(), Some(&Value::from("Acme.Widget")));
        Ok(())
    }

    #[test]
    fn test_ignores_ordinary_methods() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let get = types.foo.find_methods("Get").pop().unwrap();
        let call = InterceptedCall::new(&get, &target, args![])?;
        assert!(!ObjectMemberRule.is_applicable_to(&call));
        Ok(())
    }
}
