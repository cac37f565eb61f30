use crate::{
    call::{describe_call, FakeObjectCall, InterceptedCall},
    rules::FakeRule,
    Error, Result,
};

/// Rejects every unconfigured call of a strict fake.
///
/// Added as the oldest user rule when a strict fake is created, so every rule the test
/// configures afterwards takes precedence. `System.Object` members stay answered by the
/// post rules.
#[derive(Debug, Default)]
pub struct StrictFakeRule;

impl FakeRule for StrictFakeRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        call.method().object_member().is_none()
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        Err(Error::ExpectationFailed(format!(
            "Call to unconfigured method of strict fake: {}.",
            describe_call(call)
        )))
    }

    fn description(&self) -> String {
        "Strict fake".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, call::ArgumentCollection, test::factories::sample_types, value::Instance};

    #[test]
    fn test_rejects_unconfigured_calls() -> Result<()> {
        let types = sample_types();
        let target = Instance::constructed(&types.widget, ArgumentCollection::empty());
        let bar = types.foo.find_methods("Bar").pop().unwrap();
        let mut call = InterceptedCall::new(&bar, &target, args![3, "x"])?;

        assert!(StrictFakeRule.is_applicable_to(&call));
        let error = StrictFakeRule.apply(&mut call).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Call to unconfigured method of strict fake: Acme.IFoo.Bar(x: 3, name: \"x\")."
        );

        let to_string = types.foo.find_methods("ToString").pop().unwrap();
        let call = InterceptedCall::new(&to_string, &target, args![])?;
        assert!(!StrictFakeRule.is_applicable_to(&call));
        Ok(())
    }
}
