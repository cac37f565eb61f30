use std::sync::Arc;

use crate::{
    assertion::Repeated,
    call::{CallWriter, CompletedCall, FakeObjectCall, OutputWriter, StringOutputWriter},
    Error, Result,
};

/// Decides whether a recorded call is the asserted one
pub type CallPredicate<'a> = &'a dyn Fn(&dyn FakeObjectCall) -> bool;

/// Asserts on the calls visible to one fake.
///
/// The visible calls are those of the current scope (see [`crate::scope`]); the asserter
/// counts the calls matching a predicate and renders all visible calls when the count does
/// not satisfy the expected [`Repeated`].
pub struct FakeAsserter {
    calls: Vec<Arc<CompletedCall>>,
    max_rendered_calls: usize,
}

impl FakeAsserter {
    /// Creates an asserter over `calls`
    ///
    /// ## Arguments
    /// * 'calls'              - The visible calls, in call order
    /// * 'max_rendered_calls' - Maximum number of collapsed lines in a failure message
    #[must_use]
    pub fn new(calls: Vec<Arc<CompletedCall>>, max_rendered_calls: usize) -> Self {
        FakeAsserter {
            calls,
            max_rendered_calls,
        }
    }

    /// The visible calls
    #[must_use]
    pub fn calls(&self) -> &[Arc<CompletedCall>] {
        &self.calls
    }

    /// Number of visible calls matching `predicate`
    #[must_use]
    pub fn count_matching(&self, predicate: CallPredicate<'_>) -> usize {
        self.calls.iter().filter(|call| predicate(call.as_ref())).count()
    }

    /// Checks that the calls matching `predicate` happened as often as `repeated` expects.
    ///
    /// ## Arguments
    /// * 'predicate'        - Selects the asserted calls
    /// * 'call_description' - The asserted call as it appears in the failure message
    /// * 'repeated'         - The expected number of matching calls
    ///
    /// # Errors
    /// Returns [`Error::ExpectationFailed`] with the rendered call list if the number of
    /// matching calls does not satisfy `repeated`.
    pub fn assert_was_called(
        &self,
        predicate: CallPredicate<'_>,
        call_description: &str,
        repeated: &Repeated,
    ) -> Result<()> {
        let count = self.count_matching(predicate);
        if repeated.matches(count) {
            return Ok(());
        }
        Err(Error::ExpectationFailed(
            self.failure_message(call_description, repeated, count),
        ))
    }

    fn failure_message(&self, call_description: &str, repeated: &Repeated, count: usize) -> String {
        let mut writer = StringOutputWriter::new();
        writer.write("\n\n");
        writer.indent();
        writer.write_line("Assertion failed for the following call:");
        writer.indent();
        writer.write_line(call_description);
        writer.unindent();

        if self.calls.is_empty() {
            writer.write_line(&format!(
                "Expected to find it {repeated} but no calls were made to the fake object."
            ));
        } else {
            writer.write_line(&format!(
                "Expected to find it {repeated} but found it #{count} times among the calls:"
            ));
            writer.indent();
            CallWriter::new(self.max_rendered_calls).write_calls(&self.calls, &mut writer);
            writer.unindent();
        }
        writer.unindent();
        writer.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        call::InterceptedCall,
        test::{factories::sample_types, fake_of},
    };

    fn record(names: &[&str]) -> Result<Vec<Arc<CompletedCall>>> {
        let types = sample_types();
        let (fake, _manager) = fake_of(&types.foo);
        names
            .iter()
            .map(|name| {
                let method = types.foo.find_methods(name).pop().unwrap();
                Ok(Arc::new(InterceptedCall::new(&method, &fake, args![])?.as_completed()))
            })
            .collect()
    }

    fn is_get(call: &dyn FakeObjectCall) -> bool {
        call.method().name == "Get"
    }

    #[test]
    fn test_never_passes_without_matching_calls() -> Result<()> {
        let asserter = FakeAsserter::new(record(&["Baz"])?, 19);
        asserter.assert_was_called(&is_get, "Acme.IFoo.Get()", &Repeated::never())
    }

    #[test]
    fn test_never_fails_with_matching_call() -> Result<()> {
        let asserter = FakeAsserter::new(record(&["Get", "Baz"])?, 19);
        let Err(Error::ExpectationFailed(message)) =
            asserter.assert_was_called(&is_get, "Acme.IFoo.Get()", &Repeated::never())
        else {
            panic!("expected an assertion failure");
        };
        assert!(message.contains("Expected to find it exactly 0 times but found it #1 times"));
        assert!(message.contains("    1: Acme.IFoo.Get()\n"));
        assert!(message.contains("    2: Acme.IFoo.Baz()\n"));
        Ok(())
    }

    #[test]
    fn test_message_without_calls() {
        let asserter = FakeAsserter::new(Vec::new(), 19);
        let Err(Error::ExpectationFailed(message)) =
            asserter.assert_was_called(&is_get, "Acme.IFoo.Get()", &Repeated::once())
        else {
            panic!("expected an assertion failure");
        };
        assert_eq!(
            message,
            concat!(
                "\n\n  Assertion failed for the following call:\n    Acme.IFoo.Get()\n",
                "  Expected to find it exactly once but no calls were made to the fake object.\n"
            )
        );
    }

    #[test]
    fn test_counts_matching_calls() -> Result<()> {
        let asserter = FakeAsserter::new(record(&["Get", "Baz", "Get"])?, 19);
        assert_eq!(asserter.count_matching(&is_get), 2);
        asserter.assert_was_called(&is_get, "Acme.IFoo.Get()", &Repeated::twice())?;
        assert!(asserter
            .assert_was_called(&is_get, "Acme.IFoo.Get()", &Repeated::once())
            .is_err());
        Ok(())
    }
}
