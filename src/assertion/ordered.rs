use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::{
    assertion::{CallPredicate, FakeAsserter, Repeated},
    call::{CallWriter, CompletedCall, OutputWriter, StringOutputWriter},
    Error, Result,
};

/// Asserts that calls happened in the order the assertions are made.
///
/// Calls are ordered by their process wide sequence number, so the order holds across
/// different fakes. Every assertion must find its calls after the last call matched by
/// the previous assertion.
pub struct OrderedFakeAsserter {
    cursor: u64,
    asserted: Vec<String>,
    calls: Vec<Arc<CompletedCall>>,
    max_rendered_calls: usize,
}

impl OrderedFakeAsserter {
    /// Creates an asserter with the cursor before the first call
    #[must_use]
    pub fn new(max_rendered_calls: usize) -> Self {
        OrderedFakeAsserter {
            cursor: 0,
            asserted: Vec::new(),
            calls: Vec::new(),
            max_rendered_calls,
        }
    }

    /// Checks the calls matching `predicate` among `calls`, first without and then with
    /// regard to the order established by the previous assertions.
    ///
    /// ## Arguments
    /// * 'calls'            - The calls visible to the asserted fake
    /// * 'predicate'        - Selects the asserted calls
    /// * 'call_description' - The asserted call as it appears in the failure message
    /// * 'repeated'         - The expected number of matching calls
    ///
    /// # Errors
    /// Returns [`Error::ExpectationFailed`] if the calls did not happen as often as
    /// expected, or not after the calls matched by the previous assertion.
    pub fn assert_was_called(
        &mut self,
        calls: &[Arc<CompletedCall>],
        predicate: CallPredicate<'_>,
        call_description: &str,
        repeated: &Repeated,
    ) -> Result<()> {
        FakeAsserter::new(calls.to_vec(), self.max_rendered_calls).assert_was_called(
            predicate,
            call_description,
            repeated,
        )?;

        self.merge(calls);
        self.asserted.push(format!("{call_description} {repeated}"));

        let matched: Vec<u64> = calls
            .iter()
            .filter(|call| call.sequence_number() > self.cursor && predicate(call.as_ref()))
            .map(|call| call.sequence_number())
            .collect();
        if !repeated.matches(matched.len()) {
            debug!(cursor = self.cursor, call = call_description, "call out of order");
            return Err(Error::ExpectationFailed(self.failure_message()));
        }

        if let Some(last) = matched.into_iter().max() {
            self.cursor = last;
        }
        Ok(())
    }

    fn merge(&mut self, calls: &[Arc<CompletedCall>]) {
        for call in calls {
            if !self
                .calls
                .iter()
                .any(|known| known.sequence_number() == call.sequence_number())
            {
                self.calls.push(call.clone());
            }
        }
        self.calls.sort_by_key(|call| call.sequence_number());
    }

    fn failure_message(&self) -> String {
        let mut writer = StringOutputWriter::new();
        writer.write("\n\n");
        writer.indent();
        writer.write_line("Assertion failed.");
        writer.write_line("");
        writer.write_line("The calls were expected to happen in this order:");
        writer.indent();
        for (index, asserted) in self.asserted.iter().enumerate() {
            writer.write_line(&format!("{}: {asserted}", index + 1));
        }
        writer.unindent();
        writer.write_line("");
        writer.write_line("The calls that were made are:");
        writer.indent();
        CallWriter::new(self.max_rendered_calls).write_calls(&self.calls, &mut writer);
        writer.unindent();
        writer.unindent();
        writer.into_string()
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ORDERED: RefCell<Vec<(u64, Rc<RefCell<OrderedFakeAsserter>>)>> =
        const { RefCell::new(Vec::new()) };
}

/// Makes every assertion of the current thread an ordered one while it is alive.
///
/// ```rust
/// use dotfake::assertion::OrderedAssertions;
///
/// assert!(!OrderedAssertions::is_active());
/// {
///     let _ordered = OrderedAssertions::begin(19);
///     assert!(OrderedAssertions::is_active());
/// }
/// assert!(!OrderedAssertions::is_active());
/// ```
pub struct OrderedAssertions {
    id: u64,
    asserter: Rc<RefCell<OrderedFakeAsserter>>,
}

impl OrderedAssertions {
    /// Starts a new ordered context, replacing the current one until the guard is dropped
    #[must_use = "ordered assertions end when the guard is dropped"]
    pub fn begin(max_rendered_calls: usize) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let asserter = Rc::new(RefCell::new(OrderedFakeAsserter::new(max_rendered_calls)));
        ORDERED.with(|contexts| contexts.borrow_mut().push((id, asserter.clone())));
        OrderedAssertions { id, asserter }
    }

    /// Returns true while an ordered context is active on this thread
    #[must_use]
    pub fn is_active() -> bool {
        ORDERED.with(|contexts| !contexts.borrow().is_empty())
    }

    /// Makes an ordered assertion within this context.
    ///
    /// # Errors
    /// See [`OrderedFakeAsserter::assert_was_called`].
    pub fn assert_was_called(
        &self,
        calls: &[Arc<CompletedCall>],
        predicate: CallPredicate<'_>,
        call_description: &str,
        repeated: &Repeated,
    ) -> Result<()> {
        self.asserter
            .borrow_mut()
            .assert_was_called(calls, predicate, call_description, repeated)
    }

    /// The asserter of the innermost active context
    pub(crate) fn current() -> Option<Rc<RefCell<OrderedFakeAsserter>>> {
        ORDERED.with(|contexts| {
            contexts
                .borrow()
                .last()
                .map(|(_, asserter)| asserter.clone())
        })
    }
}

impl Drop for OrderedAssertions {
    fn drop(&mut self) {
        ORDERED.with(|contexts| {
            let mut contexts = contexts.borrow_mut();
            if let Some(position) = contexts.iter().rposition(|(id, _)| *id == self.id) {
                contexts.remove(position);
            }
        });
    }
}
