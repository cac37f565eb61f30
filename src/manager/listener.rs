use crate::{
    call::{CompletedCall, FakeObjectCall},
    rules::FakeRule,
};

/// Observes the calls a manager processes.
///
/// Listeners are notified before rule selection in reverse registration order, and after
/// the call completed in registration order together with the rule that handled it.
pub trait InterceptionListener: Send + Sync {
    /// Called before a rule is selected for `call`
    fn on_before_call_intercepted(&self, _call: &dyn FakeObjectCall) {}

    /// Called once `call` completed, `rule` is the rule that was applied
    fn on_after_call_intercepted(&self, _call: &CompletedCall, _rule: &dyn FakeRule) {}
}
