//! Integration tests for rule selection, scopes and the end-to-end configure, call and
//! assert cycle.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dotfake::{
    call::{FakeObjectCall, CompletedCall},
    manager::InterceptionListener,
    prelude::*,
    rules::FakeRule,
};

fn counter_type(context: &FakeContext) -> Result<TypeRc> {
    let types = context.types();
    types
        .interface("Acme", "ICounter")
        .method("Get", &types.i4(), [])
        .method("Add", &types.i4(), [param("amount", &types.i4())])
        .method("Reset", &types.void(), [])
        .property("Label", &types.string())
        .build()
}

#[test]
fn test_unconfigured_get_returns_default_then_configured_value() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    assert_eq!(fake.call("Get", args![])?, Value::I4(0));

    let scope = FakeScope::create();
    fake.call_to("Get")?.returns(5)?;
    fake.call_to("Get")?.must_not_have_happened()?;
    assert_eq!(fake.call("Get", args![])?, Value::I4(5));
    fake.call_to("Get")?.must_have_happened(Repeated::exactly(1))?;

    assert_eq!(fake.call("Get", args![])?, Value::I4(5));
    let Err(Error::ExpectationFailed(message)) =
        fake.call_to("Get")?.must_have_happened(Repeated::exactly(1))
    else {
        panic!("two calls must fail an exactly once assertion");
    };
    assert!(message.contains("exactly once"));
    assert!(message.contains("found it #2 times"));
    drop(scope);
    Ok(())
}

#[test]
fn test_most_recent_rule_wins_and_falls_through_when_exhausted() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    fake.call_to("Get")?.returns(1)?;
    fake.call_to("Get")?.returns(2)?.number_of_times(2);
    fake.call_to("Get")?.returns(3)?.once();

    let values: Vec<Value> = (0..5).map(|_| fake.call("Get", args![])).collect::<Result<_>>()?;
    assert_eq!(values, args![3, 2, 2, 1, 1]);
    Ok(())
}

#[test]
fn test_closing_a_scope_removes_exactly_its_rules() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    fake.call_to("Get")?.returns(1)?;
    {
        let _scope = FakeScope::create();
        fake.call_to("Get")?.returns(2)?;
        fake.call_to("Add")?.returns_lazily(|call| {
            let amount = call.arguments().by_name("amount")?.as_i32().unwrap_or_default();
            Ok(Value::I4(amount * 10))
        })?;
        assert_eq!(fake.manager().user_rules().len(), 3);
        assert_eq!(fake.call("Get", args![])?, Value::I4(2));
        assert_eq!(fake.call("Add", args![4])?, Value::I4(40));
    }

    assert_eq!(fake.manager().user_rules().len(), 1);
    assert_eq!(fake.call("Get", args![])?, Value::I4(1));
    assert_eq!(fake.call("Add", args![4])?, Value::I4(0));
    Ok(())
}

#[test]
fn test_scope_limits_visible_calls() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    fake.call("Reset", args![])?;
    {
        let _scope = FakeScope::create();
        fake.call_to("Reset")?.must_not_have_happened()?;
        fake.call("Reset", args![])?;
        fake.call_to("Reset")?.must_have_happened(Repeated::once())?;
    }
    fake.call_to("Reset")?.must_have_happened(Repeated::twice())
}

#[test]
fn test_never_failure_lists_calls() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    fake.call_to("Reset")?.must_have_happened(Repeated::never())?;
    fake.call("Reset", args![])?;

    let Err(Error::ExpectationFailed(message)) =
        fake.call_to("Reset")?.must_have_happened(Repeated::never())
    else {
        panic!("a call must fail a never assertion");
    };
    assert!(message.contains("exactly 0 times"));
    assert!(message.contains("1: Acme.ICounter.Reset()"));
    Ok(())
}

#[test]
fn test_repeated_identical_calls_are_collapsed() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    for _ in 0..25 {
        fake.call("Get", args![])?;
    }
    let Err(Error::ExpectationFailed(message)) =
        fake.call_to("Get")?.must_not_have_happened()
    else {
        panic!("expected an assertion failure");
    };
    assert!(message.contains("1: Acme.ICounter.Get() repeated 25 times"));
    assert_eq!(message.matches("Acme.ICounter.Get()").count(), 2);
    Ok(())
}

#[test]
fn test_property_state_is_kept() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;

    assert_eq!(fake.get("Label")?, Value::from(""));
    fake.set("Label", "first")?;
    fake.set("Label", "second")?;
    assert_eq!(fake.get("Label")?, Value::from("second"));
    fake.call_to_set("Label")?
        .with_args(args!["first"])?
        .must_have_happened(Repeated::once())
}

struct Recording {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl InterceptionListener for Recording {
    fn on_before_call_intercepted(&self, _call: &dyn FakeObjectCall) {
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn on_after_call_intercepted(&self, _call: &CompletedCall, _rule: &dyn FakeRule) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_listeners_see_every_call() -> Result<()> {
    let context = FakeContext::new();
    let counter = counter_type(&context)?;
    let fake = context.fake(&counter)?;
    let listener = Arc::new(Recording {
        before: AtomicUsize::new(0),
        after: AtomicUsize::new(0),
    });
    fake.manager().add_interception_listener(listener.clone());

    fake.call_to("Reset")?.throws_message("reset failed");
    fake.call("Get", args![])?;
    assert!(fake.call("Reset", args![]).is_err());

    assert_eq!(listener.before.load(Ordering::SeqCst), 2);
    assert_eq!(listener.after.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_argument_collection_rejects_mismatched_names() {
    let result = ArgumentCollection::new(args![1, 2], vec!["only".to_string()]);
    assert!(matches!(result, Err(Error::ArgumentCountMismatch { arguments: 2, names: 1 })));
}
