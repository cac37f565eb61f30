//! Integration tests for call assertions, ordered assertions and argument constraints.

use dotfake::prelude::*;

fn declare(context: &FakeContext) -> Result<(TypeRc, TypeRc)> {
    let types = context.types();
    let first = types
        .interface("Acme", "IFirst")
        .method("Foo", &types.void(), [])
        .method("Baz", &types.void(), [])
        .build()?;
    let second = types
        .interface("Acme", "ISecond")
        .method("Bar", &types.void(), [param("value", &types.i4())])
        .build()?;
    Ok((first, second))
}

#[test]
fn test_ordered_assertions_across_fakes() -> Result<()> {
    let context = FakeContext::new();
    let (first, second) = declare(&context)?;
    let a = context.fake(&first)?;
    let b = context.fake(&second)?;

    a.call("Foo", args![])?;
    b.call("Bar", args![7])?;
    a.call("Baz", args![])?;

    {
        let _ordered = context.ordered_assertions();
        a.call_to("Foo")?.must_have_happened(Repeated::once())?;
        b.call_to("Bar")?.must_have_happened(Repeated::once())?;
        a.call_to("Baz")?.must_have_happened(Repeated::once())?;
    }

    {
        let _ordered = context.ordered_assertions();
        a.call_to("Foo")?.must_have_happened(Repeated::once())?;
        a.call_to("Baz")?.must_have_happened(Repeated::once())?;
    }

    let _ordered = context.ordered_assertions();
    a.call_to("Baz")?.must_have_happened(Repeated::once())?;
    let Err(Error::ExpectationFailed(message)) =
        a.call_to("Foo")?.must_have_happened(Repeated::once())
    else {
        panic!("Foo happened before Baz");
    };
    assert!(message.contains("Acme.IFirst.Baz()"));
    assert!(message.contains("Acme.IFirst.Foo()"));
    Ok(())
}

#[test]
fn test_assertions_outside_ordered_context_ignore_order() -> Result<()> {
    let context = FakeContext::new();
    let (first, _) = declare(&context)?;
    let a = context.fake(&first)?;

    a.call("Foo", args![])?;
    a.call("Baz", args![])?;
    a.call_to("Baz")?.must_have_happened(Repeated::once())?;
    a.call_to("Foo")?.must_have_happened(Repeated::once())
}

#[test]
fn test_constrained_assertions() -> Result<()> {
    let context = FakeContext::new();
    let (_, second) = declare(&context)?;
    let b = context.fake(&second)?;

    for value in [1, 5, 12, 40] {
        b.call("Bar", args![value])?;
    }

    let large = ArgumentConstraint::that("greater than 10", |value| {
        value.as_i32().is_some_and(|value| value > 10)
    });
    b.call_to("Bar")?
        .with_constraints(vec![large])?
        .must_have_happened(Repeated::twice())?;
    b.call_to("Bar")?
        .with_args(args![5])?
        .must_have_happened(Repeated::once())?;
    b.call_to("Bar")?.must_have_happened(Repeated::at_least(4))?;
    b.call_to("Bar")?.must_have_happened(Repeated::at_most(4))?;

    let Err(Error::ExpectationFailed(message)) = b
        .call_to("Bar")?
        .when_arguments_match(|arguments| arguments.get(0).ok().and_then(Value::as_i32) == Some(99))
        .must_have_happened(Repeated::once())
    else {
        panic!("no call passed 99");
    };
    assert!(message.contains("found it #0 times"));
    assert!(message.contains("4: Acme.ISecond.Bar(value: 40)"));
    Ok(())
}

#[test]
fn test_custom_repeat_predicate() -> Result<()> {
    let context = FakeContext::new();
    let (first, _) = declare(&context)?;
    let a = context.fake(&first)?;

    for _ in 0..4 {
        a.call("Foo", args![])?;
    }
    a.call_to("Foo")?
        .must_have_happened(Repeated::like("an even number of times", |count| count % 2 == 0))?;

    let Err(Error::ExpectationFailed(message)) =
        a.call_to("Foo")?.must_have_happened(Repeated::like("an odd number of times", |count| {
            count % 2 == 1
        }))
    else {
        panic!("four is not odd");
    };
    assert!(message.contains("an odd number of times"));
    Ok(())
}
