
use std::sync::Arc;

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    config::FakeConfig,
    creation::{DynamicProxyGenerator, ProxyGenerationResult, ProxyGenerator},
    dummy::DummyValueResolver,
    manager::{FakeManager, FakeManagerProvider},
    rules::FakeRule,
    typesystem::TypeRc,
    value::{ObjectRef, Value},
    Result,
};

/// A resolver that never produces a dummy, unconfigured calls fall back to default values
pub struct NoDummies;

impl DummyValueResolver for NoDummies {
    fn try_resolve_dummy(&self, _ty: &TypeRc) -> Option<Value> {
        None
    }
}

/// A loose fake of `ty` with its manager, bypassing the context
pub fn fake_of(ty: &TypeRc) -> (ObjectRef, Arc<FakeManager>) {
    let provider = Arc::new(FakeManagerProvider::new(Arc::new(NoDummies), FakeConfig::default()));
    let ProxyGenerationResult::Generated(proxy) =
        DynamicProxyGenerator.generate_proxy(ty, &[], None, provider)
    else {
        panic!("{} can not be proxied", ty.fullname());
    };
    let manager = FakeManager::of(&proxy).expect("generated proxies are fakes");
    (proxy, manager)
}

/// Answers every call with a fixed value
pub struct FixedRule {
    value: Value,
    times: Option<usize>,
}

impl FixedRule {
    pub fn new(value: Value, times: Option<usize>) -> Self {
        FixedRule { value, times }
    }
}

impl FakeRule for FixedRule {
    fn is_applicable_to(&self, _call: &dyn FakeObjectCall) -> bool {
        true
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        call.set_return_value(self.value.clone());
        Ok(())
    }

    fn number_of_times_to_call(&self) -> Option<usize> {
        self.times
    }

    fn description(&self) -> String {
        format!("Always {}", self.value)
    }
}
