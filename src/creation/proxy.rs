use std::sync::Arc;

use crate::{
    creation::{ProxyGenerationResult, ProxyGenerator},
    manager::{CallProcessorProvider, FakeTag},
    typesystem::{ConstructorRc, TypeRc},
    value::{Instance, Value},
};

/// Generates proxies as runtime [`Instance`]s carrying a [`FakeTag`].
///
/// Class proxies run the selected base constructor before the proxy is handed out, so a
/// throwing constructor fails the generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicProxyGenerator;

impl DynamicProxyGenerator {
    fn select_constructor(ty: &TypeRc, arguments: &[Value]) -> Option<ConstructorRc> {
        ty.constructors
            .iter()
            .map(|(_, ctor)| ctor)
            .find(|ctor| {
                ctor.params.len() == arguments.len()
                    && ctor.params.iter().zip(arguments).all(|(param, value)| {
                        param
                            .param_type
                            .upgrade()
                            .is_some_and(|param_type| value.is_assignable_to(&param_type))
                    })
            })
            .cloned()
    }
}

impl ProxyGenerator for DynamicProxyGenerator {
    fn generate_proxy(
        &self,
        ty: &TypeRc,
        additional_interfaces: &[TypeRc],
        constructor_arguments: Option<&[Value]>,
        provider: Arc<dyn CallProcessorProvider>,
    ) -> ProxyGenerationResult {
        if !ty.can_be_proxied() {
            return ProxyGenerationResult::Failed(format!(
                "The type {} can not be proxied because it is sealed or not a reference type.",
                ty.fullname()
            ));
        }
        if let Some(interface) = additional_interfaces
            .iter()
            .find(|interface| !interface.is_interface())
        {
            return ProxyGenerationResult::Failed(format!(
                "The type {} is not an interface and can not be implemented additionally.",
                interface.fullname()
            ));
        }

        if !ty.is_interface() {
            let arguments = constructor_arguments.unwrap_or_default();
            let Some(constructor) = Self::select_constructor(ty, arguments) else {
                return ProxyGenerationResult::Failed(
                    "No constructor matches the passed arguments for constructor.".to_string(),
                );
            };
            if let Err(error) = constructor.invoke(arguments.to_vec()) {
                return ProxyGenerationResult::Failed(format!("The constructor threw: {error}"));
            }
        }

        ProxyGenerationResult::Generated(Instance::proxy(
            ty,
            additional_interfaces.to_vec(),
            FakeTag::new(provider),
        ))
    }
}
