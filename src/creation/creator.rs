use std::{cmp::Reverse, sync::Arc};

use tracing::debug;

use crate::{
    creation::{FakeOptions, ProxyGenerationResult, ProxyGenerator},
    manager::CallProcessorProvider,
    typesystem::TypeRc,
    value::{ObjectRef, Value},
    Error, Result,
};

/// Chooses the constructor a fake is built with.
///
/// Without explicit constructor arguments the parameterless constructor is tried first,
/// then every other constructor from the widest to the narrowest with dummy arguments.
/// If none works, the failure of every attempt is reported in one
/// [`Error::FakeCreation`].
pub struct FakeObjectCreator {
    generator: Arc<dyn ProxyGenerator>,
}

impl FakeObjectCreator {
    /// Creates a creator generating proxies through `generator`
    pub fn new(generator: Arc<dyn ProxyGenerator>) -> Self {
        FakeObjectCreator { generator }
    }

    /// Creates a fake of `ty`.
    ///
    /// ## Arguments
    /// * 'ty'            - The type to fake
    /// * 'options'       - Constructor arguments and additional interfaces
    /// * 'provider'      - Builds the manager of the proxy
    /// * 'resolve_dummy' - Resolves dummies for constructor parameters
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if constructor arguments are given for an
    /// interface, [`Error::FakeCreation`] if no constructor could be used.
    pub fn create_fake(
        &self,
        ty: &TypeRc,
        options: &FakeOptions,
        provider: Arc<dyn CallProcessorProvider>,
        resolve_dummy: &mut dyn FnMut(&TypeRc) -> Option<Value>,
    ) -> Result<ObjectRef> {
        let interfaces = options.additional_interfaces.as_slice();

        if let Some(arguments) = &options.constructor_arguments {
            if ty.is_interface() {
                return Err(configuration_error!(
                    "Arguments for constructor specified for interface type {}.",
                    ty.fullname()
                ));
            }

            return match self.generator.generate_proxy(ty, interfaces, Some(arguments), provider) {
                ProxyGenerationResult::Generated(proxy) => Ok(proxy),
                ProxyGenerationResult::Failed(reason) => {
                    let rendered: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                    Err(Error::FakeCreation {
                        type_name: ty.fullname(),
                        reasons: vec![format!(
                            "Constructor with arguments ({}) failed: {reason}",
                            rendered.join(", ")
                        )],
                    })
                }
            };
        }

        if ty.is_interface() || !ty.can_be_proxied() {
            return match self.generator.generate_proxy(ty, interfaces, None, provider) {
                ProxyGenerationResult::Generated(proxy) => Ok(proxy),
                ProxyGenerationResult::Failed(reason) => Err(Error::FakeCreation {
                    type_name: ty.fullname(),
                    reasons: vec![reason],
                }),
            };
        }

        let mut constructors: Vec<_> = ty
            .constructors
            .iter()
            .map(|(_, ctor)| ctor.clone())
            .collect();
        // Stable sort: the parameterless constructor first, then widest to narrowest
        constructors.sort_by_key(|ctor| (!ctor.params.is_empty(), Reverse(ctor.params.len())));

        let mut reasons = Vec::new();
        for constructor in constructors {
            let mut arguments = Vec::with_capacity(constructor.params.len());
            let mut unresolved = Vec::new();
            for param in &constructor.params {
                match param.param_type.upgrade().and_then(|param_type| resolve_dummy(&param_type)) {
                    Some(value) => arguments.push(value),
                    None => unresolved.push(param.param_type.fullname().to_string()),
                }
            }

            if !unresolved.is_empty() {
                reasons.push(format!(
                    "Constructor with signature {} failed: \
                     No dummy could be resolved for the parameter types ({}).",
                    constructor.signature(),
                    unresolved.join(", ")
                ));
                continue;
            }

            match self
                .generator
                .generate_proxy(ty, interfaces, Some(&arguments), provider.clone())
            {
                ProxyGenerationResult::Generated(proxy) => {
                    debug!(
                        type_name = %ty.fullname(),
                        signature = %constructor.signature(),
                        "created fake"
                    );
                    return Ok(proxy);
                }
                ProxyGenerationResult::Failed(reason) => reasons.push(format!(
                    "Constructor with signature {} failed: {reason}",
                    constructor.signature()
                )),
            }
        }

        Err(Error::FakeCreation {
            type_name: ty.fullname(),
            reasons,
        })
    }
}
