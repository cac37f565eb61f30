//! Creation of fakes.
//!
//! A fake is a proxy generated for the faked type whose interceptable members forward into
//! a [`crate::manager::FakeManager`]. Generating the proxy is the job of a
//! [`ProxyGenerator`]; the [`FakeObjectCreator`] decides which constructor the proxy is
//! built with and collects the reason every attempted constructor failed.
//!
//! # Key Components
//!
//! - [`ProxyGenerator`] / [`DynamicProxyGenerator`]: builds proxy instances
//! - [`FakeObjectCreator`]: constructor selection and failure aggregation
//! - [`FakeOptions`]: per fake settings (constructor arguments, extra interfaces, wrapping,
//!   strictness, creation callbacks)

mod creator;
mod options;
mod proxy;

use std::sync::Arc;

pub use creator::FakeObjectCreator;
pub use options::FakeOptions;
pub use proxy::DynamicProxyGenerator;

use crate::{
    manager::CallProcessorProvider,
    typesystem::TypeRc,
    value::{ObjectRef, Value},
};

/// Outcome of a proxy generation attempt
#[derive(Debug)]
pub enum ProxyGenerationResult {
    /// The generated proxy
    Generated(ObjectRef),
    /// Why no proxy could be generated
    Failed(String),
}

/// Generates proxies forwarding every interceptable call into a call processor
pub trait ProxyGenerator: Send + Sync {
    /// Generates a proxy of `ty` that also implements `additional_interfaces`.
    ///
    /// ## Arguments
    /// * 'ty'                    - The type to proxy
    /// * 'additional_interfaces' - Interfaces the proxy implements on top of `ty`
    /// * 'constructor_arguments' - Arguments for the base constructor, `None` for the
    ///   parameterless one
    /// * 'provider'              - Builds the call processor the proxy forwards to
    fn generate_proxy(
        &self,
        ty: &TypeRc,
        additional_interfaces: &[TypeRc],
        constructor_arguments: Option<&[Value]>,
        provider: Arc<dyn CallProcessorProvider>,
    ) -> ProxyGenerationResult;
}
