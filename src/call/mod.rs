//! Call records and their rendering.
//!
//! Every invocation of an interceptable member of a fake becomes an [`InterceptedCall`]
//! while rules process it, and a [`CompletedCall`] once it has returned. Both expose the
//! call through the [`FakeObjectCall`] trait so matchers, rules and assertions treat them
//! uniformly.
//!
//! # Key Components
//!
//! - [`ArgumentCollection`]: argument values paired with their parameter names
//! - [`InterceptedCall`] / [`CompletedCall`]: a call in flight and its frozen record
//! - [`describe_call`]: renders a single call for diagnostics
//! - [`CallWriter`] / [`OutputWriter`]: bounded, run-length collapsed call listings

mod arguments;
mod formatter;
mod intercepted;
mod writer;

pub use arguments::ArgumentCollection;
pub use formatter::describe_call;
pub use intercepted::{CompletedCall, InterceptedCall};
pub use writer::{CallWriter, OutputWriter, StringOutputWriter};

use crate::{
    typesystem::MethodRc,
    value::ObjectRef,
};

/// Read access to a call made on a fake
pub trait FakeObjectCall {
    /// The invoked method
    fn method(&self) -> &MethodRc;

    /// The arguments of the call
    fn arguments(&self) -> &ArgumentCollection;

    /// The fake the call was made on, `None` once a recorded call outlived its fake
    fn faked_object(&self) -> Option<ObjectRef>;

    /// Identity of the fake the call was made on
    fn faked_object_id(&self) -> u64;
}
