// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotfake
//!
//! A dynamic fake object framework for .NET style object models. Types are declared at
//! runtime in a [`typesystem::TypeRegistry`]; `dotfake` creates fakes of interfaces and
//! non-sealed classes whose calls are intercepted, answered by configurable rules,
//! recorded and asserted on.
//!
//! ## Features
//!
//! - **Fakes of interfaces and classes** - class fakes run a base constructor chosen
//!   automatically, with dummy arguments for every parameter
//! - **Configurable calls** - return values, return sequences, thrown errors, callbacks,
//!   base method calls and out / ref parameter values, narrowed by argument constraints
//! - **Call assertions** - exact, minimum and maximum call counts, also across fakes in
//!   a required order
//! - **Dummies** - placeholder values for any type, including fakes and constructed
//!   objects, extensible through registered factories
//! - **Scopes** - configuration and call visibility limited to a block of a test
//! - **Properties and events** - properties keep their assigned values, events can be
//!   subscribed to and raised
//!
//! ## Quick Start
//!
//! ```rust
//! use dotfake::prelude::*;
//!
//! let context = FakeContext::new();
//! let types = context.types();
//! let repository = types
//!     .interface("Acme", "IRepository")
//!     .method("Find", &types.string(), [param("id", &types.i4())])
//!     .method("Save", &types.void(), [param("id", &types.i4()), param("name", &types.string())])
//!     .build()?;
//!
//! let fake = context.fake(&repository)?;
//! fake.call_to("Find")?.with_args(args![1])?.returns("first")?;
//!
//! // The code under test receives `fake.object()` and calls it
//! assert_eq!(fake.call("Find", args![1])?, Value::from("first"));
//! fake.call("Save", args![1, "renamed"])?;
//!
//! fake.call_to("Save")?
//!     .with_args(args![1, "renamed"])?
//!     .must_have_happened(Repeated::once())?;
//! fake.call_to("Find")?.with_args(args![2])?.must_not_have_happened()?;
//! # Ok::<(), dotfake::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`typesystem`] - runtime type declarations: interfaces, classes, members
//! - [`value`] - the dynamic values flowing through faked calls
//! - [`fake`] - [`Fake`] handles and the [`FakeContext`] creating them
//! - [`creation`] - proxy generation and constructor selection
//! - [`manager`] - per fake interception through an ordered rule chain
//! - [`rules`] - the built-in rules answering unconfigured calls
//! - [`configuration`] - user configuration of calls
//! - [`assertion`] - call count and call order assertions
//! - [`call`] - intercepted and recorded calls and their rendering
//! - [`dummy`] - dummy value resolution
//! - [`scope`] - nested scopes of configuration and call visibility
//!
//! ## Logging
//!
//! `dotfake` emits [`tracing`] events: `debug` for fake creation, rule installation,
//! scope boundaries and failed assertions, `trace` for every intercepted call and the
//! rule answering it. Install any `tracing` subscriber to see them.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Assertion failures are
//! [`Error::ExpectationFailed`] errors carrying the complete rendered message:
//!
//! ```rust
//! use dotfake::{Error, FakeContext, Repeated};
//!
//! let context = FakeContext::new();
//! let types = context.types();
//! let service = types.interface("Acme", "IService").method("Start", &types.void(), []).build()?;
//! let fake = context.fake(&service)?;
//!
//! match fake.call_to("Start")?.must_have_happened(Repeated::once()) {
//!     Err(Error::ExpectationFailed(message)) => {
//!         assert!(message.contains("Acme.IService.Start()"))
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok::<(), dotfake::Error>(())
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotfake::prelude::*;
///
/// let context = FakeContext::new();
/// assert_eq!(context.dummy(&context.types().i4())?, Value::I4(0));
/// # Ok::<(), dotfake::Error>(())
/// ```
pub mod prelude;

/// Assertions on recorded calls: call counts and call order
pub mod assertion;

/// Intercepted and recorded calls, their arguments and their rendering
pub mod call;

/// Framework configuration
pub mod config;

/// Fluent configuration of faked calls and argument constraints
pub mod configuration;

/// Proxy generation and constructor selection
pub mod creation;

/// Dummy values for arbitrary types
pub mod dummy;

/// Fakes and the context creating them
pub mod fake;

/// Per fake interception of calls through an ordered chain of rules
pub mod manager;

/// The built-in rules answering calls nobody configured
pub mod rules;

/// Nested scopes limiting configuration lifetime and call visibility
pub mod scope;

/// Runtime declarations of the faked types
pub mod typesystem;

/// Dynamic values: primitives, objects, delegates
pub mod value;

/// `dotfake` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotfake` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the variants.
pub use error::Error;

pub use assertion::Repeated;
pub use config::FakeConfig;
pub use configuration::{ArgumentConstraint, CallConfiguration};
pub use creation::FakeOptions;
pub use fake::{Fake, FakeContext};
pub use scope::FakeScope;
pub use value::{Delegate, Raise, Value};
