//! Assertions on the calls made to fakes.
//!
//! An assertion counts the visible calls matching a predicate and compares the count
//! against a [`Repeated`] expectation. Which calls are visible is decided by the current
//! scope (see [`crate::scope`]). A failed assertion is an [`crate::Error::ExpectationFailed`]
//! whose message renders the visible calls through a [`crate::call::CallWriter`].
//!
//! # Ordered Assertions
//!
//! While an [`OrderedAssertions`] guard is alive, assertions made through
//! [`crate::configuration::CallConfiguration::must_have_happened`] additionally have to
//! observe their calls in the order the assertions are written, across fakes.
//!
//! ```rust
//! use dotfake::{args, FakeContext, Repeated};
//!
//! let context = FakeContext::new();
//! let types = context.types();
//! let service = types
//!     .interface("Acme", "IService")
//!     .method("Open", &types.void(), [])
//!     .method("Close", &types.void(), [])
//!     .build()?;
//!
//! let fake = context.fake(&service)?;
//! fake.call("Open", args![])?;
//! fake.call("Close", args![])?;
//!
//! let ordered = context.ordered_assertions();
//! fake.call_to("Open")?.must_have_happened(Repeated::once())?;
//! fake.call_to("Close")?.must_have_happened(Repeated::once())?;
//! drop(ordered);
//! # Ok::<(), dotfake::Error>(())
//! ```

mod asserter;
mod ordered;
mod repeated;

pub use asserter::{CallPredicate, FakeAsserter};
pub use ordered::{OrderedAssertions, OrderedFakeAsserter};
pub use repeated::Repeated;
