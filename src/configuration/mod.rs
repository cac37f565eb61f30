//! User configuration of faked calls.
//!
//! [`CallConfiguration`] is the fluent builder behind [`crate::Fake::call_to`] and its
//! siblings. It selects the member (or every member) a [`ConfiguredRule`] is about,
//! narrows the matching calls with [`ArgumentConstraint`]s and predicates, and sets what
//! matching calls do: return a value, throw, run callbacks, call the base method or
//! assign out and ref parameters. The same builder asserts on the calls it matches.

mod builder;
mod constraint;
mod rule;

pub use builder::CallConfiguration;
pub use constraint::ArgumentConstraint;
pub(crate) use rule::MethodSelector;
pub use rule::ConfiguredRule;
