//! # dotfake Prelude
//!
//! The types and functions a test usually needs: the context and fakes, type
//! declaration helpers, values, configuration and assertion building blocks.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotfake operations
pub use crate::Error;

/// The result type used throughout dotfake
pub use crate::Result;

/// Framework configuration
pub use crate::FakeConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Creates fakes and dummies
pub use crate::{Fake, FakeContext, FakeOptions};

/// Builds argument lists
pub use crate::args;

// ================================================================================================
// Type Declarations
// ================================================================================================

/// Declaring the faked types
pub use crate::typesystem::{
    method_body, out_param, param, ref_param, TypeArg, TypeFlavor, TypeRc, TypeRegistry,
};

// ================================================================================================
// Values
// ================================================================================================

/// Values flowing through faked calls
pub use crate::value::{Delegate, Invocable, ObjectRef, Raise, Value};

// ================================================================================================
// Configuration and Assertions
// ================================================================================================

/// Configuring calls
pub use crate::configuration::{ArgumentConstraint, CallConfiguration};

/// Asserting on calls
pub use crate::assertion::{OrderedAssertions, Repeated};

/// Reading recorded calls
pub use crate::call::{ArgumentCollection, FakeObjectCall};

/// Scoping configuration and call visibility
pub use crate::scope::FakeScope;

// ================================================================================================
// Extension Points
// ================================================================================================

/// Registering dummies and default fake configuration
pub use crate::dummy::{DummyFactory, DummyPriority, FakeConfigurator, TypedDummyFactory};
