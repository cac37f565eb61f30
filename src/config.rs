//! Framework configuration
//!
//! This module provides the knobs that influence how fakes are created, how calls are
//! recorded and how much of the call history is rendered into assertion failures.

/// Configuration for a [`crate::FakeContext`]
///
/// The defaults match what a test suite usually wants: loose fakes that answer every
/// unconfigured call with a default value, full call recording, and failure messages that
/// list up to 19 (run-length collapsed) calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeConfig {
    /// Maximum number of collapsed call lines rendered into an assertion failure
    /// before the remaining calls are summarized (default: 19)
    pub max_rendered_calls: usize,

    /// Maximum nesting depth of a single dummy resolution tree (default: 64)
    /// Circular graphs are rejected long before this through cycle detection; the limit only
    /// bounds very deep but legitimate graphs
    pub max_resolution_depth: usize,

    /// Create every fake as a strict fake, rejecting unconfigured calls
    pub strict_by_default: bool,

    /// Record intercepted calls for later assertions (default: true)
    /// Disabling recording makes every assertion see an empty call history
    pub record_calls: bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            max_rendered_calls: 19,
            max_resolution_depth: 64,
            strict_by_default: false,
            record_calls: true,
        }
    }
}

impl FakeConfig {
    /// Creates a configuration where every fake is strict
    ///
    /// Unconfigured calls (other than `System.Object` members) fail with an
    /// [`crate::Error::ExpectationFailed`].
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_by_default: true,
            ..Self::default()
        }
    }

    /// Creates a minimal configuration for benchmarks and stress tests
    ///
    /// Calls are not recorded and failure messages render a single call line.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            max_rendered_calls: 1,
            max_resolution_depth: 16,
            strict_by_default: false,
            record_calls: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_config_presets() {
        let default = FakeConfig::default();
        assert_eq!(default.max_rendered_calls, 19);
        assert_eq!(default.max_resolution_depth, 64);
        assert!(!default.strict_by_default);
        assert!(default.record_calls);

        let strict = FakeConfig::strict();
        assert!(strict.strict_by_default);
        assert_eq!(strict.max_rendered_calls, default.max_rendered_calls);

        let minimal = FakeConfig::minimal();
        assert!(!minimal.record_calls);
        assert_eq!(minimal.max_rendered_calls, 1);
    }
}
