use thiserror::Error;

macro_rules! configuration_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Configuration {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Configuration {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the way failures surface to a test author: configuration mistakes are
/// reported synchronously by the fluent API, creation failures aggregate every attempted
/// constructor, and assertion failures carry the rendered call log of the fake.
///
/// # Error Categories
///
/// ## Configuration Errors
/// - [`Error::Configuration`] - The fluent API was used in a way the faked member can not honor
/// - [`Error::MemberNotFound`] - A configured or invoked member does not exist on the faked type
///
/// ## Creation Errors
/// - [`Error::FakeCreation`] - No constructor of the faked type could be used to build a proxy
/// - [`Error::DummyCreation`] - No dummy value could be produced for a type
/// - [`Error::RecursionLimit`] - Dummy resolution nested deeper than allowed
///
/// ## Assertion Errors
/// - [`Error::ExpectationFailed`] - A call assertion did not hold
///
/// ## Call Errors
/// - [`Error::Thrown`] / [`Error::Custom`] - A configured rule threw on purpose
/// - [`Error::NoBaseImplementation`] - A base method was requested for an abstract member
///
/// ## Invariant Violations
/// - [`Error::ArgumentCountMismatch`], [`Error::ArgumentNotFound`],
///   [`Error::ArgumentOutOfRange`], [`Error::RuleNotFound`]
///
/// # Examples
///
/// ```rust
/// use dotfake::{Error, FakeContext};
///
/// let context = FakeContext::new();
/// let void = context.types().void();
///
/// match context.dummy(&void) {
///     Err(Error::DummyCreation { type_name, .. }) => assert_eq!(type_name, "System.Void"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The fluent configuration API was used incorrectly.
    ///
    /// Raised synchronously to the caller, e.g. when a return value does not fit the faked
    /// method's return type, when constructor arguments are supplied for an interface or when
    /// an event is raised with the wrong number of arguments.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the misconfiguration
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Configuration - {file}:{line}: {message}")]
    Configuration {
        /// The message to be printed for the Configuration error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A member could not be found on a faked type.
    #[error("The type {type_name} has no member named '{member}'")]
    MemberNotFound {
        /// Full name of the type that was searched
        type_name: String,
        /// Name of the member that was requested
        member: String,
    },

    /// A fake could not be created.
    ///
    /// Every attempted constructor contributes one entry to `reasons`, distinguishing
    /// constructors whose arguments could not be resolved from constructors that failed
    /// while running.
    #[error("{}", render_creation_failure(.type_name, .reasons))]
    FakeCreation {
        /// Full name of the type that should have been faked
        type_name: String,
        /// One failure reason per attempted constructor
        reasons: Vec<String>,
    },

    /// No dummy value could be resolved for a type.
    #[error("Failed to create dummy of type {type_name}: {reason}")]
    DummyCreation {
        /// Full name of the type
        type_name: String,
        /// Why resolution failed
        reason: String,
    },

    /// A call assertion failed.
    ///
    /// The message contains the asserted call, the expected repetition, the number of
    /// matching calls found and a rendering of every visible call.
    #[error("{0}")]
    ExpectationFailed(String),

    /// A configured rule threw an error on purpose.
    #[error("{0}")]
    Thrown(String),

    /// A configured rule threw a caller supplied error.
    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The base implementation of a member was requested but the member is abstract.
    #[error("The member {0} has no base implementation that could be called")]
    NoBaseImplementation(String),

    /// Argument values and parameter names do not pair up.
    #[error(
        "The number of argument names ({names}) does not match \
         the number of arguments ({arguments})"
    )]
    ArgumentCountMismatch {
        /// Number of argument values supplied
        arguments: usize,
        /// Number of parameter names supplied
        names: usize,
    },

    /// No argument with the requested name exists.
    #[error("The call has no argument named '{0}'")]
    ArgumentNotFound(String),

    /// An argument index was outside of the collection.
    #[error("Argument index {index} is out of range, the call has {count} arguments")]
    ArgumentOutOfRange {
        /// Requested index
        index: usize,
        /// Number of arguments in the collection
        count: usize,
    },

    /// A rule was removed from a manager that does not hold it.
    #[error("The rule is not registered on this fake")]
    RuleNotFound,

    /// Recursion limit reached.
    ///
    /// Dummy resolution refuses to nest deeper than the configured depth, even for
    /// type graphs that are not circular.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}

impl Error {
    /// Wraps an arbitrary error so that a configured rule can throw it.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Custom(Box::new(error))
    }
}

fn render_creation_failure(type_name: &str, reasons: &[String]) -> String {
    let mut message = format!("\n  Failed to create fake of type {type_name}.\n\n");
    message.push_str("  Below is a list of reasons for failure per attempted constructor:\n");
    if reasons.is_empty() {
        message.push_str("    No usable constructors were found.\n");
    }
    for reason in reasons {
        message.push_str("    ");
        message.push_str(reason);
        message.push('\n');
    }
    message
}
