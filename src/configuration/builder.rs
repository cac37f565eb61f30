use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    assertion::{FakeAsserter, OrderedAssertions, Repeated},
    call::{ArgumentCollection, FakeObjectCall},
    configuration::{
        rule::{Behavior, MethodSelector, RuleState},
        ArgumentConstraint, ConfiguredRule,
    },
    manager::FakeManager,
    rules::{CallRuleMetadata, FakeRule},
    scope::FakeScope,
    typesystem::MethodRc,
    value::Value,
    Error, Result,
};

/// Fluent configuration of the calls to one member (or to any member) of a fake.
///
/// The configured rule is added in front of the fake's rules once the first behavior is
/// configured, so the most recent configuration wins. Configurations made inside a
/// [`crate::scope::FakeScope`] are removed again when the scope closes.
///
/// A configuration without any configured behavior only specifies calls. It never enters
/// the rule chain and can be kept around to assert on later.
///
/// ```rust
/// use dotfake::{args, typesystem::param, FakeContext, Repeated, Value};
///
/// let context = FakeContext::new();
/// let types = context.types();
/// let calculator = types
///     .interface("Acme", "ICalculator")
///     .method("Add", &types.i4(), [param("a", &types.i4()), param("b", &types.i4())])
///     .build()?;
///
/// let fake = context.fake(&calculator)?;
/// fake.call_to("Add")?.with_args(args![1, 2])?.returns(3)?;
///
/// assert_eq!(fake.call("Add", args![1, 2])?, Value::I4(3));
/// assert_eq!(fake.call("Add", args![2, 2])?, Value::I4(0));
/// fake.call_to("Add")?.with_args(args![1, 2])?.must_have_happened(Repeated::once())?;
/// # Ok::<(), dotfake::Error>(())
/// ```
pub struct CallConfiguration {
    manager: Arc<FakeManager>,
    rule: Arc<ConfiguredRule>,
    metadata: OnceLock<Arc<CallRuleMetadata>>,
}

impl CallConfiguration {
    pub(crate) fn new(manager: &Arc<FakeManager>, selector: MethodSelector) -> Self {
        CallConfiguration {
            manager: manager.clone(),
            rule: Arc::new(ConfiguredRule::new(selector, manager.resolver().clone())),
            metadata: OnceLock::new(),
        }
    }

    /// The configured rule
    #[must_use]
    pub fn rule(&self) -> &Arc<ConfiguredRule> {
        &self.rule
    }

    /// How often the rule has been applied so far
    #[must_use]
    pub fn times_applied(&self) -> usize {
        self.metadata
            .get()
            .map_or(0, |metadata| metadata.called_number_of_times())
    }

    /// Returns true once a behavior was configured and the rule joined the fake's rules
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.metadata.get().is_some()
    }

    fn candidates(&self) -> Vec<MethodRc> {
        self.rule.candidates()
    }

    fn configure(self, configure: impl FnOnce(&mut RuleState)) -> Self {
        self.rule.update(configure);
        self.metadata
            .get_or_init(|| FakeScope::add_rule_first(&self.manager, self.rule.clone()));
        self
    }

    /// Only matches calls with exactly these arguments
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if no configured overload accepts the arguments.
    pub fn with_args(self, arguments: Vec<Value>) -> Result<Self> {
        self.with_constraints(arguments.into_iter().map(ArgumentConstraint::from).collect())
    }

    /// Only matches calls whose arguments satisfy `constraints`, one per parameter.
    ///
    /// Narrows the configured overloads to those taking as many arguments as there are
    /// constraints, and accepting the values of equality constraints.
    ///
    /// # Errors
    /// Returns [`Error::MemberNotFound`] if no configured overload fits.
    pub fn with_constraints(self, constraints: Vec<ArgumentConstraint>) -> Result<Self> {
        let candidates = self.candidates();
        if !candidates.is_empty() {
            let fitting: Vec<MethodRc> = candidates
                .iter()
                .filter(|method| accepts(method, &constraints))
                .cloned()
                .collect();
            if fitting.is_empty() {
                return Err(Error::MemberNotFound {
                    type_name: candidates[0].declaring_type.fullname().to_string(),
                    member: format!("{}/{}", candidates[0].name, constraints.len()),
                });
            }
            self.rule
                .update(|state| state.selector = MethodSelector::Methods(fitting));
        }
        self.rule
            .update(|state| state.constraints = Some(constraints));
        Ok(self)
    }

    /// Matches calls regardless of their arguments
    pub fn with_any_arguments(self) -> Self {
        self.rule.update(|state| state.constraints = None);
        self
    }

    /// Only matches calls whose arguments are accepted by `predicate`
    pub fn when_arguments_match<F>(self, predicate: F) -> Self
    where
        F: Fn(&ArgumentCollection) -> bool + Send + Sync + 'static,
    {
        self.where_call("arguments match predicate", move |call| predicate(call.arguments()))
    }

    /// Only matches calls accepted by `predicate`, rendered as `where <description>`
    pub fn where_call<F>(self, description: &str, predicate: F) -> Self
    where
        F: Fn(&dyn FakeObjectCall) -> bool + Send + Sync + 'static,
    {
        let description = description.to_string();
        self.rule
            .update(|state| state.filters.push((Arc::new(predicate), description)));
        self
    }

    /// Returns `value` from matching calls.
    ///
    /// A configuration for any member only applies to members whose return type accepts
    /// `value`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a configured member returns `void` or its return
    /// type does not accept `value`.
    pub fn returns(self, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let candidates = self.candidates();
        if candidates.is_empty() {
            let accepted = value.clone();
            let this = self.where_call("the return type accepts the value", move |call| {
                call.method()
                    .return_type()
                    .is_some_and(|return_type| accepted.is_assignable_to(&return_type))
            });
            return Ok(this.configure(|state| state.behavior = Behavior::ReturnValue(value)));
        }

        for method in &candidates {
            check_return_value(method, &value)?;
        }
        Ok(self.configure(|state| state.behavior = Behavior::ReturnValue(value)))
    }

    /// Returns the value produced by `factory` from every matching call
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a configured member returns `void`.
    pub fn returns_lazily<F>(self, factory: F) -> Result<Self>
    where
        F: Fn(&dyn FakeObjectCall) -> Result<Value> + Send + Sync + 'static,
    {
        if let Some(method) = self.candidates().iter().find(|method| method.returns_void()) {
            return Err(configuration_error!(
                "The method {} returns void, no return value can be configured",
                method.fullname()
            ));
        }
        Ok(self.configure(|state| state.behavior = Behavior::Lazily(Arc::new(factory))))
    }

    /// Returns `values` one after the other, one value per matching call.
    ///
    /// The rule is exhausted after the last value, later calls fall through to older
    /// configurations.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a value does not fit a configured member.
    pub fn returns_next_from_sequence(self, values: Vec<Value>) -> Result<Self> {
        for method in &self.candidates() {
            for value in &values {
                check_return_value(method, value)?;
            }
        }
        Ok(self.configure(|state| {
            state.times = Some(values.len());
            state.sequence = VecDeque::from(values);
            state.behavior = Behavior::Sequence;
        }))
    }

    /// Fails matching calls with the error produced by `factory`
    pub fn throws<F>(self, factory: F) -> Self
    where
        F: Fn(&dyn FakeObjectCall) -> Error + Send + Sync + 'static,
    {
        self.configure(|state| state.behavior = Behavior::Throw(Arc::new(factory)))
    }

    /// Fails matching calls with [`Error::Thrown`] carrying `message`
    pub fn throws_message(self, message: &str) -> Self {
        let message = message.to_string();
        self.throws(move |_| Error::Thrown(message.clone()))
    }

    /// Runs `action` on every matching call before the configured behavior
    pub fn invokes<F>(self, action: F) -> Self
    where
        F: Fn(&dyn FakeObjectCall) -> Result<()> + Send + Sync + 'static,
    {
        self.configure(|state| state.actions.push(Arc::new(action)))
    }

    /// Runs the base implementation for matching calls
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if every configured member is abstract.
    pub fn calls_base_method(self) -> Result<Self> {
        let candidates = self.candidates();
        if !candidates.is_empty() && candidates.iter().all(|method| method.body().is_none()) {
            return Err(configuration_error!(
                "The member {} is abstract, it has no base method that could be called",
                candidates[0].fullname()
            ));
        }
        Ok(self.configure(|state| state.behavior = Behavior::CallBase))
    }

    /// Makes matching calls do nothing, returning the default value of non-void members
    pub fn does_nothing(self) -> Self {
        self.configure(|state| state.behavior = Behavior::Default)
    }

    /// Writes `values` to the out and ref parameters of matching calls, in parameter order
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the number of values does not match the number of
    /// out and ref parameters of a configured member.
    pub fn assigns_out_and_ref_parameters(self, values: Vec<Value>) -> Result<Self> {
        for method in &self.candidates() {
            let out_and_ref = method.params.iter().filter(|param| param.is_out_or_ref()).count();
            if out_and_ref != values.len() {
                return Err(configuration_error!(
                    "The number of values for out and ref parameters specified does not match \
                     the number of out and ref parameters of {}: expected {}, got {}",
                    method.fullname(),
                    out_and_ref,
                    values.len()
                ));
            }
        }
        Ok(self.configure(|state| state.out_and_ref = Some(values)))
    }

    /// Applies the configuration to `count` calls, later calls fall through to older rules
    pub fn number_of_times(self, count: usize) -> Self {
        self.configure(|state| state.times = Some(count))
    }

    /// Applies the configuration to a single call
    pub fn once(self) -> Self {
        self.number_of_times(1)
    }

    /// Applies the configuration to two calls
    pub fn twice(self) -> Self {
        self.number_of_times(2)
    }

    /// Asserts that matching calls happened as often as `repeated` expects.
    ///
    /// Only the calls visible from the current scope count. Inside an
    /// [`OrderedAssertions`] context the calls must also come after those of the previous
    /// ordered assertion.
    ///
    /// # Errors
    /// Returns [`Error::ExpectationFailed`] with the rendered call list if the assertion
    /// does not hold.
    pub fn must_have_happened(&self, repeated: Repeated) -> Result<()> {
        let calls = FakeScope::calls_within_current_scope(&self.manager);
        let description = self.rule.describe();
        let predicate = |call: &dyn FakeObjectCall| self.rule.is_applicable_to(call);

        if let Some(ordered) = OrderedAssertions::current() {
            let mut ordered = ordered.borrow_mut();
            return ordered.assert_was_called(&calls, &predicate, &description, &repeated);
        }
        FakeAsserter::new(calls, self.manager.config().max_rendered_calls)
            .assert_was_called(&predicate, &description, &repeated)
    }

    /// Asserts that no matching call happened
    ///
    /// # Errors
    /// Returns [`Error::ExpectationFailed`] if a matching call was made.
    pub fn must_not_have_happened(&self) -> Result<()> {
        self.must_have_happened(Repeated::never())
    }
}

fn accepts(method: &MethodRc, constraints: &[ArgumentConstraint]) -> bool {
    method.params.len() == constraints.len()
        && method.params.iter().zip(constraints).all(|(param, constraint)| {
            match (constraint.expected_value(), param.param_type.upgrade()) {
                (Some(value), Some(param_type)) => value.is_assignable_to(&param_type),
                _ => true,
            }
        })
}

fn check_return_value(method: &MethodRc, value: &Value) -> Result<()> {
    if method.returns_void() {
        return Err(configuration_error!(
            "The method {} returns void, no return value can be configured",
            method.fullname()
        ));
    }
    match method.return_type() {
        Some(return_type) if !value.is_assignable_to(&return_type) => Err(configuration_error!(
            "The value {} is not assignable to the return type {} of {}",
            value,
            return_type.fullname(),
            method.fullname()
        )),
        _ => Ok(()),
    }
}

impl fmt::Debug for CallConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallConfiguration")
            .field("fake", &self.manager.id())
            .field("rule", &self.rule.describe())
            .field("applied", &self.times_applied())
            .finish()
    }
}
