use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    call::{FakeObjectCall, InterceptedCall},
    configuration::ArgumentConstraint,
    dummy::DummyValueResolver,
    rules::{default_value, FakeRule},
    typesystem::MethodRc,
    value::Value,
    Error, Result,
};

pub(crate) type CallFilter = Arc<dyn Fn(&dyn FakeObjectCall) -> bool + Send + Sync>;
pub(crate) type CallAction = Arc<dyn Fn(&dyn FakeObjectCall) -> Result<()> + Send + Sync>;
pub(crate) type ValueFactory = Arc<dyn Fn(&dyn FakeObjectCall) -> Result<Value> + Send + Sync>;
pub(crate) type ErrorFactory = Arc<dyn Fn(&dyn FakeObjectCall) -> Error + Send + Sync>;

/// Which members a configured rule is about
#[derive(Clone)]
pub(crate) enum MethodSelector {
    /// One of these overloads
    Methods(Vec<MethodRc>),
    /// Any member except the `System.Object` ones
    Any,
}

#[derive(Clone)]
pub(crate) enum Behavior {
    Default,
    ReturnValue(Value),
    Lazily(ValueFactory),
    Sequence,
    Throw(ErrorFactory),
    CallBase,
}

pub(crate) struct RuleState {
    pub(crate) selector: MethodSelector,
    pub(crate) constraints: Option<Vec<ArgumentConstraint>>,
    pub(crate) filters: Vec<(CallFilter, String)>,
    pub(crate) actions: Vec<CallAction>,
    pub(crate) behavior: Behavior,
    pub(crate) sequence: VecDeque<Value>,
    pub(crate) out_and_ref: Option<Vec<Value>>,
    pub(crate) times: Option<usize>,
}

/// The rule built by a [`crate::configuration::CallConfiguration`].
///
/// Matching state and behavior are shared with the configuration builder and change while
/// the configuration is written. User callbacks never run while the state is locked.
pub struct ConfiguredRule {
    state: Mutex<RuleState>,
    resolver: Arc<dyn DummyValueResolver>,
}

impl ConfiguredRule {
    pub(crate) fn new(selector: MethodSelector, resolver: Arc<dyn DummyValueResolver>) -> Self {
        ConfiguredRule {
            state: Mutex::new(RuleState {
                selector,
                constraints: None,
                filters: Vec::new(),
                actions: Vec::new(),
                behavior: Behavior::Default,
                sequence: VecDeque::new(),
                out_and_ref: None,
                times: None,
            }),
            resolver,
        }
    }

    /// Runs `update` against the locked state
    pub(crate) fn update<R>(&self, update: impl FnOnce(&mut RuleState) -> R) -> R {
        let mut state = lock!(self.state);
        update(&mut state)
    }

    /// The methods this rule is about, empty for rules matching any member
    pub(crate) fn candidates(&self) -> Vec<MethodRc> {
        match &lock!(self.state).selector {
            MethodSelector::Methods(methods) => methods.clone(),
            MethodSelector::Any => Vec::new(),
        }
    }

    /// Renders the calls this rule matches, e.g. `Acme.IFoo.Bar(x: 1, name: <Ignored>)`
    pub fn describe(&self) -> String {
        let state = lock!(self.state);
        let mut description = match &state.selector {
            MethodSelector::Any => "Any call made to the fake object".to_string(),
            MethodSelector::Methods(methods) => match methods.first() {
                Some(method) => describe_method(method, state.constraints.as_deref()),
                None => "No call".to_string(),
            },
        };
        for (_, filter) in &state.filters {
            description.push_str(" where ");
            description.push_str(filter);
        }
        description
    }
}

fn describe_method(method: &MethodRc, constraints: Option<&[ArgumentConstraint]>) -> String {
    let declaring_type = method.declaring_type.fullname();
    let rendered: Vec<String> = match constraints {
        Some(constraints) => constraints.iter().map(ToString::to_string).collect(),
        None => method.params.iter().map(|_| "<Ignored>".to_string()).collect(),
    };

    if let Some(property) = method.property_getter_of() {
        return format!("{declaring_type}.{property}");
    }
    if let Some(property) = method.property_setter_of() {
        let value = rendered.last().cloned().unwrap_or_default();
        return format!("{declaring_type}.{property} = {value}");
    }

    let arguments: Vec<String> = method
        .params
        .iter()
        .zip(&rendered)
        .map(|(param, constraint)| format!("{}: {constraint}", param.name))
        .collect();
    format!("{declaring_type}.{}({})", method.name, arguments.join(", "))
}

/// Same member, compared by token so that members reached through different lookups match
fn same_method(lhs: &MethodRc, rhs: &MethodRc) -> bool {
    Arc::ptr_eq(lhs, rhs) || lhs.token == rhs.token
}

impl FakeRule for ConfiguredRule {
    fn is_applicable_to(&self, call: &dyn FakeObjectCall) -> bool {
        let (constraints, filters) = {
            let state = lock!(self.state);
            let selected = match &state.selector {
                MethodSelector::Methods(methods) => {
                    methods.iter().any(|method| same_method(method, call.method()))
                }
                MethodSelector::Any => call.method().object_member().is_none(),
            };
            if !selected {
                return false;
            }
            (state.constraints.clone(), state.filters.clone())
        };

        if let Some(constraints) = constraints {
            let arguments = call.arguments();
            if constraints.len() != arguments.len()
                || !constraints
                    .iter()
                    .zip(arguments.iter())
                    .all(|(constraint, value)| constraint.is_satisfied_by(value))
            {
                return false;
            }
        }
        filters.iter().all(|(filter, _)| filter(call))
    }

    fn apply(&self, call: &mut InterceptedCall) -> Result<()> {
        let (actions, behavior, out_and_ref) = {
            let state = lock!(self.state);
            (
                state.actions.clone(),
                state.behavior.clone(),
                state.out_and_ref.clone(),
            )
        };

        for action in &actions {
            action(&*call)?;
        }

        let method = call.method().clone();
        match behavior {
            Behavior::Default => {
                call.set_return_value(default_value(self.resolver.as_ref(), &method.return_type));
            }
            Behavior::ReturnValue(value) => call.set_return_value(value),
            Behavior::Lazily(factory) => {
                let value = factory(&*call)?;
                if let Some(return_type) = method.return_type() {
                    if !value.is_assignable_to(&return_type) {
                        return Err(configuration_error!(
                            "The value {} produced for {} is not assignable to its return type {}",
                            value,
                            method.fullname(),
                            return_type.fullname()
                        ));
                    }
                }
                call.set_return_value(value);
            }
            Behavior::Sequence => {
                let next = lock!(self.state).sequence.pop_front();
                let value = next
                    .unwrap_or_else(|| default_value(self.resolver.as_ref(), &method.return_type));
                call.set_return_value(value);
            }
            Behavior::Throw(factory) => return Err(factory(&*call)),
            Behavior::CallBase => call.call_base_method()?,
        }

        if let Some(values) = out_and_ref {
            let indices: Vec<usize> = method
                .params
                .iter()
                .enumerate()
                .filter(|(_, param)| param.is_out_or_ref())
                .map(|(index, _)| index)
                .collect();
            for (index, value) in indices.into_iter().zip(values) {
                call.set_argument_value(index, value)?;
            }
        }
        Ok(())
    }

    fn number_of_times_to_call(&self) -> Option<usize> {
        lock!(self.state).times
    }

    fn description(&self) -> String {
        self.describe()
    }
}
