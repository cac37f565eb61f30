use std::{fmt, sync::Arc};

type CountPredicate = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// How often a call is expected to have happened.
///
/// ```rust
/// use dotfake::Repeated;
///
/// assert!(Repeated::at_least(2).matches(3));
/// assert!(!Repeated::once().matches(2));
/// assert_eq!(Repeated::twice().to_string(), "exactly twice");
///
/// let even = Repeated::like("an even number of times", |count| count % 2 == 0);
/// assert!(even.matches(4));
/// ```
#[derive(Clone)]
pub struct Repeated {
    predicate: CountPredicate,
    description: String,
}

impl Repeated {
    /// Exactly `count` times
    #[must_use]
    pub fn exactly(count: usize) -> Self {
        Repeated {
            predicate: Arc::new(move |actual| actual == count),
            description: format!("exactly {}", times(count)),
        }
    }

    /// `count` times or more
    #[must_use]
    pub fn at_least(count: usize) -> Self {
        Repeated {
            predicate: Arc::new(move |actual| actual >= count),
            description: format!("at least {}", times(count)),
        }
    }

    /// `count` times or fewer
    #[must_use]
    pub fn at_most(count: usize) -> Self {
        Repeated {
            predicate: Arc::new(move |actual| actual <= count),
            description: format!("at most {}", times(count)),
        }
    }

    /// Not at all
    #[must_use]
    pub fn never() -> Self {
        Self::exactly(0)
    }

    /// Exactly once
    #[must_use]
    pub fn once() -> Self {
        Self::exactly(1)
    }

    /// Exactly twice
    #[must_use]
    pub fn twice() -> Self {
        Self::exactly(2)
    }

    /// A count accepted by `predicate`, rendered as `description` in failure messages
    pub fn like<F>(description: &str, predicate: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        Repeated {
            predicate: Arc::new(predicate),
            description: description.to_string(),
        }
    }

    /// Returns true if `count` calls satisfy the expectation
    #[must_use]
    pub fn matches(&self, count: usize) -> bool {
        (self.predicate)(count)
    }

    /// The expectation as it appears in failure messages
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

fn times(count: usize) -> String {
    match count {
        1 => "once".to_string(),
        2 => "twice".to_string(),
        count => format!("{count} times"),
    }
}

impl fmt::Display for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl fmt::Debug for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Repeated").field(&self.description).finish()
    }
}
