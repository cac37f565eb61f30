use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    typesystem::{Token, TypeRc},
    value::Value,
    Error, Result,
};

/// State of one top level dummy request.
///
/// Tracks the types currently being resolved up the call stack to reject circular
/// dependencies, and caches successful resolutions so a type needed several times in the
/// same tree is resolved once.
#[derive(Debug)]
pub struct ResolutionSession {
    in_progress: HashSet<Token>,
    resolved: HashMap<Token, Value>,
    depth: usize,
    max_depth: usize,
    failures: Vec<String>,
}

impl ResolutionSession {
    /// Creates a session refusing to nest deeper than `max_depth`
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        ResolutionSession {
            in_progress: HashSet::new(),
            resolved: HashMap::new(),
            depth: 0,
            max_depth,
            failures: Vec::new(),
        }
    }

    /// The cached dummy of `ty`
    #[must_use]
    pub fn cached(&self, ty: &TypeRc) -> Option<Value> {
        self.resolved.get(&ty.token).cloned()
    }

    /// Returns true while `ty` is being resolved further up the stack
    #[must_use]
    pub fn is_in_progress(&self, ty: &TypeRc) -> bool {
        self.in_progress.contains(&ty.token)
    }

    /// Current nesting depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Marks `ty` as being resolved
    ///
    /// # Errors
    /// Returns [`Error::DummyCreation`] if `ty` is already being resolved (a circular
    /// dependency), [`Error::RecursionLimit`] if the maximum depth is reached.
    pub fn enter(&mut self, ty: &TypeRc) -> Result<()> {
        if self.is_in_progress(ty) {
            debug!(type_name = %ty.fullname(), depth = self.depth, "circular dummy dependency");
            return Err(Error::DummyCreation {
                type_name: ty.fullname(),
                reason: "circular dependency detected".to_string(),
            });
        }
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        self.in_progress.insert(ty.token);
        self.depth += 1;
        Ok(())
    }

    /// Ends the resolution of `ty`, caching `value` if it succeeded
    pub fn leave(&mut self, ty: &TypeRc, value: Option<&Value>) {
        self.in_progress.remove(&ty.token);
        self.depth = self.depth.saturating_sub(1);
        if let Some(value) = value {
            self.resolved.insert(ty.token, value.clone());
        }
    }

    /// Remembers why a resolution step failed
    pub fn note_failure(&mut self, reason: String) {
        self.failures.push(reason);
    }

    /// Every failure noted so far, oldest first
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}
