//! Rule set lookup by name.
//!
//! The registry is owned by the host; there is no global state. Resolvers are
//! consulted in registration order and the first non-empty rule set wins.

use crate::error::{Error, Result};
use crate::rules::RuleSet;
use std::collections::HashMap;
use std::sync::Arc;

/// A source of named rule sets.
pub trait RuleSetResolver: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn resolve(&self, rule_set: &str) -> Option<Arc<RuleSet>>;
}

/// Resolver backed by a fixed map.
#[derive(Debug, Default)]
pub struct StaticResolver {
    name: String,
    rule_sets: HashMap<String, Arc<RuleSet>>,
}

impl StaticResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule_sets: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, rule_set: impl Into<Arc<RuleSet>>) -> Self {
        self.insert(name, rule_set);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rule_set: impl Into<Arc<RuleSet>>) {
        self.rule_sets.insert(name.into(), rule_set.into());
    }
}

impl RuleSetResolver for StaticResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, rule_set: &str) -> Option<Arc<RuleSet>> {
        self.rule_sets.get(rule_set).cloned()
    }
}

/// Ordered collection of resolvers.
#[derive(Clone, Default)]
pub struct RuleSetRegistry {
    resolvers: Vec<Arc<dyn RuleSetResolver>>,
}

impl RuleSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resolver: impl RuleSetResolver + 'static) -> &mut Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Register a single named rule set.
    pub fn insert(&mut self, name: impl Into<String>, rule_set: impl Into<Arc<RuleSet>>) -> &mut Self {
        let name = name.into();
        self.register(StaticResolver::new(name.clone()).with(name, rule_set))
    }

    /// Find a rule set. Empty rule sets are skipped.
    pub fn resolve(&self, name: &str) -> Option<Arc<RuleSet>> {
        for resolver in &self.resolvers {
            if let Some(rule_set) = resolver.resolve(name).filter(|r| !r.is_empty()) {
                tracing::trace!(rule_set = name, resolver = resolver.name(), "rule set resolved");
                return Some(rule_set);
            }
        }
        None
    }

    pub fn get(&self, name: &str) -> Result<Arc<RuleSet>> {
        self.resolve(name)
            .ok_or_else(|| Error::RuleSetNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl std::fmt::Debug for RuleSetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}
