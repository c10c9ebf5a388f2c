//! Condition chains.
//!
//! Conditions are opaque strings. A chain is the list of non-empty guards
//! wrapping an item, outermost first. Two scopes are equivalent when their
//! chains match element for element.

use serde::Serialize;
use std::fmt;

/// Ordered list of non-empty condition strings, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConditionChain(Vec<String>);

impl ConditionChain {
    /// Create an empty (unconditioned) chain.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Push a condition one level deeper. Empty conditions are skipped.
    pub fn push(&mut self, condition: &str) {
        if !condition.trim().is_empty() {
            self.0.push(condition.to_string());
        }
    }

    /// Return a copy extended by one more inner condition.
    #[must_use]
    pub fn with(mut self, condition: &str) -> Self {
        self.push(condition);
        self
    }

    /// The conditions, outermost first.
    #[must_use]
    pub fn conditions(&self) -> &[String] {
        &self.0
    }

    /// True when the chain holds no guard at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ConditionChain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut chain = Self::new();
        for condition in iter {
            chain.push(condition.as_ref());
        }
        chain
    }
}

impl fmt::Display for ConditionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }
        write!(f, "{}", self.0.join(" && "))
    }
}

/// True when both chains hold the same guards in the same order.
#[must_use]
pub fn chains_equivalent(a: &ConditionChain, b: &ConditionChain) -> bool {
    a == b
}

/// True when the chain holds at least one guard.
#[must_use]
pub fn has_condition(chain: &ConditionChain) -> bool {
    !chain.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conditions_are_skipped() {
        let chain: ConditionChain = ["", "'$(A)'=='x'", "  "].into_iter().collect();
        assert_eq!(chain.conditions(), ["'$(A)'=='x'".to_string()]);
        assert!(has_condition(&chain));
        assert!(!has_condition(&ConditionChain::new().with("")));
    }

    #[test]
    fn test_equivalence_is_ordered() {
        let ab: ConditionChain = ["a", "b"].into_iter().collect();
        let ba: ConditionChain = ["b", "a"].into_iter().collect();
        assert!(chains_equivalent(&ab, &ConditionChain::new().with("a").with("b")));
        assert!(!chains_equivalent(&ab, &ba));
        assert!(!chains_equivalent(&ab, &ConditionChain::new().with("a")));
    }
}
