//! # Solution-Mapping Algebra (§4.B)
//!
//! A solution mapping μ is a partial function from variable names to RDF
//! terms. All operations here are pure — they produce new mappings rather
//! than mutating in place (§3 Lifecycles).
//!
//! Representation: a small associative vector, matching the §9 Design Note
//! ("a small-map ... when |dom(μ)| ≤ 8, and a hashed map otherwise"). Rule
//! bodies rarely bind more than a handful of variables, so a linear-scan
//! vector beats a hash map in practice and keeps iteration order stable for
//! deterministic output (Testable Property 3).

use std::collections::HashSet;

use crate::term::Term;

/// A partial function from variable names to terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionMapping {
    bindings: Vec<(String, Term)>,
}

impl SolutionMapping {
    /// The empty mapping μ₀, the starting point of body evaluation (§4.E).
    pub fn empty() -> Self {
        SolutionMapping::default()
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.iter().find(|(name, _)| name == var).map(|(_, t)| t)
    }

    pub fn is_bound(&self, var: &str) -> bool {
        self.get(var).is_some()
    }

    pub fn domain(&self) -> HashSet<&str> {
        self.bindings.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Extend this mapping with a new binding. Requires `var` not already
    /// bound (§4.B) — callers enforce this at the well-formedness or
    /// body-evaluation layer; this function does not check it.
    pub fn extend(&self, var: &str, term: Term) -> SolutionMapping {
        let mut bindings = self.bindings.clone();
        bindings.push((var.to_string(), term));
        SolutionMapping { bindings }
    }

    fn insert_unchecked(&mut self, var: String, term: Term) {
        self.bindings.push((var, term));
    }
}

/// Two mappings are compatible iff they agree on every variable in both
/// domains (§3).
pub fn compatible(mu1: &SolutionMapping, mu2: &SolutionMapping) -> bool {
    for (var, term) in mu1.iter() {
        if let Some(other) = mu2.get(var) {
            if other != term {
                return false;
            }
        }
    }
    true
}

/// Merge two compatible mappings; `None` when incompatible (§3, §4.B).
pub fn merge(mu1: &SolutionMapping, mu2: &SolutionMapping) -> Option<SolutionMapping> {
    if !compatible(mu1, mu2) {
        return None;
    }
    let mut result = mu1.clone();
    for (var, term) in mu2.iter() {
        if !result.is_bound(var) {
            result.insert_unchecked(var.to_string(), term.clone());
        }
    }
    Some(result)
}

/// Join: `{ μ₁ ∪ μ₂ | μ₁ ∈ Ω₁, μ₂ ∈ Ω₂, compatible(μ₁, μ₂) }` (§4.B, §8 #6).
pub fn join(omega1: &[SolutionMapping], omega2: &[SolutionMapping]) -> Vec<SolutionMapping> {
    let mut result = Vec::new();
    for mu1 in omega1 {
        for mu2 in omega2 {
            if let Some(merged) = merge(mu1, mu2) {
                result.push(merged);
            }
        }
    }
    result
}

/// Anti-join: `{ μ ∈ Ω₁ : ∀ μ' ∈ Ω₂, ¬compatible(μ, μ') }` (§4.B, §8 #6).
pub fn anti_join(omega1: &[SolutionMapping], omega2: &[SolutionMapping]) -> Vec<SolutionMapping> {
    omega1
        .iter()
        .filter(|mu| omega2.iter().all(|other| !compatible(mu, other)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn mu(pairs: &[(&str, Term)]) -> SolutionMapping {
        let mut m = SolutionMapping::empty();
        for (name, term) in pairs {
            m = m.extend(name, term.clone());
        }
        m
    }

    #[test]
    fn compatible_on_disjoint_domains() {
        let a = mu(&[("x", Term::iri("a"))]);
        let b = mu(&[("y", Term::iri("b"))]);
        assert!(compatible(&a, &b));
        assert!(merge(&a, &b).is_some());
    }

    #[test]
    fn incompatible_on_conflicting_binding() {
        let a = mu(&[("x", Term::iri("a"))]);
        let b = mu(&[("x", Term::iri("b"))]);
        assert!(!compatible(&a, &b));
        assert!(merge(&a, &b).is_none());
    }

    #[test]
    fn join_with_empty_omega_is_empty() {
        let a = vec![mu(&[("x", Term::iri("a"))])];
        assert!(join(&a, &[]).is_empty());
    }

    #[test]
    fn join_with_single_empty_mapping_is_identity() {
        let a = vec![mu(&[("x", Term::iri("a"))])];
        let identity = vec![SolutionMapping::empty()];
        assert_eq!(join(&a, &identity), a);
    }

    #[test]
    fn anti_join_against_empty_is_identity() {
        let a = vec![mu(&[("x", Term::iri("a"))])];
        assert_eq!(anti_join(&a, &[]), a);
    }

    #[test]
    fn anti_join_against_single_empty_mapping_is_empty() {
        let a = vec![mu(&[("x", Term::iri("a"))])];
        let identity = vec![SolutionMapping::empty()];
        assert!(anti_join(&a, &identity).is_empty());
    }

    #[test]
    fn extend_preserves_prior_bindings() {
        let a = mu(&[("x", Term::iri("a"))]).extend("y", Term::iri("b"));
        assert_eq!(a.get("x"), Some(&Term::iri("a")));
        assert_eq!(a.get("y"), Some(&Term::iri("b")));
    }
}
