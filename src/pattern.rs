//! # Pattern Matcher & Property-Path Evaluator (§4.C)
//!
//! Matches a single [`TriplePattern`] against a [`Graph`], producing one
//! solution mapping per matching triple (or per matching path endpoint pair,
//! when the predicate slot is a [`Path`]). Path evaluation covers `Simple`,
//! `Inverse`, `Sequence`, and `Alternative` only — closure operators are out
//! of scope (§9).

use std::collections::HashSet;

use crate::ast::{Path, PredicateSlot, TriplePattern};
use crate::graph::Graph;
use crate::mapping::SolutionMapping;
use crate::term::Term;

/// Evaluate a property path over the graph, returning every `(start, end)`
/// node pair it connects. Grounded directly on the endpoint-pair semantics
/// of SPARQL property paths restricted to the non-closure operators.
pub fn eval_path(graph: &dyn Graph, path: &Path) -> HashSet<(Term, Term)> {
    match path {
        Path::Simple(iri) => {
            let predicate = Term::iri(iri.clone());
            graph
                .match_triples(None, Some(&predicate), None)
                .map(|t| (t.subject.clone(), t.object.clone()))
                .collect()
        }
        Path::Inverse(inner) => {
            eval_path(graph, inner).into_iter().map(|(s, o)| (o, s)).collect()
        }
        Path::Sequence(steps) => eval_sequence(graph, steps),
        Path::Alternative(branches) => {
            branches.iter().flat_map(|b| eval_path(graph, b)).collect()
        }
    }
}

fn eval_sequence(graph: &dyn Graph, steps: &[Path]) -> HashSet<(Term, Term)> {
    let Some((first, rest)) = steps.split_first() else {
        return HashSet::new();
    };
    let mut frontier = eval_path(graph, first);
    for step in rest {
        let next = eval_path(graph, step);
        let mut joined = HashSet::new();
        for (start, mid) in &frontier {
            for (mid2, end) in &next {
                if mid == mid2 {
                    joined.insert((start.clone(), end.clone()));
                }
            }
        }
        frontier = joined;
    }
    frontier
}

/// Bind a pattern slot (subject/object) against a candidate term, extending
/// `mu` if the slot is a fresh variable, checking compatibility if already
/// bound, or requiring term equality if the slot is a constant.
fn bind_slot(mu: &SolutionMapping, slot: &Term, candidate: &Term) -> Option<SolutionMapping> {
    match slot {
        Term::Variable(name) => match mu.get(name) {
            Some(bound) if bound == candidate => Some(mu.clone()),
            Some(_) => None,
            None => Some(mu.extend(name, candidate.clone())),
        },
        constant => {
            if constant == candidate {
                Some(mu.clone())
            } else {
                None
            }
        }
    }
}

/// Match a single triple pattern against the graph, producing one solution
/// mapping per match (§4.C `graphMatch`).
pub fn graph_match(graph: &dyn Graph, pattern: &TriplePattern) -> Vec<SolutionMapping> {
    match &pattern.predicate {
        PredicateSlot::Term(predicate_slot) => {
            let predicate_const = match predicate_slot {
                Term::Variable(_) => None,
                other => Some(other),
            };
            graph
                .match_triples(None, predicate_const, None)
                .filter_map(|triple| {
                    let mu = bind_slot(&SolutionMapping::empty(), &pattern.subject, &triple.subject)?;
                    let mu = bind_slot(&mu, predicate_slot, &triple.predicate)?;
                    bind_slot(&mu, &pattern.object, &triple.object)
                })
                .collect()
        }
        PredicateSlot::Path(path) => eval_path(graph, path)
            .into_iter()
            .filter_map(|(start, end)| {
                let mu = bind_slot(&SolutionMapping::empty(), &pattern.subject, &start)?;
                bind_slot(&mu, &pattern.object, &end)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::PatternBuilder;
    use crate::graph::TripleStore;

    fn store() -> TripleStore {
        TripleStore::from_triples([
            crate::term::Triple::new(
                Term::iri("alice"),
                Term::iri("parent"),
                Term::iri("bob"),
            ),
            crate::term::Triple::new(Term::iri("bob"), Term::iri("parent"), Term::iri("carol")),
        ])
    }

    #[test]
    fn matches_constant_predicate_binding_both_vars() {
        let g = store();
        let pattern = PatternBuilder::new(Term::var("x"), "parent", Term::var("y")).build();
        let results = graph_match(&g, &pattern);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .any(|mu| mu.get("x") == Some(&Term::iri("alice")) && mu.get("y") == Some(&Term::iri("bob"))));
    }

    #[test]
    fn matches_constant_subject_filters_results() {
        let g = store();
        let pattern = PatternBuilder::new(Term::iri("bob"), "parent", Term::var("y")).build();
        let results = graph_match(&g, &pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("y"), Some(&Term::iri("carol")));
    }

    #[test]
    fn inverse_path_swaps_endpoints() {
        let g = store();
        let pattern = PatternBuilder::with_path(
            Term::var("x"),
            Path::Inverse(Box::new(Path::simple("parent"))),
            Term::var("y"),
        )
        .build();
        let results = graph_match(&g, &pattern);
        assert!(results
            .iter()
            .any(|mu| mu.get("x") == Some(&Term::iri("bob")) && mu.get("y") == Some(&Term::iri("alice"))));
    }

    #[test]
    fn sequence_path_composes_two_hops() {
        let g = store();
        let pattern = PatternBuilder::with_path(
            Term::var("x"),
            Path::Sequence(vec![Path::simple("parent"), Path::simple("parent")]),
            Term::var("y"),
        )
        .build();
        let results = graph_match(&g, &pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("x"), Some(&Term::iri("alice")));
        assert_eq!(results[0].get("y"), Some(&Term::iri("carol")));
    }

    #[test]
    fn same_variable_in_both_slots_requires_equal_endpoints() {
        let mut g = TripleStore::new();
        g.add(crate::term::Triple::new(
            Term::iri("alice"),
            Term::iri("knows"),
            Term::iri("alice"),
        ));
        g.add(crate::term::Triple::new(Term::iri("alice"), Term::iri("knows"), Term::iri("bob")));
        let pattern = PatternBuilder::new(Term::var("x"), "knows", Term::var("x")).build();
        let results = graph_match(&g, &pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("x"), Some(&Term::iri("alice")));
    }
}
