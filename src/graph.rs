//! # Graph Adapter (§4.I)
//!
//! The engine depends only on three operations — `contains`, `add`, `match`
//! — and is otherwise agnostic to storage, indexing, and concurrency control.
//! [`Graph`] is the trait boundary; [`TripleStore`] is a small in-memory
//! reference implementation good enough to drive the engine end to end.

use std::collections::HashMap;

use crate::term::{Term, Triple};

/// An optional constant used to narrow a `match` query; `None` is a wildcard.
pub type Slot<'a> = Option<&'a Term>;

/// The graph-adapter contract (§4.I). All storage/indexing/concurrency
/// concerns belong to the implementor, not the engine.
pub trait Graph {
    fn contains(&self, triple: &Triple) -> bool;

    /// Idempotent add: inserting an already-present triple is a no-op (§3
    /// Invariant 4).
    fn add(&mut self, triple: Triple);

    /// All triples matching the given (possibly wildcard) slots.
    fn match_triples<'a>(
        &'a self,
        subject: Slot<'_>,
        predicate: Slot<'_>,
        object: Slot<'_>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter_all<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        self.match_triples(None, None, None)
    }
}

/// A simple in-memory triple store indexed by subject, predicate, and object
/// independently — three `HashMap<Term, Vec<usize>>` over a shared triple
/// arena. Naive by design (§5 Non-goals: "no optimisation beyond naive
/// semi-naive-style iteration"); adequate for the engine's synchronous,
/// single-threaded evaluation loop.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    triples: Vec<Triple>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_predicate: HashMap<Term, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
}

impl TripleStore {
    pub fn new() -> Self {
        TripleStore::default()
    }

    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut store = TripleStore::new();
        for t in triples {
            store.add(t);
        }
        store
    }

    fn candidate_indices(&self, subject: Slot, predicate: Slot, object: Slot) -> Vec<usize> {
        // Pick the narrowest available index to scan.
        if let Some(s) = subject {
            return self.by_subject.get(s).cloned().unwrap_or_default();
        }
        if let Some(p) = predicate {
            return self.by_predicate.get(p).cloned().unwrap_or_default();
        }
        if let Some(o) = object {
            return self.by_object.get(o).cloned().unwrap_or_default();
        }
        (0..self.triples.len()).collect()
    }
}

impl Graph for TripleStore {
    fn contains(&self, triple: &Triple) -> bool {
        self.by_subject
            .get(&triple.subject)
            .into_iter()
            .flatten()
            .any(|&idx| &self.triples[idx] == triple)
    }

    fn add(&mut self, triple: Triple) {
        if self.contains(&triple) {
            return;
        }
        let idx = self.triples.len();
        self.by_subject.entry(triple.subject.clone()).or_default().push(idx);
        self.by_predicate.entry(triple.predicate.clone()).or_default().push(idx);
        self.by_object.entry(triple.object.clone()).or_default().push(idx);
        self.triples.push(triple);
    }

    fn match_triples<'a>(
        &'a self,
        subject: Slot<'_>,
        predicate: Slot<'_>,
        object: Slot<'_>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        let candidates = self.candidate_indices(subject, predicate, object);
        let subject = subject.cloned();
        let predicate = predicate.cloned();
        let object = object.cloned();
        Box::new(candidates.into_iter().map(move |idx| &self.triples[idx]).filter(
            move |t| {
                subject.as_ref().map_or(true, |s| &t.subject == s)
                    && predicate.as_ref().map_or(true, |p| &t.predicate == p)
                    && object.as_ref().map_or(true, |o| &t.object == o)
            },
        ))
    }

    fn len(&self) -> usize {
        self.triples.len()
    }
}
