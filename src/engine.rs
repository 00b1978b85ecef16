//! # Fixpoint Driver & Public Engine API (§4.G, §6)
//!
//! `Engine` ties the stratifier, body evaluator, and graph adapter together:
//! stratify once, then for each stratum iterate "evaluate every rule body,
//! instantiate its head templates, add the delta" until no new triples
//! appear, capped at [`EngineConfig::max_iterations`] (default 1000) and
//! cooperatively cancellable via [`CancelHandle`] (§5). Grounded on
//! `engine.py::RuleEngine` (stratum loop, delta-batching, warning-not-error
//! iteration cap) and the teacher's config/report pattern for surfacing
//! non-fatal run conditions alongside a result value.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, info_span, warn};

use crate::ast::{RuleSet, TripleTemplate};
use crate::body::{eval_body, validate_body};
use crate::cancel::CancelHandle;
use crate::error::{EngineError, EngineResult};
use crate::graph::{Graph, TripleStore};
use crate::mapping::SolutionMapping;
use crate::strat::{stratify, Stratification};
use crate::term::{Term, Triple};

/// Configuration for a single evaluation run (§6). The engine owns no I/O of
/// its own, so this carries only the knobs the fixpoint driver itself needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum fixpoint iterations per stratum before surfacing a
    /// [`EvaluationReport::hit_iteration_cap`] warning rather than looping
    /// forever (§4.G, §7).
    pub max_iterations: usize,
    pub cancel: CancelHandle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { max_iterations: 1000, cancel: CancelHandle::new() }
    }
}

/// Per-stratum bookkeeping surfaced to the caller after a run (§6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StratumReport {
    pub stratum: usize,
    pub iterations: usize,
    pub hit_iteration_cap: bool,
}

/// The non-fatal outcome of a run: per-stratum iteration counts plus whether
/// the run was cancelled partway through (§6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub strata: Vec<StratumReport>,
    pub cancelled: bool,
}

impl EvaluationReport {
    pub fn hit_iteration_cap(&self) -> bool {
        self.strata.iter().any(|s| s.hit_iteration_cap)
    }
}

/// A single inferred-triple provenance record (§9 Supplemented features):
/// which rule, in which stratum, produced this triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceRecord {
    pub triple: Triple,
    pub rule_index: usize,
    pub stratum: usize,
}

/// The result of [`Engine::evaluate`]: the graph plus its run report.
#[derive(Debug)]
pub struct EvaluationOutcome<G> {
    pub graph: G,
    pub report: EvaluationReport,
}

/// The stratified rule evaluation engine.
pub struct Engine {
    rule_set: RuleSet,
    config: EngineConfig,
    stratification: Stratification,
}

impl Engine {
    /// Build an engine for a rule set, validating well-formedness (§4.H) and
    /// stratifying (§4.F) up front so failures surface before any graph I/O.
    pub fn new(rule_set: RuleSet, config: EngineConfig) -> EngineResult<Self> {
        if config.max_iterations == 0 {
            return Err(EngineError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for (index, rule) in rule_set.rules.iter().enumerate() {
            validate_body(index, rule.head.iter().flat_map(TripleTemplate::variables), &rule.body)?;
        }
        let stratification = stratify(&rule_set)?;
        Ok(Engine { rule_set, config, stratification })
    }

    /// The computed stratification, for introspection/debugging (§9
    /// Supplemented features, grounded on `engine.py::get_stratum_info`).
    pub fn strata(&self) -> &Stratification {
        &self.stratification
    }

    pub fn describe_rule(&self, rule_index: usize) -> String {
        self.stratification.describe(&self.rule_set, rule_index)
    }

    /// Evaluate the rule set to its least stratified fixpoint over `graph`,
    /// mutating it in place (§4.G).
    pub fn evaluate(&self, graph: &mut TripleStore) -> EvaluationReport {
        let (report, _) = self.run(graph, false);
        report
    }

    /// As [`Engine::evaluate`], but also returns a provenance record for
    /// every inferred triple (§9 Supplemented features).
    pub fn evaluate_with_provenance(
        &self,
        graph: &mut TripleStore,
    ) -> (EvaluationReport, Vec<ProvenanceRecord>) {
        self.run(graph, true)
    }

    /// Evaluate against a clone of `graph`, leaving the caller's graph
    /// untouched: `inPlace=false` in §6's terms. The source conflates
    /// `inplace`/`results_only` into a single method with a runtime
    /// `ValueError` for the invalid combination (`engine.py::evaluate`); this
    /// redesign (§9 Design Notes) makes the combination unrepresentable by
    /// splitting into separate entry points instead — [`Engine::evaluate`]
    /// (in place, returns only a report since the caller already owns the
    /// mutated graph), [`Engine::evaluate_copy`] (copy, full graph,
    /// returns an [`EvaluationOutcome`]), and [`Engine::infer_delta`] (copy,
    /// inferred triples only, also an [`EvaluationOutcome`]).
    pub fn evaluate_copy(&self, graph: &TripleStore) -> EvaluationOutcome<TripleStore> {
        let mut copy = graph.clone();
        let report = self.evaluate(&mut copy);
        EvaluationOutcome { graph: copy, report }
    }

    /// Evaluate against a clone of `graph` and return only the triples the
    /// run inferred (`resultsOnly=true`, never in place — §6). Grounded on
    /// `engine.py::evaluate`'s `result_graph - graph` tail.
    pub fn infer_delta(&self, graph: &TripleStore) -> EvaluationOutcome<TripleStore> {
        let evaluated = self.evaluate_copy(graph);
        let mut delta = TripleStore::new();
        for triple in evaluated.graph.iter_all() {
            if !graph.contains(triple) {
                delta.add(triple.clone());
            }
        }
        EvaluationOutcome { graph: delta, report: evaluated.report }
    }

    fn run(&self, graph: &mut TripleStore, track_provenance: bool) -> (EvaluationReport, Vec<ProvenanceRecord>) {
        let mut report = EvaluationReport::default();
        let mut provenance = Vec::new();

        for (stratum_index, rule_indices) in self.stratification.strata.iter().enumerate() {
            if self.config.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let span = info_span!("stratum", index = stratum_index, rule_count = rule_indices.len());
            let _enter = span.enter();

            let mut stratum_report = StratumReport { stratum: stratum_index, ..Default::default() };
            let mut iteration = 0;
            loop {
                if self.config.cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                if iteration >= self.config.max_iterations {
                    stratum_report.hit_iteration_cap = true;
                    warn!(
                        stratum = stratum_index,
                        iterations = iteration,
                        "stratum did not reach fixpoint within the iteration cap"
                    );
                    break;
                }
                iteration += 1;

                let mut delta: Vec<(Triple, usize)> = Vec::new();
                for &rule_index in rule_indices {
                    if self.config.cancel.is_cancelled() {
                        break;
                    }
                    let rule = &self.rule_set.rules[rule_index];
                    let solutions = eval_body(graph, &rule.body);
                    for mu in &solutions {
                        for (template_index, template) in rule.head.iter().enumerate() {
                            if let Some(triple) =
                                instantiate_head(template, mu, rule_index, iteration, template_index)
                            {
                                if !graph.contains(&triple) {
                                    delta.push((triple, rule_index));
                                }
                            }
                        }
                    }
                }

                debug!(stratum = stratum_index, iteration, delta_size = delta.len());

                if delta.is_empty() {
                    break;
                }

                delta.sort_by(|a, b| format!("{:?}", a.0).cmp(&format!("{:?}", b.0)));
                delta.dedup_by(|a, b| a.0 == b.0);
                for (triple, rule_index) in delta {
                    if track_provenance && !graph.contains(&triple) {
                        provenance.push(ProvenanceRecord {
                            triple: triple.clone(),
                            rule_index,
                            stratum: stratum_index,
                        });
                    }
                    graph.add(triple);
                }
            }
            stratum_report.iterations = iteration;
            report.strata.push(stratum_report);
            if report.cancelled {
                break;
            }
        }

        (report, provenance)
    }
}

/// Instantiate a rule head template against a solution mapping, returning
/// `None` if any slot's variable is unbound (§4.G: an unbound head variable
/// is a well-formedness error caught earlier by [`validate_body`], so in
/// practice this only returns `None` for a template whose *own* fields are
/// somehow inconsistent — defensive, not reachable from a validated engine).
///
/// A `Blank` term appearing directly in a head template is never reused
/// verbatim: it is resynthesized per `(rule_index, iteration, μ, template
/// index)` so that repeated application of the same rule to different
/// solutions produces distinct blank nodes, while re-running the same input
/// graph reproduces graph-isomorphic output (Testable Property 3).
fn instantiate_head(
    template: &TripleTemplate,
    mu: &SolutionMapping,
    rule_index: usize,
    iteration: usize,
    template_index: usize,
) -> Option<Triple> {
    let resolve = |term: &Term| -> Option<Term> {
        match term {
            Term::Variable(name) => mu.get(name).cloned(),
            Term::Blank(label) => {
                Some(Term::Blank(fresh_blank_label(rule_index, iteration, mu, template_index, label)))
            }
            other => Some(other.clone()),
        }
    };
    Some(Triple::new(resolve(&template.subject)?, resolve(&template.predicate)?, resolve(&template.object)?))
}

fn fresh_blank_label(
    rule_index: usize,
    iteration: usize,
    mu: &SolutionMapping,
    template_index: usize,
    original_label: &str,
) -> String {
    let mut hasher = DefaultHasher::new();
    rule_index.hash(&mut hasher);
    iteration.hash(&mut hasher);
    template_index.hash(&mut hasher);
    original_label.hash(&mut hasher);
    let mut sorted: Vec<_> = mu.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (var, term) in sorted {
        var.hash(&mut hasher);
        format!("{term}").hash(&mut hasher);
    }
    format!("g{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{PatternBuilder, RuleBuilder};
    use crate::ast::{BodyElement, Path};
    use crate::graph::TripleStore;
    use crate::term::Term;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    #[test]
    fn transitive_closure_reaches_fixpoint() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("z"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .body_pattern(PatternBuilder::new(Term::var("y"), "ancestor", Term::var("z")))
            .build();
        let direct = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();

        let mut graph = TripleStore::from_triples([
            triple("alice", "parent", "bob"),
            triple("bob", "parent", "carol"),
            triple("carol", "parent", "dave"),
        ]);

        let engine = Engine::new(RuleSet::new(vec![direct, rule]), EngineConfig::default()).unwrap();
        engine.evaluate(&mut graph);

        let ancestor = Term::iri("ancestor");
        let results: Vec<_> = graph.match_triples(Some(&Term::iri("alice")), Some(&ancestor), None).collect();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn negation_yields_orphan_detection() {
        let has_child = RuleBuilder::new()
            .head("hasChild", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let childless = RuleBuilder::new()
            .head("childless", Term::var("x"), Term::var("x"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "type", Term::var("t")))
            .body_negation(vec![BodyElement::Pattern(
                PatternBuilder::new(Term::var("x"), "hasChild", Term::var("y")).build(),
            )])
            .build();

        let mut graph = TripleStore::from_triples([
            triple("alice", "parent", "bob"),
            triple("alice", "type", "Person"),
            triple("bob", "type", "Person"),
        ]);

        let engine = Engine::new(RuleSet::new(vec![has_child, childless]), EngineConfig::default()).unwrap();
        engine.evaluate(&mut graph);

        let childless_pred = Term::iri("childless");
        assert!(graph.contains(&Triple::new(Term::iri("bob"), childless_pred.clone(), Term::iri("bob"))));
        assert!(!graph.contains(&Triple::new(Term::iri("alice"), childless_pred, Term::iri("alice"))));
    }

    #[test]
    fn engine_rejects_unbound_head_variable_at_construction() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("z"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let result = Engine::new(RuleSet::new(vec![rule]), EngineConfig::default());
        assert!(matches!(result, Err(EngineError::WellFormedness { .. })));
    }

    #[test]
    fn cancellation_stops_the_run_early() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("z"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .body_pattern(PatternBuilder::new(Term::var("y"), "ancestor", Term::var("z")))
            .build();
        let direct = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();

        let mut graph = TripleStore::from_triples([triple("alice", "parent", "bob")]);
        let cancel = CancelHandle::new();
        cancel.cancel();
        let config = EngineConfig { cancel, ..EngineConfig::default() };
        let engine = Engine::new(RuleSet::new(vec![direct, rule]), config).unwrap();
        let report = engine.evaluate(&mut graph);
        assert!(report.cancelled);
    }

    #[test]
    fn synthesized_blank_nodes_are_distinct_per_solution() {
        let rule = RuleBuilder::new()
            .head("hasAnon", Term::var("x"), Term::blank("_"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let mut graph = TripleStore::from_triples([
            triple("alice", "parent", "bob"),
            triple("carol", "parent", "dave"),
        ]);
        let engine = Engine::new(RuleSet::new(vec![rule]), EngineConfig::default()).unwrap();
        engine.evaluate(&mut graph);

        let has_anon = Term::iri("hasAnon");
        let objects: Vec<_> = graph
            .match_triples(None, Some(&has_anon), None)
            .map(|t| t.object.clone())
            .collect();
        assert_eq!(objects.len(), 2);
        assert_ne!(objects[0], objects[1]);
    }

    #[test]
    fn zero_max_iterations_is_a_configuration_error() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let config = EngineConfig { max_iterations: 0, ..EngineConfig::default() };
        let result = Engine::new(RuleSet::new(vec![rule]), config);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn evaluate_copy_leaves_the_input_graph_untouched() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let original = TripleStore::from_triples([triple("alice", "parent", "bob")]);
        let engine = Engine::new(RuleSet::new(vec![rule]), EngineConfig::default()).unwrap();
        let outcome = engine.evaluate_copy(&original);

        assert_eq!(original.len(), 1);
        assert!(outcome.graph.contains(&triple("alice", "ancestor", "bob")));
        assert!(!original.contains(&triple("alice", "ancestor", "bob")));
    }

    #[test]
    fn infer_delta_returns_only_inferred_triples() {
        let rule = RuleBuilder::new()
            .head("ancestor", Term::var("x"), Term::var("y"))
            .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
            .build();
        let original = TripleStore::from_triples([triple("alice", "parent", "bob")]);
        let engine = Engine::new(RuleSet::new(vec![rule]), EngineConfig::default()).unwrap();
        let outcome = engine.infer_delta(&original);

        assert_eq!(outcome.graph.len(), 1);
        assert!(outcome.graph.contains(&triple("alice", "ancestor", "bob")));
        assert!(!outcome.graph.contains(&triple("alice", "parent", "bob")));
    }

    #[test]
    fn inverse_path_in_a_rule_body_is_supported() {
        let rule = RuleBuilder::new()
            .head("childOf", Term::var("y"), Term::var("x"))
            .body_pattern(PatternBuilder::with_path(
                Term::var("y"),
                Path::Inverse(Box::new(Path::simple("parent"))),
                Term::var("x"),
            ))
            .build();
        let mut graph = TripleStore::from_triples([triple("alice", "parent", "bob")]);
        let engine = Engine::new(RuleSet::new(vec![rule]), EngineConfig::default()).unwrap();
        engine.evaluate(&mut graph);
        assert!(graph.contains(&triple("bob", "childOf", "alice")));
    }
}
