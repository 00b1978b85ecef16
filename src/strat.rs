//! # Stratifier (§4.F)
//!
//! Groups a rule set into evaluation strata so that every negated predicate
//! is fully computed by an earlier stratum than the rule that negates it.
//! Grounded on the positive/negative dependency-graph model (cf. the
//! `DependencyType::{Positive, Negative}` split) and on a two-pass
//! cycle-detection-then-relaxation algorithm over rule indices.

use std::collections::HashSet;

use crate::ast::{Rule, RuleSet};
use crate::error::EngineError;

/// Per-rule dependency info computed from predicate overlap with other
/// rules' heads.
#[derive(Debug, Clone)]
struct RuleDependencies {
    depends_on: HashSet<usize>,
    negatively_depends_on: HashSet<usize>,
}

/// The result of stratifying a rule set: strata in evaluation order, each a
/// list of rule indices, plus each rule's assigned stratum for introspection
/// (`Engine::strata`, §9 Supplemented features).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratification {
    pub strata: Vec<Vec<usize>>,
    pub rule_stratum: Vec<usize>,
}

impl Stratification {
    pub fn stratum_of(&self, rule_index: usize) -> Option<usize> {
        self.rule_stratum.get(rule_index).copied()
    }

    pub fn describe(&self, rule_set: &RuleSet, rule_index: usize) -> String {
        let stratum = self.stratum_of(rule_index).unwrap_or(usize::MAX);
        let head = rule_set
            .rules
            .get(rule_index)
            .map(Rule::head_predicates)
            .unwrap_or_default();
        format!("rule {rule_index} (head predicates {head:?}) assigned to stratum {stratum}")
    }
}

fn predicates_overlap(a: &HashSet<Option<String>>, b: &HashSet<Option<String>>) -> bool {
    if a.contains(&None) || b.contains(&None) {
        return true;
    }
    a.intersection(b).next().is_some()
}

fn compute_dependencies(rules: &[Rule]) -> Vec<RuleDependencies> {
    let head_predicates: Vec<_> = rules.iter().map(Rule::head_predicates).collect();
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let positive = rule.positive_body_predicates();
            let negative = rule.negated_body_predicates();
            let mut depends_on = HashSet::new();
            let mut negatively_depends_on = HashSet::new();
            for (j, other_head) in head_predicates.iter().enumerate() {
                if i == j {
                    continue;
                }
                if predicates_overlap(other_head, &positive) {
                    depends_on.insert(j);
                }
                if predicates_overlap(other_head, &negative) {
                    negatively_depends_on.insert(j);
                }
            }
            RuleDependencies { depends_on, negatively_depends_on }
        })
        .collect()
}

/// Iterative-deepening DFS with a 3-color visited state, tracking negative
/// edges along the current path; raises an error the instant a cycle closes
/// through at least one negative edge (§4.F).
fn detect_negation_cycles(deps: &[RuleDependencies]) -> Result<(), EngineError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum State {
        Unvisited,
        Visiting,
        Visited,
    }

    let n = deps.len();
    let mut state = vec![State::Unvisited; n];

    fn dfs(
        node: usize,
        deps: &[RuleDependencies],
        state: &mut [State],
        path: &mut Vec<usize>,
        neg_edges: &HashSet<(usize, usize)>,
    ) -> Result<(), EngineError> {
        state[node] = State::Visiting;
        path.push(node);

        for &neighbor in &deps[node].depends_on {
            match state[neighbor] {
                State::Visiting => {
                    let cycle_start = path.iter().position(|&x| x == neighbor).unwrap();
                    let cycle = &path[cycle_start..];
                    for w in cycle.windows(2) {
                        if neg_edges.contains(&(w[0], w[1])) {
                            return Err(cycle_error(cycle, neighbor));
                        }
                    }
                    if let (Some(&last), Some(&first)) = (cycle.last(), cycle.first()) {
                        if neg_edges.contains(&(last, first)) {
                            return Err(cycle_error(cycle, neighbor));
                        }
                    }
                }
                State::Unvisited => dfs(neighbor, deps, state, path, neg_edges)?,
                State::Visited => {}
            }
        }

        for &neighbor in &deps[node].negatively_depends_on {
            let mut extended = neg_edges.clone();
            extended.insert((node, neighbor));
            match state[neighbor] {
                State::Visiting => {
                    let cycle_start = path.iter().position(|&x| x == neighbor).unwrap();
                    let cycle = &path[cycle_start..];
                    return Err(cycle_error(cycle, neighbor));
                }
                State::Unvisited => dfs(neighbor, deps, state, path, &extended)?,
                State::Visited => {}
            }
        }

        path.pop();
        state[node] = State::Visited;
        Ok(())
    }

    fn cycle_error(cycle: &[usize], closing: usize) -> EngineError {
        let rendered = cycle.iter().map(usize::to_string).collect::<Vec<_>>().join(" -> ");
        EngineError::Stratification { cycle: format!("{rendered} -> {closing}") }
    }

    for i in 0..n {
        if state[i] == State::Unvisited {
            let mut path = Vec::new();
            dfs(i, deps, &mut state, &mut path, &HashSet::new())?;
        }
    }
    Ok(())
}

/// Relaxation-based stratum assignment, bounded at `n + 1` iterations (§4.F).
fn assign_strata(deps: &[RuleDependencies], n: usize) -> Result<Vec<usize>, EngineError> {
    let mut stratum = vec![0usize; n];
    let max_iterations = n + 1;
    let mut iteration = 0;
    loop {
        if iteration >= max_iterations {
            return Err(EngineError::StratumAssignmentDidNotConverge { iterations: iteration });
        }
        iteration += 1;
        let mut changed = false;
        for i in 0..n {
            let mut max_dep_stratum: Option<usize> = None;
            for &dep in deps[i].depends_on.iter().chain(deps[i].negatively_depends_on.iter()) {
                max_dep_stratum = Some(max_dep_stratum.map_or(stratum[dep], |m| m.max(stratum[dep])));
            }
            let required = max_dep_stratum.map_or(0, |m| m + 1);
            if required > stratum[i] {
                stratum[i] = required;
                changed = true;
            }
        }
        if !changed {
            return Ok(stratum);
        }
    }
}

/// Stratify a rule set (§4.F `stratify_rules`).
pub fn stratify(rule_set: &RuleSet) -> Result<Stratification, EngineError> {
    let n = rule_set.rules.len();
    if n == 0 {
        return Ok(Stratification { strata: Vec::new(), rule_stratum: Vec::new() });
    }
    let deps = compute_dependencies(&rule_set.rules);
    detect_negation_cycles(&deps)?;
    let rule_stratum = assign_strata(&deps, n)?;
    let max_stratum = rule_stratum.iter().copied().max().unwrap_or(0);
    let mut strata = vec![Vec::new(); max_stratum + 1];
    for (i, &s) in rule_stratum.iter().enumerate() {
        strata[s].push(i);
    }
    Ok(Stratification { strata, rule_stratum })
}
