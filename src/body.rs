//! # Rule-Body Evaluator (§4.E)
//!
//! Evaluates a rule body as a sequential composition of its elements,
//! threading a set of solution mappings Ω through each [`BodyElement`] in
//! order: patterns join, filters restrict, negation anti-joins against a
//! seeded sub-evaluation of its own body, and binds extend each mapping with
//! a computed value. Short-circuits to `[]` once Ω is empty (§4.E, grounded
//! on the `rules.py` evaluation loop).

use crate::ast::BodyElement;
use crate::error::{EngineError, WellFormednessDetail};
use crate::expr::{eval, eval_ebv};
use crate::graph::Graph;
use crate::mapping::{anti_join, join, SolutionMapping};
use crate::pattern::graph_match;

/// Evaluate a full rule body against the graph, returning the set of
/// solution mappings it produces.
pub fn eval_body(graph: &dyn Graph, body: &[BodyElement]) -> Vec<SolutionMapping> {
    let mut omega = vec![SolutionMapping::empty()];
    for element in body {
        if omega.is_empty() {
            return omega;
        }
        omega = eval_element(graph, element, &omega);
    }
    omega
}

fn eval_element(graph: &dyn Graph, element: &BodyElement, omega: &[SolutionMapping]) -> Vec<SolutionMapping> {
    match element {
        BodyElement::Pattern(pattern) => {
            // The pattern is evaluated once against the whole graph, then
            // joined against the running solutions — equivalent to, but
            // cheaper than, re-matching per incoming mapping.
            let pattern_solutions = graph_match(graph, pattern);
            join(omega, &pattern_solutions)
        }
        BodyElement::Filter(expr) => omega.iter().filter(|mu| eval_ebv(expr, mu)).cloned().collect(),
        BodyElement::Negation(inner) => {
            // Each incoming mapping seeds its own sub-evaluation (§4.E): a
            // negated block may reference variables already bound outside
            // it, so the inner body is evaluated once per outer mapping
            // rather than once against the empty mapping.
            let surviving: Vec<SolutionMapping> = omega
                .iter()
                .filter(|mu| {
                    let seeded = vec![(*mu).clone()];
                    let inner_results = eval_seeded(graph, inner, &seeded);
                    inner_results.is_empty()
                })
                .cloned()
                .collect();
            surviving
        }
        BodyElement::Bind(var, expr) => omega
            .iter()
            .filter_map(|mu| eval(expr, mu).ok().map(|term| mu.extend(var, term)))
            .collect(),
        BodyElement::Aggregation => Vec::new(),
    }
}

/// Evaluate a (typically negated) body starting from a given seed set of
/// mappings rather than the empty mapping, so outer bindings are visible
/// inside.
fn eval_seeded(graph: &dyn Graph, body: &[BodyElement], seed: &[SolutionMapping]) -> Vec<SolutionMapping> {
    let mut omega = seed.to_vec();
    for element in body {
        if omega.is_empty() {
            return omega;
        }
        omega = eval_element(graph, element, &omega);
    }
    // Only the portion of each resulting mapping beyond the seed matters for
    // the `NOT EXISTS`-style test above; anti_join/emptiness check only cares
    // whether *any* solution survived, so the full mapping is fine as is.
    omega
}

/// Negation-as-anti-join form, used where the caller already has two
/// independently computed solution sets instead of a body to seed (kept for
/// symmetry with [`crate::mapping::anti_join`] and the negation testable
/// property).
pub fn negate(omega: &[SolutionMapping], negated: &[SolutionMapping]) -> Vec<SolutionMapping> {
    anti_join(omega, negated)
}

/// Well-formedness check for a single rule body + head (§4.H): every head
/// variable must be bound by the body, BIND targets must be fresh, and
/// Filter/Bind expressions may only reference variables bound strictly
/// earlier in the body sequence. Returns the first violation found.
pub fn validate_body(
    rule_index: usize,
    head_vars: impl Iterator<Item = String>,
    body: &[BodyElement],
) -> Result<(), EngineError> {
    let mut bound = std::collections::HashSet::new();
    for element in body {
        match element {
            BodyElement::Pattern(p) => {
                bound.extend(p.variables());
            }
            BodyElement::Filter(expr) => {
                for v in expr.variables() {
                    if !bound.contains(&v) {
                        return Err(EngineError::WellFormedness {
                            rule_index,
                            detail: WellFormednessDetail::UnboundExpressionVariable(v),
                        });
                    }
                }
            }
            BodyElement::Bind(var, expr) => {
                if bound.contains(var) {
                    return Err(EngineError::WellFormedness {
                        rule_index,
                        detail: WellFormednessDetail::BindTargetAlreadyBound(var.clone()),
                    });
                }
                for v in expr.variables() {
                    if !bound.contains(&v) {
                        return Err(EngineError::WellFormedness {
                            rule_index,
                            detail: WellFormednessDetail::UnboundExpressionVariable(v),
                        });
                    }
                }
                bound.insert(var.clone());
            }
            BodyElement::Negation(_) => {
                // Variables bound only inside a negated block do not escape
                // it (§4.E); negation never widens `bound`.
            }
            BodyElement::Aggregation => {
                return Err(EngineError::WellFormedness {
                    rule_index,
                    detail: WellFormednessDetail::UnsupportedAggregation,
                });
            }
        }
    }
    for v in head_vars {
        if !bound.contains(&v) {
            return Err(EngineError::WellFormedness {
                rule_index,
                detail: WellFormednessDetail::UnboundHeadVariable(v),
            });
        }
    }
    Ok(())
}
