//! Error taxonomy (§6, §7).
//!
//! Structural errors (`WellFormedness`, `Stratification`, `Configuration`)
//! abort the run before or during preparation. Expression-level errors never
//! surface here — they propagate as absent values through the evaluator
//! (§4.D, §7) and are not part of this enum.

use thiserror::Error;

/// Top-level error returned by fallible engine entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A rule violates the variable-scope discipline of §4.H.
    #[error("well-formedness error in rule {rule_index}: {detail}")]
    WellFormedness { rule_index: usize, detail: WellFormednessDetail },

    /// The predicate-level dependency graph has a cycle through negation.
    #[error("stratification error: cycle through negation: {cycle}")]
    Stratification { cycle: String },

    /// A caller requested an invalid combination of evaluation options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stratum-assignment relaxation failed to converge within `|R| + 1`
    /// iterations — an internal-consistency failure, not a user error (§4.F).
    #[error("internal error: stratum assignment did not converge after {iterations} iterations")]
    StratumAssignmentDidNotConverge { iterations: usize },
}

/// The specific well-formedness violation (§4.H), carrying enough detail for
/// a concise diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellFormednessDetail {
    /// A head template variable is never bound by the body.
    UnboundHeadVariable(String),
    /// A Bind target was already bound earlier in the body.
    BindTargetAlreadyBound(String),
    /// A Bind/Filter expression refers to a variable not bound strictly
    /// earlier in the body sequence.
    UnboundExpressionVariable(String),
    /// An aggregation element was encountered; aggregation is unsupported
    /// (§9 Open Question).
    UnsupportedAggregation,
}

impl std::fmt::Display for WellFormednessDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WellFormednessDetail::UnboundHeadVariable(v) => {
                write!(f, "head variable ?{v} is not bound by the body")
            }
            WellFormednessDetail::BindTargetAlreadyBound(v) => {
                write!(f, "BIND target ?{v} is already bound earlier in the body")
            }
            WellFormednessDetail::UnboundExpressionVariable(v) => {
                write!(f, "?{v} is referenced before it is bound")
            }
            WellFormednessDetail::UnsupportedAggregation => {
                write!(f, "aggregation is not supported")
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
