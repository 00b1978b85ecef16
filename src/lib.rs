//! # stratarule
//!
//! A stratified rule evaluation engine for RDF graphs: conjunctive patterns
//! over triples (including a restricted property-path grammar), SPARQL-style
//! expression evaluation, and stratified negation evaluated to its least
//! fixpoint.
//!
//! The crate is a library only — there is no surface-syntax parser or CLI
//! here. Callers build a [`ast::RuleSet`] directly (or via
//! [`ast::builders`]) and drive evaluation through [`engine::Engine`].
//!
//! ## Pipeline
//!
//! ```text
//! RuleSet                          (ast)
//!     |
//! [well-formedness validation]     (body::validate_body)   -> EngineError
//!     |
//! [stratification]                 (strat::stratify)       -> Stratification
//!     |
//! [per-stratum fixpoint loop]       (engine::Engine::evaluate)
//!     |    for each rule:
//!     |      [body evaluation]     (body::eval_body)
//!     |        -> pattern matching (pattern::graph_match)
//!     |        -> expression eval  (expr::eval, expr::eval_ebv)
//!     |      [head instantiation]  (engine::instantiate_head)
//!     |
//! TripleStore with inferred triples added
//! ```
//!
//! ## Example
//!
//! ```rust
//! use stratarule::ast::builders::{PatternBuilder, RuleBuilder};
//! use stratarule::engine::{Engine, EngineConfig};
//! use stratarule::ast::RuleSet;
//! use stratarule::graph::{Graph, TripleStore};
//! use stratarule::term::Term;
//!
//! let mut graph = TripleStore::from_triples([
//!     stratarule::term::Triple::new(Term::iri("alice"), Term::iri("parent"), Term::iri("bob")),
//!     stratarule::term::Triple::new(Term::iri("bob"), Term::iri("parent"), Term::iri("carol")),
//! ]);
//!
//! let ancestor_base = RuleBuilder::new()
//!     .head("ancestor", Term::var("x"), Term::var("y"))
//!     .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
//!     .build();
//! let ancestor_step = RuleBuilder::new()
//!     .head("ancestor", Term::var("x"), Term::var("z"))
//!     .body_pattern(PatternBuilder::new(Term::var("x"), "parent", Term::var("y")))
//!     .body_pattern(PatternBuilder::new(Term::var("y"), "ancestor", Term::var("z")))
//!     .build();
//!
//! let engine = Engine::new(RuleSet::new(vec![ancestor_base, ancestor_step]), EngineConfig::default())
//!     .expect("well-formed, stratifiable rule set");
//! engine.evaluate(&mut graph);
//!
//! assert!(graph.contains(&stratarule::term::Triple::new(
//!     Term::iri("alice"),
//!     Term::iri("ancestor"),
//!     Term::iri("carol"),
//! )));
//! ```

pub mod ast;
pub mod body;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod expr;
pub mod graph;
pub mod mapping;
pub mod pattern;
pub mod strat;
pub mod term;

pub use engine::{Engine, EngineConfig, EvaluationOutcome, EvaluationReport};
pub use error::{EngineError, EngineResult};
