//! Builder patterns for AST construction — fluent APIs used mostly by tests.
//!
//! ## Example
//!
//! ```rust
//! use stratarule::ast::builders::{PatternBuilder, RuleBuilder};
//! use stratarule::term::Term;
//!
//! // Build: {?x :ancestor ?y} WHERE {?x :parent ?y}
//! let rule = RuleBuilder::new()
//!     .head("http://example.org/ancestor", Term::var("x"), Term::var("y"))
//!     .body_pattern(PatternBuilder::new(Term::var("x"), "http://example.org/parent", Term::var("y")))
//!     .build();
//! ```

use super::{BodyElement, Path, PredicateSlot, Rule, TriplePattern, TripleTemplate};
use crate::term::Term;

/// Builder for a single triple pattern.
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    subject: Term,
    predicate: PredicateSlot,
    object: Term,
}

impl PatternBuilder {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        PatternBuilder {
            subject,
            predicate: PredicateSlot::Term(Term::iri(predicate.into())),
            object,
        }
    }

    pub fn with_path(subject: Term, path: Path, object: Term) -> Self {
        PatternBuilder { subject, predicate: PredicateSlot::Path(path), object }
    }

    pub fn build(self) -> TriplePattern {
        TriplePattern { subject: self.subject, predicate: self.predicate, object: self.object }
    }
}

/// Builder for constructing [`Rule`] instances fluently.
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    head: Vec<TripleTemplate>,
    body: Vec<BodyElement>,
}

impl RuleBuilder {
    pub fn new() -> Self {
        RuleBuilder::default()
    }

    pub fn head(mut self, predicate: impl Into<String>, subject: Term, object: Term) -> Self {
        self.head.push(TripleTemplate::new(subject, Term::iri(predicate.into()), object));
        self
    }

    pub fn body_pattern(mut self, pattern: PatternBuilder) -> Self {
        self.body.push(BodyElement::Pattern(pattern.build()));
        self
    }

    pub fn body_filter(mut self, expr: super::Expression) -> Self {
        self.body.push(BodyElement::Filter(expr));
        self
    }

    pub fn body_bind(mut self, var: impl Into<String>, expr: super::Expression) -> Self {
        self.body.push(BodyElement::Bind(var.into(), expr));
        self
    }

    pub fn body_negation(mut self, elements: Vec<BodyElement>) -> Self {
        self.body.push(BodyElement::Negation(elements));
        self
    }

    pub fn build(self) -> Rule {
        Rule::new(self.head, self.body)
    }
}
