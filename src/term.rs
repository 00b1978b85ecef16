//! # RDF Term & Value Model
//!
//! Core term types for the rule engine: IRIs, typed/language-tagged literals,
//! blank nodes, and variables. Also defines the numeric datatype hierarchy used
//! by the expression evaluator's arithmetic promotion and value-equality rules.

use std::cmp::Ordering;
use std::fmt;

/// The lexical form a [`Literal`] carries, mirroring RDF's three literal shapes:
/// plain (defaults to `xsd:string`), language-tagged (`rdf:langString`), and
/// datatype-tagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralForm {
    Plain,
    Lang(String),
    Typed(String),
}

/// The well-known XSD datatype IRIs the evaluator treats specially. Anything
/// else is an opaque datatype: equality/ordering fall back to term equality.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A literal value: lexical form plus its datatype/language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub lexical: String,
    pub form: LiteralForm,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal { lexical: lexical.into(), form: LiteralForm::Plain }
    }

    pub fn lang(lexical: impl Into<String>, tag: impl Into<String>) -> Self {
        Literal { lexical: lexical.into(), form: LiteralForm::Lang(tag.into()) }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Literal { lexical: lexical.into(), form: LiteralForm::Typed(datatype.into()) }
    }

    pub fn boolean(value: bool) -> Self {
        Literal::typed(if value { "true" } else { "false" }, XSD_BOOLEAN)
    }

    pub fn integer(value: i64) -> Self {
        Literal::typed(value.to_string(), XSD_INTEGER)
    }

    pub fn double(value: f64) -> Self {
        Literal::typed(format!("{value}"), XSD_DOUBLE)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Literal::typed(value.into(), XSD_STRING)
    }

    /// The effective datatype IRI: `xsd:string` for Plain, `rdf:langString`
    /// for Lang, the tagged IRI for Typed.
    pub fn datatype(&self) -> &str {
        match &self.form {
            LiteralForm::Plain => XSD_STRING,
            LiteralForm::Lang(_) => RDF_LANG_STRING,
            LiteralForm::Typed(dt) => dt,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match &self.form {
            LiteralForm::Lang(tag) => Some(tag),
            _ => None,
        }
    }

    /// Classify this literal's datatype in the numeric hierarchy, if any.
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        NumericKind::of_datatype(self.datatype())
    }

    pub fn as_bool(&self) -> Option<bool> {
        if self.datatype() != XSD_BOOLEAN {
            return None;
        }
        match self.lexical.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.numeric_kind()?;
        self.lexical.parse::<f64>().ok()
    }
}

/// Datatype rung in the numeric promotion ladder (§4.D): wider datatypes sort
/// higher. `double > float > decimal > integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericKind {
    Integer,
    Decimal,
    Float,
    Double,
}

impl NumericKind {
    pub fn of_datatype(datatype: &str) -> Option<Self> {
        match datatype {
            XSD_INTEGER => Some(NumericKind::Integer),
            XSD_DECIMAL => Some(NumericKind::Decimal),
            XSD_FLOAT => Some(NumericKind::Float),
            XSD_DOUBLE => Some(NumericKind::Double),
            _ => None,
        }
    }

    pub fn datatype(self) -> &'static str {
        match self {
            NumericKind::Integer => XSD_INTEGER,
            NumericKind::Decimal => XSD_DECIMAL,
            NumericKind::Float => XSD_FLOAT,
            NumericKind::Double => XSD_DOUBLE,
        }
    }

    /// The promoted kind of a binary operation between two numeric operands.
    pub fn promote(self, other: NumericKind) -> NumericKind {
        self.max(other)
    }
}

/// An RDF term, a variable (for patterns/templates/expressions), or a
/// property-path-bearing predicate slot lives in [`crate::ast::Path`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Literal(Literal),
    Blank(String),
    Variable(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        if let Term::Variable(name) = self {
            Some(name)
        } else {
            None
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        if let Term::Literal(lit) = self {
            Some(lit)
        } else {
            None
        }
    }

    /// Ground terms are everything but `Variable` — the only kind that may
    /// appear as a bound value in a [`crate::mapping::SolutionMapping`] or in
    /// the graph itself.
    pub fn is_ground(&self) -> bool {
        !self.is_variable()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Literal(lit) => match &lit.form {
                LiteralForm::Plain => write!(f, "\"{}\"", lit.lexical),
                LiteralForm::Lang(tag) => write!(f, "\"{}\"@{tag}", lit.lexical),
                LiteralForm::Typed(dt) => write!(f, "\"{}\"^^<{dt}>", lit.lexical),
            },
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Variable(name) => write!(f, "?{name}"),
        }
    }
}

/// A ground (s, p, o) fact in the graph. Unlike [`crate::ast::TriplePattern`]
/// none of the three slots may be a variable or property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple { subject, predicate, object }
    }
}

/// Value equality used by `=`/`!=` (§4.A): numeric literals compare by value
/// across the numeric hierarchy, string-ish literals compare by lexical form,
/// everything else falls back to term equality.
pub fn value_eq(a: &Term, b: &Term) -> bool {
    if let (Term::Literal(la), Term::Literal(lb)) = (a, b) {
        if let (Some(na), Some(nb)) = (la.numeric_kind(), lb.numeric_kind()) {
            let _ = (na, nb);
            return match (la.as_f64(), lb.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            };
        }
        let a_stringlike = la.datatype() == XSD_STRING;
        let b_stringlike = lb.datatype() == XSD_STRING;
        if a_stringlike && b_stringlike {
            return la.lexical == lb.lexical;
        }
    }
    a == b
}

/// Ordering used by `<`, `<=`, `>`, `>=` (§4.A). `None` means the operands are
/// unordered (the caller surfaces this as an evaluation error, i.e. EBV=false
/// in filter context).
pub fn value_cmp(a: &Term, b: &Term) -> Option<Ordering> {
    if let (Term::Literal(la), Term::Literal(lb)) = (a, b) {
        if la.numeric_kind().is_some() && lb.numeric_kind().is_some() {
            return la.as_f64()?.partial_cmp(&lb.as_f64()?);
        }
        if la.datatype() == XSD_STRING && lb.datatype() == XSD_STRING {
            return Some(la.lexical.cmp(&lb.lexical));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_eq_numeric_crosses_datatypes() {
        let int_lit = Term::Literal(Literal::integer(2));
        let dbl_lit = Term::Literal(Literal::double(2.0));
        assert!(value_eq(&int_lit, &dbl_lit));
    }

    #[test]
    fn value_eq_strings_compare_lexically() {
        let a = Term::Literal(Literal::string("abc"));
        let b = Term::Literal(Literal::plain("abc"));
        assert!(value_eq(&a, &b));
    }

    #[test]
    fn term_eq_distinguishes_lang_tags() {
        let a = Literal::lang("hi", "en");
        let b = Literal::lang("hi", "fr");
        assert_ne!(a, b);
    }

    #[test]
    fn value_cmp_numeric_orders_by_value() {
        let a = Term::Literal(Literal::integer(3));
        let b = Term::Literal(Literal::double(10.0));
        assert_eq!(value_cmp(&a, &b), Some(Ordering::Less));
    }

    #[test]
    fn value_cmp_unordered_returns_none() {
        let a = Term::Iri("http://example.org/a".into());
        let b = Term::Iri("http://example.org/b".into());
        assert_eq!(value_cmp(&a, &b), None);
    }

    #[test]
    fn numeric_kind_promotion_widens() {
        assert_eq!(NumericKind::Integer.promote(NumericKind::Double), NumericKind::Double);
        assert_eq!(NumericKind::Float.promote(NumericKind::Decimal), NumericKind::Float);
    }
}
