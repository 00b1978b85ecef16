//! # Rule AST
//!
//! Typed AST the engine consumes: triple patterns/templates, property paths,
//! expressions, and rules. This is the boundary the (out-of-scope)
//! surface-syntax parser targets — the engine itself never parses text.

pub mod builders;

use std::collections::HashSet;

use crate::term::Term;

/// A property path, used only in the predicate slot of a [`TriplePattern`].
/// Closure operators (`*`, `+`, `?`) are intentionally not supported (§9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    Simple(String),
    Inverse(Box<Path>),
    Sequence(Vec<Path>),
    Alternative(Vec<Path>),
}

impl Path {
    pub fn simple(iri: impl Into<String>) -> Self {
        Path::Simple(iri.into())
    }
}

/// The predicate slot of a pattern: either a constant/variable term or a
/// property path (patterns only — templates never carry a path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateSlot {
    Term(Term),
    Path(Path),
}

impl From<Term> for PredicateSlot {
    fn from(term: Term) -> Self {
        PredicateSlot::Term(term)
    }
}

impl From<Path> for PredicateSlot {
    fn from(path: Path) -> Self {
        PredicateSlot::Path(path)
    }
}

/// A triple pattern in a rule body: any slot may be a variable, and the
/// predicate slot may additionally be a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: PredicateSlot,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: impl Into<PredicateSlot>, object: Term) -> Self {
        TriplePattern { subject, predicate: predicate.into(), object }
    }

    /// Variables free in this pattern (subject/object only — a variable
    /// predicate slot is never a [`Path`], so no path can bind one).
    pub fn variables(&self) -> HashSet<String> {
        let mut vars = HashSet::new();
        if let Some(name) = self.subject.as_variable() {
            vars.insert(name.to_string());
        }
        if let PredicateSlot::Term(term) = &self.predicate {
            if let Some(name) = term.as_variable() {
                vars.insert(name.to_string());
            }
        }
        if let Some(name) = self.object.as_variable() {
            vars.insert(name.to_string());
        }
        vars
    }

    /// The head-predicate-overlap key used by the stratifier (§4.F): the
    /// constant IRI of the predicate slot, or `None` for a variable/path
    /// predicate (treated as the `*` wildcard by the caller).
    pub fn constant_predicate(&self) -> Option<&str> {
        match &self.predicate {
            PredicateSlot::Term(Term::Iri(iri)) => Some(iri),
            _ => None,
        }
    }
}

/// A triple template in a rule head: any slot may be a variable, but the
/// predicate slot is always a plain term — templates never carry a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripleTemplate {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TripleTemplate {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TripleTemplate { subject, predicate, object }
    }

    pub fn variables(&self) -> HashSet<String> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(Term::as_variable)
            .map(str::to_string)
            .collect()
    }

    /// The stratifier's head-predicate key: the constant IRI, or `None` for a
    /// variable predicate slot (the `*` wildcard).
    pub fn constant_predicate(&self) -> Option<&str> {
        match &self.predicate {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// Binary operators over expressions (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

/// Unary operators over expressions (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

/// Built-in function identifiers (§4.D). Resolved by name once at
/// AST-validation time (§9 Design Notes) rather than dispatched by string
/// during evaluation — see [`Builtin::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Str,
    Lang,
    Datatype,
    Bound,
    Iri,
    Bnode,
    Strdt,
    Strlang,
    SameTerm,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    StrLen,
    Substr,
    Ucase,
    Lcase,
    Concat,
    Contains,
    StrStarts,
    StrEnds,
    StrBefore,
    StrAfter,
    Replace,
    Regex,
    EncodeForUri,
    LangMatches,
    Abs,
    Round,
    Ceil,
    Floor,
    Rand,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Uuid,
    StrUuid,
    Now,
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    If,
    Coalesce,
    In,
}

/// The arity a built-in function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(lo) => n >= lo,
        }
    }
}

impl Builtin {
    /// Parse a built-in function name (case-insensitive, as in SPARQL).
    pub fn parse(name: &str) -> Option<Self> {
        use Builtin::*;
        Some(match name.to_ascii_uppercase().as_str() {
            "STR" => Str,
            "LANG" => Lang,
            "DATATYPE" => Datatype,
            "BOUND" => Bound,
            "IRI" | "URI" => Iri,
            "BNODE" => Bnode,
            "STRDT" => Strdt,
            "STRLANG" => Strlang,
            "SAMETERM" => SameTerm,
            "ISIRI" | "ISURI" => IsIri,
            "ISBLANK" => IsBlank,
            "ISLITERAL" => IsLiteral,
            "ISNUMERIC" => IsNumeric,
            "STRLEN" => StrLen,
            "SUBSTR" => Substr,
            "UCASE" => Ucase,
            "LCASE" => Lcase,
            "CONCAT" => Concat,
            "CONTAINS" => Contains,
            "STRSTARTS" => StrStarts,
            "STRENDS" => StrEnds,
            "STRBEFORE" => StrBefore,
            "STRAFTER" => StrAfter,
            "REPLACE" => Replace,
            "REGEX" => Regex,
            "ENCODE_FOR_URI" => EncodeForUri,
            "LANGMATCHES" => LangMatches,
            "ABS" => Abs,
            "ROUND" => Round,
            "CEIL" => Ceil,
            "FLOOR" => Floor,
            "RAND" => Rand,
            "MD5" => Md5,
            "SHA1" => Sha1,
            "SHA256" => Sha256,
            "SHA384" => Sha384,
            "SHA512" => Sha512,
            "UUID" => Uuid,
            "STRUUID" => StrUuid,
            "NOW" => Now,
            "YEAR" => Year,
            "MONTH" => Month,
            "DAY" => Day,
            "HOURS" => Hours,
            "MINUTES" => Minutes,
            "SECONDS" => Seconds,
            "IF" => If,
            "COALESCE" => Coalesce,
            "IN" => In,
            _ => return None,
        })
    }

    pub fn arity(self) -> Arity {
        use Builtin::*;
        match self {
            Lang | Datatype | Bound | Iri | StrLen | Ucase | Lcase | IsIri | IsBlank
            | IsLiteral | IsNumeric | Abs | Round | Ceil | Floor | Md5 | Sha1 | Sha256
            | Sha384 | Sha512 | Year | Month | Day | Hours | Minutes | Seconds | Str => {
                Arity::Exact(1)
            }
            Strdt | SameTerm | Contains | StrStarts | StrEnds | StrBefore | StrAfter
            | LangMatches => Arity::Exact(2),
            Strlang => Arity::Exact(2),
            Regex => Arity::Range(2, 3),
            Substr => Arity::Range(2, 3),
            Replace => Arity::Range(3, 4),
            If => Arity::Exact(3),
            Bnode => Arity::Range(0, 1),
            Rand | Uuid | StrUuid | Now => Arity::Exact(0),
            EncodeForUri => Arity::Exact(1),
            Concat | Coalesce | In => Arity::AtLeast(1),
        }
    }
}

/// An expression over bound variables and constants (§4.D).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Term(Term),
    BinaryOp(BinaryOp, Box<Expression>, Box<Expression>),
    UnaryOp(UnaryOp, Box<Expression>),
    Builtin(Builtin, Vec<Expression>),
    /// A call to a function not in the built-in table. The engine has no
    /// user-defined function registry (Non-goal); evaluating one is always
    /// an expression-level error.
    FunctionCall(String, Vec<Expression>),
}

impl Expression {
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Term(Term::var(name))
    }

    /// Free variables referenced by this expression, used by well-formedness
    /// validation (§4.H) to check Filter/Bind scope discipline.
    pub fn variables(&self) -> HashSet<String> {
        match self {
            Expression::Term(Term::Variable(name)) => {
                let mut set = HashSet::new();
                set.insert(name.clone());
                set
            }
            Expression::Term(_) => HashSet::new(),
            Expression::BinaryOp(_, l, r) => {
                let mut set = l.variables();
                set.extend(r.variables());
                set
            }
            Expression::UnaryOp(_, e) => e.variables(),
            Expression::Builtin(_, args) | Expression::FunctionCall(_, args) => {
                args.iter().flat_map(Expression::variables).collect()
            }
        }
    }
}

/// An element of a rule body (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum BodyElement {
    Pattern(TriplePattern),
    Filter(Expression),
    Negation(Vec<BodyElement>),
    Bind(String, Expression),
    /// Placeholder for the source AST's unimplemented aggregation node (§9
    /// Open Question): evaluating one is always an explicit "unsupported"
    /// error, never silently skipped.
    Aggregation,
}

/// A rule: head templates instantiated from body solutions.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub head: Vec<TripleTemplate>,
    pub body: Vec<BodyElement>,
}

impl Rule {
    pub fn new(head: Vec<TripleTemplate>, body: Vec<BodyElement>) -> Self {
        Rule { head, body }
    }

    /// All head predicates, as constant-IRI-or-`None` (§4.F); `None` stands
    /// for the `*` wildcard a variable predicate slot represents.
    pub fn head_predicates(&self) -> HashSet<Option<String>> {
        self.head
            .iter()
            .map(|t| t.constant_predicate().map(str::to_string))
            .collect()
    }

    /// Predicates mentioned by positive (non-negated) body patterns.
    pub fn positive_body_predicates(&self) -> HashSet<Option<String>> {
        let mut set = HashSet::new();
        for elem in &self.body {
            if let BodyElement::Pattern(p) = elem {
                set.insert(p.constant_predicate().map(str::to_string));
            }
        }
        set
    }

    /// Predicates mentioned inside any [`BodyElement::Negation`], recursively.
    pub fn negated_body_predicates(&self) -> HashSet<Option<String>> {
        let mut set = HashSet::new();
        fn collect(elems: &[BodyElement], set: &mut HashSet<Option<String>>) {
            for elem in elems {
                match elem {
                    BodyElement::Negation(inner) => {
                        for e in inner {
                            if let BodyElement::Pattern(p) = e {
                                set.insert(p.constant_predicate().map(str::to_string));
                            }
                        }
                        collect(inner, set);
                    }
                    _ => {}
                }
            }
        }
        collect(&self.body, &mut set);
        set
    }
}

/// A rule set in evaluation order. Prologue (prefix) bindings are resolved at
/// parse time and are not carried into evaluation (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }
}
