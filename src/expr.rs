//! # Expression Evaluator (§4.D)
//!
//! Evaluates [`Expression`] trees against a [`SolutionMapping`], returning a
//! `Term` or an [`EvalError`] — expression-level errors never abort the run
//! (§7): callers treat an `Err` the same as SPARQL treats a type error,
//! namely "this solution does not satisfy the filter" (EBV = false), or
//! "this BIND produces no value" (the bound variable stays unbound).
//!
//! Built-ins are matched once by [`crate::ast::Builtin::parse`] at AST
//! construction time; this module only ever dispatches on the already-typed
//! [`Builtin`] variant (§9 Design Note, REDESIGN FLAGS).

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use md5::{Digest, Md5};
use rand::Rng;
use regex::{Regex, RegexBuilder};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::ast::{BinaryOp, Builtin, Expression, UnaryOp};
use crate::mapping::SolutionMapping;
use crate::term::{value_cmp, value_eq, Literal, NumericKind, Term, XSD_STRING};

/// An expression-level evaluation failure. Never fatal to the overall run
/// (§7) — the caller decides how an absent value propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError(pub String);

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EvalError {}

type EvalResult = Result<Term, EvalError>;

fn err(msg: impl Into<String>) -> EvalError {
    EvalError(msg.into())
}

/// Evaluate an expression to a term.
pub fn eval(expr: &Expression, mu: &SolutionMapping) -> EvalResult {
    match expr {
        Expression::Term(Term::Variable(name)) => {
            mu.get(name).cloned().ok_or_else(|| err(format!("?{name} is unbound")))
        }
        Expression::Term(t) => Ok(t.clone()),
        Expression::BinaryOp(op, lhs, rhs) => eval_binary(*op, lhs, rhs, mu),
        Expression::UnaryOp(op, inner) => eval_unary(*op, inner, mu),
        Expression::Builtin(b, args) => eval_builtin(*b, args, mu),
        Expression::FunctionCall(name, _) => {
            Err(err(format!("no user-defined function registry: unknown function {name}")))
        }
    }
}

/// SPARQL Effective Boolean Value (§4.D).
pub fn ebv(term: &Term) -> Result<bool, EvalError> {
    match term {
        Term::Literal(lit) => {
            if let Some(b) = lit.as_bool() {
                return Ok(b);
            }
            if lit.numeric_kind().is_some() {
                return Ok(lit.as_f64().map(|v| v != 0.0 && !v.is_nan()).unwrap_or(false));
            }
            if lit.datatype() == XSD_STRING {
                return Ok(!lit.lexical.is_empty());
            }
            Err(err("EBV undefined for this literal"))
        }
        _ => Err(err("EBV undefined for non-literal terms")),
    }
}

/// Evaluate an expression's effective boolean value directly (used by Filter
/// elements, §4.E): any evaluation error or EBV-undefined result is `false`,
/// matching §7's "absent value propagates as filtered out" rule.
pub fn eval_ebv(expr: &Expression, mu: &SolutionMapping) -> bool {
    eval(expr, mu).and_then(|t| ebv(&t)).unwrap_or(false)
}

fn eval_binary(op: BinaryOp, lhs: &Expression, rhs: &Expression, mu: &SolutionMapping) -> EvalResult {
    match op {
        BinaryOp::And => {
            let l = eval_ebv(lhs, mu);
            let r = eval_ebv(rhs, mu);
            Ok(Term::Literal(Literal::boolean(l && r)))
        }
        BinaryOp::Or => {
            let l = eval_ebv(lhs, mu);
            let r = eval_ebv(rhs, mu);
            Ok(Term::Literal(Literal::boolean(l || r)))
        }
        BinaryOp::Eq => Ok(Term::Literal(Literal::boolean(value_eq(&eval(lhs, mu)?, &eval(rhs, mu)?)))),
        BinaryOp::NotEq => Ok(Term::Literal(Literal::boolean(!value_eq(&eval(lhs, mu)?, &eval(rhs, mu)?)))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let l = eval(lhs, mu)?;
            let r = eval(rhs, mu)?;
            let ordering = value_cmp(&l, &r).ok_or_else(|| err("operands are unordered"))?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Term::Literal(Literal::boolean(result)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let l = numeric_literal(&eval(lhs, mu)?)?;
            let r = numeric_literal(&eval(rhs, mu)?)?;
            arithmetic(op, &l, &r)
        }
    }
}

fn eval_unary(op: UnaryOp, inner: &Expression, mu: &SolutionMapping) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Term::Literal(Literal::boolean(!eval_ebv(inner, mu)))),
        UnaryOp::Plus => {
            let lit = numeric_literal(&eval(inner, mu)?)?;
            Ok(Term::Literal(lit))
        }
        UnaryOp::Minus => {
            let lit = numeric_literal(&eval(inner, mu)?)?;
            let value = -lit.as_f64().ok_or_else(|| err("not numeric"))?;
            Ok(Term::Literal(numeric_result(lit.numeric_kind().unwrap(), value)))
        }
    }
}

fn numeric_literal(term: &Term) -> Result<Literal, EvalError> {
    match term {
        Term::Literal(lit) if lit.numeric_kind().is_some() => Ok(lit.clone()),
        _ => Err(err("expected a numeric literal")),
    }
}

fn numeric_result(kind: NumericKind, value: f64) -> Literal {
    match kind {
        NumericKind::Integer => Literal::typed(format!("{}", value as i64), kind.datatype()),
        _ => Literal::typed(format!("{value}"), kind.datatype()),
    }
}

fn arithmetic(op: BinaryOp, l: &Literal, r: &Literal) -> EvalResult {
    let kind = l.numeric_kind().unwrap().promote(r.numeric_kind().unwrap());
    let (lv, rv) = (l.as_f64().ok_or_else(|| err("not numeric"))?, r.as_f64().ok_or_else(|| err("not numeric"))?);
    let result = match op {
        BinaryOp::Add => lv + rv,
        BinaryOp::Sub => lv - rv,
        BinaryOp::Mul => lv * rv,
        BinaryOp::Div => {
            if rv == 0.0 {
                return Err(err("division by zero"));
            }
            lv / rv
        }
        _ => unreachable!(),
    };
    Ok(Term::Literal(numeric_result(kind, result)))
}

fn string_of(term: &Term) -> Result<String, EvalError> {
    match term {
        Term::Literal(lit) => Ok(lit.lexical.clone()),
        Term::Iri(iri) => Ok(iri.clone()),
        _ => Err(err("expected a string-like term")),
    }
}

fn eval_args(args: &[Expression], mu: &SolutionMapping) -> Result<Vec<Term>, EvalError> {
    args.iter().map(|a| eval(a, mu)).collect()
}

#[allow(clippy::too_many_lines)]
fn eval_builtin(b: Builtin, args: &[Expression], mu: &SolutionMapping) -> EvalResult {
    if !b.arity().accepts(args.len()) {
        return Err(err(format!("{b:?} called with wrong number of arguments")));
    }
    match b {
        Builtin::Bound => {
            let is_bound = match &args[0] {
                Expression::Term(Term::Variable(name)) => mu.is_bound(name),
                other => eval(other, mu).is_ok(),
            };
            Ok(Term::Literal(Literal::boolean(is_bound)))
        }
        Builtin::Str => Ok(Term::Literal(Literal::string(string_of(&eval(&args[0], mu)?)?))),
        Builtin::Lang => {
            let t = eval(&args[0], mu)?;
            let lang = t.as_literal().and_then(Literal::language).unwrap_or("");
            Ok(Term::Literal(Literal::string(lang)))
        }
        Builtin::Datatype => {
            let t = eval(&args[0], mu)?;
            let lit = t.as_literal().ok_or_else(|| err("DATATYPE() requires a literal"))?;
            Ok(Term::iri(lit.datatype().to_string()))
        }
        Builtin::Iri => Ok(Term::iri(string_of(&eval(&args[0], mu)?)?)),
        Builtin::Bnode => {
            let label = if args.is_empty() {
                format!("b{}", uuid::Uuid::new_v4().simple())
            } else {
                string_of(&eval(&args[0], mu)?)?
            };
            Ok(Term::blank(label))
        }
        Builtin::Strdt => {
            let lexical = string_of(&eval(&args[0], mu)?)?;
            let dt = string_of(&eval(&args[1], mu)?)?;
            Ok(Term::Literal(Literal::typed(lexical, dt)))
        }
        Builtin::Strlang => {
            let lexical = string_of(&eval(&args[0], mu)?)?;
            let tag = string_of(&eval(&args[1], mu)?)?;
            Ok(Term::Literal(Literal::lang(lexical, tag)))
        }
        Builtin::SameTerm => Ok(Term::Literal(Literal::boolean(eval(&args[0], mu)? == eval(&args[1], mu)?))),
        Builtin::IsIri => Ok(Term::Literal(Literal::boolean(matches!(eval(&args[0], mu)?, Term::Iri(_))))),
        Builtin::IsBlank => Ok(Term::Literal(Literal::boolean(matches!(eval(&args[0], mu)?, Term::Blank(_))))),
        Builtin::IsLiteral => {
            Ok(Term::Literal(Literal::boolean(matches!(eval(&args[0], mu)?, Term::Literal(_)))))
        }
        Builtin::IsNumeric => {
            let t = eval(&args[0], mu)?;
            Ok(Term::Literal(Literal::boolean(
                t.as_literal().and_then(Literal::numeric_kind).is_some(),
            )))
        }
        Builtin::StrLen => Ok(Term::Literal(Literal::integer(
            string_of(&eval(&args[0], mu)?)?.chars().count() as i64,
        ))),
        Builtin::Substr => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let start = numeric_literal(&eval(&args[1], mu)?)?.as_f64().unwrap_or(1.0) as i64;
            let chars: Vec<char> = s.chars().collect();
            let from = (start.max(1) - 1) as usize;
            let len = if args.len() == 3 {
                numeric_literal(&eval(&args[2], mu)?)?.as_f64().unwrap_or(0.0) as usize
            } else {
                chars.len().saturating_sub(from)
            };
            let result: String = chars.into_iter().skip(from).take(len).collect();
            Ok(Term::Literal(Literal::string(result)))
        }
        Builtin::Ucase => Ok(Term::Literal(Literal::string(string_of(&eval(&args[0], mu)?)?.to_uppercase()))),
        Builtin::Lcase => Ok(Term::Literal(Literal::string(string_of(&eval(&args[0], mu)?)?.to_lowercase()))),
        Builtin::Concat => {
            let mut out = String::new();
            for a in args {
                out.push_str(&string_of(&eval(a, mu)?)?);
            }
            Ok(Term::Literal(Literal::string(out)))
        }
        Builtin::Contains => {
            let haystack = string_of(&eval(&args[0], mu)?)?;
            let needle = string_of(&eval(&args[1], mu)?)?;
            Ok(Term::Literal(Literal::boolean(haystack.contains(&needle))))
        }
        Builtin::StrStarts => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let prefix = string_of(&eval(&args[1], mu)?)?;
            Ok(Term::Literal(Literal::boolean(s.starts_with(&prefix))))
        }
        Builtin::StrEnds => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let suffix = string_of(&eval(&args[1], mu)?)?;
            Ok(Term::Literal(Literal::boolean(s.ends_with(&suffix))))
        }
        Builtin::StrBefore => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let needle = string_of(&eval(&args[1], mu)?)?;
            let result = s.find(&needle).map(|i| &s[..i]).unwrap_or("");
            Ok(Term::Literal(Literal::string(result)))
        }
        Builtin::StrAfter => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let needle = string_of(&eval(&args[1], mu)?)?;
            let result = s.find(&needle).map(|i| &s[i + needle.len()..]).unwrap_or("");
            Ok(Term::Literal(Literal::string(result)))
        }
        Builtin::Replace => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let pattern = string_of(&eval(&args[1], mu)?)?;
            let replacement = string_of(&eval(&args[2], mu)?)?;
            let flags = if args.len() == 4 { Some(string_of(&eval(&args[3], mu)?)?) } else { None };
            let re = compile_regex(&pattern, flags.as_deref())?;
            Ok(Term::Literal(Literal::string(re.replace_all(&s, replacement.as_str()).into_owned())))
        }
        Builtin::Regex => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let pattern = string_of(&eval(&args[1], mu)?)?;
            let flags = if args.len() == 3 { Some(string_of(&eval(&args[2], mu)?)?) } else { None };
            let re = compile_regex(&pattern, flags.as_deref())?;
            Ok(Term::Literal(Literal::boolean(re.is_match(&s))))
        }
        Builtin::EncodeForUri => {
            let s = string_of(&eval(&args[0], mu)?)?;
            let encoded: String = s
                .bytes()
                .map(|b| {
                    if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                        (b as char).to_string()
                    } else {
                        format!("%{b:02X}")
                    }
                })
                .collect();
            Ok(Term::Literal(Literal::string(encoded)))
        }
        Builtin::LangMatches => {
            let tag = string_of(&eval(&args[0], mu)?)?.to_ascii_lowercase();
            let range = string_of(&eval(&args[1], mu)?)?.to_ascii_lowercase();
            let matches = range == "*" || tag == range || tag.starts_with(&format!("{range}-"));
            Ok(Term::Literal(Literal::boolean(matches)))
        }
        Builtin::Abs => unary_numeric(&args[0], mu, f64::abs),
        Builtin::Round => unary_numeric(&args[0], mu, f64::round),
        Builtin::Ceil => unary_numeric(&args[0], mu, f64::ceil),
        Builtin::Floor => unary_numeric(&args[0], mu, f64::floor),
        Builtin::Rand => Ok(Term::Literal(Literal::double(rand::thread_rng().gen_range(0.0..1.0)))),
        Builtin::Md5 => Ok(Term::Literal(Literal::string(hex_digest::<Md5>(&string_of(&eval(&args[0], mu)?)?)))),
        Builtin::Sha1 => Ok(Term::Literal(Literal::string(hex_digest::<Sha1>(&string_of(&eval(&args[0], mu)?)?)))),
        Builtin::Sha256 => {
            Ok(Term::Literal(Literal::string(hex_digest::<Sha256>(&string_of(&eval(&args[0], mu)?)?))))
        }
        Builtin::Sha384 => {
            Ok(Term::Literal(Literal::string(hex_digest::<Sha384>(&string_of(&eval(&args[0], mu)?)?))))
        }
        Builtin::Sha512 => {
            Ok(Term::Literal(Literal::string(hex_digest::<Sha512>(&string_of(&eval(&args[0], mu)?)?))))
        }
        Builtin::Uuid => Ok(Term::iri(format!("urn:uuid:{}", uuid::Uuid::new_v4()))),
        Builtin::StrUuid => Ok(Term::Literal(Literal::string(uuid::Uuid::new_v4().to_string()))),
        Builtin::Now => Ok(Term::Literal(Literal::typed(Utc::now().to_rfc3339(), crate::term::XSD_DATETIME))),
        Builtin::Year | Builtin::Month | Builtin::Day | Builtin::Hours | Builtin::Minutes | Builtin::Seconds => {
            datetime_part(b, &args[0], mu)
        }
        Builtin::If => {
            if eval_ebv(&args[0], mu) {
                eval(&args[1], mu)
            } else {
                eval(&args[2], mu)
            }
        }
        Builtin::Coalesce => {
            for a in args {
                if let Ok(t) = eval(a, mu) {
                    return Ok(t);
                }
            }
            Err(err("COALESCE: all arguments unbound or erroring"))
        }
        Builtin::In => {
            let needle = eval(&args[0], mu)?;
            for a in &args[1..] {
                if value_eq(&needle, &eval(a, mu)?) {
                    return Ok(Term::Literal(Literal::boolean(true)));
                }
            }
            Ok(Term::Literal(Literal::boolean(false)))
        }
    }
}

fn unary_numeric(arg: &Expression, mu: &SolutionMapping, f: impl Fn(f64) -> f64) -> EvalResult {
    let lit = numeric_literal(&eval(arg, mu)?)?;
    let value = f(lit.as_f64().ok_or_else(|| err("not numeric"))?);
    Ok(Term::Literal(numeric_result(lit.numeric_kind().unwrap(), value)))
}

/// Compile a `REGEX`/`REPLACE` pattern honoring the SPARQL flag letters `i`
/// (case-insensitive), `m` (multi-line `^`/`$`), and `s` (`.` matches
/// newline) — the only flags §4.D requires.
fn compile_regex(pattern: &str, flags: Option<&str>) -> Result<Regex, EvalError> {
    let mut builder = RegexBuilder::new(pattern);
    if let Some(flags) = flags {
        for c in flags.chars() {
            match c {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                _ => return Err(err(format!("unsupported REGEX flag '{c}'"))),
            }
        }
    }
    builder.build().map_err(|e| err(format!("bad REGEX pattern: {e}")))
}

fn hex_digest<D: Digest>(input: &str) -> String {
    let mut hasher = D::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn datetime_part(b: Builtin, arg: &Expression, mu: &SolutionMapping) -> EvalResult {
    let t = eval(arg, mu)?;
    let lit = t.as_literal().ok_or_else(|| err("expected an xsd:dateTime literal"))?;
    let dt: DateTime<Utc> =
        DateTime::parse_from_rfc3339(&lit.lexical).map_err(|e| err(format!("bad dateTime: {e}")))?.into();
    let value = match b {
        Builtin::Year => i64::from(dt.year()),
        Builtin::Month => i64::from(dt.month()),
        Builtin::Day => i64::from(dt.day()),
        Builtin::Hours => i64::from(dt.hour()),
        Builtin::Minutes => i64::from(dt.minute()),
        Builtin::Seconds => i64::from(dt.second()),
        _ => unreachable!(),
    };
    Ok(Term::Literal(Literal::integer(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression as E;

    fn mu_empty() -> SolutionMapping {
        SolutionMapping::empty()
    }

    #[test]
    fn arithmetic_promotes_to_widest_datatype() {
        let expr = E::BinaryOp(
            BinaryOp::Add,
            Box::new(E::Term(Term::Literal(Literal::integer(2)))),
            Box::new(E::Term(Term::Literal(Literal::double(1.5)))),
        );
        let result = eval(&expr, &mu_empty()).unwrap();
        assert_eq!(result.as_literal().unwrap().datatype(), crate::term::XSD_DOUBLE);
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let expr = E::BinaryOp(
            BinaryOp::Div,
            Box::new(E::Term(Term::Literal(Literal::integer(1)))),
            Box::new(E::Term(Term::Literal(Literal::integer(0)))),
        );
        assert!(eval(&expr, &mu_empty()).is_err());
    }

    #[test]
    fn ebv_of_empty_string_is_false() {
        assert_eq!(ebv(&Term::Literal(Literal::string(""))).unwrap(), false);
    }

    #[test]
    fn ebv_of_nonzero_integer_is_true() {
        assert_eq!(ebv(&Term::Literal(Literal::integer(1))).unwrap(), true);
    }

    #[test]
    fn unbound_variable_is_filtered_out_not_fatal() {
        let expr = E::var("missing");
        assert!(!eval_ebv(&expr, &mu_empty()));
    }

    #[test]
    fn concat_builtin_joins_arguments() {
        let expr = E::Builtin(
            Builtin::Concat,
            vec![E::Term(Term::Literal(Literal::string("foo"))), E::Term(Term::Literal(Literal::string("bar")))],
        );
        let result = eval(&expr, &mu_empty()).unwrap();
        assert_eq!(result.as_literal().unwrap().lexical, "foobar");
    }

    #[test]
    fn regex_builtin_matches() {
        let expr = E::Builtin(
            Builtin::Regex,
            vec![E::Term(Term::Literal(Literal::string("hello"))), E::Term(Term::Literal(Literal::string("^h.*o$")))],
        );
        assert_eq!(eval(&expr, &mu_empty()).unwrap(), Term::Literal(Literal::boolean(true)));
    }

    #[test]
    fn md5_builtin_is_deterministic() {
        let expr = E::Builtin(Builtin::Md5, vec![E::Term(Term::Literal(Literal::string("abc")))]);
        let result = eval(&expr, &mu_empty()).unwrap();
        assert_eq!(result.as_literal().unwrap().lexical, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn function_call_with_no_registry_is_an_error() {
        let expr = E::FunctionCall("http://example.org/custom".into(), vec![]);
        assert!(eval(&expr, &mu_empty()).is_err());
    }

    #[test]
    fn regex_builtin_honors_case_insensitive_flag() {
        let expr = E::Builtin(
            Builtin::Regex,
            vec![
                E::Term(Term::Literal(Literal::string("HELLO"))),
                E::Term(Term::Literal(Literal::string("^hello$"))),
                E::Term(Term::Literal(Literal::string("i"))),
            ],
        );
        assert_eq!(eval(&expr, &mu_empty()).unwrap(), Term::Literal(Literal::boolean(true)));
    }

    #[test]
    fn replace_builtin_with_flags_substitutes_all_matches() {
        let expr = E::Builtin(
            Builtin::Replace,
            vec![
                E::Term(Term::Literal(Literal::string("Foo BAR foo"))),
                E::Term(Term::Literal(Literal::string("foo"))),
                E::Term(Term::Literal(Literal::string("baz"))),
                E::Term(Term::Literal(Literal::string("i"))),
            ],
        );
        let result = eval(&expr, &mu_empty()).unwrap();
        assert_eq!(result.as_literal().unwrap().lexical, "baz BAR baz");
    }

    #[test]
    fn in_builtin_uses_value_equality() {
        let expr = E::Builtin(
            Builtin::In,
            vec![
                E::Term(Term::Literal(Literal::integer(2))),
                E::Term(Term::Literal(Literal::integer(1))),
                E::Term(Term::Literal(Literal::double(2.0))),
            ],
        );
        assert_eq!(eval(&expr, &mu_empty()).unwrap(), Term::Literal(Literal::boolean(true)));
    }
}
