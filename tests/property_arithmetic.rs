//! Property-based arithmetic and EBV tests (proptest), covering Testable
//! Properties 1 (numeric promotion) and 7 (EBV per datatype) from §8 across
//! randomly generated literals rather than a handful of hand-picked cases.

use proptest::prelude::*;

use stratarule::ast::{BinaryOp, Expression};
use stratarule::expr::{ebv, eval};
use stratarule::mapping::SolutionMapping;
use stratarule::term::{Literal, NumericKind, Term};

fn add_expr(a: Term, b: Term) -> Expression {
    Expression::BinaryOp(BinaryOp::Add, Box::new(Expression::Term(a)), Box::new(Expression::Term(b)))
}

proptest! {
    /// `+` is commutative regardless of which numeric datatypes the two
    /// literals carry (integer, decimal, float, double all promote to a
    /// symmetric widest-wins rule, §4.A/§4.D).
    #[test]
    fn addition_is_commutative_across_numeric_datatypes(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mu = SolutionMapping::empty();
        let forward = eval(&add_expr(Term::Literal(Literal::integer(a)), Term::Literal(Literal::integer(b))), &mu).unwrap();
        let backward = eval(&add_expr(Term::Literal(Literal::integer(b)), Term::Literal(Literal::integer(a))), &mu).unwrap();
        prop_assert_eq!(forward, backward);
    }

    /// Mixing an integer with a double promotes to double in either operand
    /// order (§4.D: "Double > float > decimal > integer").
    #[test]
    fn addition_of_mixed_datatypes_promotes_to_the_widest_and_is_commutative(
        a in -10_000i64..10_000,
        b in -10_000.0f64..10_000.0,
    ) {
        let mu = SolutionMapping::empty();
        let forward = eval(&add_expr(Term::Literal(Literal::integer(a)), Term::Literal(Literal::double(b))), &mu).unwrap();
        let backward = eval(&add_expr(Term::Literal(Literal::double(b)), Term::Literal(Literal::integer(a))), &mu).unwrap();
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.as_literal().unwrap().datatype(), stratarule::term::XSD_DOUBLE);
    }

    /// `NumericKind::promote` is a `max` over a total order, so it is
    /// commutative for every pair of datatype rungs (§9 Design Notes).
    #[test]
    fn numeric_kind_promotion_is_commutative(a in 0u8..4, b in 0u8..4) {
        let kinds = [NumericKind::Integer, NumericKind::Decimal, NumericKind::Float, NumericKind::Double];
        let ka = kinds[a as usize];
        let kb = kinds[b as usize];
        prop_assert_eq!(ka.promote(kb), kb.promote(ka));
    }

    /// EBV on `xsd:boolean` literals always echoes the underlying boolean
    /// (§4.D EBV table, row 1).
    #[test]
    fn ebv_of_boolean_literal_is_total_and_matches_the_value(b: bool) {
        let term = Term::Literal(Literal::boolean(b));
        prop_assert_eq!(ebv(&term).unwrap(), b);
    }

    /// EBV on numeric literals is false iff the value is exactly zero
    /// (§4.D EBV table, row 2).
    #[test]
    fn ebv_of_integer_literal_is_false_only_at_zero(n in -10_000i64..10_000) {
        let term = Term::Literal(Literal::integer(n));
        prop_assert_eq!(ebv(&term).unwrap(), n != 0);
    }

    /// EBV on `xsd:string` literals is false iff the lexical form is empty
    /// (§4.D EBV table, row 3).
    #[test]
    fn ebv_of_string_literal_is_false_only_when_empty(chars in proptest::collection::vec(any::<char>(), 0..8)) {
        let s: String = chars.into_iter().collect();
        let is_empty = s.is_empty();
        let term = Term::Literal(Literal::string(s));
        prop_assert_eq!(ebv(&term).unwrap(), !is_empty);
    }
}
