//! Target matcher: `AnyOf(AllOf(Match))`, per spec §4.C.
//!
//! Naming follows the OASIS schema, not the prose shorthand: a [`Target`]
//! is a list of [`AnyOf`] combined with AND semantics; an [`AnyOf`] is a
//! list of [`AllOf`] combined with OR; an [`AllOf`] is a list of [`Match`]
//! combined with AND. Indeterminate propagation per XACML §7.11: a `False`
//! anywhere in an AND wins over any `Indeterminate` already seen, and
//! symmetrically for OR/`True`.

use std::sync::Arc;

use crate::{
    context::EvaluationContext,
    expr::{AttributeDesignator, AttributeSelector, Expression},
    function::Function,
    status::XacmlStatus,
    value::AttributeValue,
};

/// Three-valued outcome of Target/Condition matching — distinct from
/// [`crate::combining::DecisionResult`] because matching answers a boolean
/// question, not a Permit/Deny decision.
#[derive(Debug, Clone)]
pub enum Trivalent {
    /// Definitely matched / true.
    True,
    /// Definitely did not match / false.
    False,
    /// Could not be determined, with the status explaining why.
    Indeterminate(XacmlStatus),
}

impl Trivalent {
    /// Whether this is [`Trivalent::True`].
    pub fn is_true(&self) -> bool {
        matches!(self, Trivalent::True)
    }

    /// Whether this is [`Trivalent::False`].
    pub fn is_false(&self) -> bool {
        matches!(self, Trivalent::False)
    }

    /// Whether this is [`Trivalent::Indeterminate`].
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Trivalent::Indeterminate(_))
    }
}

/// Where a [`Match`] draws its candidate values from.
#[derive(Debug, Clone)]
pub enum MatchSource {
    /// An `AttributeDesignator`.
    Designator(AttributeDesignator),
    /// An `AttributeSelector`.
    Selector(AttributeSelector),
}

impl MatchSource {
    fn resolve(&self, ctx: &mut EvaluationContext) -> Result<crate::value::Bag, XacmlStatus> {
        match self {
            MatchSource::Designator(d) => ctx.resolve_designator(&d.fqn, d.datatype, d.must_be_present),
            MatchSource::Selector(s) => ctx.resolve_selector(s),
        }
    }
}

/// `Match(matchId, AttributeValue, AttributeDesignator|Selector)`, per spec
/// §4.C.
///
/// True if the match function, applied to the literal value and any one
/// value produced by the designator/selector, returns true (OR over the
/// resolved bag).
#[derive(Debug, Clone)]
pub struct Match {
    /// The match function (typically a datatype-specific `-equal` or
    /// `-regexp-match` function).
    pub function: Arc<dyn Function>,
    /// The literal value supplied in the policy document.
    pub attribute_value: AttributeValue,
    /// The designator or selector supplying candidate values.
    pub source: MatchSource,
}

impl Match {
    /// Evaluate this match against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Trivalent {
        let bag = match self.source.resolve(ctx) {
            Ok(bag) => bag,
            Err(status) => return Trivalent::Indeterminate(status),
        };
        let mut saw_indeterminate = None;
        for candidate in bag.iter() {
            let args = [
                Expression::Constant(self.attribute_value.clone()),
                Expression::Constant(candidate.clone()),
            ];
            match self.function.call(ctx, &args) {
                Ok(v) if v.as_boolean() == Some(true) => return Trivalent::True,
                Ok(_) => {}
                Err(status) => {
                    saw_indeterminate.get_or_insert(status);
                }
            }
        }
        match saw_indeterminate {
            Some(status) => Trivalent::Indeterminate(status),
            None => Trivalent::False,
        }
    }
}

/// `AllOf`: AND across [`Match`]es.
#[derive(Debug, Clone)]
pub struct AllOf {
    /// The matches, combined with AND semantics.
    pub matches: Vec<Match>,
}

impl AllOf {
    /// Evaluate this `AllOf` against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Trivalent {
        let mut saw_indeterminate = None;
        for m in &self.matches {
            match m.evaluate(ctx) {
                Trivalent::False => return Trivalent::False,
                Trivalent::Indeterminate(status) => {
                    saw_indeterminate.get_or_insert(status);
                }
                Trivalent::True => {}
            }
        }
        match saw_indeterminate {
            Some(status) => Trivalent::Indeterminate(status),
            None => Trivalent::True,
        }
    }
}

/// `AnyOf`: OR across [`AllOf`]s.
#[derive(Debug, Clone)]
pub struct AnyOf {
    /// The all-ofs, combined with OR semantics.
    pub all_ofs: Vec<AllOf>,
}

impl AnyOf {
    /// Evaluate this `AnyOf` against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Trivalent {
        let mut saw_indeterminate = None;
        for a in &self.all_ofs {
            match a.evaluate(ctx) {
                Trivalent::True => return Trivalent::True,
                Trivalent::Indeterminate(status) => {
                    saw_indeterminate.get_or_insert(status);
                }
                Trivalent::False => {}
            }
        }
        match saw_indeterminate {
            Some(status) => Trivalent::Indeterminate(status),
            None => Trivalent::False,
        }
    }
}

/// `Target`: AND across [`AnyOf`]s. An empty/absent Target matches
/// everything (spec §8 "Absent Target ≡ True").
#[derive(Debug, Clone, Default)]
pub struct Target {
    /// The any-ofs, combined with AND semantics.
    pub any_ofs: Vec<AnyOf>,
}

impl Target {
    /// An empty Target, matching unconditionally.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Evaluate this Target against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Trivalent {
        if self.any_ofs.is_empty() {
            return Trivalent::True;
        }
        let mut saw_indeterminate = None;
        for a in &self.any_ofs {
            match a.evaluate(ctx) {
                Trivalent::False => return Trivalent::False,
                Trivalent::Indeterminate(status) => {
                    saw_indeterminate.get_or_insert(status);
                }
                Trivalent::True => {}
            }
        }
        match saw_indeterminate {
            Some(status) => Trivalent::Indeterminate(status),
            None => Trivalent::True,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        function::library::equality::StringEqualFunction,
        value::{category, AttributeFqn, Datatype},
    };

    fn subject_id_match(literal: &str) -> Match {
        Match {
            function: Arc::new(StringEqualFunction),
            attribute_value: AttributeValue::String(literal.to_owned()),
            source: MatchSource::Designator(AttributeDesignator {
                fqn: AttributeFqn::new(category::SUBJECT, "subject-id", None),
                datatype: Datatype::String,
                must_be_present: false,
            }),
        }
    }

    #[test]
    fn empty_target_matches() {
        let target = Target::empty();
        let mut ctx = EvaluationContext::for_testing();
        assert!(target.evaluate(&mut ctx).is_true());
    }

    #[test]
    fn match_against_absent_optional_designator_is_false_not_indeterminate() {
        let m = subject_id_match("Julius Hibbert");
        let mut ctx = EvaluationContext::for_testing();
        assert!(m.evaluate(&mut ctx).is_false());
    }

    #[test]
    fn match_true_when_designator_value_equals_literal() {
        let fqn = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let mut ctx = EvaluationContext::for_testing()
            .with_named_attribute(fqn, crate::value::Bag::singleton(AttributeValue::String("Julius Hibbert".into())));
        let m = subject_id_match("Julius Hibbert");
        assert!(m.evaluate(&mut ctx).is_true());
    }

    #[test]
    fn all_of_short_circuits_false_even_with_prior_indeterminate() {
        let fqn = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let indeterminate_match = Match {
            function: Arc::new(StringEqualFunction),
            attribute_value: AttributeValue::String("x".into()),
            source: MatchSource::Designator(AttributeDesignator {
                fqn: fqn.clone(),
                datatype: Datatype::Integer, // datatype mismatch -> Indeterminate
                must_be_present: false,
            }),
        };
        let false_match = subject_id_match("nobody");
        let mut ctx = EvaluationContext::for_testing()
            .with_named_attribute(fqn, crate::value::Bag::singleton(AttributeValue::String("alice".into())));
        let all_of = AllOf {
            matches: vec![indeterminate_match, false_match],
        };
        assert!(all_of.evaluate(&mut ctx).is_false());
    }
}
