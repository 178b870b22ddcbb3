//! Rule evaluator, per spec §4.E.

use crate::{
    combining::{Decidable, Decision, DecisionResult, ExtendedIndeterminate},
    condition::Condition,
    context::EvaluationContext,
    obligation::{AdviceExpression, Effect, ObligationExpression},
    target::{Target, Trivalent},
};

/// A single XACML `Rule`: a Target-guarded, Condition-guarded Effect,
/// carrying its own obligation/advice expressions (this engine, unlike
/// strict XACML core which only allows obligations on Policy/PolicySet,
/// generalizes §4.E's "Evaluate rule's PEP-action expressions" to mean Rules
/// may also declare them directly).
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule's id, for diagnostics and applicable-policy tracing.
    pub id: String,
    /// Permit or Deny.
    pub effect: Effect,
    /// The rule's Target; `Target::empty()` matches unconditionally.
    pub target: Target,
    /// The rule's Condition, if any; absent is equivalent to `true`.
    pub condition: Option<Condition>,
    /// Obligation expressions, already pre-filtered by policy construction
    /// to `fulfill_on == effect` (a rule can never fulfill the opposite
    /// effect, since it only ever decides its own `effect`).
    pub obligation_expressions: Vec<ObligationExpression>,
    /// Advice expressions, likewise pre-filtered.
    pub advice_expressions: Vec<AdviceExpression>,
}

impl Rule {
    fn extended_indeterminate(&self) -> ExtendedIndeterminate {
        match self.effect {
            Effect::Permit => ExtendedIndeterminate::P,
            Effect::Deny => ExtendedIndeterminate::D,
        }
    }

    fn decision(&self) -> Decision {
        match self.effect {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }
}

impl Decidable for Rule {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> DecisionResult {
        match self.target.evaluate(ctx) {
            Trivalent::False => return DecisionResult::not_applicable(),
            Trivalent::Indeterminate(status) => {
                return DecisionResult::indeterminate(self.extended_indeterminate(), status)
            }
            Trivalent::True => {}
        }

        if let Some(condition) = &self.condition {
            match condition.evaluate(ctx) {
                Trivalent::False => return DecisionResult::not_applicable(),
                Trivalent::Indeterminate(status) => {
                    return DecisionResult::indeterminate(self.extended_indeterminate(), status)
                }
                Trivalent::True => {}
            }
        }

        let mut obligations = Vec::new();
        for expr in &self.obligation_expressions {
            match expr.evaluate_if_applicable(self.effect, ctx) {
                None => {}
                Some(Ok(o)) => obligations.push(o),
                Some(Err(status)) => {
                    return DecisionResult::indeterminate(self.extended_indeterminate(), status)
                }
            }
        }
        let mut advices = Vec::new();
        for expr in &self.advice_expressions {
            match expr.evaluate_if_applicable(self.effect, ctx) {
                None => {}
                Some(Ok(a)) => advices.push(a),
                Some(Err(status)) => {
                    return DecisionResult::indeterminate(self.extended_indeterminate(), status)
                }
            }
        }

        DecisionResult {
            decision: self.decision(),
            status: None,
            obligations,
            advices,
            applicable_policies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::Expression,
        value::AttributeValue,
    };

    fn permit_rule(condition: Option<Condition>) -> Rule {
        Rule {
            id: "rule1".to_owned(),
            effect: Effect::Permit,
            target: Target::empty(),
            condition,
            obligation_expressions: vec![],
            advice_expressions: vec![],
        }
    }

    #[test]
    fn matching_target_absent_condition_permits() {
        let rule = permit_rule(None);
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(rule.evaluate(&mut ctx).decision, Decision::Permit);
    }

    #[test]
    fn false_condition_is_not_applicable() {
        let rule = permit_rule(Some(Condition {
            expression: Expression::Constant(AttributeValue::Boolean(false)),
        }));
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(rule.evaluate(&mut ctx).decision, Decision::NotApplicable);
    }

    #[test]
    fn indeterminate_condition_maps_to_effect_as_decision() {
        let rule = permit_rule(Some(Condition {
            expression: Expression::Constant(AttributeValue::Integer(1)),
        }));
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(
            rule.evaluate(&mut ctx).decision,
            Decision::Indeterminate(ExtendedIndeterminate::P)
        );
    }
}
