//! Policy evaluator, per spec §4.G.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    combining::{CombiningAlgorithmId, Decidable, Decision, DecisionResult, ExtendedIndeterminate, PolicyIdentifier},
    context::EvaluationContext,
    expr::Expression,
    obligation::{AdviceExpression, ObligationExpression},
    rule::Rule,
    target::{Target, Trivalent},
};

/// A single XACML `Policy`: a Target-guarded, rule-combined decision that
/// owns its own obligation/advice expressions and variable definitions.
#[derive(Debug, Clone)]
pub struct Policy {
    /// The policy's id.
    pub id: String,
    /// The policy's version.
    pub version: String,
    /// The policy's Target; `Target::empty()` matches unconditionally.
    pub target: Target,
    /// The policy's rules, in document order.
    pub rules: Vec<Rule>,
    /// The rule-combining algorithm applied over `rules`.
    pub rule_combining_algorithm: CombiningAlgorithmId,
    /// Obligation expressions owned by this policy (evaluated in addition to
    /// any its rules already contributed).
    pub obligation_expressions: Vec<ObligationExpression>,
    /// Advice expressions owned by this policy.
    pub advice_expressions: Vec<AdviceExpression>,
    /// Named expressions available to `VariableReference`s within this
    /// policy's scope, keyed by `VariableDefinition` id.
    pub variable_definitions: Arc<HashMap<String, Expression>>,
}

impl Decidable for Policy {
    #[tracing::instrument(skip_all, fields(policy_id = %self.id))]
    fn evaluate(&self, ctx: &mut EvaluationContext) -> DecisionResult {
        if let Err(status) = ctx.check_deadline() {
            return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status);
        }

        match self.target.evaluate(ctx) {
            Trivalent::False => {
                tracing::debug!(policy_id = %self.id, "target did not match");
                return DecisionResult::not_applicable();
            }
            // Open question (§9), pinned: a Policy's own Target going
            // Indeterminate is treated as Indeterminate{DP} unconditionally,
            // matching the OASIS reference implementation rather than the
            // narrower "only when the combining result would otherwise be
            // Permit-or-Deny" reading — see DESIGN.md.
            Trivalent::Indeterminate(status) => {
                return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status)
            }
            Trivalent::True => {}
        }

        ctx.push_variable_scope(Arc::clone(&self.variable_definitions));
        let children: Vec<&dyn Decidable> = self.rules.iter().map(|r| r as &dyn Decidable).collect();
        let mut result = self.rule_combining_algorithm.combine(&children, ctx);
        ctx.pop_variable_scope();

        if !result.is_permit_or_deny() {
            return result;
        }

        let effect = result
            .decision
            .as_effect()
            .expect("is_permit_or_deny guarantees an Effect");

        for expr in &self.obligation_expressions {
            match expr.evaluate_if_applicable(effect, ctx) {
                None => {}
                Some(Ok(o)) => result.obligations.push(o),
                Some(Err(status)) => {
                    let extended = match result.decision {
                        Decision::Permit => ExtendedIndeterminate::P,
                        Decision::Deny => ExtendedIndeterminate::D,
                        _ => unreachable!("guarded by is_permit_or_deny above"),
                    };
                    return DecisionResult::indeterminate(extended, status);
                }
            }
        }
        for expr in &self.advice_expressions {
            match expr.evaluate_if_applicable(effect, ctx) {
                None => {}
                Some(Ok(a)) => result.advices.push(a),
                Some(Err(status)) => {
                    let extended = match result.decision {
                        Decision::Permit => ExtendedIndeterminate::P,
                        Decision::Deny => ExtendedIndeterminate::D,
                        _ => unreachable!("guarded by is_permit_or_deny above"),
                    };
                    return DecisionResult::indeterminate(extended, status);
                }
            }
        }

        result.applicable_policies.insert(
            0,
            PolicyIdentifier {
                id: self.id.clone(),
                version: self.version.clone(),
            },
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{combining::CombiningAlgorithmId, obligation::Effect, value::AttributeValue};

    fn permit_rule() -> Rule {
        Rule {
            id: "r1".to_owned(),
            effect: Effect::Permit,
            target: Target::empty(),
            condition: None,
            obligation_expressions: vec![],
            advice_expressions: vec![],
        }
    }

    fn not_applicable_deny_rule() -> Rule {
        Rule {
            id: "r2".to_owned(),
            effect: Effect::Deny,
            target: Target::empty(),
            condition: Some(crate::condition::Condition {
                expression: Expression::Constant(AttributeValue::Boolean(false)),
            }),
            obligation_expressions: vec![],
            advice_expressions: vec![],
        }
    }

    fn policy(rules: Vec<Rule>, algo: CombiningAlgorithmId) -> Policy {
        Policy {
            id: "policy1".to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            rules,
            rule_combining_algorithm: algo,
            obligation_expressions: vec![],
            advice_expressions: vec![],
            variable_definitions: Arc::new(HashMap::new()),
        }
    }

    #[test]
    fn permit_rule_wins_under_deny_overrides_and_records_policy_id() {
        let p = policy(vec![not_applicable_deny_rule(), permit_rule()], CombiningAlgorithmId::DenyOverrides);
        let mut ctx = EvaluationContext::for_testing();
        let result = p.evaluate(&mut ctx);
        assert_eq!(result.decision, Decision::Permit);
        assert_eq!(result.applicable_policies, vec![PolicyIdentifier {
            id: "policy1".to_owned(),
            version: "1.0".to_owned(),
        }]);
    }

    #[test]
    fn no_applicable_rules_is_not_applicable_and_untagged() {
        let p = policy(vec![not_applicable_deny_rule()], CombiningAlgorithmId::DenyOverrides);
        let mut ctx = EvaluationContext::for_testing();
        let result = p.evaluate(&mut ctx);
        assert_eq!(result.decision, Decision::NotApplicable);
        assert!(result.applicable_policies.is_empty());
    }
}
