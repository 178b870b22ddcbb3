//! PolicySet evaluator, per spec §4.G. Structurally identical to [`crate::policy::Policy`]
//! except its children are themselves [`Decidable`]s (Policy, PolicySet, or a
//! resolved policy/policy-set reference) combined by a policy-combining
//! algorithm, and it carries no rules/variable definitions of its own.

use std::sync::Arc;

use crate::{
    combining::{CombiningAlgorithmId, Decidable, Decision, DecisionResult, ExtendedIndeterminate, PolicyIdentifier},
    context::EvaluationContext,
    obligation::{AdviceExpression, ObligationExpression},
    target::{Target, Trivalent},
};

/// A PolicySet child: an inline `Policy`/`PolicySet`, or a
/// `PolicyIdReference`/`PolicySetIdReference` represented as a
/// [`crate::resolver::ReferenceNode`], which resolves itself against the
/// root policy resolver the first time it's evaluated (spec §4.H). Either
/// way the child is just a `Decidable`, so `PolicySet` doesn't need to
/// distinguish the two cases itself.
pub type PolicySetChild = Arc<dyn Decidable>;

/// A single XACML `PolicySet`.
#[derive(Debug, Clone)]
pub struct PolicySet {
    /// The policy set's id.
    pub id: String,
    /// The policy set's version.
    pub version: String,
    /// The policy set's Target; `Target::empty()` matches unconditionally.
    pub target: Target,
    /// Child Policy/PolicySet nodes, in document order, references already
    /// resolved.
    pub children: Vec<PolicySetChild>,
    /// The policy-combining algorithm applied over `children`.
    pub policy_combining_algorithm: CombiningAlgorithmId,
    /// Obligation expressions owned by this policy set.
    pub obligation_expressions: Vec<ObligationExpression>,
    /// Advice expressions owned by this policy set.
    pub advice_expressions: Vec<AdviceExpression>,
}

impl Decidable for PolicySet {
    #[tracing::instrument(skip_all, fields(policy_set_id = %self.id))]
    fn evaluate(&self, ctx: &mut EvaluationContext) -> DecisionResult {
        if let Err(status) = ctx.check_deadline() {
            return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status);
        }

        match self.target.evaluate(ctx) {
            Trivalent::False => {
                tracing::debug!(policy_set_id = %self.id, "target did not match");
                return DecisionResult::not_applicable();
            }
            Trivalent::Indeterminate(status) => {
                return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status)
            }
            Trivalent::True => {}
        }

        let children: Vec<&dyn Decidable> = self.children.iter().map(|c| c.as_ref()).collect();
        let mut result = self.policy_combining_algorithm.combine(&children, ctx);

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
    use crate::{expr::Expression, obligation::Effect, policy::Policy, rule::Rule, value::AttributeValue};
    use std::collections::HashMap;

    fn permit_policy(id: &str) -> Arc<dyn Decidable> {
        Arc::new(Policy {
            id: id.to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            rules: vec![Rule {
                id: format!("{id}-rule"),
                effect: Effect::Permit,
                target: Target::empty(),
                condition: None,
                obligation_expressions: vec![],
                advice_expressions: vec![],
            }],
            rule_combining_algorithm: CombiningAlgorithmId::DenyOverrides,
            obligation_expressions: vec![],
            advice_expressions: vec![],
            variable_definitions: Arc::new(HashMap::new()),
        })
    }

    fn not_applicable_policy(id: &str) -> Arc<dyn Decidable> {
        Arc::new(Policy {
            id: id.to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            rules: vec![Rule {
                id: format!("{id}-rule"),
                effect: Effect::Deny,
                target: Target::empty(),
                condition: Some(crate::condition::Condition {
                    expression: Expression::Constant(AttributeValue::Boolean(false)),
                }),
                obligation_expressions: vec![],
                advice_expressions: vec![],
            }],
            rule_combining_algorithm: CombiningAlgorithmId::DenyOverrides,
            obligation_expressions: vec![],
            advice_expressions: vec![],
            variable_definitions: Arc::new(HashMap::new()),
        })
    }

    #[test]
    fn aggregates_applicable_policy_ids_from_nested_policies() {
        let set = PolicySet {
            id: "set1".to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            children: vec![not_applicable_policy("p1"), permit_policy("p2")],
            policy_combining_algorithm: CombiningAlgorithmId::PermitOverrides,
            obligation_expressions: vec![],
            advice_expressions: vec![],
        };
        let mut ctx = EvaluationContext::for_testing();
        let result = set.evaluate(&mut ctx);
        assert_eq!(result.decision, Decision::Permit);
        assert_eq!(
            result.applicable_policies,
            vec![
                PolicyIdentifier { id: "set1".to_owned(), version: "1.0".to_owned() },
                PolicyIdentifier { id: "p2".to_owned(), version: "1.0".to_owned() },
            ]
        );
    }

    #[test]
    fn empty_target_mismatch_is_not_applicable() {
        let set = PolicySet {
            id: "set1".to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            children: vec![not_applicable_policy("p1")],
            policy_combining_algorithm: CombiningAlgorithmId::PermitOverrides,
            obligation_expressions: vec![],
            advice_expressions: vec![],
        };
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(set.evaluate(&mut ctx).decision, Decision::NotApplicable);
    }
}
