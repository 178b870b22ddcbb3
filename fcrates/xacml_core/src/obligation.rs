//! Obligation/advice assembly: [`Effect`], [`AttributeAssignmentExpression`],
//! [`ObligationExpression`]/[`AdviceExpression`], and their evaluated
//! [`Obligation`]/[`Advice`] forms, per spec §4.E/§4.G and §8 "Obligation
//! filtering".

use crate::{
    context::EvaluationContext,
    expr::Expression,
    status::XacmlStatus,
    value::{AttributeValue, Datatype},
};

/// A Rule's effect, and the `FulfillOn`/`AppliesTo` discriminant for
/// obligation/advice expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Permit.
    Permit,
    /// Deny.
    Deny,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Effect::Permit => "Permit",
            Effect::Deny => "Deny",
        })
    }
}

/// A resolved `(attributeId, category?, issuer?, datatype, value)` tuple
/// attached to an [`Obligation`] or [`Advice`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeAssignment {
    /// The attribute id URI.
    pub attribute_id: String,
    /// The optional category URI.
    pub category: Option<String>,
    /// The optional issuer URI.
    pub issuer: Option<String>,
    /// The assigned value's datatype.
    pub datatype: Datatype,
    /// The assigned value.
    pub value: AttributeValue,
}

/// An unevaluated `AttributeAssignmentExpression`. If its expression
/// evaluates to a bag, one [`AttributeAssignment`] is produced per bag
/// element (XACML 3.0 core §5.38).
#[derive(Debug, Clone)]
pub struct AttributeAssignmentExpression {
    /// The attribute id URI.
    pub attribute_id: String,
    /// The optional category URI.
    pub category: Option<String>,
    /// The optional issuer URI.
    pub issuer: Option<String>,
    /// The value-producing expression.
    pub expression: Expression,
}

impl AttributeAssignmentExpression {
    /// Evaluate into zero-or-more concrete assignments.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<Vec<AttributeAssignment>, XacmlStatus> {
        let evaluated = self.expression.evaluate(ctx)?;
        let assignments = match evaluated {
            crate::expr::EvaluatedValue::Single(v) => {
                vec![self.to_assignment(v)]
            }
            crate::expr::EvaluatedValue::Bag(bag) => {
                bag.into_values().into_iter().map(|v| self.to_assignment(v)).collect()
            }
        };
        Ok(assignments)
    }

    fn to_assignment(&self, value: AttributeValue) -> AttributeAssignment {
        AttributeAssignment {
            attribute_id: self.attribute_id.clone(),
            category: self.category.clone(),
            issuer: self.issuer.clone(),
            datatype: value.datatype(),
            value,
        }
    }
}

/// An evaluated obligation: a PEP MUST act on this.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    /// The obligation id URI.
    pub obligation_id: String,
    /// Resolved attribute assignments.
    pub attribute_assignments: Vec<AttributeAssignment>,
}

/// An evaluated advice item: a PEP MAY act on this.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    /// The advice id URI.
    pub advice_id: String,
    /// Resolved attribute assignments.
    pub attribute_assignments: Vec<AttributeAssignment>,
}

/// An unevaluated `ObligationExpression`, emitted only when the enclosing
/// Rule/Policy/PolicySet's decision equals `fulfill_on`.
#[derive(Debug, Clone)]
pub struct ObligationExpression {
    /// The obligation id URI.
    pub obligation_id: String,
    /// The decision this obligation is emitted for.
    pub fulfill_on: Effect,
    /// Attribute assignment expressions.
    pub attribute_assignments: Vec<AttributeAssignmentExpression>,
}

impl ObligationExpression {
    /// Evaluate into an [`Obligation`], if `decision` matches `fulfill_on`.
    pub fn evaluate_if_applicable(
        &self,
        decision: Effect,
        ctx: &mut EvaluationContext,
    ) -> Option<Result<Obligation, XacmlStatus>> {
        if self.fulfill_on != decision {
            return None;
        }
        Some(self.evaluate(ctx))
    }

    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<Obligation, XacmlStatus> {
        let mut attribute_assignments = Vec::new();
        for expr in &self.attribute_assignments {
            attribute_assignments.extend(expr.evaluate(ctx)?);
        }
        Ok(Obligation {
            obligation_id: self.obligation_id.clone(),
            attribute_assignments,
        })
    }
}

/// An unevaluated `AdviceExpression`, emitted only when the enclosing
/// decision equals `applies_to`.
#[derive(Debug, Clone)]
pub struct AdviceExpression {
    /// The advice id URI.
    pub advice_id: String,
    /// The decision this advice applies to.
    pub applies_to: Effect,
    /// Attribute assignment expressions.
    pub attribute_assignments: Vec<AttributeAssignmentExpression>,
}

impl AdviceExpression {
    /// Evaluate into an [`Advice`], if `decision` matches `applies_to`.
    pub fn evaluate_if_applicable(
        &self,
        decision: Effect,
        ctx: &mut EvaluationContext,
    ) -> Option<Result<Advice, XacmlStatus>> {
        if self.applies_to != decision {
            return None;
        }
        Some(self.evaluate(ctx))
    }

    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<Advice, XacmlStatus> {
        let mut attribute_assignments = Vec::new();
        for expr in &self.attribute_assignments {
            attribute_assignments.extend(expr.evaluate(ctx)?);
        }
        Ok(Advice {
            advice_id: self.advice_id.clone(),
            attribute_assignments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obligation_expression_skipped_on_mismatched_effect() {
        let expr = ObligationExpression {
            obligation_id: "log-access".to_owned(),
            fulfill_on: Effect::Deny,
            attribute_assignments: vec![],
        };
        let mut ctx = EvaluationContext::for_testing();
        assert!(expr.evaluate_if_applicable(Effect::Permit, &mut ctx).is_none());
    }

    #[test]
    fn bag_valued_assignment_expands_to_one_per_element() {
        let expr = AttributeAssignmentExpression {
            attribute_id: "tags".to_owned(),
            category: None,
            issuer: None,
            expression: Expression::ConstantBag(crate::value::Bag::new(
                Datatype::String,
                vec![
                    AttributeValue::String("a".into()),
                    AttributeValue::String("b".into()),
                ],
            )),
        };
        let mut ctx = EvaluationContext::for_testing();
        let assignments = expr.evaluate(&mut ctx).unwrap();
        assert_eq!(assignments.len(), 2);
    }
}
