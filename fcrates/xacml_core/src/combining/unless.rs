//! `deny-unless-permit` / `permit-unless-deny`, per XACML 3.0 core §C.10/§C.11.
//!
//! Both algorithms never return `NotApplicable` or `Indeterminate`: every
//! other outcome (including a child error) is absorbed into the opposite
//! default.

use crate::context::EvaluationContext;

use super::{gather_obligations_advice, Decidable, Decision, DecisionResult};

/// `deny-unless-permit`: Permit if any child is Permit; Deny otherwise.
pub fn deny_unless_permit(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    let results: Vec<DecisionResult> = children.iter().map(|c| c.evaluate(ctx)).collect();
    if results.iter().any(|r| r.decision == Decision::Permit) {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Permit);
        return DecisionResult {
            decision: Decision::Permit,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Deny);
    DecisionResult {
        decision: Decision::Deny,
        status: None,
        obligations,
        advices,
        applicable_policies,
    }
}

/// `permit-unless-deny`: Deny if any child is Deny; Permit otherwise.
pub fn permit_unless_deny(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    let results: Vec<DecisionResult> = children.iter().map(|c| c.evaluate(ctx)).collect();
    if results.iter().any(|r| r.decision == Decision::Deny) {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Deny);
        return DecisionResult {
            decision: Decision::Deny,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Permit);
    DecisionResult {
        decision: Decision::Permit,
        status: None,
        obligations,
        advices,
        applicable_policies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(DecisionResult);
    impl Decidable for Fixed {
        fn evaluate(&self, _ctx: &mut EvaluationContext) -> DecisionResult {
            self.0.clone()
        }
    }

    fn fixed(d: DecisionResult) -> Fixed {
        Fixed(d)
    }

    #[test]
    fn deny_unless_permit_absorbs_indeterminate() {
        let c0 = fixed(DecisionResult::indeterminate(
            super::super::ExtendedIndeterminate::DP,
            crate::status::processing_error_status("x"),
        ));
        let c1 = fixed(DecisionResult::not_applicable());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(deny_unless_permit(&children, &mut ctx).decision, Decision::Deny);
    }

    #[test]
    fn permit_unless_deny_allows_by_default() {
        let c0 = fixed(DecisionResult::not_applicable());
        let children: Vec<&dyn Decidable> = vec![&c0];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(permit_unless_deny(&children, &mut ctx).decision, Decision::Permit);
    }
}
