//! `only-one-applicable`, per XACML 3.0 core §C.9.
//!
//! Per SPEC_FULL.md's §4.F annotation this is restricted to Policy children
//! only — the combining-algorithm registry (`xacml_pdp`) only offers it on
//! the policy-combining surface, matching §10.E.
//!
//! Open question (pinned per §9): when more than zero children are
//! Indeterminate, the result is always `Indeterminate{DP}` regardless of how
//! many Permits/Denies are also present, conforming to the OASIS reference
//! implementation rather than trying to special-case "exactly one
//! Indeterminate plus one Permit."

use crate::{
    context::EvaluationContext,
    status::processing_error_status,
};

use super::{Decidable, Decision, DecisionResult, ExtendedIndeterminate};

/// Exactly one child may be applicable (decision ≠ NotApplicable); zero
/// applicable children ⇒ NotApplicable, more than one ⇒ Indeterminate, any
/// Indeterminate child ⇒ Indeterminate.
pub fn only_one_applicable(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    let results: Vec<DecisionResult> = children.iter().map(|c| c.evaluate(ctx)).collect();

    if let Some(status) = results.iter().find_map(|r| {
        matches!(r.decision, Decision::Indeterminate(_))
            .then(|| r.status.clone())
            .flatten()
    }) {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status);
    }

    let mut applicable = results.into_iter().filter(|r| r.decision != Decision::NotApplicable);
    match (applicable.next(), applicable.next()) {
        (None, _) => DecisionResult::not_applicable(),
        (Some(only), None) => only,
        (Some(_), Some(_)) => DecisionResult::indeterminate(
            ExtendedIndeterminate::DP,
            processing_error_status("only-one-applicable: more than one child policy applied"),
        ),
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
    fn exactly_one_applicable_wins() {
        let c0 = fixed(DecisionResult::not_applicable());
        let c1 = fixed(DecisionResult::permit());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(only_one_applicable(&children, &mut ctx).decision, Decision::Permit);
    }

    #[test]
    fn two_applicable_is_indeterminate() {
        let c0 = fixed(DecisionResult::permit());
        let c1 = fixed(DecisionResult::deny());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(
            only_one_applicable(&children, &mut ctx).decision,
            Decision::Indeterminate(ExtendedIndeterminate::DP)
        );
    }

    #[test]
    fn any_indeterminate_child_is_indeterminate_even_with_one_permit() {
        let c0 = fixed(DecisionResult::permit());
        let c1 = fixed(DecisionResult::indeterminate(
            ExtendedIndeterminate::P,
            processing_error_status("boom"),
        ));
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(
            only_one_applicable(&children, &mut ctx).decision,
            Decision::Indeterminate(ExtendedIndeterminate::DP)
        );
    }
}
