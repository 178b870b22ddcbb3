//! `deny-overrides` / `permit-overrides` and their `ordered-*` aliases, per
//! XACML 3.0 core §C.2/§C.3.

use crate::{context::EvaluationContext, status::processing_error_status};

use super::{classify, gather_obligations_advice, Decidable, Decision, DecisionResult, ExtendedIndeterminate};

fn evaluate_children(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> Vec<DecisionResult> {
    children.iter().map(|c| c.evaluate(ctx)).collect()
}

/// `deny-overrides`: Deny wins over everything; Permit wins if no Deny and
/// no unresolved Deny-leaning Indeterminate.
pub fn deny_overrides(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    let results = evaluate_children(children, ctx);
    let c = classify(&results);

    if c.any_deny {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Deny);
        return DecisionResult {
            decision: Decision::Deny,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    let status = || {
        c.first_indeterminate_status
            .clone()
            .unwrap_or_else(|| processing_error_status("deny-overrides: indeterminate child"))
    };
    if c.any_indeterminate_dp {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status());
    }
    if c.any_indeterminate_d && (c.any_indeterminate_p || c.any_permit) {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status());
    }
    if c.any_indeterminate_d {
        return DecisionResult::indeterminate(ExtendedIndeterminate::D, status());
    }
    if c.any_permit {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Permit);
        return DecisionResult {
            decision: Decision::Permit,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    if c.any_indeterminate_p {
        return DecisionResult::indeterminate(ExtendedIndeterminate::P, status());
    }
    DecisionResult::not_applicable()
}

/// `permit-overrides`: symmetric to [`deny_overrides`].
pub fn permit_overrides(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    let results = evaluate_children(children, ctx);
    let c = classify(&results);

    if c.any_permit {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Permit);
        return DecisionResult {
            decision: Decision::Permit,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    let status = || {
        c.first_indeterminate_status
            .clone()
            .unwrap_or_else(|| processing_error_status("permit-overrides: indeterminate child"))
    };
    if c.any_indeterminate_dp {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status());
    }
    if c.any_indeterminate_p && (c.any_indeterminate_d || c.any_deny) {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DP, status());
    }
    if c.any_indeterminate_p {
        return DecisionResult::indeterminate(ExtendedIndeterminate::P, status());
    }
    if c.any_deny {
        let (obligations, advices, applicable_policies) = gather_obligations_advice(&results, Decision::Deny);
        return DecisionResult {
            decision: Decision::Deny,
            status: None,
            obligations,
            advices,
            applicable_policies,
        };
    }
    if c.any_indeterminate_d {
        return DecisionResult::indeterminate(ExtendedIndeterminate::D, status());
    }
    DecisionResult::not_applicable()
}

/// `ordered-deny-overrides`: document-order evaluation is already this
/// implementation's only evaluation order (spec §5 "Ordering"), so this is
/// the same algorithm as [`deny_overrides`].
pub fn ordered_deny_overrides(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    deny_overrides(children, ctx)
}

/// `ordered-permit-overrides`: see [`ordered_deny_overrides`].
pub fn ordered_permit_overrides(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    permit_overrides(children, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

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

    #[rstest]
    #[case(vec![DecisionResult::deny(), DecisionResult::permit(), DecisionResult::not_applicable()], Decision::Deny)]
    #[case(vec![DecisionResult::permit(), DecisionResult::not_applicable()], Decision::Permit)]
    #[case(vec![DecisionResult::not_applicable(), DecisionResult::not_applicable()], Decision::NotApplicable)]
    fn deny_overrides_matches_table(#[case] inputs: Vec<DecisionResult>, #[case] expected: Decision) {
        let owned: Vec<Fixed> = inputs.into_iter().map(fixed).collect();
        let children: Vec<&dyn Decidable> = owned.iter().map(|f| f as &dyn Decidable).collect();
        let mut ctx = EvaluationContext::for_testing();
        let result = deny_overrides(&children, &mut ctx);
        assert_eq!(result.decision, expected);
    }

    #[test]
    fn deny_overrides_indeterminate_d_with_permit_collapses_to_dp() {
        let status = processing_error_status("boom");
        let c0 = fixed(DecisionResult::indeterminate(ExtendedIndeterminate::D, status));
        let c1 = fixed(DecisionResult::permit());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        let result = deny_overrides(&children, &mut ctx);
        assert_eq!(result.decision, Decision::Indeterminate(ExtendedIndeterminate::DP));
    }

    #[test]
    fn permit_overrides_gathers_only_winning_obligations() {
        let mut winner = DecisionResult::permit();
        winner.obligations.push(crate::obligation::Obligation {
            obligation_id: "log".to_owned(),
            attribute_assignments: vec![],
        });
        let c0 = fixed(DecisionResult::deny());
        let c1 = fixed(winner);
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        let result = permit_overrides(&children, &mut ctx);
        assert_eq!(result.decision, Decision::Permit);
        assert_eq!(result.obligations.len(), 1);
    }
}
