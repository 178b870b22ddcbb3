//! `on-permit-apply-second`, XACML 3.0's own "experimental" extended
//! combining algorithm — gated behind the `combining-algorithms-experimental`
//! Cargo feature, consistent with how experimental backends elsewhere in
//! this workspace are feature-gated.

use crate::context::EvaluationContext;

use super::{Decidable, Decision, DecisionResult};

/// `child[0]` is a guard: if it evaluates to Permit, the combined result is
/// `child[1]`'s evaluation; otherwise the guard's own Deny/NotApplicable/
/// Indeterminate passes through unchanged.
///
/// # Panics
/// Panics if `children` has fewer than two elements — this algorithm is only
/// ever applied to a PolicySet with exactly two policy children, validated
/// at policy-load time before this is ever called.
pub fn on_permit_apply_second(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    assert!(children.len() >= 2, "on-permit-apply-second requires exactly two children");
    let guard = children[0].evaluate(ctx);
    match guard.decision {
        Decision::Permit => children[1].evaluate(ctx),
        Decision::Deny | Decision::NotApplicable | Decision::Indeterminate(_) => guard,
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
    fn guard_permit_defers_to_second_child() {
        let c0 = fixed(DecisionResult::permit());
        let c1 = fixed(DecisionResult::deny());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(on_permit_apply_second(&children, &mut ctx).decision, Decision::Deny);
    }

    #[test]
    fn guard_deny_short_circuits() {
        let c0 = fixed(DecisionResult::deny());
        let c1 = fixed(DecisionResult::permit());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(on_permit_apply_second(&children, &mut ctx).decision, Decision::Deny);
    }
}
