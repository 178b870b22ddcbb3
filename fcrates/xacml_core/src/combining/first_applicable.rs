//! `first-applicable`, per XACML 3.0 core §C.1/§C.5.

use crate::context::EvaluationContext;

use super::{Decidable, Decision, DecisionResult};

/// The first child whose decision is not `NotApplicable` wins outright,
/// including when that decision is `Indeterminate`.
pub fn first_applicable(children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
    for child in children {
        let result = child.evaluate(ctx);
        if result.decision != Decision::NotApplicable {
            return result;
        }
    }
    DecisionResult::not_applicable()
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
    fn first_non_not_applicable_wins() {
        let c0 = fixed(DecisionResult::not_applicable());
        let c1 = fixed(DecisionResult::deny());
        let c2 = fixed(DecisionResult::permit());
        let children: Vec<&dyn Decidable> = vec![&c0, &c1, &c2];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(first_applicable(&children, &mut ctx).decision, Decision::Deny);
    }

    #[test]
    fn all_not_applicable_stays_not_applicable() {
        let c0 = fixed(DecisionResult::not_applicable());
        let children: Vec<&dyn Decidable> = vec![&c0];
        let mut ctx = EvaluationContext::for_testing();
        assert_eq!(
            first_applicable(&children, &mut ctx).decision,
            Decision::NotApplicable
        );
    }
}
