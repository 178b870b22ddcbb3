//! Combining algorithms: [`Decidable`], [`DecisionResult`], and the eleven
//! standard algorithms of spec §4.F, implemented per XACML 3.0 core §C.
//!
//! Per §5 "Ordering": within one evaluation, children are always evaluated
//! in document order by this implementation (no internal parallelism is
//! attempted), so the *ordered-* algorithm variants are observationally
//! identical to their unordered counterparts and are implemented as the same
//! function, re-exported under both names — see [`overrides`].

pub mod first_applicable;
#[cfg(feature = "combining-algorithms-experimental")]
pub mod on_permit_apply_second;
pub mod only_one_applicable;
pub mod overrides;
pub mod unless;

use crate::{
    context::EvaluationContext,
    obligation::{Advice, Effect, Obligation},
    status::XacmlStatus,
};

/// The four XACML "Extended Indeterminate" values, per spec §2/§4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedIndeterminate {
    /// Unqualified Indeterminate (neither a Permit nor a Deny candidate).
    None,
    /// Indeterminate that, absent the error, would have been Deny.
    D,
    /// Indeterminate that, absent the error, would have been Permit.
    P,
    /// Indeterminate that could have gone either way.
    DP,
}

/// The four-way decision outcome of evaluating a [`Decidable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Permit.
    Permit,
    /// Deny.
    Deny,
    /// The Target did not match.
    NotApplicable,
    /// Could not be determined; see the accompanying extended-indeterminate
    /// classification.
    Indeterminate(ExtendedIndeterminate),
}

impl Decision {
    /// The [`Effect`] this decision corresponds to, for obligation/advice
    /// filtering, if any.
    pub fn as_effect(self) -> Option<Effect> {
        match self {
            Decision::Permit => Some(Effect::Permit),
            Decision::Deny => Some(Effect::Deny),
            _ => None,
        }
    }
}

/// A (policyId, version) pair identifying a Policy or PolicySet that
/// contributed to a Permit/Deny result, per spec §3 "Applicable Policy
/// Identifiers".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyIdentifier {
    /// The policy or policy set id.
    pub id: String,
    /// Its version.
    pub version: String,
}

/// The result of evaluating a Rule, Policy, or PolicySet: a [`Decision`]
/// plus its status and the obligations/advice contributed along the
/// deciding path.
#[derive(Debug, Clone)]
pub struct DecisionResult {
    /// The decision.
    pub decision: Decision,
    /// The status explaining the decision (always present for
    /// `Indeterminate`; `None` for a clean Permit/Deny/NotApplicable).
    pub status: Option<XacmlStatus>,
    /// Obligations contributed by the deciding path, in document order.
    pub obligations: Vec<Obligation>,
    /// Advice contributed by the deciding path, in document order.
    pub advices: Vec<Advice>,
    /// Ids of the Policy/PolicySet nodes along the deciding path, innermost
    /// first, populated only when the request asked for
    /// `ReturnPolicyIdList` (spec §4.J/§4.G step 5).
    pub applicable_policies: Vec<PolicyIdentifier>,
}

impl DecisionResult {
    /// A Permit result with no obligations/advice attached yet (a
    /// Policy/PolicySet appends its own afterward, per spec §4.G step 3).
    pub fn permit() -> Self {
        Self {
            decision: Decision::Permit,
            status: None,
            obligations: Vec::new(),
            advices: Vec::new(),
            applicable_policies: Vec::new(),
        }
    }

    /// A Deny result with no obligations/advice attached yet.
    pub fn deny() -> Self {
        Self {
            decision: Decision::Deny,
            status: None,
            obligations: Vec::new(),
            advices: Vec::new(),
            applicable_policies: Vec::new(),
        }
    }

    /// A NotApplicable result.
    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            status: None,
            obligations: Vec::new(),
            advices: Vec::new(),
            applicable_policies: Vec::new(),
        }
    }

    /// An Indeterminate result with the given extended classification and
    /// explanatory status.
    pub fn indeterminate(extended: ExtendedIndeterminate, status: XacmlStatus) -> Self {
        Self {
            decision: Decision::Indeterminate(extended),
            status: Some(status),
            obligations: Vec::new(),
            advices: Vec::new(),
            applicable_policies: Vec::new(),
        }
    }

    /// Whether this result's obligations/advice should be attached to an
    /// enclosing Policy's own obligation/advice expressions (i.e. the
    /// result is a clean Permit or Deny).
    pub fn is_permit_or_deny(&self) -> bool {
        matches!(self.decision, Decision::Permit | Decision::Deny)
    }
}

/// Something that can be evaluated to a [`DecisionResult`]: a Rule, Policy,
/// or PolicySet. Combining algorithms operate uniformly over a list of
/// `&dyn Decidable` children regardless of which concrete node type they are.
pub trait Decidable: std::fmt::Debug {
    /// Evaluate this node against `ctx`.
    fn evaluate(&self, ctx: &mut EvaluationContext) -> DecisionResult;
}

/// Classification tallies over a list of already-evaluated children,
/// shared by every combining algorithm's decision table.
pub(crate) struct Classification {
    pub any_permit: bool,
    pub any_deny: bool,
    pub any_indeterminate_d: bool,
    pub any_indeterminate_p: bool,
    pub any_indeterminate_dp: bool,
    /// The first status seen among any Indeterminate child, used when the
    /// combined result itself becomes Indeterminate.
    pub first_indeterminate_status: Option<XacmlStatus>,
}

pub(crate) fn classify(results: &[DecisionResult]) -> Classification {
    let mut c = Classification {
        any_permit: false,
        any_deny: false,
        any_indeterminate_d: false,
        any_indeterminate_p: false,
        any_indeterminate_dp: false,
        first_indeterminate_status: None,
    };
    for r in results {
        match r.decision {
            Decision::Permit => c.any_permit = true,
            Decision::Deny => c.any_deny = true,
            Decision::NotApplicable => {}
            Decision::Indeterminate(ExtendedIndeterminate::None) => {
                c.any_indeterminate_d = true;
                c.any_indeterminate_p = true;
                c.first_indeterminate_status.get_or_insert_with(|| r.status.clone().unwrap());
            }
            Decision::Indeterminate(ExtendedIndeterminate::D) => {
                c.any_indeterminate_d = true;
                c.first_indeterminate_status.get_or_insert_with(|| r.status.clone().unwrap());
            }
            Decision::Indeterminate(ExtendedIndeterminate::P) => {
                c.any_indeterminate_p = true;
                c.first_indeterminate_status.get_or_insert_with(|| r.status.clone().unwrap());
            }
            Decision::Indeterminate(ExtendedIndeterminate::DP) => {
                c.any_indeterminate_dp = true;
                c.first_indeterminate_status.get_or_insert_with(|| r.status.clone().unwrap());
            }
        }
    }
    c
}

/// The id of a standard combining algorithm, per spec §4.F. Rule-combining
/// and policy-combining share this one closed set; [`CombiningAlgorithmId::is_policy_only`]
/// flags the two algorithms that spec §10.E restricts to the policy-combining
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiningAlgorithmId {
    /// `urn:oasis:names:tc:xacml:1.0:(rule|policy)-combining-algorithm:deny-overrides`
    DenyOverrides,
    /// `...:permit-overrides`
    PermitOverrides,
    /// `urn:oasis:names:tc:xacml:3.0:...:ordered-deny-overrides`
    OrderedDenyOverrides,
    /// `...:ordered-permit-overrides`
    OrderedPermitOverrides,
    /// `urn:oasis:names:tc:xacml:1.0:...:deny-unless-permit`
    DenyUnlessPermit,
    /// `...:permit-unless-deny`
    PermitUnlessDeny,
    /// `urn:oasis:names:tc:xacml:1.0:...:first-applicable`
    FirstApplicable,
    /// `urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable`
    /// (policy-combining only).
    OnlyOneApplicable,
    /// Experimental; requires the `combining-algorithms-experimental` feature
    /// (policy-combining only).
    #[cfg(feature = "combining-algorithms-experimental")]
    OnPermitApplySecond,
}

impl CombiningAlgorithmId {
    /// Resolve a rule-combining-algorithm identifier URI.
    pub fn from_rule_combining_uri(uri: &str) -> Option<Self> {
        Some(match uri {
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides" => Self::DenyOverrides,
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides" => Self::PermitOverrides,
            "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-deny-overrides" => {
                Self::OrderedDenyOverrides
            }
            "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-permit-overrides" => {
                Self::OrderedPermitOverrides
            }
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-unless-permit" => Self::DenyUnlessPermit,
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-unless-deny" => Self::PermitUnlessDeny,
            "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable" => Self::FirstApplicable,
            _ => return None,
        })
    }

    /// Resolve a policy-combining-algorithm identifier URI.
    pub fn from_policy_combining_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable" => {
                Some(Self::OnlyOneApplicable)
            }
            #[cfg(feature = "combining-algorithms-experimental")]
            "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:on-permit-apply-second" => {
                Some(Self::OnPermitApplySecond)
            }
            _ => {
                let uri = uri.replace("rule-combining-algorithm", "policy-combining-algorithm");
                Self::from_rule_combining_uri(&uri)
            }
        }
    }

    /// Whether this algorithm is restricted to the policy-combining surface.
    pub fn is_policy_only(self) -> bool {
        match self {
            Self::OnlyOneApplicable => true,
            #[cfg(feature = "combining-algorithms-experimental")]
            Self::OnPermitApplySecond => true,
            _ => false,
        }
    }

    /// Run this algorithm over `children`.
    pub fn combine(self, children: &[&dyn Decidable], ctx: &mut EvaluationContext) -> DecisionResult {
        match self {
            Self::DenyOverrides => overrides::deny_overrides(children, ctx),
            Self::PermitOverrides => overrides::permit_overrides(children, ctx),
            Self::OrderedDenyOverrides => overrides::ordered_deny_overrides(children, ctx),
            Self::OrderedPermitOverrides => overrides::ordered_permit_overrides(children, ctx),
            Self::DenyUnlessPermit => unless::deny_unless_permit(children, ctx),
            Self::PermitUnlessDeny => unless::permit_unless_deny(children, ctx),
            Self::FirstApplicable => first_applicable::first_applicable(children, ctx),
            Self::OnlyOneApplicable => only_one_applicable::only_one_applicable(children, ctx),
            #[cfg(feature = "combining-algorithms-experimental")]
            Self::OnPermitApplySecond => on_permit_apply_second::on_permit_apply_second(children, ctx),
        }
    }
}

/// Concatenate obligations/advice/applicable-policy-ids from every child
/// whose decision equals `winning`, in document order — per spec §4.F
/// "Obligations/advice of children contributing to the final Permit/Deny
/// are concatenated in child order."
pub(crate) fn gather_obligations_advice(
    results: &[DecisionResult],
    winning: Decision,
) -> (Vec<Obligation>, Vec<Advice>, Vec<PolicyIdentifier>) {
    let mut obligations = Vec::new();
    let mut advices = Vec::new();
    let mut applicable_policies = Vec::new();
    for r in results {
        if r.decision == winning {
            obligations.extend(r.obligations.iter().cloned());
            advices.extend(r.advices.iter().cloned());
            applicable_policies.extend(r.applicable_policies.iter().cloned());
        }
    }
    (obligations, advices, applicable_policies)
}
