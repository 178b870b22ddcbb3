//! Cross-module conformance-style scenarios, exercised end-to-end through
//! [`xacml_pdp::engine::Pdp`] rather than against a single evaluator
//! component in isolation.

use std::collections::HashMap;
use std::sync::Arc;

use xacml_core::{
    combining::{CombiningAlgorithmId, Decidable, Decision, ExtendedIndeterminate},
    function::library::{
        arithmetic::IntegerSubtractFunction, bag::IntegerOneAndOnlyFunction,
        comparison::IntegerGreaterThanOrEqualFunction, equality::StringEqualFunction,
    },
    obligation::{Effect, Obligation, ObligationExpression},
    policy::Policy,
    policyset::PolicySet,
    resolver::{PolicyProvider, PolicyReference},
    rule::Rule,
    target::{AllOf, AnyOf, Match, MatchSource, Target},
    value::{category, AttributeFqn, AttributeValue, Datatype},
};
use xacml_pdp::{
    config::{PdpConfig, RootPolicyRef, StandardEnvironmentAttributeSource},
    engine::Pdp,
    request::{RawAttribute, RawCategory, RawRequest},
};

#[derive(Debug)]
struct FixedPolicyProvider(Arc<dyn Decidable>);

impl PolicyProvider for FixedPolicyProvider {
    fn resolve(&self, _reference: &PolicyReference) -> Option<Arc<dyn Decidable>> {
        Some(Arc::clone(&self.0))
    }
}

fn test_config() -> PdpConfig {
    PdpConfig {
        max_variable_reference_depth: 10,
        max_policy_reference_depth: 10,
        strict_attribute_issuer_match: false,
        standard_environment_attribute_source: StandardEnvironmentAttributeSource::PdpOnly,
        xpath_enabled: false,
        root_policy_ref: RootPolicyRef {
            id: "root-policy".to_owned(),
            version_match: None,
        },
    }
}

fn pdp_for(tree: Arc<dyn Decidable>) -> Pdp {
    Pdp::bootstrap(
        &test_config(),
        vec![Arc::new(FixedPolicyProvider(tree))],
        vec![],
        None,
        None,
        None,
    )
    .unwrap()
}

fn subject_attribute(id: &str, value: AttributeValue, datatype: Datatype) -> RawCategory {
    RawCategory {
        category: category::SUBJECT.to_owned(),
        content: None,
        attributes: vec![RawAttribute {
            id: id.to_owned(),
            issuer: None,
            datatype,
            values: vec![value],
            include_in_result: false,
        }],
    }
}

fn subject_id_match(literal: &str) -> Match {
    Match {
        function: Arc::new(StringEqualFunction),
        attribute_value: AttributeValue::String(literal.to_owned()),
        source: MatchSource::Designator(xacml_core::expr::AttributeDesignator {
            fqn: AttributeFqn::new(category::SUBJECT, "subject-id", None),
            datatype: Datatype::String,
            must_be_present: false,
        }),
    }
}

fn target_matching_subject(literal: &str) -> Target {
    Target {
        any_ofs: vec![AnyOf {
            all_ofs: vec![AllOf {
                matches: vec![subject_id_match(literal)],
            }],
        }],
    }
}

/// Scenario 2 (spec §8): a Permit rule whose Target matches
/// `subject-id="Julius Hibbert"` and has no Condition.
#[test]
fn matching_target_rule_permits() {
    let policy = Arc::new(Policy {
        id: "policy1".to_owned(),
        version: "1.0".to_owned(),
        target: Target::empty(),
        rules: vec![Rule {
            id: "rule1".to_owned(),
            effect: Effect::Permit,
            target: target_matching_subject("Julius Hibbert"),
            condition: None,
            obligation_expressions: vec![],
            advice_expressions: vec![],
        }],
        rule_combining_algorithm: CombiningAlgorithmId::DenyOverrides,
        obligation_expressions: vec![],
        advice_expressions: vec![],
        variable_definitions: Arc::new(HashMap::new()),
    });

    let pdp = pdp_for(policy);
    let request = RawRequest {
        return_policy_id_list: false,
        combined_decision: false,
        categories: vec![subject_attribute(
            "subject-id",
            AttributeValue::String("Julius Hibbert".to_owned()),
            Datatype::String,
        )],
    };
    let response = pdp.evaluate(&request, None);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].decision, Decision::Permit);
}

fn permit_rule_with_obligation(obligation_id: &str) -> Rule {
    Rule {
        id: format!("{obligation_id}-rule"),
        effect: Effect::Permit,
        target: Target::empty(),
        condition: None,
        obligation_expressions: vec![ObligationExpression {
            obligation_id: obligation_id.to_owned(),
            fulfill_on: Effect::Permit,
            attribute_assignments: vec![],
        }],
        advice_expressions: vec![],
    }
}

fn deny_rule() -> Rule {
    Rule {
        id: "deny-rule".to_owned(),
        effect: Effect::Deny,
        target: Target::empty(),
        condition: None,
        obligation_expressions: vec![],
        advice_expressions: vec![],
    }
}

fn not_applicable_rule() -> Rule {
    Rule {
        id: "na-rule".to_owned(),
        effect: Effect::Deny,
        target: Target::empty(),
        condition: Some(xacml_core::condition::Condition {
            expression: xacml_core::expr::Expression::Constant(AttributeValue::Boolean(false)),
        }),
        obligation_expressions: vec![],
        advice_expressions: vec![],
    }
}

fn policy_with_rules(id: &str, rules: Vec<Rule>, algo: CombiningAlgorithmId) -> Arc<dyn Decidable> {
    Arc::new(Policy {
        id: id.to_owned(),
        version: "1.0".to_owned(),
        target: Target::empty(),
        rules,
        rule_combining_algorithm: algo,
        obligation_expressions: vec![],
        advice_expressions: vec![],
        variable_definitions: Arc::new(HashMap::new()),
    })
}

fn no_subject_request() -> RawRequest {
    RawRequest {
        return_policy_id_list: false,
        combined_decision: false,
        categories: vec![RawCategory {
            category: category::RESOURCE.to_owned(),
            content: None,
            attributes: vec![RawAttribute {
                id: "resource-id".to_owned(),
                issuer: None,
                datatype: Datatype::String,
                values: vec![AttributeValue::String("doc1".to_owned())],
                include_in_result: false,
            }],
        }],
    }
}

/// Scenario 3 (spec §8): permit-overrides over {Deny, Permit, NotApplicable}
/// yields Permit, carrying only the winning Permit rule's obligations.
#[test]
fn permit_overrides_picks_permit_and_its_obligations_only() {
    let policy = policy_with_rules(
        "policy1",
        vec![deny_rule(), permit_rule_with_obligation("log-access"), not_applicable_rule()],
        CombiningAlgorithmId::PermitOverrides,
    );

    let pdp = pdp_for(policy);
    let response = pdp.evaluate(&no_subject_request(), None);
    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Permit);
    assert_eq!(
        result.obligations,
        vec![Obligation {
            obligation_id: "log-access".to_owned(),
            attribute_assignments: vec![],
        }]
    );
}

fn indeterminate_d_rule() -> Rule {
    // Effect=Deny with a Condition over a designator that is both absent
    // and mustBePresent=true -> resolve_designator errors -> Indeterminate{D}.
    Rule {
        id: "indeterminate-rule".to_owned(),
        effect: Effect::Deny,
        target: Target::empty(),
        condition: Some(xacml_core::condition::Condition {
            expression: xacml_core::expr::Expression::Designator(
                xacml_core::expr::AttributeDesignator {
                    fqn: AttributeFqn::new(category::SUBJECT, "missing-attr", None),
                    datatype: Datatype::Boolean,
                    must_be_present: true,
                },
            ),
        }),
        obligation_expressions: vec![],
        advice_expressions: vec![],
    }
}

/// Scenario 4 (spec §8): permit-overrides over {Indeterminate{D}, Deny,
/// NotApplicable} collapses to Indeterminate{D} (no Permit seen).
#[test]
fn permit_overrides_with_indeterminate_d_and_deny_collapses_to_indeterminate_d() {
    let policy = policy_with_rules(
        "policy1",
        vec![indeterminate_d_rule(), deny_rule(), not_applicable_rule()],
        CombiningAlgorithmId::PermitOverrides,
    );

    let pdp = pdp_for(policy);
    let response = pdp.evaluate(&no_subject_request(), None);
    assert_eq!(response.results.len(), 1);
    assert_eq!(
        response.results[0].decision,
        Decision::Indeterminate(ExtendedIndeterminate::D)
    );
}

/// Scenario 5 (spec §8): `CombinedDecision=true` against a PDP bootstrapped
/// with the default `IdentityResultPostProcessor` (which declares no
/// combining support) is rejected by preprocessing before any individual
/// decision is evaluated -- a single Indeterminate result with a
/// syntax-error status, and the fixed policy provider's tree is never
/// evaluated.
#[test]
fn unsupported_combined_decision_short_circuits_before_evaluation() {
    let policy = policy_with_rules("policy1", vec![permit_rule_with_obligation("x")], CombiningAlgorithmId::PermitOverrides);
    let pdp = pdp_for(policy);

    let mut request = no_subject_request();
    request.combined_decision = true;

    let response = pdp.evaluate(&request, None);
    assert_eq!(response.results.len(), 1);
    assert!(matches!(
        response.results[0].decision,
        Decision::Indeterminate(_)
    ));
    assert!(response.results[0].status.is_some());
    assert!(response.results[0].applicable_policies.is_none());
}

/// A simplified analogue of conformance test IID013: a nested PolicySet
/// using permit-overrides at both levels, where the inner policy's rule
/// only fires when the age difference between two subjects meets a
/// threshold.
#[test]
fn nested_permit_overrides_policy_set_fires_on_age_difference_rule() {
    fn one_and_only_age(attribute_id: &str) -> xacml_core::expr::Expression {
        xacml_core::expr::Expression::Apply(Box::new(
            xacml_core::expr::Apply::new(
                Arc::new(IntegerOneAndOnlyFunction),
                vec![xacml_core::expr::Expression::Designator(
                    xacml_core::expr::AttributeDesignator {
                        fqn: AttributeFqn::new(category::SUBJECT, attribute_id, None),
                        datatype: Datatype::Integer,
                        must_be_present: true,
                    },
                )],
            )
            .expect("integer-one-and-only arity/type checks out"),
        ))
    }

    let age_difference_rule = Rule {
        id: "age-difference-rule".to_owned(),
        effect: Effect::Permit,
        target: Target::empty(),
        condition: Some(xacml_core::condition::Condition {
            expression: xacml_core::expr::Expression::Apply(Box::new(
                xacml_core::expr::Apply::new(
                    Arc::new(IntegerGreaterThanOrEqualFunction),
                    vec![
                        xacml_core::expr::Expression::Apply(Box::new(
                            xacml_core::expr::Apply::new(
                                Arc::new(IntegerSubtractFunction),
                                vec![one_and_only_age("age"), one_and_only_age("bart-simpson-age")],
                            )
                            .expect("integer-subtract arity/type checks out"),
                        )),
                        xacml_core::expr::Expression::Constant(AttributeValue::Integer(5)),
                    ],
                )
                .expect("integer-greater-than-or-equal arity/type checks out"),
            )),
        }),
        obligation_expressions: vec![],
        advice_expressions: vec![],
    };

    let policy1 = policy_with_rules("policy1", vec![not_applicable_rule()], CombiningAlgorithmId::PermitOverrides);
    let policy2 = policy_with_rules("policy2", vec![age_difference_rule], CombiningAlgorithmId::PermitOverrides);

    let root = Arc::new(PolicySet {
        id: "set1".to_owned(),
        version: "1.0".to_owned(),
        target: target_matching_subject("Julius Hibbert"),
        children: vec![policy1, policy2],
        policy_combining_algorithm: CombiningAlgorithmId::PermitOverrides,
        obligation_expressions: vec![],
        advice_expressions: vec![],
    });

    let pdp = pdp_for(root);
    let request = RawRequest {
        return_policy_id_list: false,
        combined_decision: false,
        categories: vec![RawCategory {
            category: category::SUBJECT.to_owned(),
            content: None,
            attributes: vec![
                RawAttribute {
                    id: "subject-id".to_owned(),
                    issuer: None,
                    datatype: Datatype::String,
                    values: vec![AttributeValue::String("Julius Hibbert".to_owned())],
                    include_in_result: false,
                },
                RawAttribute {
                    id: "age".to_owned(),
                    issuer: None,
                    datatype: Datatype::Integer,
                    values: vec![AttributeValue::Integer(55)],
                    include_in_result: false,
                },
                RawAttribute {
                    id: "bart-simpson-age".to_owned(),
                    issuer: None,
                    datatype: Datatype::Integer,
                    values: vec![AttributeValue::Integer(10)],
                    include_in_result: false,
                },
            ],
        }],
    };

    let response = pdp.evaluate(&request, None);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].decision, Decision::Permit);
    assert!(response.results[0].obligations.is_empty());
}
