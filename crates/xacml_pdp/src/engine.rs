//! The PDP engine and result post-processor, per spec §4.K.
//!
//! [`Pdp::evaluate`] orchestrates: preprocess (§4.J) → build the PDP-issued
//! environment attribute snapshot → per individual request, consult the
//! decision cache (§4.L) or evaluate the resolved root policy/policy-set
//! tree (§4.G via §4.H/§4.I) → apply the configured result post-processor →
//! assemble the [`Response`].

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Instant, SystemTime},
};

use chrono::{DateTime, Utc};
use xacml_core::{
    combining::{Decision, DecisionResult, ExtendedIndeterminate, PolicyIdentifier},
    context::{AttributeProvider, ContextConfig, EvaluationContext, XPathEvaluator},
    obligation::{Advice, Obligation},
    resolver::{PolicyProvider, PolicyReference, RootPolicyResolver},
    status::{processing_error_status, syntax_error_status, XacmlStatus},
    value::{category, environment_attr, AttributeFqn, AttributeValue, Bag, Datatype},
};

use crate::{
    cache::{DecisionCache, NoDecisionCache},
    config::{PdpConfig, StandardEnvironmentAttributeSource},
    providers::AttributeProviderRegistry,
    request::{preprocess, IndividualDecisionRequest, PreprocessError, PreprocessorCapabilities, RawRequest},
};

/// One `Result` of an XACML `Response`, per spec §6 "Response (outbound)".
#[derive(Debug, Clone)]
pub struct XacmlResult {
    /// The decision.
    pub decision: Decision,
    /// The status explaining the decision; always present for
    /// `Indeterminate`, `None` for a clean Permit/Deny/NotApplicable.
    pub status: Option<XacmlStatus>,
    /// Obligations the PEP must act on.
    pub obligations: Vec<Obligation>,
    /// Advice the PEP may act on.
    pub advices: Vec<Advice>,
    /// Attributes echoed back because their `IncludeInResult` flag was set.
    pub attributes: Vec<(AttributeFqn, Bag)>,
    /// Ids of the Policy/PolicySet nodes that contributed to this decision,
    /// present only when the request asked for `ReturnPolicyIdList`.
    pub applicable_policies: Option<Vec<PolicyIdentifier>>,
}

impl XacmlResult {
    fn from_decision(result: DecisionResult, request: &IndividualDecisionRequest) -> Self {
        let attributes = request
            .included_in_result
            .iter()
            .filter_map(|fqn| {
                request
                    .named_attributes
                    .get(fqn)
                    .map(|bag| (fqn.clone(), bag.clone()))
            })
            .collect();
        let applicable_policies = request
            .return_policy_id_list
            .then_some(result.applicable_policies);
        Self {
            decision: result.decision,
            status: result.status,
            obligations: result.obligations,
            advices: result.advices,
            attributes,
            applicable_policies,
        }
    }

    /// A single Indeterminate result carrying `status`, used when
    /// preprocessing fails before any policy evaluation runs (spec §8
    /// scenario 5).
    fn indeterminate_only(status: XacmlStatus) -> Self {
        Self {
            decision: Decision::Indeterminate(ExtendedIndeterminate::DP),
            status: Some(status),
            obligations: Vec::new(),
            advices: Vec::new(),
            attributes: Vec::new(),
            applicable_policies: None,
        }
    }
}

/// The response to a `Request`: one [`XacmlResult`] per individual decision,
/// possibly combined by the configured [`ResultPostProcessor`].
#[derive(Debug, Clone)]
pub struct Response {
    /// The results.
    pub results: Vec<XacmlResult>,
}

/// Post-processes the raw, one-per-individual-request results of
/// evaluation, per spec §4.K step 4. The identity post-processor (default)
/// returns results unchanged; the combined-decision variant aggregates every
/// individual Permit/Deny into a single result per the Multiple Decision
/// Profile's `CombinedDecision` semantics.
pub trait ResultPostProcessor: std::fmt::Debug + Send + Sync {
    /// Whether this post-processor can honour `CombinedDecision=true` (spec
    /// §4.J "`CombinedDecision` (supported iff the post-processor declares
    /// combining support)").
    fn supports_combined_decision(&self) -> bool;

    /// Post-process `results`, consuming whether the originating request
    /// asked for combination.
    fn process(&self, results: Vec<XacmlResult>, combined_decision: bool) -> Vec<XacmlResult>;
}

/// Returns every individual result unchanged; rejects `CombinedDecision`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResultPostProcessor;

impl ResultPostProcessor for IdentityResultPostProcessor {
    fn supports_combined_decision(&self) -> bool {
        false
    }

    fn process(&self, results: Vec<XacmlResult>, _combined_decision: bool) -> Vec<XacmlResult> {
        results
    }
}

/// Aggregates multiple individual Permit/Deny decisions into a single
/// combined result when `CombinedDecision=true`, per the XACML Multiple
/// Decision Profile: any Deny overrides; else any Permit wins; else any
/// Indeterminate; else NotApplicable. Obligations/advice of every result
/// sharing the winning decision are concatenated in individual-request
/// order, mirroring the deny-overrides combining shape of spec §4.F.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombinedDecisionResultPostProcessor;

impl ResultPostProcessor for CombinedDecisionResultPostProcessor {
    fn supports_combined_decision(&self) -> bool {
        true
    }

    fn process(&self, results: Vec<XacmlResult>, combined_decision: bool) -> Vec<XacmlResult> {
        if !combined_decision || results.len() <= 1 {
            return results;
        }

        let any_deny = results.iter().any(|r| r.decision == Decision::Deny);
        let any_permit = results.iter().any(|r| r.decision == Decision::Permit);
        let any_indeterminate = results
            .iter()
            .any(|r| matches!(r.decision, Decision::Indeterminate(_)));

        let winning = if any_deny {
            Decision::Deny
        } else if any_permit {
            Decision::Permit
        } else if any_indeterminate {
            Decision::Indeterminate(ExtendedIndeterminate::DP)
        } else {
            Decision::NotApplicable
        };

        let mut obligations = Vec::new();
        let mut advices = Vec::new();
        let mut applicable_policies: Option<Vec<PolicyIdentifier>> = None;
        let mut status = None;
        for r in &results {
            let matches = match (winning, r.decision) {
                (Decision::Indeterminate(_), Decision::Indeterminate(_)) => true,
                (a, b) => a == b,
            };
            if !matches {
                continue;
            }
            obligations.extend(r.obligations.iter().cloned());
            advices.extend(r.advices.iter().cloned());
            if let Some(ids) = &r.applicable_policies {
                applicable_policies.get_or_insert_with(Vec::new).extend(ids.iter().cloned());
            }
            status = status.or_else(|| r.status.clone());
        }

        vec![XacmlResult {
            decision: winning,
            status,
            obligations,
            advices,
            attributes: Vec::new(),
            applicable_policies,
        }]
    }
}

/// Bootstrap-time failures, per spec §6 "Exit codes ... 1 = configuration
/// error".
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The attribute provider registration graph was invalid.
    #[error(transparent)]
    ProviderRegistration(#[from] crate::providers::ProviderRegistrationError),
}

/// The policy decision point: composes the root policy resolver, attribute
/// provider registry, decision cache, and result post-processor into
/// [`Pdp::evaluate`], per spec §4.K.
#[derive(Debug)]
pub struct Pdp {
    root_resolver: RootPolicyResolver,
    root_reference: PolicyReference,
    provider_registry: AttributeProviderRegistry,
    xpath_evaluator: Option<Arc<dyn XPathEvaluator>>,
    decision_cache: Arc<dyn DecisionCache>,
    post_processor: Arc<dyn ResultPostProcessor>,
    context_config: ContextConfig,
    standard_environment_attribute_source: StandardEnvironmentAttributeSource,
}

impl Pdp {
    /// Bootstrap a `Pdp` from `config` and the registered extension
    /// implementations, per spec §6 "registered extensions ... are not part
    /// of core runtime" — they're supplied here, programmatically, rather
    /// than deserialized alongside `config`.
    pub fn bootstrap(
        config: &PdpConfig,
        policy_providers: Vec<Arc<dyn PolicyProvider>>,
        attribute_providers: Vec<Arc<dyn AttributeProvider>>,
        xpath_evaluator: Option<Arc<dyn XPathEvaluator>>,
        decision_cache: Option<Arc<dyn DecisionCache>>,
        post_processor: Option<Arc<dyn ResultPostProcessor>>,
    ) -> Result<Self, BootstrapError> {
        let provider_registry = AttributeProviderRegistry::new(attribute_providers)?;
        Ok(Self {
            root_resolver: RootPolicyResolver::new(policy_providers, config.max_policy_reference_depth),
            root_reference: PolicyReference {
                id: config.root_policy_ref.id.clone(),
                version_match: config.root_policy_ref.version_match.clone(),
            },
            provider_registry,
            xpath_evaluator,
            decision_cache: decision_cache.unwrap_or_else(|| Arc::new(NoDecisionCache)),
            post_processor: post_processor.unwrap_or_else(|| Arc::new(IdentityResultPostProcessor)),
            context_config: ContextConfig {
                strict_attribute_issuer_match: config.strict_attribute_issuer_match,
                xpath_enabled: config.xpath_enabled,
                max_policy_reference_depth: config.max_policy_reference_depth,
            },
            standard_environment_attribute_source: config.standard_environment_attribute_source,
        })
    }

    /// Evaluate `request`, per spec §4.K steps 1-5. `deadline`, if given, is
    /// threaded into every individual evaluation (spec §5 "Cancellation/
    /// timeout").
    #[tracing::instrument(skip_all)]
    pub fn evaluate(&self, request: &RawRequest, deadline: Option<Instant>) -> Response {
        let capabilities = PreprocessorCapabilities {
            supports_return_policy_id_list: true,
            supports_combined_decision: self.post_processor.supports_combined_decision(),
        };

        let individual_requests = match preprocess(request, capabilities) {
            Ok(individual) => individual,
            Err(err) => {
                return Response {
                    results: vec![XacmlResult::indeterminate_only(syntax_error_status(
                        preprocess_error_message(&err),
                    ))],
                }
            }
        };

        let pdp_issued = self.environment_attribute_snapshot();
        let individual_requests: Vec<IndividualDecisionRequest> = individual_requests
            .into_iter()
            .map(|r| self.merge_environment_attributes(r, &pdp_issued))
            .collect();

        let cached = self.decision_cache.get_all(&individual_requests);

        let mut results = Vec::with_capacity(individual_requests.len());
        let mut to_cache = Vec::new();
        for (request, cached_result) in individual_requests.into_iter().zip(cached) {
            let decision = match cached_result {
                Some(decision) => decision,
                None => {
                    let decision = self.evaluate_individual(&request, deadline);
                    to_cache.push((request.clone(), decision.clone()));
                    decision
                }
            };
            results.push(XacmlResult::from_decision(decision, &request));
        }
        if !to_cache.is_empty() {
            self.decision_cache.put_all(to_cache);
        }

        let results = self
            .post_processor
            .process(results, request.combined_decision);
        Response { results }
    }

    fn evaluate_individual(
        &self,
        request: &IndividualDecisionRequest,
        deadline: Option<Instant>,
    ) -> DecisionResult {
        let tree = match self.root_resolver.resolve(&self.root_reference) {
            Ok(tree) => tree,
            Err(err) => {
                return DecisionResult::indeterminate(
                    ExtendedIndeterminate::DP,
                    processing_error_status(err.to_string()),
                )
            }
        };

        let mut ctx = EvaluationContext::new(
            request.named_attributes.clone(),
            request.extra_contents_by_category.clone(),
            self.provider_registry.ordered_providers(),
            self.xpath_evaluator.clone(),
            self.context_config,
            deadline,
        );
        tree.evaluate(&mut ctx)
    }

    /// Build the single current-time/current-date/current-dateTime
    /// snapshot taken at request entry, per spec §4.I "PDP-issued
    /// attributes ... are all derived from a single snapshot ... so that
    /// they agree."
    fn environment_attribute_snapshot(&self) -> HashMap<AttributeFqn, Bag> {
        let now: DateTime<Utc> = SystemTime::now().into();
        let naive = now.naive_utc();
        let mut snapshot = HashMap::new();
        snapshot.insert(
            AttributeFqn::new(
                category::ENVIRONMENT,
                environment_attr::CURRENT_TIME,
                None,
            ),
            Bag::singleton(AttributeValue::Time(naive.time())),
        );
        snapshot.insert(
            AttributeFqn::new(
                category::ENVIRONMENT,
                environment_attr::CURRENT_DATE,
                None,
            ),
            Bag::singleton(AttributeValue::Date(naive.date())),
        );
        snapshot.insert(
            AttributeFqn::new(
                category::ENVIRONMENT,
                environment_attr::CURRENT_DATETIME,
                None,
            ),
            Bag::singleton(AttributeValue::DateTime(naive)),
        );
        snapshot
    }

    fn merge_environment_attributes(
        &self,
        mut request: IndividualDecisionRequest,
        pdp_issued: &HashMap<AttributeFqn, Bag>,
    ) -> IndividualDecisionRequest {
        match self.standard_environment_attribute_source {
            StandardEnvironmentAttributeSource::RequestOnly => {}
            StandardEnvironmentAttributeSource::PdpOnly => {
                for (fqn, bag) in pdp_issued {
                    request.named_attributes.insert(fqn.clone(), bag.clone());
                }
            }
            StandardEnvironmentAttributeSource::RequestElsePdp => {
                for (fqn, bag) in pdp_issued {
                    request
                        .named_attributes
                        .entry(fqn.clone())
                        .or_insert_with(|| bag.clone());
                }
            }
        }
        request
    }

    /// Release resources held by this PDP's collaborators, per spec §5
    /// "The engine's `close()` cascades to root policy resolver, each
    /// attribute provider, and the decision cache."
    ///
    /// The root policy resolver and attribute providers in this
    /// implementation hold no releasable resources of their own (any I/O
    /// they perform is synchronous and self-contained per call); only the
    /// decision cache needs an explicit teardown hook.
    pub fn close(&self) {
        self.decision_cache.close();
    }
}

fn preprocess_error_message(err: &PreprocessError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RawAttribute, RawCategory};
    use std::sync::Arc;
    use xacml_core::{
        combining::{CombiningAlgorithmId, Decidable},
        obligation::Effect,
        policy::Policy,
        resolver::PolicyProvider,
        rule::Rule,
        target::Target,
        value::category,
    };

    #[derive(Debug)]
    struct FixedPolicyProvider(Arc<dyn Decidable>);
    impl PolicyProvider for FixedPolicyProvider {
        fn resolve(&self, _reference: &PolicyReference) -> Option<Arc<dyn Decidable>> {
            Some(Arc::clone(&self.0))
        }
    }

    fn permit_everything_policy() -> Arc<dyn Decidable> {
        Arc::new(Policy {
            id: "root-policy".to_owned(),
            version: "1.0".to_owned(),
            target: Target::empty(),
            rules: vec![Rule {
                id: "r1".to_owned(),
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

    fn test_config() -> PdpConfig {
        PdpConfig {
            max_variable_reference_depth: 10,
            max_policy_reference_depth: 10,
            strict_attribute_issuer_match: false,
            standard_environment_attribute_source: StandardEnvironmentAttributeSource::PdpOnly,
            xpath_enabled: false,
            root_policy_ref: crate::config::RootPolicyRef {
                id: "root-policy".to_owned(),
                version_match: None,
            },
        }
    }

    fn subject_request(subject: &str) -> RawRequest {
        RawRequest {
            return_policy_id_list: false,
            combined_decision: false,
            categories: vec![RawCategory {
                category: category::SUBJECT.to_owned(),
                content: None,
                attributes: vec![RawAttribute {
                    id: "subject-id".to_owned(),
                    issuer: None,
                    datatype: Datatype::String,
                    values: vec![AttributeValue::String(subject.to_owned())],
                    include_in_result: false,
                }],
            }],
        }
    }

    #[test]
    fn evaluate_permit_everything_policy_returns_permit() {
        let pdp = Pdp::bootstrap(
            &test_config(),
            vec![Arc::new(FixedPolicyProvider(permit_everything_policy()))],
            vec![],
            None,
            None,
            None,
        )
        .unwrap();
        let response = pdp.evaluate(&subject_request("alice"), None);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].decision, Decision::Permit);
    }

    #[test]
    fn unsupported_return_policy_id_list_short_circuits_to_indeterminate() {
        let pdp = Pdp::bootstrap(
            &test_config(),
            vec![Arc::new(FixedPolicyProvider(permit_everything_policy()))],
            vec![],
            None,
            None,
            None,
        )
        .unwrap();
        let mut request = subject_request("alice");
        request.combined_decision = true; // IdentityResultPostProcessor rejects this
        let response = pdp.evaluate(&request, None);
        assert_eq!(response.results.len(), 1);
        assert!(matches!(
            response.results[0].decision,
            Decision::Indeterminate(_)
        ));
    }

    #[test]
    fn combined_decision_post_processor_keeps_permit_when_all_individuals_permit() {
        let pdp = Pdp::bootstrap(
            &test_config(),
            vec![Arc::new(FixedPolicyProvider(permit_everything_policy()))],
            vec![],
            None,
            None,
            Some(Arc::new(CombinedDecisionResultPostProcessor)),
        )
        .unwrap();
        let mut request = RawRequest {
            return_policy_id_list: false,
            combined_decision: true,
            categories: vec![
                RawCategory {
                    category: category::SUBJECT.to_owned(),
                    content: None,
                    attributes: vec![RawAttribute {
                        id: "subject-id".to_owned(),
                        issuer: None,
                        datatype: Datatype::String,
                        values: vec![AttributeValue::String("alice".to_owned())],
                        include_in_result: false,
                    }],
                },
                RawCategory {
                    category: category::SUBJECT.to_owned(),
                    content: None,
                    attributes: vec![RawAttribute {
                        id: "subject-id".to_owned(),
                        issuer: None,
                        datatype: Datatype::String,
                        values: vec![AttributeValue::String("bob".to_owned())],
                        include_in_result: false,
                    }],
                },
                RawCategory {
                    category: category::RESOURCE.to_owned(),
                    content: None,
                    attributes: vec![RawAttribute {
                        id: "resource-id".to_owned(),
                        issuer: None,
                        datatype: Datatype::String,
                        values: vec![AttributeValue::String("doc1".to_owned())],
                        include_in_result: false,
                    }],
                },
            ],
        };
        request.categories[2].category = category::RESOURCE.to_owned();
        let response = pdp.evaluate(&request, None);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].decision, Decision::Permit);
    }
}
