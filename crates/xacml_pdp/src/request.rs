//! Request preprocessor, per spec §4.J.
//!
//! Splits an inbound [`RawRequest`] into one or more [`IndividualDecisionRequest`]s.
//! The minimum behavior is one-to-one; when a category URI appears more than
//! once in the raw request (XACML's "repeated-attribute-categories" Multiple
//! Decision Profile variant), this fans out into the Cartesian product across
//! the repeated categories, preserving per-category attribute grouping.
//!
//! `MultiRequests`/`RequestReference` (the other two Multiple Decision
//! Profile variants) are explicitly out of scope (spec §1 Non-goals) and are
//! not modeled at all — only the repeated-attribute-categories shape is
//! representable by [`RawRequest`].

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
};

use thiserror::Error;
use xacml_core::value::{AttributeFqn, AttributeValue, Bag, Datatype};

/// One `Attribute` within a `RawCategory`: an id, optional issuer, a set of
/// same-typed values, and whether it should be echoed back in the result.
#[derive(Debug, Clone)]
pub struct RawAttribute {
    /// The attribute id URI.
    pub id: String,
    /// The optional issuer URI.
    pub issuer: Option<String>,
    /// The common datatype of every value below.
    pub datatype: Datatype,
    /// The attribute's values (a singleton list for a single-valued
    /// attribute; more than one forms a bag).
    pub values: Vec<AttributeValue>,
    /// Whether this attribute must be echoed in the `Result.attributes`
    /// `IncludeInResult` list.
    pub include_in_result: bool,
}

/// One `Attributes` block: a category URI, optional `Content` node, and its
/// attributes. A category URI that repeats across multiple blocks in one
/// [`RawRequest`] drives the Multiple-Decision fan-out.
#[derive(Debug, Clone)]
pub struct RawCategory {
    /// The category URI (e.g. `...:subject-category:access-subject`).
    pub category: String,
    /// The category's `Content` XML node, for `AttributeSelector` resolution.
    pub content: Option<String>,
    /// This category instance's attributes.
    pub attributes: Vec<RawAttribute>,
}

/// The inbound XACML `Request`, independent of its XML/JSON wire encoding
/// (spec §1 "Explicitly out of scope": wire parsers are external
/// collaborators; this is the already-parsed abstract shape of spec §6).
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Whether the response should include the ids of every Policy/
    /// PolicySet that contributed to each decision.
    pub return_policy_id_list: bool,
    /// Whether multiple individual decisions fanned out from this request
    /// should be combined into a single aggregate result.
    pub combined_decision: bool,
    /// The request's `Attributes` blocks, possibly repeating a category URI.
    pub categories: Vec<RawCategory>,
}

/// A single individual decision request: the flattened, per-combination
/// attribute set the evaluation engine and decision cache actually consume.
#[derive(Debug, Clone)]
pub struct IndividualDecisionRequest {
    /// Request-supplied attributes. The PDP-issued environment attribute
    /// snapshot (spec §4.I/§4.K step 2) is merged in separately by
    /// [`crate::engine::Pdp`], not here.
    pub named_attributes: HashMap<AttributeFqn, Bag>,
    /// `Content` nodes by category, for `AttributeSelector` resolution.
    pub extra_contents_by_category: HashMap<String, String>,
    /// Whether this request asked for applicable-policy-id tracking.
    pub return_policy_id_list: bool,
    /// Attributes whose `IncludeInResult` flag was set.
    pub included_in_result: Vec<AttributeFqn>,
}

impl IndividualDecisionRequest {
    /// A stable hash over sorted `(category, attributeFqn, datatype,
    /// values)` tuples, independent of `HashMap` iteration order — spec §9
    /// "Decision cache key: a canonical choice is a stable hash over sorted
    /// ... tuples after request preprocessing."
    pub fn canonical_hash(&self) -> u64 {
        let mut entries: Vec<(&AttributeFqn, &Bag)> = self.named_attributes.iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
            (&a.category, &a.id, &a.issuer).cmp(&(&b.category, &b.id, &b.issuer))
        });

        let mut hasher = DefaultHasher::new();
        self.return_policy_id_list.hash(&mut hasher);
        for (fqn, bag) in entries {
            fqn.category.hash(&mut hasher);
            fqn.id.hash(&mut hasher);
            fqn.issuer.hash(&mut hasher);
            bag.datatype().hash(&mut hasher);
            let mut values: Vec<&AttributeValue> = bag.iter().collect();
            values.sort_by(|a, b| a.canonical_lexical_form().cmp(&b.canonical_lexical_form()));
            for v in values {
                v.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

/// What the rest of the pipeline can actually do with a [`RawRequest`]'s
/// optional features — spec §4.J "Validates `ReturnPolicyIdList` (supported
/// iff tree is tracked) and `CombinedDecision` (supported iff the
/// post-processor declares combining support)."
#[derive(Debug, Clone, Copy)]
pub struct PreprocessorCapabilities {
    /// Whether the evaluation tree tracks applicable-policy ids at all.
    pub supports_return_policy_id_list: bool,
    /// Whether the configured result post-processor can combine multiple
    /// individual decisions into one (spec §4.K step 4).
    pub supports_combined_decision: bool,
}

/// Request preprocessing failures — surfaced as a single `Indeterminate`
/// `Result` with a syntax-error status (spec §8 scenario 5), never a panic.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// `ReturnPolicyIdList=true` but no capability to track it.
    #[error("ReturnPolicyIdList is not supported by this PDP")]
    UnsupportedReturnPolicyIdList,
    /// `CombinedDecision=true` but no capable result post-processor.
    #[error("CombinedDecision is not supported by this PDP")]
    UnsupportedCombinedDecision,
}

/// Split `request` into one or more [`IndividualDecisionRequest`]s.
pub fn preprocess(
    request: &RawRequest,
    capabilities: PreprocessorCapabilities,
) -> Result<Vec<IndividualDecisionRequest>, PreprocessError> {
    if request.return_policy_id_list && !capabilities.supports_return_policy_id_list {
        return Err(PreprocessError::UnsupportedReturnPolicyIdList);
    }
    if request.combined_decision && !capabilities.supports_combined_decision {
        return Err(PreprocessError::UnsupportedCombinedDecision);
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&RawCategory>> = HashMap::new();
    for category in &request.categories {
        groups.entry(category.category.clone()).or_insert_with(|| {
            order.push(category.category.clone());
            Vec::new()
        });
        groups.get_mut(&category.category).unwrap().push(category);
    }

    let mut combinations: Vec<Vec<&RawCategory>> = vec![Vec::new()];
    for category_uri in &order {
        let instances = &groups[category_uri];
        let mut expanded = Vec::with_capacity(combinations.len() * instances.len());
        for combo in &combinations {
            for instance in instances {
                let mut next = combo.clone();
                next.push(*instance);
                expanded.push(next);
            }
        }
        combinations = expanded;
    }

    let mut individual_requests = Vec::with_capacity(combinations.len());
    for combination in combinations {
        let mut named_attributes = HashMap::new();
        let mut extra_contents_by_category = HashMap::new();
        let mut included_in_result = Vec::new();
        for category in combination {
            if let Some(content) = &category.content {
                extra_contents_by_category.insert(category.category.clone(), content.clone());
            }
            for attribute in &category.attributes {
                let fqn = AttributeFqn::new(category.category.clone(), attribute.id.clone(), attribute.issuer.clone());
                named_attributes.insert(fqn.clone(), Bag::new(attribute.datatype, attribute.values.clone()));
                if attribute.include_in_result {
                    included_in_result.push(fqn);
                }
            }
        }
        individual_requests.push(IndividualDecisionRequest {
            named_attributes,
            extra_contents_by_category,
            return_policy_id_list: request.return_policy_id_list,
            included_in_result,
        });
    }
    Ok(individual_requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::value::category;

    fn subject_category(id: &str) -> RawCategory {
        RawCategory {
            category: category::SUBJECT.to_owned(),
            content: None,
            attributes: vec![RawAttribute {
                id: "subject-id".to_owned(),
                issuer: None,
                datatype: Datatype::String,
                values: vec![AttributeValue::String(id.to_owned())],
                include_in_result: false,
            }],
        }
    }

    fn permissive_capabilities() -> PreprocessorCapabilities {
        PreprocessorCapabilities {
            supports_return_policy_id_list: true,
            supports_combined_decision: true,
        }
    }

    #[test]
    fn single_category_request_produces_one_individual_request() {
        let request = RawRequest {
            categories: vec![subject_category("alice")],
            ..Default::default()
        };
        let individual = preprocess(&request, permissive_capabilities()).unwrap();
        assert_eq!(individual.len(), 1);
    }

    #[test]
    fn repeated_category_fans_out_into_cartesian_product() {
        let request = RawRequest {
            categories: vec![
                subject_category("alice"),
                subject_category("bob"),
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
            ..Default::default()
        };
        let individual = preprocess(&request, permissive_capabilities()).unwrap();
        assert_eq!(individual.len(), 2);
    }

    #[test]
    fn unsupported_return_policy_id_list_is_rejected() {
        let request = RawRequest {
            return_policy_id_list: true,
            ..Default::default()
        };
        let capabilities = PreprocessorCapabilities {
            supports_return_policy_id_list: false,
            supports_combined_decision: false,
        };
        assert!(matches!(
            preprocess(&request, capabilities),
            Err(PreprocessError::UnsupportedReturnPolicyIdList)
        ));
    }

    #[test]
    fn canonical_hash_is_independent_of_attribute_insertion_order() {
        let fqn_a = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let fqn_b = AttributeFqn::new(category::RESOURCE, "resource-id", None);

        let mut first = HashMap::new();
        first.insert(fqn_a.clone(), Bag::singleton(AttributeValue::String("alice".into())));
        first.insert(fqn_b.clone(), Bag::singleton(AttributeValue::String("doc1".into())));

        let mut second = HashMap::new();
        second.insert(fqn_b, Bag::singleton(AttributeValue::String("doc1".into())));
        second.insert(fqn_a, Bag::singleton(AttributeValue::String("alice".into())));

        let a = IndividualDecisionRequest {
            named_attributes: first,
            extra_contents_by_category: HashMap::new(),
            return_policy_id_list: false,
            included_in_result: Vec::new(),
        };
        let b = IndividualDecisionRequest {
            named_attributes: second,
            extra_contents_by_category: HashMap::new(),
            return_policy_id_list: false,
            included_in_result: Vec::new(),
        };
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }
}
