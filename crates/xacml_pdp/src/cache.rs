//! Decision cache, per spec §4.L.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use xacml_core::combining::DecisionResult;

use crate::request::IndividualDecisionRequest;

/// A cache of [`IndividualDecisionRequest`] → [`DecisionResult`] pairs,
/// consulted by [`crate::engine::Pdp::evaluate`] before running the
/// evaluation engine.
///
/// Implementations must never serve stale results for a changed policy set —
/// invalidate on policy reload (spec §4.L).
pub trait DecisionCache: std::fmt::Debug + Send + Sync {
    /// Batch-lookup. MUST return a result of the same length as `requests`,
    /// in the same order; `None` at a position signals a miss.
    fn get_all(&self, requests: &[IndividualDecisionRequest]) -> Vec<Option<DecisionResult>>;

    /// Batch-store newly computed results.
    fn put_all(&self, entries: Vec<(IndividualDecisionRequest, DecisionResult)>);

    /// Release any held resources. Cascaded into from [`crate::engine::Pdp::close`].
    fn close(&self);

    /// Drop every cached entry — called on policy reload so a changed
    /// policy set can never serve a stale cached decision.
    fn invalidate_all(&self);
}

/// An unbounded, in-memory [`DecisionCache`] keyed by a canonical hash of
/// the request's (category, attributeFqn, datatype, values) tuples (spec §9
/// "Decision cache key").
///
/// No TTL/size eviction is implemented — size/TTL bounding is
/// implementation-defined per spec and is a reasonable next extension point,
/// not a contract this type must satisfy.
#[derive(Debug, Default)]
pub struct InMemoryDecisionCache {
    entries: RwLock<HashMap<u64, DecisionResult>>,
}

impl InMemoryDecisionCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn key_for(request: &IndividualDecisionRequest) -> u64 {
        request.canonical_hash()
    }
}

impl DecisionCache for InMemoryDecisionCache {
    #[tracing::instrument(skip_all)]
    fn get_all(&self, requests: &[IndividualDecisionRequest]) -> Vec<Option<DecisionResult>> {
        let entries = self.entries.read().expect("decision cache lock poisoned");
        requests
            .iter()
            .map(|r| entries.get(&Self::key_for(r)).cloned())
            .collect()
    }

    #[tracing::instrument(skip_all)]
    fn put_all(&self, new_entries: Vec<(IndividualDecisionRequest, DecisionResult)>) {
        let mut entries = self.entries.write().expect("decision cache lock poisoned");
        for (request, result) in new_entries {
            entries.insert(Self::key_for(&request), result);
        }
    }

    fn close(&self) {
        self.invalidate_all();
    }

    fn invalidate_all(&self) {
        self.entries.write().expect("decision cache lock poisoned").clear();
    }
}

/// A no-op cache — every lookup misses, every store is discarded. Used when
/// no cache is configured (spec §4.K step 3 "If decision cache present").
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDecisionCache;

impl DecisionCache for NoDecisionCache {
    fn get_all(&self, requests: &[IndividualDecisionRequest]) -> Vec<Option<DecisionResult>> {
        vec![None; requests.len()]
    }

    fn put_all(&self, _entries: Vec<(IndividualDecisionRequest, DecisionResult)>) {}

    fn close(&self) {}

    fn invalidate_all(&self) {}
}

/// A convenience constructor for a shared, thread-safe in-memory cache.
pub fn in_memory() -> Arc<dyn DecisionCache> {
    Arc::new(InMemoryDecisionCache::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use xacml_core::value::AttributeFqn;

    fn request_with(subject: &str) -> IndividualDecisionRequest {
        let mut named_attributes = StdHashMap::new();
        named_attributes.insert(
            AttributeFqn::new(xacml_core::value::category::SUBJECT, "subject-id", None),
            xacml_core::value::Bag::singleton(xacml_core::value::AttributeValue::String(subject.to_owned())),
        );
        IndividualDecisionRequest {
            named_attributes,
            extra_contents_by_category: StdHashMap::new(),
            return_policy_id_list: false,
            included_in_result: Vec::new(),
        }
    }

    #[test]
    fn miss_then_hit_after_put() {
        let cache = InMemoryDecisionCache::new();
        let req = request_with("alice");
        let misses = cache.get_all(&[req.clone()]);
        assert_eq!(misses.len(), 1);
        assert!(misses[0].is_none());

        cache.put_all(vec![(req.clone(), DecisionResult::permit())]);
        let hits = cache.get_all(&[req]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].as_ref().unwrap().decision, xacml_core::combining::Decision::Permit);
    }

    #[test]
    fn invalidate_all_clears_entries() {
        let cache = InMemoryDecisionCache::new();
        let req = request_with("alice");
        cache.put_all(vec![(req.clone(), DecisionResult::permit())]);
        cache.invalidate_all();
        let hits = cache.get_all(&[req]);
        assert!(hits[0].is_none());
    }

    #[test]
    fn no_decision_cache_always_misses() {
        let cache = NoDecisionCache;
        let req = request_with("alice");
        cache.put_all(vec![(req.clone(), DecisionResult::permit())]);
        let hits = cache.get_all(&[req]);
        assert!(hits[0].is_none());
    }
}
