//! Attribute provider registry, per spec §4.M.
//!
//! Dispatches designator lookups to registered Policy Information Points
//! (PIPs) by `(category, attribute id)`. Providers are consulted by
//! [`xacml_core::context::EvaluationContext`] in registration order; this
//! registry's job is purely to compute that order at init time so a
//! provider's own attribute dependencies are always satisfied by a provider
//! registered ahead of it, and to reject a dependency cycle up front rather
//! than let it surface as a runtime designator-resolution failure.

use std::{collections::HashSet, sync::Arc};

use thiserror::Error;
use xacml_core::context::AttributeProvider;

/// Failures in building an [`AttributeProviderRegistry`] — load-time fatal,
/// per spec §7 "Policy-reference cycles/overflows, unknown functions/
/// datatypes are load-time fatal" (the analogous rule for provider wiring).
#[derive(Debug, Error)]
pub enum ProviderRegistrationError {
    /// Two providers declared the same `(category, attribute id)` in their
    /// `provided_attributes()`, and registration order could not
    /// disambiguate them because both also depend on the other.
    #[error(
        "cyclic attribute provider dependency: providers {0:?} and {1:?} each require an \
         attribute the other provides"
    )]
    Cycle(String, String),
}

/// Registry of [`AttributeProvider`]s, consulted by
/// [`xacml_core::context::EvaluationContext`] in the order this registry
/// settles on at construction time.
///
/// Per spec §4.M: "Each provider declares its `providedAttributes` ...
/// Dependency graph between providers ... is resolved at init; cycles
/// rejected." The ordering is a topological sort of the "provider B needs an
/// attribute served by provider A" relation, falling back to the
/// caller-supplied registration order among providers with no relative
/// dependency.
#[derive(Debug)]
pub struct AttributeProviderRegistry {
    ordered: Vec<Arc<dyn AttributeProvider>>,
}

impl AttributeProviderRegistry {
    /// Build a registry from `providers`, resolving their dependency order.
    pub fn new(
        providers: Vec<Arc<dyn AttributeProvider>>,
    ) -> Result<Self, ProviderRegistrationError> {
        let ordered = topological_order(&providers)?;
        Ok(Self { ordered })
    }

    /// The providers in their resolved dependency order, as consumed by
    /// [`xacml_core::context::EvaluationContext::new`].
    pub fn ordered_providers(&self) -> Vec<Arc<dyn AttributeProvider>> {
        self.ordered.clone()
    }
}

/// Index `providers` by which `(category, id)` pairs each one provides, then
/// Kahn's-algorithm topologically sort on the "requires an attribute
/// provided by" edges, breaking ties by original registration order so the
/// result is deterministic when there is no dependency between two
/// providers.
fn topological_order(
    providers: &[Arc<dyn AttributeProvider>],
) -> Result<Vec<Arc<dyn AttributeProvider>>, ProviderRegistrationError> {
    let provided_by: Vec<HashSet<(String, String)>> = providers
        .iter()
        .map(|p| p.provided_attributes().iter().cloned().collect())
        .collect();

    // edges[i] = set of provider indices that provider i depends on.
    let mut edges: Vec<HashSet<usize>> = vec![HashSet::new(); providers.len()];
    for (i, provider) in providers.iter().enumerate() {
        for required in provider.required_attributes() {
            for (j, provided) in provided_by.iter().enumerate() {
                if i != j && provided.contains(required) {
                    edges[i].insert(j);
                }
            }
        }
    }

    let mut placed = vec![false; providers.len()];
    let mut ordered = Vec::with_capacity(providers.len());
    for _ in 0..providers.len() {
        let next = (0..providers.len()).find(|&i| {
            !placed[i] && edges[i].iter().all(|&dep| placed[dep])
        });
        match next {
            Some(i) => {
                placed[i] = true;
                ordered.push(Arc::clone(&providers[i]));
            }
            None => {
                let (a, b) = first_unplaced_cycle_pair(&edges, &placed);
                return Err(ProviderRegistrationError::Cycle(
                    providers[a].id().to_owned(),
                    providers[b].id().to_owned(),
                ));
            }
        }
    }
    Ok(ordered)
}

fn first_unplaced_cycle_pair(edges: &[HashSet<usize>], placed: &[bool]) -> (usize, usize) {
    for (i, deps) in edges.iter().enumerate() {
        if placed[i] {
            continue;
        }
        for &j in deps {
            if !placed[j] {
                return (i, j);
            }
        }
    }
    (0, 0)
}
