//! I define [`EvaluationContext`]: per-evaluation attribute lookup, selector
//! resolution, Variable memoization, and deadline checking, per spec §4.I.

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::Instant,
};

use crate::{
    expr::{AttributeDesignator, AttributeSelector, EvalResult, EvaluatedValue, Expression},
    status::{missing_attribute_status, processing_error_status},
    value::{AttributeFqn, AttributeValue, Bag, Datatype},
};

/// A source of attribute values not present in the request itself — a
/// Policy Information Point, per spec §4.M.
///
/// Per §5 "Concurrency & resource model": evaluation is purely synchronous
/// with no internal suspension points, so providers are plain blocking trait
/// objects; an embedder wanting async I/O blocks on its own runtime at this
/// boundary.
pub trait AttributeProvider: fmt::Debug + Send + Sync {
    /// A human-readable id for diagnostics (registered providers are looked
    /// up by position, not by this id).
    fn id(&self) -> &str;

    /// The set of `(category, attribute id)` designators this provider can
    /// resolve, used by the attribute provider registry
    /// (`xacml_pdp::providers`) to build the init-time dependency graph
    /// between providers.
    fn provided_attributes(&self) -> &[(String, String)];

    /// The set of `(category, attribute id)` designators this provider
    /// itself consults (e.g. via [`crate::context::EvaluationContext::resolve_designator`])
    /// while resolving one of its own `provided_attributes`. Used by the
    /// registry to order providers so a dependency is always registered
    /// before its dependents, and to reject cyclic dependencies at init
    /// (spec §4.M "Dependency graph between providers ... is resolved at
    /// init; cycles rejected.").
    ///
    /// Defaults to none: most providers resolve attributes independently of
    /// other providers.
    fn required_attributes(&self) -> &[(String, String)] {
        &[]
    }

    /// Attempt to resolve `fqn`. Returns `Ok(None)` when this provider has
    /// no opinion (the registry then tries the next provider); `Ok(Some(bag))`
    /// on a successful (possibly empty) resolution; `Err` on a hard failure.
    fn resolve(&self, fqn: &AttributeFqn, datatype: Datatype) -> Result<Option<Bag>, crate::status::XacmlStatus>;
}

/// Evaluates an [`AttributeSelector`]'s XPath expression against a category's
/// `Content` node.
///
/// Per spec §1 "Explicitly out of scope": XML/JSON wire parsers and XPath
/// engines are external collaborators. When `xPathEnabled=false` (§6), no
/// evaluator is configured and every selector resolves to
/// `Indeterminate(processing-error)`.
pub trait XPathEvaluator: fmt::Debug + Send + Sync {
    /// Evaluate `xpath` against `content`, returning the lexical text of
    /// each matched node for [`crate::value::parse_value`] to parse into
    /// `datatype`.
    fn select(&self, content: &str, xpath: &str, datatype: Datatype) -> Result<Vec<String>, crate::status::XacmlStatus>;
}

/// A per-policy-scope table of `VariableDefinition` expressions plus their
/// per-request memoization cache, per spec §4.G "VariableDefinitions:
/// per-policy, per-request memoized."
#[derive(Debug, Default)]
struct VariableScope {
    definitions: Arc<HashMap<String, Expression>>,
    cache: HashMap<String, EvaluatedValue>,
}

/// Configuration knobs consulted during evaluation (the runtime-relevant
/// subset of `xacml_pdp::config::PdpConfig`, per spec §6).
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// Whether a designator with no issuer matches only stored attributes
    /// that also have no issuer (`true`), or relaxes per XACML §5.29
    /// (`false`).
    pub strict_attribute_issuer_match: bool,
    /// Whether [`AttributeSelector`] resolution is permitted at all.
    pub xpath_enabled: bool,
    /// The maximum depth of nested `PolicyIdReference`/`PolicySetIdReference`
    /// resolution permitted along one evaluation path, per spec §4.H /
    /// §6 `maxPolicyReferenceDepth`.
    pub max_policy_reference_depth: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            strict_attribute_issuer_match: false,
            xpath_enabled: false,
            max_policy_reference_depth: 10,
        }
    }
}

/// Per-evaluation state: request-supplied attributes, PDP-issued environment
/// attributes, registered attribute providers, and memoization caches, per
/// spec §4.I.
///
/// Confined to exactly one individual-decision evaluation (§5 "The
/// EvaluationContext is confined to one evaluation").
pub struct EvaluationContext {
    named_attributes: HashMap<AttributeFqn, Bag>,
    extra_contents_by_category: HashMap<String, String>,
    designator_cache: HashMap<(AttributeFqn, Datatype), Bag>,
    providers: Vec<Arc<dyn AttributeProvider>>,
    xpath_evaluator: Option<Arc<dyn XPathEvaluator>>,
    variable_scopes: Vec<VariableScope>,
    config: ContextConfig,
    deadline: Option<Instant>,
    reference_path: Vec<crate::resolver::PolicyReference>,
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("named_attributes_count", &self.named_attributes.len())
            .field("providers_count", &self.providers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl EvaluationContext {
    /// Build a fresh context for one individual-decision evaluation.
    ///
    /// `named_attributes` should already include the PDP-issued
    /// `current-time`/`current-date`/`current-dateTime` snapshot (§4.I: "all
    /// derived from a single snapshot taken at request entry"); building
    /// that snapshot is `xacml_pdp::engine`'s responsibility, not this
    /// constructor's.
    pub fn new(
        named_attributes: HashMap<AttributeFqn, Bag>,
        extra_contents_by_category: HashMap<String, String>,
        providers: Vec<Arc<dyn AttributeProvider>>,
        xpath_evaluator: Option<Arc<dyn XPathEvaluator>>,
        config: ContextConfig,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            named_attributes,
            extra_contents_by_category,
            designator_cache: HashMap::new(),
            providers,
            xpath_evaluator,
            variable_scopes: Vec::new(),
            config,
            deadline,
            reference_path: Vec::new(),
        }
    }

    /// A minimal context suitable for unit-testing functions and
    /// expressions in isolation: no request attributes, no providers,
    /// permissive defaults, no deadline.
    pub fn for_testing() -> Self {
        Self::new(
            HashMap::new(),
            HashMap::new(),
            Vec::new(),
            None,
            ContextConfig::default(),
            None,
        )
    }

    /// Seed a request-supplied (or test-supplied) attribute directly,
    /// bypassing providers. Mainly useful for `for_testing()` contexts.
    pub fn with_named_attribute(mut self, fqn: AttributeFqn, bag: Bag) -> Self {
        self.named_attributes.insert(fqn, bag);
        self
    }

    /// Resolve an [`AttributeDesignator`] per §4.I's four-step algorithm.
    pub fn resolve_designator(
        &mut self,
        fqn: &AttributeFqn,
        datatype: Datatype,
        must_be_present: bool,
    ) -> Result<Bag, crate::status::XacmlStatus> {
        self.check_deadline()?;

        let cache_key = (fqn.clone(), datatype);
        if let Some(bag) = self.designator_cache.get(&cache_key) {
            return Ok(bag.clone());
        }

        if let Some((stored_fqn, bag)) = self
            .named_attributes
            .iter()
            .find(|(stored, _)| fqn.matches(stored, self.config.strict_attribute_issuer_match))
        {
            if bag.datatype() != datatype {
                return Err(processing_error_status(format!(
                    "attribute {stored_fqn} resolved with datatype {} but designator expects {datatype}",
                    bag.datatype()
                )));
            }
            let bag = bag.clone();
            self.designator_cache.insert(cache_key, bag.clone());
            return Ok(bag);
        }

        for provider in self.providers.clone() {
            match provider.resolve(fqn, datatype) {
                Ok(Some(bag)) if !bag.is_empty() => {
                    self.designator_cache.insert(cache_key, bag.clone());
                    return Ok(bag);
                }
                Ok(_) => continue,
                Err(status) => {
                    if must_be_present {
                        return Err(status);
                    }
                    let bag = Bag::empty_with_cause(datatype, status);
                    self.designator_cache.insert(cache_key, bag.clone());
                    return Ok(bag);
                }
            }
        }

        if must_be_present {
            let designator = AttributeDesignator {
                fqn: fqn.clone(),
                datatype,
                must_be_present,
            };
            return Err(missing_attribute_status(designator));
        }
        let bag = Bag::empty(datatype);
        self.designator_cache.insert(cache_key, bag.clone());
        Ok(bag)
    }

    /// Resolve an [`AttributeSelector`] against this context's `Content`
    /// nodes, delegating XPath evaluation to the configured
    /// [`XPathEvaluator`].
    pub fn resolve_selector(&mut self, selector: &AttributeSelector) -> Result<Bag, crate::status::XacmlStatus> {
        self.check_deadline()?;

        if !self.config.xpath_enabled {
            if selector.must_be_present {
                return Err(processing_error_status(
                    "xPathEnabled=false: AttributeSelector cannot be resolved",
                ));
            }
            return Ok(Bag::empty(selector.datatype));
        }
        let Some(evaluator) = &self.xpath_evaluator else {
            return Err(processing_error_status(
                "xPathEnabled=true but no XPathEvaluator is configured",
            ));
        };
        let Some(content) = self.extra_contents_by_category.get(&selector.category) else {
            return if selector.must_be_present {
                Err(processing_error_status(format!(
                    "no Content node for category {}",
                    selector.category
                )))
            } else {
                Ok(Bag::empty(selector.datatype))
            };
        };
        let texts = evaluator.select(content, &selector.xpath, selector.datatype)?;
        if texts.is_empty() {
            return if selector.must_be_present {
                Err(missing_attribute_status(AttributeDesignator {
                    fqn: AttributeFqn::new(selector.category.clone(), selector.xpath.clone(), None),
                    datatype: selector.datatype,
                    must_be_present: true,
                }))
            } else {
                Ok(Bag::empty(selector.datatype))
            };
        }
        let mut values = Vec::with_capacity(texts.len());
        for text in texts {
            let value = crate::value::parse_value(selector.datatype, &text)
                .map_err(|e| processing_error_status(e.to_string()))?;
            values.push(value);
        }
        Ok(Bag::new(selector.datatype, values))
    }

    /// Push a new per-policy Variable scope with the given definitions.
    /// Every `Policy`/`PolicySet` evaluation that declares `VariableDefinition`s
    /// must push a scope on entry and [`Self::pop_variable_scope`] on exit.
    pub fn push_variable_scope(&mut self, definitions: Arc<HashMap<String, Expression>>) {
        self.variable_scopes.push(VariableScope {
            definitions,
            cache: HashMap::new(),
        });
    }

    /// Pop the innermost Variable scope.
    pub fn pop_variable_scope(&mut self) {
        self.variable_scopes.pop();
    }

    /// Resolve a `VariableReference` against the innermost enclosing scope
    /// that declares it, memoizing the result for the remainder of this
    /// evaluation.
    pub fn resolve_variable(&mut self, variable_id: &str) -> EvalResult {
        self.check_deadline()?;

        for depth in (0..self.variable_scopes.len()).rev() {
            if let Some(value) = self.variable_scopes[depth].cache.get(variable_id) {
                return Ok(value.clone());
            }
            if let Some(expr) = self.variable_scopes[depth].definitions.get(variable_id).cloned() {
                let value = expr.evaluate(self)?;
                self.variable_scopes[depth]
                    .cache
                    .insert(variable_id.to_owned(), value.clone());
                return Ok(value);
            }
        }
        Err(processing_error_status(format!(
            "VariableReference {variable_id:?} is not declared in any enclosing scope"
        )))
    }

    /// Enter resolution of a nested `PolicyIdReference`/`PolicySetIdReference`
    /// encountered while evaluating a [`crate::policyset::PolicySet`]'s
    /// children, per spec §4.H: rejects a reference chain deeper than
    /// `max_policy_reference_depth`, and rejects revisiting a reference
    /// already on the current path (a cycle). Must be paired with
    /// [`Self::exit_policy_reference`] on every exit path, including early
    /// returns.
    pub fn enter_policy_reference(
        &mut self,
        reference: crate::resolver::PolicyReference,
    ) -> Result<(), crate::status::XacmlStatus> {
        if self.reference_path.len() >= self.config.max_policy_reference_depth {
            return Err(processing_error_status(format!(
                "policy reference depth {} exceeds configured maximum {}",
                self.reference_path.len() + 1,
                self.config.max_policy_reference_depth
            )));
        }
        if self.reference_path.contains(&reference) {
            return Err(processing_error_status(format!(
                "cyclic policy reference: {reference:?}"
            )));
        }
        self.reference_path.push(reference);
        Ok(())
    }

    /// Leave the innermost nested policy reference entered via
    /// [`Self::enter_policy_reference`].
    pub fn exit_policy_reference(&mut self) {
        self.reference_path.pop();
    }

    /// Error out with `Indeterminate(processing-error)` if the caller-supplied
    /// deadline (§5 "Cancellation/timeout") has passed.
    pub fn check_deadline(&self) -> Result<(), crate::status::XacmlStatus> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                Err(processing_error_status("deadline exceeded"))
            }
            _ => Ok(()),
        }
    }

    /// The context's configuration.
    pub fn config(&self) -> ContextConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::category;

    #[test]
    fn resolve_designator_returns_named_attribute() {
        let fqn = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let mut ctx = EvaluationContext::for_testing()
            .with_named_attribute(fqn.clone(), Bag::singleton(AttributeValue::String("alice".into())));
        let bag = ctx.resolve_designator(&fqn, Datatype::String, true).unwrap();
        assert_eq!(bag.size(), 1);
    }

    #[test]
    fn resolve_designator_missing_and_required_is_indeterminate() {
        let fqn = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let mut ctx = EvaluationContext::for_testing();
        assert!(ctx.resolve_designator(&fqn, Datatype::String, true).is_err());
    }

    #[test]
    fn resolve_designator_missing_and_optional_is_empty_bag() {
        let fqn = AttributeFqn::new(category::SUBJECT, "subject-id", None);
        let mut ctx = EvaluationContext::for_testing();
        let bag = ctx.resolve_designator(&fqn, Datatype::String, false).unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn variable_reference_memoizes_across_lookups() {
        let mut defs = HashMap::new();
        defs.insert(
            "v1".to_owned(),
            Expression::Constant(AttributeValue::Integer(42)),
        );
        let mut ctx = EvaluationContext::for_testing();
        ctx.push_variable_scope(Arc::new(defs));
        let a = ctx.resolve_variable("v1").unwrap();
        let b = ctx.resolve_variable("v1").unwrap();
        assert_eq!(a.as_single(), b.as_single());
    }
}
