//! I define the [`Function`] trait and the standard function library/
//! registry, per spec §3 "Function" and §4.B.
//!
//! A call is either **eager** (the function evaluates all its arguments to
//! values up front) or **lazy/short-circuit** (logical `or`/`and`/`n-of` and
//! the higher-order functions, which evaluate arguments only as needed).
//! Both shapes are expressed uniformly as `fn call(&self, ctx, args: &[Expression])`
//! so a lazy function can choose not to evaluate every argument — collapsing
//! the source's four-way eager-call specialization (spec §9 "Eager-call
//! specialization") into one generic dispatch path, which the design note
//! explicitly allows ("a typed-per-shape path is an optimization, not a
//! contract").

pub mod library;

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, Expression},
    value::ValueType,
};

/// A named, statically-typed XACML function.
pub trait Function: Debug + Send + Sync {
    /// The function's identifier URI.
    fn id(&self) -> &str;

    /// The declared parameter types. For a variadic function this is the
    /// minimal fixed prefix; [`Function::is_variadic`] says whether trailing
    /// arguments (repeating the final declared type) are accepted.
    fn param_types(&self) -> &[ValueType];

    /// Whether this function accepts a variadic trailing tail beyond
    /// `param_types()`.
    fn is_variadic(&self) -> bool {
        false
    }

    /// The function's declared return type.
    fn return_type(&self) -> ValueType;

    /// Invoke the function. Implementations evaluate `args` against `ctx`
    /// themselves (eagerly or lazily) using `Expression::evaluate`.
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult;

    /// Whether [`crate::expr::Apply::new`] should skip its static
    /// argument-type check for this function.
    ///
    /// The higher-order functions (`any-of`, `all-of`, `map`, ...) are
    /// generic over whatever datatype their sub-function argument operates
    /// on — there is no single fixed [`ValueType`] signature to check
    /// statically the way there is for first-order functions. Those
    /// implementations return `true` here and validate argument shapes
    /// themselves at call time instead.
    fn skip_static_arg_check(&self) -> bool {
        false
    }

    /// For a higher-order function whose return type depends on its
    /// sub-function argument (namely `map`, whose result bag's datatype is
    /// the sub-function's return datatype), compute the effective return
    /// type given the resolved sub-function. Defaults to
    /// [`Function::return_type`] for every other function.
    fn higher_order_return_type(&self, _sub_function: &Arc<dyn Function>) -> ValueType {
        self.return_type()
    }
}

/// An immutable, process-wide registry of standard (and, when an embedder
/// registers extensions, custom) functions keyed by id URI.
///
/// Per spec §9 "Global state: the engine keeps none. The only process-wide
/// thing is an optional extension registry populated at init and frozen
/// before any `evaluate` call" — a [`FunctionRegistry`] is built once at
/// bootstrap (see `xacml_pdp::config`) and then shared read-only via `Arc`.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: Arc<HashMap<String, Arc<dyn Function>>>,
}

impl FunctionRegistry {
    /// An empty registry with no functions registered.
    pub fn empty() -> Self {
        Self {
            functions: Arc::new(HashMap::new()),
        }
    }

    /// The standard registry, populated with every function in
    /// [`library`].
    pub fn standard() -> Self {
        let mut functions: HashMap<String, Arc<dyn Function>> = HashMap::new();
        for f in library::standard_functions() {
            functions.insert(f.id().to_owned(), f);
        }
        Self {
            functions: Arc::new(functions),
        }
    }

    /// Look up a function by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(id).cloned()
    }

    /// Register (or override) a function, returning a new registry —
    /// extension registries are built up immutably before being frozen.
    pub fn with_function(mut self, function: Arc<dyn Function>) -> Self {
        Arc::make_mut(&mut self.functions).insert(function.id().to_owned(), function);
        self
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry has no registered functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
