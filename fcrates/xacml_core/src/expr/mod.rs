//! I define the expression model: [`Expression`], designators, selectors,
//! variable references, and function applications, per spec §3 and §4.B.

use std::{fmt, sync::Arc};

use crate::{
    context::EvaluationContext,
    function::Function,
    status::processing_error_status,
    value::{AttributeFqn, AttributeValue, Bag, Datatype, ValueType},
};

/// The value an [`Expression`] evaluates to: either a single primitive value
/// or a bag, mirroring spec §4.B's `evaluate(ctx) → Value | Bag |
/// Indeterminate(status, cause)` contract (the `Indeterminate` arm is the
/// `Err` side of [`EvalResult`]).
#[derive(Debug, Clone)]
pub enum EvaluatedValue {
    /// A single primitive value.
    Single(AttributeValue),
    /// A bag of values.
    Bag(Bag),
}

impl EvaluatedValue {
    /// The [`ValueType`] of this evaluated value.
    pub fn value_type(&self) -> ValueType {
        match self {
            EvaluatedValue::Single(v) => ValueType::Primitive(v.datatype()),
            EvaluatedValue::Bag(b) => ValueType::Bag(b.datatype()),
        }
    }

    /// View as a single value, if this is not a bag.
    pub fn as_single(&self) -> Option<&AttributeValue> {
        match self {
            EvaluatedValue::Single(v) => Some(v),
            EvaluatedValue::Bag(_) => None,
        }
    }

    /// View as a bag, if this is a bag.
    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            EvaluatedValue::Bag(b) => Some(b),
            EvaluatedValue::Single(_) => None,
        }
    }

    /// Extract a boolean, if this is a single `xs:boolean` value.
    pub fn as_boolean(&self) -> Option<bool> {
        self.as_single().and_then(|v| v.as_boolean())
    }
}

impl From<AttributeValue> for EvaluatedValue {
    fn from(v: AttributeValue) -> Self {
        EvaluatedValue::Single(v)
    }
}

impl From<Bag> for EvaluatedValue {
    fn from(b: Bag) -> Self {
        EvaluatedValue::Bag(b)
    }
}

/// Result of evaluating an [`Expression`] or [`Function`] call: either a
/// value/bag, or an `Indeterminate` carrying its [`crate::status::XacmlStatus`].
pub type EvalResult = Result<EvaluatedValue, crate::status::XacmlStatus>;

/// `AttributeDesignator(fqn, datatype, mustBePresent)`, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDesignator {
    /// The fully-qualified attribute name to look up.
    pub fqn: AttributeFqn,
    /// The expected datatype of the resolved bag's elements.
    pub datatype: Datatype,
    /// Whether an empty resolution is an error (`Indeterminate`) or a
    /// legitimate empty bag.
    pub must_be_present: bool,
}

impl AttributeDesignator {
    /// A designator's evaluated type is always a bag of its declared datatype.
    pub fn value_type(&self) -> ValueType {
        ValueType::Bag(self.datatype)
    }

    /// Evaluate by delegating to the context's `resolveDesignator`, per
    /// spec §4.I.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> EvalResult {
        let bag = ctx.resolve_designator(&self.fqn, self.datatype, self.must_be_present)?;
        Ok(EvaluatedValue::Bag(bag))
    }
}

/// `AttributeSelector(category, xpath, datatype, mustBePresent,
/// contextSelector?)`, per spec §3.
///
/// XPath evaluation against request `Content` nodes is explicitly outside
/// this core (§1 "Explicitly out of scope": XML/JSON wire parsers); a
/// selector here always resolves through
/// [`EvaluationContext::resolve_selector`], which callers configure with
/// whatever XPath engine (or none, when `xPathEnabled = false` per §6) fits
/// their embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// The category of the `Content` node to select against.
    pub category: String,
    /// The XPath expression.
    pub xpath: String,
    /// The expected datatype of selected nodes' text content.
    pub datatype: Datatype,
    /// Whether an empty selection is an error.
    pub must_be_present: bool,
    /// Optional `contextSelectorId` narrowing which `Content`'s designator
    /// output picks the XPath's evaluation context node.
    pub context_selector_id: Option<String>,
}

impl AttributeSelector {
    /// A selector's evaluated type is always a bag of its declared datatype.
    pub fn value_type(&self) -> ValueType {
        ValueType::Bag(self.datatype)
    }

    /// Evaluate against the context's XPath-selectable content.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> EvalResult {
        let bag = ctx.resolve_selector(self)?;
        Ok(EvaluatedValue::Bag(bag))
    }
}

/// `VariableReference(id)`, per spec §3, resolved against the enclosing
/// policy's per-request-memoized `VariableDefinitions` (spec §4.G).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The `VariableId` being referenced.
    pub variable_id: String,
    /// The declared return type of the referenced `VariableDefinition`,
    /// known statically from policy parsing.
    pub value_type: ValueType,
}

impl VariableReference {
    /// Evaluate by delegating to the context's per-policy-scope variable
    /// memoization table.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> EvalResult {
        ctx.resolve_variable(&self.variable_id)
    }
}

/// `Apply(function, [arg])`: invocation of a named [`Function`] over
/// sub-expressions.
#[derive(Clone)]
pub struct Apply {
    /// The function being invoked.
    pub function: Arc<dyn Function>,
    /// Argument sub-expressions, in declaration order.
    pub args: Vec<Expression>,
    /// The function's declared return type, cached at construction for
    /// cheap access from [`Expression::value_type`].
    pub return_type: ValueType,
}

impl fmt::Debug for Apply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apply")
            .field("function", &self.function.id())
            .field("args", &self.args)
            .finish()
    }
}

impl Apply {
    /// Construct a new `Apply`, validating arity and argument types against
    /// the function's signature per spec §4.B "Function calls validate
    /// arity and argument datatypes at construction time."
    pub fn new(function: Arc<dyn Function>, args: Vec<Expression>) -> Result<Self, ApplyBuildError> {
        let params = function.param_types();
        let variadic = function.is_variadic();
        if args.len() < params.len() || (!variadic && args.len() > params.len()) {
            return Err(ApplyBuildError::ArityMismatch {
                function: function.id().to_owned(),
                expected: params.len(),
                variadic,
                found: args.len(),
            });
        }

        // Higher-order functions (any-of, all-of, map, ...) are generic over
        // their sub-function argument's own signature; they validate their
        // own argument shapes at call time instead of here.
        if !function.skip_static_arg_check() {
            for (i, arg) in args.iter().enumerate() {
                let expected = if i < params.len() {
                    params[i]
                } else {
                    // Variadic tail repeats the last declared parameter type.
                    *params.last().expect("variadic function must declare >=1 param type")
                };
                let found = arg.value_type();
                if found != expected {
                    return Err(ApplyBuildError::ArgTypeMismatch {
                        function: function.id().to_owned(),
                        index: i,
                        expected,
                        found,
                    });
                }
            }
        }

        let return_type = match args.first().and_then(|a| a.as_function()) {
            Some(sub_function) if function.skip_static_arg_check() => {
                function.higher_order_return_type(sub_function)
            }
            _ => function.return_type(),
        };
        Ok(Self {
            function,
            args,
            return_type,
        })
    }

    /// Invoke the function with these arguments against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> EvalResult {
        self.function.call(ctx, &self.args)
    }
}

/// Error building an [`Apply`]: arity or argument-type mismatch against the
/// function's declared signature. Load-time fatal per spec §7
/// ("unknown functions/datatypes are load-time fatal").
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApplyBuildError {
    /// Wrong number of arguments for the function's arity (accounting for
    /// variadic trailing parameters).
    #[error(
        "function {function:?} expects {}{} args, found {found}",
        expected,
        if *variadic { "+" } else { "" }
    )]
    ArityMismatch {
        /// The function id.
        function: String,
        /// The minimum (or exact, if not variadic) expected argument count.
        expected: usize,
        /// Whether trailing arguments beyond `expected` are permitted.
        variadic: bool,
        /// The argument count actually supplied.
        found: usize,
    },
    /// An argument's static return type doesn't match the function's
    /// declared parameter type at that position.
    #[error(
        "function {function:?} argument {index} expected type {expected}, found {found}"
    )]
    ArgTypeMismatch {
        /// The function id.
        function: String,
        /// The zero-based argument index.
        index: usize,
        /// The declared parameter type.
        expected: ValueType,
        /// The argument expression's actual static type.
        found: ValueType,
    },
}

/// Tagged variant of the XACML expression grammar, per spec §3.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal constant value.
    Constant(AttributeValue),
    /// A literal constant bag (used for e.g. pre-folded `Bag`/`Apply` results
    /// embedded as sub-expressions, and in tests).
    ConstantBag(Bag),
    /// `AttributeDesignator`.
    Designator(AttributeDesignator),
    /// `AttributeSelector`.
    Selector(AttributeSelector),
    /// `VariableReference`.
    VariableReference(VariableReference),
    /// `Apply`.
    Apply(Box<Apply>),
    /// `Function`: a bare reference to a function, used as the sub-function
    /// argument of a higher-order function (`any-of`, `map`, ...).
    Function(Arc<dyn Function>),
}

impl Expression {
    /// The declared return type of this expression.
    pub fn value_type(&self) -> ValueType {
        match self {
            Expression::Constant(v) => ValueType::Primitive(v.datatype()),
            Expression::ConstantBag(b) => ValueType::Bag(b.datatype()),
            Expression::Designator(d) => d.value_type(),
            Expression::Selector(s) => s.value_type(),
            Expression::VariableReference(v) => v.value_type,
            Expression::Apply(a) => a.return_type,
            // A bare function reference is never evaluated directly (callers
            // destructure it via `as_function`); report the wrapped
            // function's own return type for uniformity with `Apply`.
            Expression::Function(f) => f.return_type(),
        }
    }

    /// View this expression as a function reference, for the first argument
    /// position of higher-order functions.
    pub fn as_function(&self) -> Option<&Arc<dyn Function>> {
        match self {
            Expression::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Evaluate this expression against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> EvalResult {
        match self {
            Expression::Constant(v) => Ok(EvaluatedValue::Single(v.clone())),
            Expression::ConstantBag(b) => Ok(EvaluatedValue::Bag(b.clone())),
            Expression::Designator(d) => d.evaluate(ctx),
            Expression::Selector(s) => s.evaluate(ctx),
            Expression::VariableReference(v) => v.evaluate(ctx),
            Expression::Apply(a) => a.evaluate(ctx),
            Expression::Function(_) => Err(processing_error_status(
                "a bare Function expression cannot be evaluated directly; it must be passed as the sub-function argument of a higher-order function",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::library::string::StringEqualFunction;

    #[test]
    fn apply_rejects_arity_mismatch() {
        let f: Arc<dyn Function> = Arc::new(StringEqualFunction);
        let args = vec![Expression::Constant(AttributeValue::String("a".into()))];
        assert!(matches!(
            Apply::new(f, args),
            Err(ApplyBuildError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn apply_rejects_type_mismatch() {
        let f: Arc<dyn Function> = Arc::new(StringEqualFunction);
        let args = vec![
            Expression::Constant(AttributeValue::String("a".into())),
            Expression::Constant(AttributeValue::Integer(1)),
        ];
        assert!(matches!(
            Apply::new(f, args),
            Err(ApplyBuildError::ArgTypeMismatch { .. })
        ));
    }
}
