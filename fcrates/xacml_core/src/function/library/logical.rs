//! Logical short-circuit functions (`or`, `and`, `n-of`, `not`), per spec
//! §4.B "Lazy" and the "Short-circuit soundness" testable property (§8).

use std::sync::Arc;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Datatype, ValueType},
};

fn eval_bool(ctx: &mut EvaluationContext, expr: &Expression, fn_id: &str) -> Result<bool, crate::status::XacmlStatus> {
    let v = expr.evaluate(ctx)?;
    v.as_boolean()
        .ok_or_else(|| crate::status::processing_error_status(format!("{fn_id}: argument must be a boolean")))
}

/// `urn:oasis:names:tc:xacml:1.0:function:or`, variadic.
///
/// Per spec §4.B: "returns Permit/True as soon as one arg is true; returns
/// Indeterminate only if no True seen AND at least one Indeterminate; else
/// false."
#[derive(Debug, Clone, Copy)]
pub struct OrFunction;

impl Function for OrFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:or"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::Boolean)];
        &P
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let mut saw_indeterminate = None;
        for arg in args {
            match eval_bool(ctx, arg, self.id()) {
                Ok(true) => return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true))),
                Ok(false) => {}
                Err(e) => saw_indeterminate.get_or_insert(e),
            }
        }
        match saw_indeterminate {
            Some(e) => Err(e),
            None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
        }
    }
}

/// `urn:oasis:names:tc:xacml:1.0:function:and`, variadic. Symmetric to
/// [`OrFunction`]: short-circuits to `false` on the first `false` argument.
#[derive(Debug, Clone, Copy)]
pub struct AndFunction;

impl Function for AndFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:and"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::Boolean)];
        &P
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let mut saw_indeterminate = None;
        for arg in args {
            match eval_bool(ctx, arg, self.id()) {
                Ok(false) => return Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
                Ok(true) => {}
                Err(e) => saw_indeterminate.get_or_insert(e),
            }
        }
        match saw_indeterminate {
            Some(e) => Err(e),
            None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(true))),
        }
    }
}

/// `urn:oasis:names:tc:xacml:1.0:function:not`.
#[derive(Debug, Clone, Copy)]
pub struct NotFunction;

impl Function for NotFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:not"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::Boolean)];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let b = eval_bool(ctx, &args[0], self.id())?;
        Ok(EvaluatedValue::Single(AttributeValue::Boolean(!b)))
    }
}

/// `urn:oasis:names:tc:xacml:1.0:function:n-of`.
///
/// First argument is the integer `n`; remaining are booleans. Per spec
/// §4.B: "returns true when ≥n trues; false when trues + unknowns < n;
/// Indeterminate only if remaining unknowns could tip the count
/// (short-circuit accordingly)."
#[derive(Debug, Clone, Copy)]
pub struct NOfFunction;

impl Function for NOfFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:n-of"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 2] = [
            ValueType::Primitive(Datatype::Integer),
            ValueType::Primitive(Datatype::Boolean),
        ];
        &P
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let n_val = args[0].evaluate(ctx)?;
        let Some(AttributeValue::Integer(n)) = n_val.as_single() else {
            return Err(crate::status::processing_error_status(
                "n-of: first argument must be an integer",
            ));
        };
        let n = *n;
        if n <= 0 {
            return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true)));
        }
        let remaining_args = &args[1..];
        let mut trues: i64 = 0;
        let mut unresolved_remaining = remaining_args.len() as i64;
        let mut saw_indeterminate = None;
        for arg in remaining_args {
            unresolved_remaining -= 1;
            match eval_bool(ctx, arg, self.id()) {
                Ok(true) => {
                    trues += 1;
                    if trues >= n {
                        return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true)));
                    }
                }
                Ok(false) => {
                    if trues + unresolved_remaining < n {
                        // Even if every remaining arg were true, n could not
                        // be reached.
                        return Ok(EvaluatedValue::Single(AttributeValue::Boolean(false)));
                    }
                }
                Err(e) => {
                    saw_indeterminate.get_or_insert(e);
                }
            }
        }
        match saw_indeterminate {
            Some(e) if trues < n => Err(e),
            _ => Ok(EvaluatedValue::Single(AttributeValue::Boolean(trues >= n))),
        }
    }
}

/// All standard logical functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(OrFunction),
        Arc::new(AndFunction),
        Arc::new(NotFunction),
        Arc::new(NOfFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    fn bool_expr(b: bool) -> Expression {
        Expression::Constant(AttributeValue::Boolean(b))
    }

    #[test]
    fn or_short_circuits_true() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![bool_expr(true)];
        let r = OrFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }

    #[test]
    fn and_short_circuits_false() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![bool_expr(false)];
        let r = AndFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(false));
    }

    #[test]
    fn n_of_returns_true_as_soon_as_k_seen() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::Integer(2)),
            bool_expr(true),
            bool_expr(true),
            bool_expr(false),
        ];
        let r = NOfFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }

    #[test]
    fn n_of_short_circuits_false_when_unreachable() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::Integer(3)),
            bool_expr(false),
            bool_expr(false),
        ];
        let r = NOfFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(false));
    }
}
