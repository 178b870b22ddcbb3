//! Higher-order functions (`any-of`, `all-of`, `map`, `any-of-any`,
//! `all-of-any`, `any-of-all`, `all-of-all`), per spec §4.B: "take a
//! sub-function reference plus bags; semantics follow XACML §A.3.15."

use std::sync::Arc;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Bag, Datatype, ValueType},
};

use super::const_expr;

fn sub_function(args: &[Expression], fn_id: &str) -> Result<Arc<dyn Function>, crate::status::XacmlStatus> {
    args.first()
        .and_then(|a| a.as_function())
        .cloned()
        .ok_or_else(|| crate::status::processing_error_status(format!("{fn_id}: first argument must be a function reference")))
}

fn invoke_predicate(
    ctx: &mut EvaluationContext,
    sub: &Arc<dyn Function>,
    a: &AttributeValue,
    b: &AttributeValue,
) -> Result<bool, crate::status::XacmlStatus> {
    let args = [const_expr(a.clone()), const_expr(b.clone())];
    let result = sub.call(ctx, &args)?;
    result
        .as_boolean()
        .ok_or_else(|| crate::status::processing_error_status("higher-order sub-function must return boolean"))
}

fn as_bag<'a>(v: &'a EvaluatedValue, fn_id: &str) -> Result<&'a Bag, crate::status::XacmlStatus> {
    v.as_bag()
        .ok_or_else(|| crate::status::processing_error_status(format!("{fn_id}: argument must be a bag")))
}

/// `urn:oasis:names:tc:xacml:3.0:function:any-of`.
///
/// `any-of(function, value, bag)`: true iff `function(value, x)` is true for
/// some `x` in `bag`.
#[derive(Debug, Clone, Copy)]
pub struct AnyOfFunction;

impl Function for AnyOfFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:3.0:function:any-of"
    }
    fn param_types(&self) -> &[ValueType] {
        &[]
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn skip_static_arg_check(&self) -> bool {
        true
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let sub = sub_function(args, self.id())?;
        let value = args[1].evaluate(ctx)?;
        let value = value
            .as_single()
            .ok_or_else(|| crate::status::processing_error_status("any-of: second argument must be a single value"))?
            .clone();
        let bag = args[2].evaluate(ctx)?;
        let bag = as_bag(&bag, self.id())?;
        let mut saw_err = None;
        for x in bag.iter() {
            match invoke_predicate(ctx, &sub, &value, x) {
                Ok(true) => return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true))),
                Ok(false) => {}
                Err(e) => saw_err.get_or_insert(e),
            }
        }
        match saw_err {
            Some(e) => Err(e),
            None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
        }
    }
}

/// `urn:oasis:names:tc:xacml:3.0:function:all-of`.
///
/// `all-of(function, value, bag)`: true iff `function(value, x)` is true for
/// every `x` in `bag`.
#[derive(Debug, Clone, Copy)]
pub struct AllOfFunction;

impl Function for AllOfFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:3.0:function:all-of"
    }
    fn param_types(&self) -> &[ValueType] {
        &[]
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn skip_static_arg_check(&self) -> bool {
        true
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let sub = sub_function(args, self.id())?;
        let value = args[1].evaluate(ctx)?;
        let value = value
            .as_single()
            .ok_or_else(|| crate::status::processing_error_status("all-of: second argument must be a single value"))?
            .clone();
        let bag = args[2].evaluate(ctx)?;
        let bag = as_bag(&bag, self.id())?;
        let mut saw_err = None;
        for x in bag.iter() {
            match invoke_predicate(ctx, &sub, &value, x) {
                Ok(false) => return Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
                Ok(true) => {}
                Err(e) => saw_err.get_or_insert(e),
            }
        }
        match saw_err {
            Some(e) => Err(e),
            None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(true))),
        }
    }
}

fn eval_two_bags<'a>(
    ctx: &mut EvaluationContext,
    args: &'a [Expression],
    fn_id: &str,
) -> Result<(Bag, Bag), crate::status::XacmlStatus> {
    let a = args[1].evaluate(ctx)?;
    let a = as_bag(&a, fn_id)?.clone();
    let b = args[2].evaluate(ctx)?;
    let b = as_bag(&b, fn_id)?.clone();
    Ok((a, b))
}

macro_rules! define_double_bag_higher_order_fn {
    ($name:ident, $id:literal, $combine:expr) => {
        #[doc = concat!("`", $id, "`.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Function for $name {
            fn id(&self) -> &str {
                $id
            }
            fn param_types(&self) -> &[ValueType] {
                &[]
            }
            fn is_variadic(&self) -> bool {
                true
            }
            fn return_type(&self) -> ValueType {
                ValueType::Primitive(Datatype::Boolean)
            }
            fn skip_static_arg_check(&self) -> bool {
                true
            }
            fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                let sub = sub_function(args, $id)?;
                let (bag1, bag2) = eval_two_bags(ctx, args, $id)?;
                let combine: fn(
                    &mut EvaluationContext,
                    &Arc<dyn Function>,
                    &Bag,
                    &Bag,
                ) -> EvalResult = $combine;
                combine(ctx, &sub, &bag1, &bag2)
            }
        }
    };
}

fn any_of_any(ctx: &mut EvaluationContext, sub: &Arc<dyn Function>, bag1: &Bag, bag2: &Bag) -> EvalResult {
    let mut saw_err = None;
    for x in bag1.iter() {
        for y in bag2.iter() {
            match invoke_predicate(ctx, sub, x, y) {
                Ok(true) => return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true))),
                Ok(false) => {}
                Err(e) => saw_err.get_or_insert(e),
            }
        }
    }
    match saw_err {
        Some(e) => Err(e),
        None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
    }
}

fn all_of_any(ctx: &mut EvaluationContext, sub: &Arc<dyn Function>, bag1: &Bag, bag2: &Bag) -> EvalResult {
    let mut saw_err = None;
    for x in bag1.iter() {
        let mut any_true = false;
        for y in bag2.iter() {
            match invoke_predicate(ctx, sub, x, y) {
                Ok(true) => {
                    any_true = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => saw_err.get_or_insert(e),
            }
        }
        if !any_true {
            return match saw_err {
                Some(e) => Err(e),
                None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
            };
        }
    }
    Ok(EvaluatedValue::Single(AttributeValue::Boolean(true)))
}

fn any_of_all(ctx: &mut EvaluationContext, sub: &Arc<dyn Function>, bag1: &Bag, bag2: &Bag) -> EvalResult {
    let mut saw_err = None;
    for x in bag1.iter() {
        let mut all_true = true;
        for y in bag2.iter() {
            match invoke_predicate(ctx, sub, x, y) {
                Ok(true) => {}
                Ok(false) => {
                    all_true = false;
                    break;
                }
                Err(e) => {
                    saw_err.get_or_insert(e);
                    all_true = false;
                    break;
                }
            }
        }
        if all_true {
            return Ok(EvaluatedValue::Single(AttributeValue::Boolean(true)));
        }
    }
    match saw_err {
        Some(e) => Err(e),
        None => Ok(EvaluatedValue::Single(AttributeValue::Boolean(false))),
    }
}

fn all_of_all(ctx: &mut EvaluationContext, sub: &Arc<dyn Function>, bag1: &Bag, bag2: &Bag) -> EvalResult {
    for x in bag1.iter() {
        for y in bag2.iter() {
            if !invoke_predicate(ctx, sub, x, y)? {
                return Ok(EvaluatedValue::Single(AttributeValue::Boolean(false)));
            }
        }
    }
    Ok(EvaluatedValue::Single(AttributeValue::Boolean(true)))
}

define_double_bag_higher_order_fn!(
    AnyOfAnyFunction,
    "urn:oasis:names:tc:xacml:3.0:function:any-of-any",
    any_of_any
);
define_double_bag_higher_order_fn!(
    AllOfAnyFunction,
    "urn:oasis:names:tc:xacml:1.0:function:all-of-any",
    all_of_any
);
define_double_bag_higher_order_fn!(
    AnyOfAllFunction,
    "urn:oasis:names:tc:xacml:1.0:function:any-of-all",
    any_of_all
);
define_double_bag_higher_order_fn!(
    AllOfAllFunction,
    "urn:oasis:names:tc:xacml:1.0:function:all-of-all",
    all_of_all
);

/// `urn:oasis:names:tc:xacml:3.0:function:map`.
///
/// `map(function, bag) -> bag`: applies a unary sub-function to every
/// element, collecting the results. The result bag's datatype is the
/// sub-function's return datatype (see [`Function::higher_order_return_type`]).
#[derive(Debug, Clone, Copy)]
pub struct MapFunction;

impl Function for MapFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:3.0:function:map"
    }
    fn param_types(&self) -> &[ValueType] {
        &[]
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        // Placeholder; the effective type is computed per-call-site via
        // `higher_order_return_type` from the concrete sub-function.
        ValueType::Bag(Datatype::String)
    }
    fn skip_static_arg_check(&self) -> bool {
        true
    }
    fn higher_order_return_type(&self, sub_function: &Arc<dyn Function>) -> ValueType {
        ValueType::Bag(sub_function.return_type().datatype())
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let sub = sub_function(args, self.id())?;
        let bag = args[1].evaluate(ctx)?;
        let bag = as_bag(&bag, self.id())?.clone();
        let out_datatype = sub.return_type().datatype();
        let mut out = Vec::with_capacity(bag.size());
        for x in bag.iter() {
            let call_args = [const_expr(x.clone())];
            let result = sub.call(ctx, &call_args)?;
            let v = result
                .as_single()
                .ok_or_else(|| crate::status::processing_error_status("map: sub-function must return a single value"))?
                .clone();
            out.push(v);
        }
        Ok(EvaluatedValue::Bag(Bag::new(out_datatype, out)))
    }
}

/// All standard higher-order functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(AnyOfFunction),
        Arc::new(AllOfFunction),
        Arc::new(AnyOfAnyFunction),
        Arc::new(AllOfAnyFunction),
        Arc::new(AnyOfAllFunction),
        Arc::new(AllOfAllFunction),
        Arc::new(MapFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::function::library::equality::StringEqualFunction;

    #[test]
    fn any_of_finds_match_in_bag() {
        let mut ctx = EvaluationContext::for_testing();
        let bag = Expression::ConstantBag(Bag::new(
            Datatype::String,
            vec![AttributeValue::String("a".into()), AttributeValue::String("b".into())],
        ));
        let args = vec![
            Expression::Function(Arc::new(StringEqualFunction)),
            Expression::Constant(AttributeValue::String("b".into())),
            bag,
        ];
        let r = AnyOfFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }

    #[test]
    fn all_of_requires_every_element_to_match() {
        let mut ctx = EvaluationContext::for_testing();
        let bag = Expression::ConstantBag(Bag::new(
            Datatype::String,
            vec![AttributeValue::String("a".into()), AttributeValue::String("a".into())],
        ));
        let args = vec![
            Expression::Function(Arc::new(StringEqualFunction)),
            Expression::Constant(AttributeValue::String("a".into())),
            bag,
        ];
        let r = AllOfFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }
}
