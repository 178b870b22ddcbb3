//! Arithmetic functions over `integer` and `double`, per the XACML 3.0
//! function-identifier appendix's arithmetic family.

use std::sync::Arc;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Datatype, ValueType},
};

macro_rules! define_binary_integer_fn {
    ($name:ident, $id:literal, $op:expr) => {
        #[doc = concat!("`", $id, "`.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Function for $name {
            fn id(&self) -> &str {
                $id
            }
            fn param_types(&self) -> &[ValueType] {
                const P: [ValueType; 2] = [
                    ValueType::Primitive(Datatype::Integer),
                    ValueType::Primitive(Datatype::Integer),
                ];
                &P
            }
            fn return_type(&self) -> ValueType {
                ValueType::Primitive(Datatype::Integer)
            }
            fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                let a = args[0].evaluate(ctx)?;
                let b = args[1].evaluate(ctx)?;
                let (Some(AttributeValue::Integer(a)), Some(AttributeValue::Integer(b))) =
                    (a.as_single(), b.as_single())
                else {
                    return Err(crate::status::processing_error_status(concat!(
                        $id, ": arguments must be integers"
                    )));
                };
                let op: fn(i64, i64) -> Option<i64> = $op;
                let result = op(*a, *b).ok_or_else(|| {
                    crate::status::processing_error_status(concat!($id, ": arithmetic overflow or division by zero"))
                })?;
                Ok(EvaluatedValue::Single(AttributeValue::Integer(result)))
            }
        }
    };
}

define_binary_integer_fn!(
    IntegerAddFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-add",
    |a, b| a.checked_add(b)
);
define_binary_integer_fn!(
    IntegerSubtractFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-subtract",
    |a, b| a.checked_sub(b)
);
define_binary_integer_fn!(
    IntegerMultiplyFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-multiply",
    |a, b| a.checked_mul(b)
);
define_binary_integer_fn!(
    IntegerDivideFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-divide",
    |a, b| if b == 0 { None } else { a.checked_div(b) }
);
define_binary_integer_fn!(
    IntegerModFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-mod",
    |a, b| if b == 0 { None } else { a.checked_rem(b) }
);

macro_rules! define_binary_double_fn {
    ($name:ident, $id:literal, $op:expr) => {
        #[doc = concat!("`", $id, "`.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Function for $name {
            fn id(&self) -> &str {
                $id
            }
            fn param_types(&self) -> &[ValueType] {
                const P: [ValueType; 2] = [
                    ValueType::Primitive(Datatype::Double),
                    ValueType::Primitive(Datatype::Double),
                ];
                &P
            }
            fn return_type(&self) -> ValueType {
                ValueType::Primitive(Datatype::Double)
            }
            fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                let a = args[0].evaluate(ctx)?;
                let b = args[1].evaluate(ctx)?;
                let (Some(AttributeValue::Double(a)), Some(AttributeValue::Double(b))) =
                    (a.as_single(), b.as_single())
                else {
                    return Err(crate::status::processing_error_status(concat!(
                        $id, ": arguments must be doubles"
                    )));
                };
                let op: fn(f64, f64) -> f64 = $op;
                Ok(EvaluatedValue::Single(AttributeValue::Double(op(*a, *b))))
            }
        }
    };
}

define_binary_double_fn!(
    DoubleAddFunction,
    "urn:oasis:names:tc:xacml:1.0:function:double-add",
    |a, b| a + b
);
define_binary_double_fn!(
    DoubleSubtractFunction,
    "urn:oasis:names:tc:xacml:1.0:function:double-subtract",
    |a, b| a - b
);
define_binary_double_fn!(
    DoubleMultiplyFunction,
    "urn:oasis:names:tc:xacml:1.0:function:double-multiply",
    |a, b| a * b
);
define_binary_double_fn!(
    DoubleDivideFunction,
    "urn:oasis:names:tc:xacml:1.0:function:double-divide",
    |a, b| a / b
);

/// `urn:oasis:names:tc:xacml:1.0:function:integer-abs`.
#[derive(Debug, Clone, Copy)]
pub struct IntegerAbsFunction;

impl Function for IntegerAbsFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:integer-abs"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::Integer)];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Integer)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let a = args[0].evaluate(ctx)?;
        let Some(AttributeValue::Integer(a)) = a.as_single() else {
            return Err(crate::status::processing_error_status(
                "integer-abs: argument must be an integer",
            ));
        };
        Ok(EvaluatedValue::Single(AttributeValue::Integer(a.abs())))
    }
}

/// `urn:oasis:names:tc:xacml:1.0:function:double-abs`.
#[derive(Debug, Clone, Copy)]
pub struct DoubleAbsFunction;

impl Function for DoubleAbsFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:double-abs"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::Double)];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Double)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let a = args[0].evaluate(ctx)?;
        let Some(AttributeValue::Double(a)) = a.as_single() else {
            return Err(crate::status::processing_error_status(
                "double-abs: argument must be a double",
            ));
        };
        Ok(EvaluatedValue::Single(AttributeValue::Double(a.abs())))
    }
}

/// All standard arithmetic functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(IntegerAddFunction),
        Arc::new(IntegerSubtractFunction),
        Arc::new(IntegerMultiplyFunction),
        Arc::new(IntegerDivideFunction),
        Arc::new(IntegerModFunction),
        Arc::new(DoubleAddFunction),
        Arc::new(DoubleSubtractFunction),
        Arc::new(DoubleMultiplyFunction),
        Arc::new(DoubleDivideFunction),
        Arc::new(IntegerAbsFunction),
        Arc::new(DoubleAbsFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    #[test]
    fn integer_add() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::Integer(2)),
            Expression::Constant(AttributeValue::Integer(3)),
        ];
        let r = IntegerAddFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_single(), Some(&AttributeValue::Integer(5)));
    }

    #[test]
    fn integer_divide_by_zero_is_indeterminate() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::Integer(2)),
            Expression::Constant(AttributeValue::Integer(0)),
        ];
        assert!(IntegerDivideFunction.call(&mut ctx, &args).is_err());
    }
}
