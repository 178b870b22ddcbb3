//! Datatype-specific ordering comparison functions (`<type>-greater-than`
//! etc.), per spec §4.B "Comparisons follow canonical ordering."

use std::{cmp::Ordering, sync::Arc};

use paste::paste;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Datatype, ValueType},
};

macro_rules! define_comparison_family {
    ($prefix:ident, $uri_prefix:literal, $dt:expr) => {
        paste! {
            #[doc = concat!("`", $uri_prefix, "-greater-than`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix GreaterThanFunction>];
            #[doc = concat!("`", $uri_prefix, "-greater-than-or-equal`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix GreaterThanOrEqualFunction>];
            #[doc = concat!("`", $uri_prefix, "-less-than`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix LessThanFunction>];
            #[doc = concat!("`", $uri_prefix, "-less-than-or-equal`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix LessThanOrEqualFunction>];

            impl Function for [<$prefix GreaterThanFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-greater-than") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Primitive($dt), ValueType::Primitive($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    compare(ctx, args, concat!($uri_prefix, "-greater-than"), |o| o == Ordering::Greater)
                }
            }
            impl Function for [<$prefix GreaterThanOrEqualFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-greater-than-or-equal") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Primitive($dt), ValueType::Primitive($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    compare(ctx, args, concat!($uri_prefix, "-greater-than-or-equal"), |o| o != Ordering::Less)
                }
            }
            impl Function for [<$prefix LessThanFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-less-than") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Primitive($dt), ValueType::Primitive($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    compare(ctx, args, concat!($uri_prefix, "-less-than"), |o| o == Ordering::Less)
                }
            }
            impl Function for [<$prefix LessThanOrEqualFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-less-than-or-equal") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Primitive($dt), ValueType::Primitive($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    compare(ctx, args, concat!($uri_prefix, "-less-than-or-equal"), |o| o != Ordering::Greater)
                }
            }
        }
    };
}

fn compare(
    ctx: &mut EvaluationContext,
    args: &[Expression],
    fn_id: &str,
    accept: impl FnOnce(Ordering) -> bool,
) -> EvalResult {
    let a = args[0].evaluate(ctx)?;
    let b = args[1].evaluate(ctx)?;
    let (Some(a), Some(b)) = (a.as_single(), b.as_single()) else {
        return Err(crate::status::processing_error_status(format!(
            "{fn_id}: arguments must be single primitive values"
        )));
    };
    match a.partial_cmp(b) {
        Some(ord) => Ok(EvaluatedValue::Single(AttributeValue::Boolean(accept(ord)))),
        None => Err(crate::status::processing_error_status(format!(
            "{fn_id}: arguments are not comparable"
        ))),
    }
}

define_comparison_family!(
    Integer,
    "urn:oasis:names:tc:xacml:1.0:function:integer",
    Datatype::Integer
);
define_comparison_family!(
    Double,
    "urn:oasis:names:tc:xacml:1.0:function:double",
    Datatype::Double
);
define_comparison_family!(
    Time,
    "urn:oasis:names:tc:xacml:1.0:function:time",
    Datatype::Time
);
define_comparison_family!(
    Date,
    "urn:oasis:names:tc:xacml:1.0:function:date",
    Datatype::Date
);
define_comparison_family!(
    DateTime,
    "urn:oasis:names:tc:xacml:1.0:function:dateTime",
    Datatype::DateTime
);

/// All standard comparison functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(IntegerGreaterThanFunction),
        Arc::new(IntegerGreaterThanOrEqualFunction),
        Arc::new(IntegerLessThanFunction),
        Arc::new(IntegerLessThanOrEqualFunction),
        Arc::new(DoubleGreaterThanFunction),
        Arc::new(DoubleGreaterThanOrEqualFunction),
        Arc::new(DoubleLessThanFunction),
        Arc::new(DoubleLessThanOrEqualFunction),
        Arc::new(TimeGreaterThanFunction),
        Arc::new(TimeGreaterThanOrEqualFunction),
        Arc::new(TimeLessThanFunction),
        Arc::new(TimeLessThanOrEqualFunction),
        Arc::new(DateGreaterThanFunction),
        Arc::new(DateGreaterThanOrEqualFunction),
        Arc::new(DateLessThanFunction),
        Arc::new(DateLessThanOrEqualFunction),
        Arc::new(DateTimeGreaterThanFunction),
        Arc::new(DateTimeGreaterThanOrEqualFunction),
        Arc::new(DateTimeLessThanFunction),
        Arc::new(DateTimeLessThanOrEqualFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    #[test]
    fn integer_greater_than() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::Integer(5)),
            Expression::Constant(AttributeValue::Integer(3)),
        ];
        let r = IntegerGreaterThanFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }
}
