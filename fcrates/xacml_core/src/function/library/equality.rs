//! Datatype-specific equality functions (`<type>-equal`), per spec §4.B
//! "Equality functions are datatype-specific."

use std::sync::Arc;

use paste::paste;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Datatype, ValueType},
};

macro_rules! define_equal_fn {
    ($fn_name:ident, $id:literal, $dt:expr, $variant:ident) => {
        paste! {
            #[doc = concat!("`", $id, "`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct $fn_name;

            impl Function for $fn_name {
                fn id(&self) -> &str {
                    $id
                }

                fn param_types(&self) -> &[ValueType] {
                    const PARAMS: [ValueType; 2] =
                        [ValueType::Primitive($dt), ValueType::Primitive($dt)];
                    &PARAMS
                }

                fn return_type(&self) -> ValueType {
                    ValueType::Primitive(Datatype::Boolean)
                }

                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let (Some(AttributeValue::$variant(..)), Some(AttributeValue::$variant(..))) =
                        (a.as_single(), b.as_single())
                    else {
                        return Err(crate::status::processing_error_status(concat!(
                            $id, ": arguments must both resolve to ", stringify!($variant)
                        )));
                    };
                    let eq = a.as_single() == b.as_single();
                    Ok(EvaluatedValue::Single(AttributeValue::Boolean(eq)))
                }
            }
        }
    };
}

define_equal_fn!(
    StringEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:string-equal",
    Datatype::String,
    String
);
define_equal_fn!(
    BooleanEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:boolean-equal",
    Datatype::Boolean,
    Boolean
);
define_equal_fn!(
    IntegerEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
    Datatype::Integer,
    Integer
);
define_equal_fn!(
    DoubleEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:double-equal",
    Datatype::Double,
    Double
);
define_equal_fn!(
    DateEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:date-equal",
    Datatype::Date,
    Date
);
define_equal_fn!(
    TimeEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:time-equal",
    Datatype::Time,
    Time
);
define_equal_fn!(
    DateTimeEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:dateTime-equal",
    Datatype::DateTime,
    DateTime
);
define_equal_fn!(
    AnyUriEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:anyURI-equal",
    Datatype::AnyUri,
    AnyUri
);
define_equal_fn!(
    HexBinaryEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:hexBinary-equal",
    Datatype::HexBinary,
    HexBinary
);
define_equal_fn!(
    Base64BinaryEqualFunction,
    "urn:oasis:names:tc:xacml:1.0:function:base64Binary-equal",
    Datatype::Base64Binary,
    Base64Binary
);
define_equal_fn!(
    DayTimeDurationEqualFunction,
    "urn:oasis:names:tc:xacml:3.0:function:dayTimeDuration-equal",
    Datatype::DayTimeDuration,
    DayTimeDuration
);
define_equal_fn!(
    YearMonthDurationEqualFunction,
    "urn:oasis:names:tc:xacml:3.0:function:yearMonthDuration-equal",
    Datatype::YearMonthDuration,
    YearMonthDuration
);

/// `urn:oasis:names:tc:xacml:1.0:function:string-equal-ignore-case`.
#[derive(Debug, Clone, Copy)]
pub struct StringEqualIgnoreCaseFunction;

impl Function for StringEqualIgnoreCaseFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:string-equal-ignore-case"
    }

    fn param_types(&self) -> &[ValueType] {
        const PARAMS: [ValueType; 2] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::String),
        ];
        &PARAMS
    }

    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }

    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let a = args[0].evaluate(ctx)?;
        let b = args[1].evaluate(ctx)?;
        let (Some(a), Some(b)) = (a.as_single().and_then(|v| v.as_str()), b.as_single().and_then(|v| v.as_str()))
        else {
            return Err(crate::status::processing_error_status(
                "string-equal-ignore-case: arguments must both resolve to strings",
            ));
        };
        Ok(EvaluatedValue::Single(AttributeValue::Boolean(
            a.eq_ignore_ascii_case(b),
        )))
    }
}

/// All standard equality functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(StringEqualFunction),
        Arc::new(BooleanEqualFunction),
        Arc::new(IntegerEqualFunction),
        Arc::new(DoubleEqualFunction),
        Arc::new(DateEqualFunction),
        Arc::new(TimeEqualFunction),
        Arc::new(DateTimeEqualFunction),
        Arc::new(AnyUriEqualFunction),
        Arc::new(HexBinaryEqualFunction),
        Arc::new(Base64BinaryEqualFunction),
        Arc::new(DayTimeDurationEqualFunction),
        Arc::new(YearMonthDurationEqualFunction),
        Arc::new(StringEqualIgnoreCaseFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_equal_ids() {
        assert_eq!(
            StringEqualFunction.id(),
            "urn:oasis:names:tc:xacml:1.0:function:string-equal"
        );
    }
}
