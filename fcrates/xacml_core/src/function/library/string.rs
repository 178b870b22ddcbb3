//! String functions, per spec §4.B "String functions (normalize-space,
//! normalize-to-lower-case, concatenate, contains, starts-with, substring,
//! string-from-*): straightforward Unicode operations per spec", and
//! concrete scenario §8.1.

use std::sync::Arc;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Datatype, ValueType},
};

pub use crate::function::library::equality::{StringEqualFunction, StringEqualIgnoreCaseFunction};

fn as_string<'a>(v: &'a EvaluatedValue, fn_id: &str, pos: &str) -> Result<&'a str, crate::status::XacmlStatus> {
    v.as_single()
        .and_then(|v| v.as_str())
        .ok_or_else(|| crate::status::processing_error_status(format!("{fn_id}: {pos} argument must be a string")))
}

/// `urn:oasis:names:tc:xacml:1.0:function:string-concatenate`, variadic
/// (two or more string arguments).
#[derive(Debug, Clone, Copy)]
pub struct StringConcatenateFunction;

impl Function for StringConcatenateFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:1.0:function:string-concatenate"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 2] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::String),
        ];
        &P
    }
    fn is_variadic(&self) -> bool {
        true
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::String)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let mut out = String::new();
        for (i, arg) in args.iter().enumerate() {
            let v = arg.evaluate(ctx)?;
            out.push_str(as_string(&v, self.id(), &format!("#{i}"))?);
        }
        Ok(EvaluatedValue::Single(AttributeValue::String(out)))
    }
}

/// `urn:oasis:names:tc:xacml:3.0:function:string-normalize-space`.
#[derive(Debug, Clone, Copy)]
pub struct StringNormalizeSpaceFunction;

impl Function for StringNormalizeSpaceFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:3.0:function:string-normalize-space"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::String)];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::String)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let v = args[0].evaluate(ctx)?;
        let s = as_string(&v, self.id(), "first")?;
        Ok(EvaluatedValue::Single(AttributeValue::String(
            s.trim().to_owned(),
        )))
    }
}

/// `urn:oasis:names:tc:xacml:3.0:function:string-normalize-to-lower-case`.
#[derive(Debug, Clone, Copy)]
pub struct StringNormalizeToLowerCaseFunction;

impl Function for StringNormalizeToLowerCaseFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:3.0:function:string-normalize-to-lower-case"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 1] = [ValueType::Primitive(Datatype::String)];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::String)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let v = args[0].evaluate(ctx)?;
        let s = as_string(&v, self.id(), "first")?;
        Ok(EvaluatedValue::Single(AttributeValue::String(
            s.to_lowercase(),
        )))
    }
}

/// `urn:oasis:names:tc:xacml:2.0:function:string-starts-with`.
#[derive(Debug, Clone, Copy)]
pub struct StringStartsWithFunction;

impl Function for StringStartsWithFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:2.0:function:string-starts-with"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 2] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::String),
        ];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        // Per XACML §A.3.13 the first arg is the prefix, the second the string searched.
        let prefix = args[0].evaluate(ctx)?;
        let s = args[1].evaluate(ctx)?;
        let prefix = as_string(&prefix, self.id(), "first")?;
        let s = as_string(&s, self.id(), "second")?;
        Ok(EvaluatedValue::Single(AttributeValue::Boolean(
            s.starts_with(prefix),
        )))
    }
}

/// `urn:oasis:names:tc:xacml:2.0:function:string-ends-with` (symmetric
/// extension of `string-starts-with`, kept for conformance suites that
/// exercise substring matching in both directions).
#[derive(Debug, Clone, Copy)]
pub struct StringEndsWithFunction;

impl Function for StringEndsWithFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:2.0:function:string-ends-with"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 2] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::String),
        ];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let suffix = args[0].evaluate(ctx)?;
        let s = args[1].evaluate(ctx)?;
        let suffix = as_string(&suffix, self.id(), "first")?;
        let s = as_string(&s, self.id(), "second")?;
        Ok(EvaluatedValue::Single(AttributeValue::Boolean(
            s.ends_with(suffix),
        )))
    }
}

/// `urn:oasis:names:tc:xacml:2.0:function:string-contains`.
#[derive(Debug, Clone, Copy)]
pub struct StringContainsFunction;

impl Function for StringContainsFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:2.0:function:string-contains"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 2] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::String),
        ];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::Boolean)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        // §A.3.13: first arg is the string searched, second is the substring.
        let s = args[0].evaluate(ctx)?;
        let needle = args[1].evaluate(ctx)?;
        let s = as_string(&s, self.id(), "first")?;
        let needle = as_string(&needle, self.id(), "second")?;
        Ok(EvaluatedValue::Single(AttributeValue::Boolean(
            s.contains(needle),
        )))
    }
}

/// `urn:oasis:names:tc:xacml:2.0:function:string-substring`.
#[derive(Debug, Clone, Copy)]
pub struct StringSubstringFunction;

impl Function for StringSubstringFunction {
    fn id(&self) -> &str {
        "urn:oasis:names:tc:xacml:2.0:function:string-substring"
    }
    fn param_types(&self) -> &[ValueType] {
        const P: [ValueType; 3] = [
            ValueType::Primitive(Datatype::String),
            ValueType::Primitive(Datatype::Integer),
            ValueType::Primitive(Datatype::Integer),
        ];
        &P
    }
    fn return_type(&self) -> ValueType {
        ValueType::Primitive(Datatype::String)
    }
    fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
        let s = args[0].evaluate(ctx)?;
        let begin = args[1].evaluate(ctx)?;
        let end = args[2].evaluate(ctx)?;
        let s = as_string(&s, self.id(), "first")?;
        let (Some(AttributeValue::Integer(begin)), Some(AttributeValue::Integer(end))) =
            (begin.as_single(), end.as_single())
        else {
            return Err(crate::status::processing_error_status(
                "string-substring: begin/end must be integers",
            ));
        };
        let chars: Vec<char> = s.chars().collect();
        let begin = (*begin).max(0) as usize;
        let end = if *end < 0 { chars.len() } else { (*end as usize).min(chars.len()) };
        if begin > chars.len() || begin > end {
            return Err(crate::status::processing_error_status(
                "string-substring: begin index out of range",
            ));
        }
        let substr: String = chars[begin..end].iter().collect();
        Ok(EvaluatedValue::Single(AttributeValue::String(substr)))
    }
}

macro_rules! define_from_string_fn {
    ($name:ident, $id:literal, $dt:expr, $parse:expr) => {
        #[doc = concat!("`", $id, "`.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Function for $name {
            fn id(&self) -> &str {
                $id
            }
            fn param_types(&self) -> &[ValueType] {
                const P: [ValueType; 1] = [ValueType::Primitive(Datatype::String)];
                &P
            }
            fn return_type(&self) -> ValueType {
                ValueType::Primitive($dt)
            }
            fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                let v = args[0].evaluate(ctx)?;
                let s = as_string(&v, self.id(), "first")?;
                let parse: fn(&str) -> Option<AttributeValue> = $parse;
                parse(s)
                    .map(EvaluatedValue::Single)
                    .ok_or_else(|| crate::status::processing_error_status(concat!($id, ": invalid lexical form")))
            }
        }
    };
}

define_from_string_fn!(
    BooleanFromStringFunction,
    "urn:oasis:names:tc:xacml:3.0:function:boolean-from-string",
    Datatype::Boolean,
    |s| crate::value::parse_value(Datatype::Boolean, s).ok()
);
define_from_string_fn!(
    IntegerFromStringFunction,
    "urn:oasis:names:tc:xacml:3.0:function:integer-from-string",
    Datatype::Integer,
    |s| crate::value::parse_value(Datatype::Integer, s).ok()
);
define_from_string_fn!(
    DoubleFromStringFunction,
    "urn:oasis:names:tc:xacml:3.0:function:double-from-string",
    Datatype::Double,
    |s| crate::value::parse_value(Datatype::Double, s).ok()
);

macro_rules! define_to_string_fn {
    ($name:ident, $id:literal, $dt:expr) => {
        #[doc = concat!("`", $id, "`.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Function for $name {
            fn id(&self) -> &str {
                $id
            }
            fn param_types(&self) -> &[ValueType] {
                const P: [ValueType; 1] = [ValueType::Primitive($dt)];
                &P
            }
            fn return_type(&self) -> ValueType {
                ValueType::Primitive(Datatype::String)
            }
            fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                let v = args[0].evaluate(ctx)?;
                let v = v.as_single().ok_or_else(|| {
                    crate::status::processing_error_status(concat!($id, ": argument must be a single value"))
                })?;
                Ok(EvaluatedValue::Single(AttributeValue::String(
                    v.canonical_lexical_form(),
                )))
            }
        }
    };
}

define_to_string_fn!(
    StringFromBooleanFunction,
    "urn:oasis:names:tc:xacml:3.0:function:string-from-boolean",
    Datatype::Boolean
);
define_to_string_fn!(
    StringFromIntegerFunction,
    "urn:oasis:names:tc:xacml:3.0:function:string-from-integer",
    Datatype::Integer
);
define_to_string_fn!(
    StringFromDoubleFunction,
    "urn:oasis:names:tc:xacml:3.0:function:string-from-double",
    Datatype::Double
);

/// All standard string functions (not including `string-equal*`, which live
/// in [`super::equality`] but are re-exported here for discoverability).
pub fn functions() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(StringConcatenateFunction),
        Arc::new(StringNormalizeSpaceFunction),
        Arc::new(StringNormalizeToLowerCaseFunction),
        Arc::new(StringStartsWithFunction),
        Arc::new(StringEndsWithFunction),
        Arc::new(StringContainsFunction),
        Arc::new(StringSubstringFunction),
        Arc::new(BooleanFromStringFunction),
        Arc::new(IntegerFromStringFunction),
        Arc::new(DoubleFromStringFunction),
        Arc::new(StringFromBooleanFunction),
        Arc::new(StringFromIntegerFunction),
        Arc::new(StringFromDoubleFunction),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use rstest::rstest;

    #[rstest]
    #[case("   test   ", "test")]
    #[case("x", "x")]
    fn normalize_space(#[case] input: &str, #[case] expected: &str) {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![Expression::Constant(AttributeValue::String(input.to_owned()))];
        let r = StringNormalizeSpaceFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_single(), Some(&AttributeValue::String(expected.to_owned())));
    }

    #[test]
    fn normalize_to_lower_case() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![Expression::Constant(AttributeValue::String("TeST".to_owned()))];
        let r = StringNormalizeToLowerCaseFunction
            .call(&mut ctx, &args)
            .unwrap();
        assert_eq!(r.as_single(), Some(&AttributeValue::String("test".to_owned())));
    }

    #[test]
    fn concatenate_is_variadic() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::String("a".into())),
            Expression::Constant(AttributeValue::String("b".into())),
            Expression::Constant(AttributeValue::String("c".into())),
        ];
        let r = StringConcatenateFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_single(), Some(&AttributeValue::String("abc".into())));
    }
}
