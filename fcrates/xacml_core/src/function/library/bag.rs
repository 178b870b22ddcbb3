//! Bag functions (`<type>-bag`, `<type>-one-and-only`, `<type>-bag-size`,
//! `<type>-is-in`, `<type>-at-least-one-member-of`, `<type>-union`,
//! `<type>-intersection`, `<type>-subset`, `<type>-set-equals`), per spec §9
//! "Decision cache key" note's sibling mention of bag-shaped eager calls and
//! the bag semantics in spec §3 "Bag<T>".
//!
//! Registered for `string`, `integer`, `double`, `boolean`, and `anyURI` —
//! the remaining eleven primitive datatypes follow the exact same shape, one
//! more macro invocation away.

use std::sync::Arc;

use paste::paste;

use crate::{
    context::EvaluationContext,
    expr::{EvalResult, EvaluatedValue, Expression},
    function::Function,
    value::{AttributeValue, Bag, Datatype, ValueType},
};

fn as_bag<'a>(v: &'a EvaluatedValue, fn_id: &str) -> Result<&'a Bag, crate::status::XacmlStatus> {
    v.as_bag()
        .ok_or_else(|| crate::status::processing_error_status(format!("{fn_id}: argument must be a bag")))
}

macro_rules! define_bag_family {
    ($prefix:ident, $uri_prefix:literal, $dt:expr) => {
        paste! {
            #[doc = concat!("`", $uri_prefix, "-bag`: variadic, collects zero or more values into a bag.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix BagFunction>];

            impl Function for [<$prefix BagFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-bag") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 1] = [ValueType::Primitive($dt)];
                    &P
                }
                fn is_variadic(&self) -> bool { true }
                fn return_type(&self) -> ValueType { ValueType::Bag($dt) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        let v = arg.evaluate(ctx)?;
                        let v = v.as_single().ok_or_else(|| crate::status::processing_error_status(
                            concat!($uri_prefix, "-bag: arguments must be single values")
                        ))?.clone();
                        values.push(v);
                    }
                    Ok(EvaluatedValue::Bag(Bag::new($dt, values)))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-one-and-only`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix OneAndOnlyFunction>];

            impl Function for [<$prefix OneAndOnlyFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-one-and-only") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 1] = [ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive($dt) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let v = args[0].evaluate(ctx)?;
                    let bag = as_bag(&v, self.id())?;
                    if bag.size() != 1 {
                        return Err(crate::status::processing_error_status(format!(
                            "{}: bag must contain exactly one value, found {}", self.id(), bag.size()
                        )));
                    }
                    Ok(EvaluatedValue::Single(bag.values()[0].clone()))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-bag-size`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix BagSizeFunction>];

            impl Function for [<$prefix BagSizeFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-bag-size") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 1] = [ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Integer) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let v = args[0].evaluate(ctx)?;
                    let bag = as_bag(&v, self.id())?;
                    Ok(EvaluatedValue::Single(AttributeValue::Integer(bag.size() as i64)))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-is-in`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix IsInFunction>];

            impl Function for [<$prefix IsInFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-is-in") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Primitive($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let v = args[0].evaluate(ctx)?;
                    let bag = args[1].evaluate(ctx)?;
                    let v = v.as_single().ok_or_else(|| crate::status::processing_error_status(
                        concat!($uri_prefix, "-is-in: first argument must be a single value")
                    ))?;
                    let bag = as_bag(&bag, self.id())?;
                    Ok(EvaluatedValue::Single(AttributeValue::Boolean(bag.contains(v))))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-at-least-one-member-of`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix AtLeastOneMemberOfFunction>];

            impl Function for [<$prefix AtLeastOneMemberOfFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-at-least-one-member-of") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Bag($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let a = as_bag(&a, self.id())?;
                    let b = as_bag(&b, self.id())?;
                    Ok(EvaluatedValue::Single(AttributeValue::Boolean(
                        a.iter().any(|v| b.contains(v))
                    )))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-union`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix UnionFunction>];

            impl Function for [<$prefix UnionFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-union") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Bag($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Bag($dt) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let a = as_bag(&a, self.id())?;
                    let b = as_bag(&b, self.id())?;
                    let mut values: Vec<AttributeValue> = a.values().to_vec();
                    for v in b.iter() {
                        if !values.contains(v) {
                            values.push(v.clone());
                        }
                    }
                    Ok(EvaluatedValue::Bag(Bag::new($dt, values)))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-intersection`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix IntersectionFunction>];

            impl Function for [<$prefix IntersectionFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-intersection") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Bag($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Bag($dt) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let a = as_bag(&a, self.id())?;
                    let b = as_bag(&b, self.id())?;
                    let mut values = Vec::new();
                    for v in a.iter() {
                        if b.contains(v) && !values.contains(v) {
                            values.push(v.clone());
                        }
                    }
                    Ok(EvaluatedValue::Bag(Bag::new($dt, values)))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-subset`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix SubsetFunction>];

            impl Function for [<$prefix SubsetFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-subset") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Bag($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let a = as_bag(&a, self.id())?;
                    let b = as_bag(&b, self.id())?;
                    Ok(EvaluatedValue::Single(AttributeValue::Boolean(
                        a.iter().all(|v| b.contains(v))
                    )))
                }
            }

            #[doc = concat!("`", $uri_prefix, "-set-equals`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct [<$prefix SetEqualsFunction>];

            impl Function for [<$prefix SetEqualsFunction>] {
                fn id(&self) -> &str { concat!($uri_prefix, "-set-equals") }
                fn param_types(&self) -> &[ValueType] {
                    const P: [ValueType; 2] = [ValueType::Bag($dt), ValueType::Bag($dt)];
                    &P
                }
                fn return_type(&self) -> ValueType { ValueType::Primitive(Datatype::Boolean) }
                fn call(&self, ctx: &mut EvaluationContext, args: &[Expression]) -> EvalResult {
                    let a = args[0].evaluate(ctx)?;
                    let b = args[1].evaluate(ctx)?;
                    let a = as_bag(&a, self.id())?;
                    let b = as_bag(&b, self.id())?;
                    let subset = |x: &Bag, y: &Bag| x.iter().all(|v| y.contains(v));
                    Ok(EvaluatedValue::Single(AttributeValue::Boolean(
                        subset(a, b) && subset(b, a)
                    )))
                }
            }

            fn [<$prefix:snake _family_functions>]() -> Vec<Arc<dyn Function>> {
                vec![
                    Arc::new([<$prefix BagFunction>]),
                    Arc::new([<$prefix OneAndOnlyFunction>]),
                    Arc::new([<$prefix BagSizeFunction>]),
                    Arc::new([<$prefix IsInFunction>]),
                    Arc::new([<$prefix AtLeastOneMemberOfFunction>]),
                    Arc::new([<$prefix UnionFunction>]),
                    Arc::new([<$prefix IntersectionFunction>]),
                    Arc::new([<$prefix SubsetFunction>]),
                    Arc::new([<$prefix SetEqualsFunction>]),
                ]
            }
        }
    };
}

define_bag_family!(String, "urn:oasis:names:tc:xacml:1.0:function:string", Datatype::String);
define_bag_family!(Integer, "urn:oasis:names:tc:xacml:1.0:function:integer", Datatype::Integer);
define_bag_family!(Double, "urn:oasis:names:tc:xacml:1.0:function:double", Datatype::Double);
define_bag_family!(Boolean, "urn:oasis:names:tc:xacml:1.0:function:boolean", Datatype::Boolean);
define_bag_family!(AnyUri, "urn:oasis:names:tc:xacml:1.0:function:anyURI", Datatype::AnyUri);

/// All standard bag functions.
pub fn functions() -> Vec<Arc<dyn Function>> {
    let mut fns = Vec::new();
    fns.extend(string_family_functions());
    fns.extend(integer_family_functions());
    fns.extend(double_family_functions());
    fns.extend(boolean_family_functions());
    fns.extend(any_uri_family_functions());
    fns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    #[test]
    fn string_bag_collects_values() {
        let mut ctx = EvaluationContext::for_testing();
        let args = vec![
            Expression::Constant(AttributeValue::String("a".into())),
            Expression::Constant(AttributeValue::String("b".into())),
        ];
        let r = StringBagFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_bag().unwrap().size(), 2);
    }

    #[test]
    fn string_is_in_true() {
        let mut ctx = EvaluationContext::for_testing();
        let bag = Expression::ConstantBag(Bag::new(
            Datatype::String,
            vec![AttributeValue::String("a".into()), AttributeValue::String("b".into())],
        ));
        let args = vec![Expression::Constant(AttributeValue::String("a".into())), bag];
        let r = StringIsInFunction.call(&mut ctx, &args).unwrap();
        assert_eq!(r.as_boolean(), Some(true));
    }

    #[test]
    fn string_one_and_only_rejects_multi_element_bag() {
        let mut ctx = EvaluationContext::for_testing();
        let bag = Expression::ConstantBag(Bag::new(
            Datatype::String,
            vec![AttributeValue::String("a".into()), AttributeValue::String("b".into())],
        ));
        assert!(StringOneAndOnlyFunction.call(&mut ctx, &[bag]).is_err());
    }
}
