//! This crate provides the core, embeddable evaluation engine of an OASIS
//! XACML 3.0 policy decision point: the typed value/datatype model, the
//! expression and function library, Target/Condition matching, Rule/Policy/
//! PolicySet evaluators, the eleven standard combining algorithms, and the
//! root policy reference resolver.
//!
//! This crate is deliberately request/response-shape agnostic — it knows
//! nothing about XML/JSON wire formats, Multiple-Decision request fan-out,
//! or decision caching. Those concerns live in `xacml_pdp`, which composes
//! the types here into a full PDP engine.

#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod combining;
pub mod condition;
pub mod context;
pub mod expr;
pub mod function;
pub mod obligation;
pub mod policy;
pub mod policyset;
pub mod resolver;
pub mod rule;
pub mod status;
pub mod target;
pub mod value;
