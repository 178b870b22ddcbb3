//! This crate composes `xacml_core`'s evaluation engine into a full OASIS
//! XACML 3.0 policy decision point: request preprocessing (including
//! Multiple-Decision repeated-attribute-categories fan-out), an attribute
//! provider registry, a decision cache, and the PDP engine with its result
//! post-processor.
//!
//! `xacml_core` knows how to evaluate one already-resolved policy tree
//! against one already-built [`xacml_core::context::EvaluationContext`];
//! this crate knows how to get there from an inbound XACML `Request` and
//! back out to an XACML `Response`, per spec §4.J/§4.K/§4.L/§4.M.

#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod providers;
pub mod request;

pub use engine::{Pdp, Response, XacmlResult};
