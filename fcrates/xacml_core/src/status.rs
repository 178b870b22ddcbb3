//! I define [`XacmlStatus`], the reified status/error type shared by
//! load-time-fatal errors and by `Indeterminate` decision results.
//!
//! This generalizes [`dyn_problem::type_::ProblemType`] from anonymous,
//! uuid-keyed problem types to the fixed, well-known status-code URIs
//! defined by XACML §7.
//!

use std::sync::Arc;

use dyn_problem::{
    type_::{LazyStaticProblemType, ProblemType},
    Problem, ProblemBuilderExt,
};
use typed_record::TypedRecordKey;

use crate::expr::AttributeDesignator;

/// Type alias: a [`Problem`] identified by one of the [`XacmlStatus`] types.
///
/// Wrapped in [`Arc`] (rather than a bare [`Problem`]) because a
/// [`crate::combining::DecisionResult`] carrying this status must be cheaply
/// [`Clone`]-able: combining algorithms remember the strongest result seen so
/// far across siblings, and the decision cache (§4.L) stores/retrieves
/// results by value.
pub type XacmlStatus = Arc<Problem>;

/// Macro to define a set of well-known (non-anonymous) XACML status types,
/// each identified by its own fixed status-code URI.
macro_rules! define_status_types {
    (
        $($(#[$outer:meta])*$NAME:ident: ($id:literal, $title:expr);)*
    ) => {
        $(
            #[allow(missing_docs)]
            $(#[$outer])*
            pub static $NAME: LazyStaticProblemType = LazyStaticProblemType::new(|| ProblemType {
                id: $id.parse().expect("status id must be a valid uri reference"),
                title: $title.to_owned(),
            });
        )*
    };
}

define_status_types!(
    /// The decision was produced without error.
    STATUS_OK: ("urn:oasis:names:tc:xacml:1.0:status:ok", "Ok.");

    /// A required attribute could not be resolved.
    ///
    /// Carries [`MissingAttributeDetail`] identifying the offending designator.
    STATUS_MISSING_ATTRIBUTE: (
        "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
        "Missing attribute."
    );

    /// A policy, policy set, or request was syntactically invalid.
    STATUS_SYNTAX_ERROR: (
        "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
        "Syntax error."
    );

    /// An internal error occurred while evaluating the request.
    STATUS_PROCESSING_ERROR: (
        "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        "Processing error."
    );
);

/// Typed-record key for attaching the offending [`AttributeDesignator`] to a
/// [`STATUS_MISSING_ATTRIBUTE`] status, per §7: "The offending
/// `AttributeDesignator` MUST be attached to the status detail."
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingAttributeDetailKey;

impl TypedRecordKey for MissingAttributeDetailKey {
    type Value = AttributeDesignator;
}

/// Build a [`XacmlStatus`] for a missing required attribute, with the
/// offending designator attached as structured detail.
pub fn missing_attribute_status(designator: AttributeDesignator) -> XacmlStatus {
    Arc::new(
        STATUS_MISSING_ATTRIBUTE
            .new_problem_builder()
            .message(format!(
                "Attribute {:?} was required (MustBePresent) but could not be resolved.",
                designator.fqn
            ))
            .extend_with::<MissingAttributeDetailKey>(designator)
            .finish(),
    )
}

/// Build a [`XacmlStatus`] for a processing error with the given message.
pub fn processing_error_status(message: impl Into<String>) -> XacmlStatus {
    Arc::new(
        STATUS_PROCESSING_ERROR
            .new_problem_builder()
            .message(message.into())
            .finish(),
    )
}

/// Build a [`XacmlStatus`] for a syntax error with the given message.
pub fn syntax_error_status(message: impl Into<String>) -> XacmlStatus {
    Arc::new(
        STATUS_SYNTAX_ERROR
            .new_problem_builder()
            .message(message.into())
            .finish(),
    )
}

/// Check if given status is of [`STATUS_OK`] type.
#[inline]
pub fn is_ok_status(status: &XacmlStatus) -> bool {
    STATUS_OK.is_type_of(status)
}
