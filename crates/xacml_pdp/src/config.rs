//! `PdpConfig`, per spec §6 "Configuration" and §10.C.
//!
//! Extension registries (datatypes, functions, combining algorithms,
//! attribute providers, policy providers, decision cache, request
//! preprocessor, result post-processor) are supplied programmatically to
//! [`crate::engine::Pdp::bootstrap`] as trait objects — they are not
//! deserialized, consistent with "registered extensions" being code, not
//! config data.

use serde::Deserialize;

fn default_max_reference_depth() -> usize {
    10
}

/// Which source standard environment attributes (`current-time`,
/// `current-date`, `current-dateTime`) are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardEnvironmentAttributeSource {
    /// Always use the PDP-issued snapshot, ignoring any request-supplied
    /// values for these attributes.
    PdpOnly,
    /// Prefer a request-supplied value; fall back to the PDP-issued
    /// snapshot when absent.
    RequestElsePdp,
    /// Use only request-supplied values; these attributes are otherwise
    /// unavailable.
    RequestOnly,
}

impl Default for StandardEnvironmentAttributeSource {
    fn default() -> Self {
        Self::PdpOnly
    }
}

/// A (id, optional version-match) pointer to the policy/policy-set this PDP
/// evaluates requests against.
#[derive(Debug, Clone, Deserialize)]
pub struct RootPolicyRef {
    /// The root policy or policy set id.
    pub id: String,
    /// An optional version-match expression; `None` means "latest".
    #[serde(default)]
    pub version_match: Option<String>,
}

/// Deserializable PDP bootstrap configuration, per spec §6.
#[derive(Debug, Clone, Deserialize)]
pub struct PdpConfig {
    /// Maximum `VariableReference` resolution depth before a cycle/overflow
    /// is treated as load-time fatal.
    #[serde(default = "default_max_reference_depth")]
    pub max_variable_reference_depth: usize,
    /// Maximum policy/policy-set reference depth (spec §4.H).
    #[serde(default = "default_max_reference_depth")]
    pub max_policy_reference_depth: usize,
    /// Whether an `AttributeDesignator` with no issuer matches only
    /// stored attributes that also have no issuer.
    #[serde(default)]
    pub strict_attribute_issuer_match: bool,
    /// Source of the standard environment attributes.
    #[serde(default)]
    pub standard_environment_attribute_source: StandardEnvironmentAttributeSource,
    /// Whether `AttributeSelector` (XPath) resolution is enabled.
    #[serde(default)]
    pub xpath_enabled: bool,
    /// The root policy/policy-set this PDP evaluates against.
    pub root_policy_ref: RootPolicyRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limits_default_to_ten() {
        let config: PdpConfig =
            serde_json::from_str(r#"{"root_policy_ref": {"id": "root-policy"}}"#).unwrap();
        assert_eq!(config.max_variable_reference_depth, 10);
        assert_eq!(config.max_policy_reference_depth, 10);
        assert!(!config.xpath_enabled);
    }
}
