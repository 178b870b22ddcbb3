//! I define the typed value and datatype model: [`Datatype`], [`AttributeValue`],
//! [`Bag`], and [`AttributeFqn`], per spec §3 and §4.A.
//!
//! Datatypes form a disjoint tagged union — there is no implicit widening
//! between e.g. `integer` and `double`, matching XACML §B.

mod duration;
mod parse;

use std::{cmp::Ordering, fmt, hash::Hash, net::IpAddr};

use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub use duration::{DayTimeDuration, YearMonthDuration};
pub use parse::{parse_value, ValueParseError};

use crate::status::XacmlStatus;

/// Identifier (URI) for one of the XACML standard primitive datatypes.
///
/// This is a closed, tagged union rather than an open string identifier:
/// per the "Inheritance → tagged variants" design note (spec §9), the
/// standard datatype set is represented as a closed enum for dispatch
/// performance, while the XACML identifier URI is recovered via
/// [`Datatype::uri`] for interop with policy documents and status details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// `http://www.w3.org/2001/XMLSchema#string`
    String,
    /// `http://www.w3.org/2001/XMLSchema#boolean`
    Boolean,
    /// `http://www.w3.org/2001/XMLSchema#integer`
    Integer,
    /// `http://www.w3.org/2001/XMLSchema#double`
    Double,
    /// `http://www.w3.org/2001/XMLSchema#time`
    Time,
    /// `http://www.w3.org/2001/XMLSchema#date`
    Date,
    /// `http://www.w3.org/2001/XMLSchema#dateTime`
    DateTime,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration`
    DayTimeDuration,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:yearMonthDuration`
    YearMonthDuration,
    /// `http://www.w3.org/2001/XMLSchema#anyURI`
    AnyUri,
    /// `http://www.w3.org/2001/XMLSchema#hexBinary`
    HexBinary,
    /// `http://www.w3.org/2001/XMLSchema#base64Binary`
    Base64Binary,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:x500Name`
    X500Name,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name`
    Rfc822Name,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:ipAddress`
    IpAddress,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:dnsName`
    DnsName,
}

impl Datatype {
    /// All standard primitive datatypes, leaves-first order matching §3.
    pub const ALL: [Datatype; 16] = [
        Datatype::String,
        Datatype::Boolean,
        Datatype::Integer,
        Datatype::Double,
        Datatype::Time,
        Datatype::Date,
        Datatype::DateTime,
        Datatype::DayTimeDuration,
        Datatype::YearMonthDuration,
        Datatype::AnyUri,
        Datatype::HexBinary,
        Datatype::Base64Binary,
        Datatype::X500Name,
        Datatype::Rfc822Name,
        Datatype::IpAddress,
        Datatype::DnsName,
    ];

    /// The XACML/XML-Schema identifier URI of this datatype.
    pub const fn uri(self) -> &'static str {
        match self {
            Datatype::String => "http://www.w3.org/2001/XMLSchema#string",
            Datatype::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Datatype::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Datatype::Double => "http://www.w3.org/2001/XMLSchema#double",
            Datatype::Time => "http://www.w3.org/2001/XMLSchema#time",
            Datatype::Date => "http://www.w3.org/2001/XMLSchema#date",
            Datatype::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Datatype::DayTimeDuration => "urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration",
            Datatype::YearMonthDuration => {
                "urn:oasis:names:tc:xacml:2.0:data-type:yearMonthDuration"
            }
            Datatype::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Datatype::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Datatype::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Datatype::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            Datatype::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            Datatype::IpAddress => "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress",
            Datatype::DnsName => "urn:oasis:names:tc:xacml:2.0:data-type:dnsName",
        }
    }

    /// Resolve a datatype from its identifier URI. Unknown URI → `None`,
    /// which callers turn into a syntax-error status per §4.A.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dt| dt.uri() == uri)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// The return/parameter type of an expression or function argument: either a
/// single primitive datatype or a bag of one. Kept distinct from [`Datatype`]
/// because XACML's type system never implicitly widens a primitive to its
/// bag (and vice versa) — see spec §3 "Expression".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A single value of the given primitive datatype.
    Primitive(Datatype),
    /// A bag of the given primitive datatype.
    Bag(Datatype),
}

impl ValueType {
    /// The primitive datatype underlying this value type, whether primitive
    /// or bagged.
    pub fn datatype(self) -> Datatype {
        match self {
            ValueType::Primitive(dt) | ValueType::Bag(dt) => dt,
        }
    }

    /// Whether this is a bag type.
    pub fn is_bag(self) -> bool {
        matches!(self, ValueType::Bag(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(dt) => write!(f, "{dt}"),
            ValueType::Bag(dt) => write!(f, "bag({dt})"),
        }
    }
}

/// An immutable `(Datatype, payload)` pair, per spec §3 "AttributeValue".
///
/// Equality is by `(datatype, canonical form)`: two values of different
/// datatypes are never equal, even if their lexical forms coincide (e.g. the
/// string `"1"` is never equal to the integer `1`).
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// `xs:string`.
    String(String),
    /// `xs:boolean`.
    Boolean(bool),
    /// `xs:integer`, represented as a 64-bit signed integer.
    Integer(i64),
    /// `xs:double`.
    Double(f64),
    /// `xs:time`.
    Time(NaiveTime),
    /// `xs:date`.
    Date(NaiveDate),
    /// `xs:dateTime`.
    DateTime(NaiveDateTime),
    /// `xacml:dayTimeDuration`.
    DayTimeDuration(DayTimeDuration),
    /// `xacml:yearMonthDuration`.
    YearMonthDuration(YearMonthDuration),
    /// `xs:anyURI`.
    AnyUri(String),
    /// `xs:hexBinary`, canonical lexical form is upper-case hex per XACML §B.
    HexBinary(Vec<u8>),
    /// `xs:base64Binary`.
    Base64Binary(Vec<u8>),
    /// `xacml:x500Name`, stored in its (non-normalized) lexical string form.
    X500Name(String),
    /// `xacml:rfc822Name`, `(local-part, domain)` with domain compared
    /// case-insensitively per XACML §B.13.
    Rfc822Name(String, String),
    /// `xacml:ipAddress`, optional mask and port range are carried in the
    /// lexical form but not modeled structurally beyond the address.
    IpAddress(IpAddr, Option<String>),
    /// `xacml:dnsName`, `(hostname, optional port range)`.
    DnsName(String, Option<String>),
}

impl AttributeValue {
    /// The datatype tag of this value.
    pub fn datatype(&self) -> Datatype {
        match self {
            AttributeValue::String(_) => Datatype::String,
            AttributeValue::Boolean(_) => Datatype::Boolean,
            AttributeValue::Integer(_) => Datatype::Integer,
            AttributeValue::Double(_) => Datatype::Double,
            AttributeValue::Time(_) => Datatype::Time,
            AttributeValue::Date(_) => Datatype::Date,
            AttributeValue::DateTime(_) => Datatype::DateTime,
            AttributeValue::DayTimeDuration(_) => Datatype::DayTimeDuration,
            AttributeValue::YearMonthDuration(_) => Datatype::YearMonthDuration,
            AttributeValue::AnyUri(_) => Datatype::AnyUri,
            AttributeValue::HexBinary(_) => Datatype::HexBinary,
            AttributeValue::Base64Binary(_) => Datatype::Base64Binary,
            AttributeValue::X500Name(_) => Datatype::X500Name,
            AttributeValue::Rfc822Name(_, _) => Datatype::Rfc822Name,
            AttributeValue::IpAddress(_, _) => Datatype::IpAddress,
            AttributeValue::DnsName(_, _) => Datatype::DnsName,
        }
    }

    /// The canonical lexical form of this value, per XACML §B.
    pub fn canonical_lexical_form(&self) -> String {
        match self {
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Double(d) => canonical_double(*d),
            AttributeValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            AttributeValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            AttributeValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            AttributeValue::DayTimeDuration(d) => d.to_string(),
            AttributeValue::YearMonthDuration(d) => d.to_string(),
            AttributeValue::AnyUri(s) => s.clone(),
            AttributeValue::HexBinary(bytes) => hex::encode_upper(bytes),
            AttributeValue::Base64Binary(bytes) => {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            AttributeValue::X500Name(s) => s.clone(),
            AttributeValue::Rfc822Name(local, domain) => format!("{local}@{domain}"),
            AttributeValue::IpAddress(addr, rest) => match rest {
                Some(rest) => format!("{addr}{rest}"),
                None => addr.to_string(),
            },
            AttributeValue::DnsName(host, port) => match port {
                Some(port) => format!("{host}:{port}"),
                None => host.clone(),
            },
        }
    }

    /// Extract a `bool`, if this is a `xs:boolean` value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract a `&str`, if this value's natural representation is a string
    /// (`string`, `anyURI`, `x500Name`).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::AnyUri(s) | AttributeValue::X500Name(s) => {
                Some(s)
            }
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        if self.datatype() != other.datatype() {
            return false;
        }
        match (self, other) {
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a == b,
            (AttributeValue::Rfc822Name(la, da), AttributeValue::Rfc822Name(lb, db)) => {
                la == lb && da.eq_ignore_ascii_case(db)
            }
            (AttributeValue::DnsName(ha, pa), AttributeValue::DnsName(hb, pb)) => {
                ha.eq_ignore_ascii_case(hb) && pa == pb
            }
            // XML-Schema value equality, not lexical equality: `PT1H` and
            // `PT60M` (or `P1D` and `PT24H`) name the same duration.
            (AttributeValue::DayTimeDuration(a), AttributeValue::DayTimeDuration(b)) => a == b,
            (AttributeValue::YearMonthDuration(a), AttributeValue::YearMonthDuration(b)) => a == b,
            _ => self.canonical_lexical_form() == other.canonical_lexical_form(),
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.datatype().hash(state);
        match self {
            // Hash in lock-step with the value-equality special cases above,
            // so equal durations also hash equal.
            AttributeValue::DayTimeDuration(d) => d.hash(state),
            AttributeValue::YearMonthDuration(d) => d.hash(state),
            _ => self.canonical_lexical_form().hash(state),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.datatype() != other.datatype() {
            return None;
        }
        match (self, other) {
            (AttributeValue::String(a), AttributeValue::String(b)) => a.partial_cmp(b),
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => a.partial_cmp(b),
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a.partial_cmp(b),
            (AttributeValue::Time(a), AttributeValue::Time(b)) => a.partial_cmp(b),
            (AttributeValue::Date(a), AttributeValue::Date(b)) => a.partial_cmp(b),
            (AttributeValue::DateTime(a), AttributeValue::DateTime(b)) => a.partial_cmp(b),
            (AttributeValue::DayTimeDuration(a), AttributeValue::DayTimeDuration(b)) => {
                a.partial_cmp(b)
            }
            (AttributeValue::YearMonthDuration(a), AttributeValue::YearMonthDuration(b)) => {
                a.partial_cmp(b)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_lexical_form())
    }
}

fn canonical_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_owned();
    }
    if d.is_infinite() {
        return if d > 0.0 { "INF".to_owned() } else { "-INF".to_owned() };
    }
    // XACML §B.3: canonical form always carries at least one fractional digit.
    if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{d:.1}")
    } else {
        format!("{d}")
    }
}

/// An unordered multiset of values of a single primitive datatype, per spec
/// §3 "Bag<T>".
///
/// A bag may carry an `indeterminate_cause`: a failed sub-evaluation (e.g. a
/// designator that resolved to an error rather than a value) can still
/// produce an "empty bag with cause", distinct from a plain empty bag
/// produced by a designator that legitimately resolved to nothing.
#[derive(Debug, Clone)]
pub struct Bag {
    datatype: Datatype,
    values: Vec<AttributeValue>,
    indeterminate_cause: Option<XacmlStatus>,
}

impl Bag {
    /// An empty bag of the given datatype, with no indeterminate cause.
    pub fn empty(datatype: Datatype) -> Self {
        Self {
            datatype,
            values: Vec::new(),
            indeterminate_cause: None,
        }
    }

    /// An empty bag of the given datatype, carrying the status that caused
    /// it to be empty (e.g. a `mustBePresent=false` designator whose
    /// resolution nonetheless errored).
    pub fn empty_with_cause(datatype: Datatype, cause: XacmlStatus) -> Self {
        Self {
            datatype,
            values: Vec::new(),
            indeterminate_cause: Some(cause),
        }
    }

    /// Build a bag from values, all of which must share `datatype`.
    ///
    /// # Panics
    /// Panics in debug builds if any value's datatype disagrees — this is a
    /// construction-time invariant, not a runtime request-shaped error.
    pub fn new(datatype: Datatype, values: Vec<AttributeValue>) -> Self {
        debug_assert!(values.iter().all(|v| v.datatype() == datatype));
        Self {
            datatype,
            values,
            indeterminate_cause: None,
        }
    }

    /// A bag containing exactly one value.
    pub fn singleton(value: AttributeValue) -> Self {
        let datatype = value.datatype();
        Self {
            datatype,
            values: vec![value],
            indeterminate_cause: None,
        }
    }

    /// The datatype of every element in this bag.
    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    /// Number of elements, per spec `size()`.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag has no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the bag's elements in insertion order (the bag is
    /// logically unordered but iteration order is stable for a given value).
    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    /// Borrow the elements as a slice.
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Consume into the owned element vector.
    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    /// Whether `value` is a member of this bag.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }

    /// The cause of this bag being empty, if it was produced by a failed
    /// sub-evaluation rather than legitimate absence.
    pub fn indeterminate_cause(&self) -> Option<&XacmlStatus> {
        self.indeterminate_cause.as_ref()
    }
}

impl PartialEq for Bag {
    /// Multiset equality: same datatype, same elements with the same
    /// multiplicities, order-independent.
    fn eq(&self, other: &Self) -> bool {
        if self.datatype != other.datatype || self.values.len() != other.values.len() {
            return false;
        }
        let mut remaining: Vec<&AttributeValue> = other.values.iter().collect();
        for v in &self.values {
            match remaining.iter().position(|o| *o == v) {
                Some(idx) => {
                    remaining.swap_remove(idx);
                }
                None => return false,
            }
        }
        true
    }
}

impl Eq for Bag {}

impl FromIterator<AttributeValue> for Bag {
    fn from_iter<T: IntoIterator<Item = AttributeValue>>(iter: T) -> Self {
        let values: Vec<AttributeValue> = iter.into_iter().collect();
        let datatype = values
            .first()
            .map(|v| v.datatype())
            .unwrap_or(Datatype::String);
        Self::new(datatype, values)
    }
}

/// `(category URI, attribute id URI, optional issuer URI)`, per spec §3
/// "AttributeFqn".
///
/// Equality is component-wise. A designator with no issuer may, per XACML
/// §5.29, match any issuer unless `strictAttributeIssuerMatch` is configured
/// — that policy choice is applied by [`crate::context::EvaluationContext`],
/// not encoded here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeFqn {
    /// The attribute category URI (e.g.
    /// `urn:oasis:names:tc:xacml:1.0:subject-category:access-subject`).
    pub category: String,
    /// The attribute id URI.
    pub id: String,
    /// The optional issuer URI.
    pub issuer: Option<String>,
}

impl AttributeFqn {
    /// Build a new fully-qualified attribute name.
    pub fn new(
        category: impl Into<String>,
        id: impl Into<String>,
        issuer: Option<String>,
    ) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            issuer,
        }
    }

    /// Whether `self` (a lookup key with an optional issuer) matches a
    /// `namedAttributes` entry's fqn `stored`, honouring §5.29's relaxed
    /// issuer matching unless `strict` is requested.
    pub fn matches(&self, stored: &AttributeFqn, strict: bool) -> bool {
        if self.category != stored.category || self.id != stored.id {
            return false;
        }
        match (&self.issuer, &stored.issuer) {
            (Some(a), Some(b)) => a == b,
            (None, _) => !strict,
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for AttributeFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issuer {
            Some(issuer) => write!(f, "{}#{} (issuer: {})", self.category, self.id, issuer),
            None => write!(f, "{}#{}", self.category, self.id),
        }
    }
}

/// The standard XACML attribute categories, per the core schema.
pub mod category {
    /// `urn:oasis:names:tc:xacml:1.0:subject-category:access-subject`
    pub const SUBJECT: &str = "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
    /// `urn:oasis:names:tc:xacml:3.0:attribute-category:resource`
    pub const RESOURCE: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
    /// `urn:oasis:names:tc:xacml:3.0:attribute-category:action`
    pub const ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
    /// `urn:oasis:names:tc:xacml:3.0:attribute-category:environment`
    pub const ENVIRONMENT: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";
}

/// The standard PDP-issued environment attribute ids, per spec §4.I.
pub mod environment_attr {
    /// `urn:oasis:names:tc:xacml:1.0:environment:current-time`
    pub const CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";
    /// `urn:oasis:names:tc:xacml:1.0:environment:current-date`
    pub const CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
    /// `urn:oasis:names:tc:xacml:1.0:environment:current-dateTime`
    pub const CURRENT_DATETIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Datatype::String, "http://www.w3.org/2001/XMLSchema#string")]
    #[case(Datatype::Integer, "http://www.w3.org/2001/XMLSchema#integer")]
    #[case(
        Datatype::DayTimeDuration,
        "urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration"
    )]
    fn datatype_uri_roundtrips(#[case] dt: Datatype, #[case] uri: &str) {
        assert_eq!(dt.uri(), uri);
        assert_eq!(Datatype::from_uri(uri), Some(dt));
    }

    #[test]
    fn bag_equality_is_multiset() {
        let a = Bag::new(
            Datatype::Integer,
            vec![AttributeValue::Integer(1), AttributeValue::Integer(2)],
        );
        let b = Bag::new(
            Datatype::Integer,
            vec![AttributeValue::Integer(2), AttributeValue::Integer(1)],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn empty_bag_with_cause_differs_from_plain_empty() {
        let plain = Bag::empty(Datatype::String);
        assert!(plain.indeterminate_cause().is_none());
        assert!(plain.is_empty());
    }

    #[test]
    fn attribute_fqn_relaxed_issuer_match() {
        let stored = AttributeFqn::new("cat", "id", Some("issuer-a".to_owned()));
        let lookup = AttributeFqn::new("cat", "id", None);
        assert!(lookup.matches(&stored, false));
        assert!(!lookup.matches(&stored, true));
    }

    #[test]
    fn string_values_are_not_equal_to_same_lexical_integer() {
        let s = AttributeValue::String("1".to_owned());
        let i = AttributeValue::Integer(1);
        assert_ne!(s, i);
    }
}
