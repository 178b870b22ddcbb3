//! I define [`parse_value`], the "Value & Datatype registry"'s
//! `parse(datatypeId, lexicalForm) → AttributeValue` entry point from spec
//! §4.A.

use std::net::IpAddr;

use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::{AttributeValue, Datatype};

/// Parse a lexical form against a known [`Datatype`] into an
/// [`AttributeValue`].
///
/// An unknown datatype is not representable by this function's signature —
/// callers resolve the URI to a [`Datatype`] via [`Datatype::from_uri`]
/// first, and a `None` there is itself the "unknown datatype → syntax-error"
/// case from spec §4.A.
pub fn parse_value(datatype: Datatype, lexical: &str) -> Result<AttributeValue, ValueParseError> {
    let err = || ValueParseError {
        datatype,
        lexical: lexical.to_owned(),
    };
    Ok(match datatype {
        Datatype::String => AttributeValue::String(lexical.to_owned()),
        Datatype::Boolean => match lexical {
            "true" | "1" => AttributeValue::Boolean(true),
            "false" | "0" => AttributeValue::Boolean(false),
            _ => return Err(err()),
        },
        Datatype::Integer => AttributeValue::Integer(lexical.trim().parse().map_err(|_| err())?),
        Datatype::Double => {
            AttributeValue::Double(parse_double(lexical).ok_or_else(err)?)
        }
        Datatype::Time => {
            AttributeValue::Time(parse_time(lexical).ok_or_else(err)?)
        }
        Datatype::Date => {
            AttributeValue::Date(NaiveDate::parse_from_str(lexical, "%Y-%m-%d").map_err(|_| err())?)
        }
        Datatype::DateTime => {
            AttributeValue::DateTime(parse_date_time(lexical).ok_or_else(err)?)
        }
        Datatype::DayTimeDuration => {
            AttributeValue::DayTimeDuration(lexical.parse().map_err(|_| err())?)
        }
        Datatype::YearMonthDuration => {
            AttributeValue::YearMonthDuration(lexical.parse().map_err(|_| err())?)
        }
        Datatype::AnyUri => AttributeValue::AnyUri(lexical.to_owned()),
        Datatype::HexBinary => {
            AttributeValue::HexBinary(hex::decode(lexical).map_err(|_| err())?)
        }
        Datatype::Base64Binary => AttributeValue::Base64Binary(
            base64::engine::general_purpose::STANDARD
                .decode(lexical)
                .map_err(|_| err())?,
        ),
        Datatype::X500Name => AttributeValue::X500Name(lexical.to_owned()),
        Datatype::Rfc822Name => {
            let (local, domain) = lexical.rsplit_once('@').ok_or_else(err)?;
            AttributeValue::Rfc822Name(local.to_owned(), domain.to_owned())
        }
        Datatype::IpAddress => {
            let (addr_part, rest) = split_ip_rest(lexical);
            let addr: IpAddr = addr_part.parse().map_err(|_| err())?;
            AttributeValue::IpAddress(addr, rest)
        }
        Datatype::DnsName => {
            let (host, port) = match lexical.split_once(':') {
                Some((h, p)) => (h.to_owned(), Some(p.to_owned())),
                None => (lexical.to_owned(), None),
            };
            AttributeValue::DnsName(host, port)
        }
    })
}

fn parse_double(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "INF" | "Infinity" => Some(f64::INFINITY),
        "-INF" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse().ok(),
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    // Accept an optional trailing "Z" (UTC) or offset, ignored: the core
    // engine is timezone-naive per the `chrono::Naive*` types used
    // throughout.
    let trimmed = s.trim_end_matches('Z');
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn split_ip_rest(s: &str) -> (&str, Option<String>) {
    match s.split_once('/') {
        Some((addr, _)) => (addr, Some(s[addr.len()..].to_owned())),
        None => match s.split_once(':') {
            Some((addr, _)) if addr.parse::<IpAddr>().is_ok() => {
                (addr, Some(s[addr.len()..].to_owned()))
            }
            _ => (s, None),
        },
    }
}

/// A lexical form could not be parsed against its declared datatype.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid lexical form {lexical:?} for datatype {datatype}")]
pub struct ValueParseError {
    datatype: Datatype,
    lexical: String,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Datatype::Integer, "42")]
    #[case(Datatype::Boolean, "true")]
    #[case(Datatype::Double, "3.14")]
    #[case(Datatype::AnyUri, "http://example.org")]
    #[case(Datatype::HexBinary, "0FB7")]
    fn parses_without_error(#[case] dt: Datatype, #[case] lexical: &str) {
        assert!(parse_value(dt, lexical).is_ok());
    }

    #[test]
    fn rejects_bad_boolean() {
        assert!(parse_value(Datatype::Boolean, "yes").is_err());
    }

    #[test]
    fn hex_binary_roundtrips_upper_case() {
        let v = parse_value(Datatype::HexBinary, "0fb7").unwrap();
        assert_eq!(v.canonical_lexical_form(), "0FB7");
    }
}
