// hostplane-config/src/validation.rs
//! Validator rules applied to coerced values.
//!
//! Each parameter carries one [`Rule`]. Rules are bound when the registry is
//! built and checked against the parameter kind there, so dispatch never
//! depends on runtime string lookups.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidateIp, ValidationError};

use crate::kind::ValueKind;
use crate::value::{PortRange, ProtoPort, RouteTableRange, Value};

lazy_static! {
    static ref INTERFACE_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_.-]{1,15}$").expect("static regex");
    static ref INTERFACE_FILTER: Regex =
        Regex::new(r"^[a-zA-Z0-9:._+-]{1,15}\+?$").expect("static regex");
    static ref DNS_NAME: Regex = Regex::new(
        r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("static regex");
    static ref K8S_SERVICE: Regex =
        Regex::new(r"^k8s-service:([a-z0-9-]{1,63}/)?[a-z0-9-]{1,63}(:[0-9]{1,5})?$")
            .expect("static regex");
}

/// Lowest routing table index the dataplane may claim.
pub const ROUTE_TABLE_MIN: i64 = 1;
/// Highest routing table index; 253..=255 are reserved by the kernel.
pub const ROUTE_TABLE_MAX: i64 = 250;

const PROTOCOLS: &[&str] = &["tcp", "udp", "sctp"];

/// A validator rule bound to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Any,
    /// Inclusive integer bounds.
    Range { min: i64, max: i64 },
    Positive,
    NonEmpty,
    /// The string must compile as a regular expression.
    Regex,
    InterfaceName,
    InterfaceFilter,
    /// Interface names or `/regex/` entries.
    InterfaceList,
    /// Empty, an IP address or a DNS name.
    Host,
    /// Empty or an IP address.
    IpAddr,
    MarkMask,
    /// `key=true|false|` feature overrides.
    FeatureOverrides,
    DnsServers,
    ProtoPorts,
    PortRanges,
    RouteTableRange,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Any => "any",
            Rule::Range { .. } => "range",
            Rule::Positive => "positive",
            Rule::NonEmpty => "non-empty",
            Rule::Regex => "regex",
            Rule::InterfaceName => "interface-name",
            Rule::InterfaceFilter => "interface-filter",
            Rule::InterfaceList => "interface-list",
            Rule::Host => "host",
            Rule::IpAddr => "ip-addr",
            Rule::MarkMask => "mark-mask",
            Rule::FeatureOverrides => "feature-overrides",
            Rule::DnsServers => "dns-servers",
            Rule::ProtoPorts => "proto-ports",
            Rule::PortRanges => "port-ranges",
            Rule::RouteTableRange => "route-table-range",
        }
    }

    /// Whether the rule can be applied to values of `kind`.
    pub fn applies_to(&self, kind: ValueKind) -> bool {
        use ValueKind as K;
        match self {
            Rule::Any => true,
            Rule::Range { .. } | Rule::Positive => matches!(kind, K::Int | K::Mark),
            Rule::MarkMask => kind == K::Mark,
            Rule::NonEmpty => matches!(kind, K::Str | K::StringList),
            Rule::Regex
            | Rule::InterfaceName
            | Rule::InterfaceFilter
            | Rule::Host
            | Rule::IpAddr => kind == K::Str,
            Rule::InterfaceList | Rule::DnsServers => kind == K::StringList,
            Rule::FeatureOverrides => kind == K::KeyValueList,
            Rule::ProtoPorts => kind == K::ProtoPortList,
            Rule::PortRanges => matches!(kind, K::PortRange | K::PortRangeList),
            Rule::RouteTableRange => kind == K::RouteTableRange,
        }
    }

    /// Applies the rule to a coerced value.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match (self, value) {
            (Rule::Any, _) => Ok(()),
            (Rule::Range { min, max }, Value::Int(v)) => validate_range(*v, *min, *max),
            (Rule::Positive, Value::Int(v)) => validate_positive(*v),
            (Rule::MarkMask, Value::Int(v)) => validate_mark_mask(*v),
            (Rule::NonEmpty, Value::Str(s)) => validate_non_empty(s),
            (Rule::NonEmpty, Value::List(items)) if items.is_empty() => {
                Err(invalid("empty", "must not be empty".into()))
            }
            (Rule::NonEmpty, Value::List(_)) => Ok(()),
            (Rule::Regex, Value::Str(s)) => validate_regex(s),
            (Rule::InterfaceName, Value::Str(s)) => validate_interface(s),
            (Rule::InterfaceFilter, Value::Str(s)) => validate_interface_filter(s),
            (Rule::InterfaceList, Value::List(items)) => {
                items.iter().try_for_each(|item| validate_interface_entry(item))
            }
            (Rule::Host, Value::Str(s)) => validate_host(s),
            (Rule::IpAddr, Value::Str(s)) => validate_ip(s),
            (Rule::FeatureOverrides, Value::KeyValues(pairs)) => pairs
                .iter()
                .try_for_each(|(k, v)| validate_feature_override(k, v)),
            (Rule::DnsServers, Value::List(items)) => {
                items.iter().try_for_each(|item| validate_dns_server(item))
            }
            (Rule::ProtoPorts, Value::ProtoPorts(ports)) => {
                ports.iter().try_for_each(validate_proto_port)
            }
            (Rule::PortRanges, Value::PortRange(range)) => validate_port_range(range),
            (Rule::PortRanges, Value::PortRanges(ranges)) => {
                ranges.iter().try_for_each(validate_port_range)
            }
            (Rule::RouteTableRange, Value::RouteTableRange(range)) => {
                validate_route_table_range(range)
            }
            (rule, value) => Err(invalid(
                "kind_mismatch",
                format!("rule {} cannot check a {}", rule.name(), value.type_name()),
            )),
        }
    }
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

/// Validate inclusive integer bounds.
pub fn validate_range(value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            "out_of_range",
            format!("{value} is outside [{min}, {max}]"),
        ))
    }
}

pub fn validate_positive(value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(invalid("not_positive", format!("{value} must be greater than 0")))
    }
}

/// Validate that a mark mask leaves at least one bit for the dataplane.
pub fn validate_mark_mask(value: i64) -> Result<(), ValidationError> {
    if value != 0 {
        Ok(())
    } else {
        Err(invalid("empty_mark_mask", "mark mask selects no bits".into()))
    }
}

pub fn validate_non_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(invalid("empty", "must not be empty".into()))
    } else {
        Ok(())
    }
}

pub fn validate_regex(pattern: &str) -> Result<(), ValidationError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| invalid("invalid_regex", e.to_string()))
}

/// Validate that an interface name follows Linux naming conventions.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    if INTERFACE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(invalid(
            "invalid_interface",
            format!("'{name}' is not a valid interface name"),
        ))
    }
}

/// An interface name, optionally ending in `+` to match a prefix. Empty disables the filter.
pub fn validate_interface_filter(filter: &str) -> Result<(), ValidationError> {
    if filter.is_empty() || INTERFACE_FILTER.is_match(filter) {
        Ok(())
    } else {
        Err(invalid(
            "invalid_interface_filter",
            format!("'{filter}' is not a valid interface filter"),
        ))
    }
}

fn validate_interface_entry(entry: &str) -> Result<(), ValidationError> {
    match entry
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
    {
        Some(pattern) => validate_regex(pattern),
        None => validate_interface(entry),
    }
}

pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() || host.validate_ip() || DNS_NAME.is_match(host) {
        Ok(())
    } else {
        Err(invalid(
            "invalid_host",
            format!("'{host}' is neither an IP address nor a host name"),
        ))
    }
}

pub fn validate_ip(addr: &str) -> Result<(), ValidationError> {
    if addr.is_empty() || addr.validate_ip() {
        Ok(())
    } else {
        Err(invalid("invalid_ip", format!("'{addr}' is not an IP address")))
    }
}

fn validate_feature_override(key: &str, value: &str) -> Result<(), ValidationError> {
    match value {
        "true" | "false" | "" => Ok(()),
        other => Err(invalid(
            "invalid_feature_override",
            format!("feature {key} must be true, false or empty, got '{other}'"),
        )),
    }
}

/// `<ip>[:<port>]` (IPv6 with a port in brackets) or `k8s-service:[<ns>/]<name>[:<port>]`.
pub fn validate_dns_server(server: &str) -> Result<(), ValidationError> {
    let ok = K8S_SERVICE.is_match(server)
        || server.parse::<IpAddr>().is_ok()
        || server.parse::<SocketAddr>().is_ok();
    if ok {
        Ok(())
    } else {
        Err(invalid(
            "invalid_dns_server",
            format!("'{server}' is neither <ip>[:<port>] nor k8s-service:[<ns>/]<name>[:<port>]"),
        ))
    }
}

fn validate_proto_port(entry: &ProtoPort) -> Result<(), ValidationError> {
    if !PROTOCOLS.contains(&entry.protocol.as_str()) {
        return Err(invalid(
            "invalid_protocol",
            format!("protocol '{}' must be one of tcp, udp, sctp", entry.protocol),
        ));
    }
    if entry.port == 0 {
        return Err(invalid("invalid_port", format!("'{entry}' uses port 0")));
    }
    Ok(())
}

fn validate_port_range(range: &PortRange) -> Result<(), ValidationError> {
    if range.is_unset() {
        return Ok(());
    }
    if range.min == 0 || range.min > range.max {
        return Err(invalid(
            "invalid_port_range",
            format!("'{range}' must satisfy 0 < min <= max"),
        ));
    }
    Ok(())
}

/// Validate that a route table range lies within the tables the kernel leaves free.
pub fn validate_route_table_range(range: &RouteTableRange) -> Result<(), ValidationError> {
    if range.min > range.max {
        return Err(invalid(
            "inverted_route_table_range",
            format!("min {} is greater than max {}", range.min, range.max),
        ));
    }
    if range.min < ROUTE_TABLE_MIN || range.max > ROUTE_TABLE_MAX {
        return Err(invalid(
            "route_table_range_out_of_bounds",
            format!("{range} is outside [{ROUTE_TABLE_MIN}, {ROUTE_TABLE_MAX}]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::describe_validation_error;

    #[test]
    fn range_is_inclusive() {
        let rule = Rule::Range { min: 1, max: 32765 };
        assert!(rule.validate(&Value::Int(1)).is_ok());
        assert!(rule.validate(&Value::Int(32765)).is_ok());
        let err = rule.validate(&Value::Int(40000)).unwrap_err();
        assert_eq!(describe_validation_error(&err), "40000 is outside [1, 32765]");
    }

    #[test]
    fn interface_lists_accept_regex_entries() {
        let rule = Rule::InterfaceList;
        let ok = Value::List(vec!["kube-ipvs0".into(), "/^veth.*/".into()]);
        assert!(rule.validate(&ok).is_ok());
        let bad = Value::List(vec!["/([unclosed/".into()]);
        assert!(rule.validate(&bad).is_err());
    }

    #[test]
    fn interface_names() {
        assert!(validate_interface("wg.calico").is_ok());
        assert!(validate_interface("this-name-is-too-long").is_err());
        assert!(validate_interface_filter("eth+").is_ok());
        assert!(validate_interface_filter("").is_ok());
    }

    #[test]
    fn hosts_and_ips() {
        assert!(validate_host("").is_ok());
        assert!(validate_host("localhost").is_ok());
        assert!(validate_host("10.0.0.1").is_ok());
        assert!(validate_host("not a host").is_err());
        assert!(validate_ip("fd00::1").is_ok());
        assert!(validate_ip("example.com").is_err());
    }

    #[test]
    fn dns_servers() {
        for ok in [
            "k8s-service:kube-dns",
            "k8s-service:kube-system/kube-dns:53",
            "10.96.0.10",
            "10.96.0.10:5353",
            "[fd00:83a6::12]:5353",
        ] {
            assert!(validate_dns_server(ok).is_ok(), "{ok}");
        }
        assert!(validate_dns_server("dns.example.com").is_err());
    }

    #[test]
    fn proto_ports_reject_unknown_protocols() {
        let rule = Rule::ProtoPorts;
        assert!(rule
            .validate(&Value::ProtoPorts(vec![ProtoPort::new("tcp", 22)]))
            .is_ok());
        assert!(rule
            .validate(&Value::ProtoPorts(vec![ProtoPort::new("icmp", 22)]))
            .is_err());
        assert!(rule
            .validate(&Value::ProtoPorts(vec![ProtoPort::new("udp", 0)]))
            .is_err());
    }

    #[test]
    fn route_table_ranges() {
        assert!(validate_route_table_range(&RouteTableRange { min: 1, max: 250 }).is_ok());
        assert!(validate_route_table_range(&RouteTableRange { min: 10, max: 5 }).is_err());
        assert!(validate_route_table_range(&RouteTableRange { min: 1, max: 254 }).is_err());
    }

    #[test]
    fn feature_overrides() {
        let rule = Rule::FeatureOverrides;
        let mut pairs = std::collections::BTreeMap::new();
        pairs.insert("SNATFullyRandom".to_string(), "true".to_string());
        pairs.insert("RestoreSupportsLock".to_string(), String::new());
        assert!(rule.validate(&Value::KeyValues(pairs.clone())).is_ok());
        pairs.insert("MASQFullyRandom".to_string(), "sometimes".to_string());
        assert!(rule.validate(&Value::KeyValues(pairs)).is_err());
    }

    #[test]
    fn mismatched_value_is_an_error_not_a_panic() {
        assert!(Rule::Regex.validate(&Value::Int(1)).is_err());
        assert!(!Rule::Regex.applies_to(ValueKind::Int));
        assert!(Rule::Range { min: 0, max: 1 }.applies_to(ValueKind::Mark));
    }
}
