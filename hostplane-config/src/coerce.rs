//! Raw string to typed value coercion.
//!
//! Coercion only checks that a string has the declared shape. Ranges, regex
//! compilation and the like are validator rules, so that a well-formed but
//! unacceptable value and a malformed one are reported differently.

use std::collections::BTreeMap;
use std::time::Duration;

use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CoercionError;
use crate::kind::{TimeScale, ValueKind};
use crate::value::{PortRange, ProtoPort, RouteTableRange, Value, NONE_SENTINEL};

lazy_static! {
    static ref KV_KEY: Regex = Regex::new("^[A-Za-z0-9_-]+$").expect("static regex");
    static ref PROTOCOL: Regex = Regex::new("^[A-Za-z][A-Za-z0-9]*$").expect("static regex");
}

const DEFAULT_PROTOCOL: &str = "tcp";

/// Coerces `raw` into a value of `kind`.
pub fn coerce(kind: ValueKind, raw: &str) -> Result<Value, CoercionError> {
    match kind {
        ValueKind::Bool => coerce_bool(raw).map(Value::Bool),
        ValueKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CoercionError::Int(raw.to_string())),
        ValueKind::Mark => coerce_mark(raw).map(|m| Value::Int(i64::from(m))),
        ValueKind::PortRange => coerce_port_range(raw.trim()).map(Value::PortRange),
        ValueKind::PortRangeList => split_list(raw)
            .map(|items| {
                items
                    .into_iter()
                    .map(coerce_port_range)
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::PortRanges),
        ValueKind::Duration(scale) => coerce_duration(raw, scale).map(Value::Duration),
        ValueKind::Str => Ok(Value::Str(raw.trim().to_string())),
        ValueKind::Enum(allowed) => {
            if allowed.contains(&raw) {
                Ok(Value::Str(raw.to_string()))
            } else {
                Err(CoercionError::Enum {
                    value: raw.to_string(),
                    allowed,
                })
            }
        }
        ValueKind::StringList => Ok(Value::List(
            split_list(raw)
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
        ValueKind::CidrList => split_list(raw)
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                item.parse::<IpNetwork>()
                    .map_err(|_| CoercionError::Cidr(item.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Cidrs),
        ValueKind::KeyValueList => coerce_key_values(raw).map(Value::KeyValues),
        ValueKind::ProtoPortList => split_list(raw)
            .unwrap_or_default()
            .into_iter()
            .map(coerce_proto_port)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::ProtoPorts),
        ValueKind::RouteTableRange => coerce_route_table_range(raw).map(Value::RouteTableRange),
    }
}

/// Splits a comma separated list, dropping empty elements.
///
/// Returns `None` for the `none` sentinel, i.e. an explicitly empty list.
fn split_list(raw: &str) -> Option<Vec<&str>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(NONE_SENTINEL) {
        return None;
    }
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

fn coerce_bool(raw: &str) -> Result<bool, CoercionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(CoercionError::Bool(raw.to_string())),
    }
}

fn coerce_mark(raw: &str) -> Result<u32, CoercionError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|_| CoercionError::Mark(raw.to_string()))
}

fn coerce_duration(raw: &str, scale: TimeScale) -> Result<Duration, CoercionError> {
    let trimmed = raw.trim();
    let fail = |reason: &str| CoercionError::Duration(raw.to_string(), reason.to_string());

    if let Ok(whole) = trimmed.parse::<u64>() {
        return Ok(match scale {
            TimeScale::Seconds => Duration::from_secs(whole),
            TimeScale::Milliseconds => Duration::from_millis(whole),
        });
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        if let Ok(fractional) = trimmed.parse::<f64>() {
            let secs = fractional * scale.unit().as_secs_f64();
            return Duration::try_from_secs_f64(secs).map_err(|e| fail(&e.to_string()));
        }
    }
    if trimmed.starts_with('-') {
        return Err(fail("negative durations are not allowed"));
    }
    humantime::parse_duration(trimmed).map_err(|e| fail(&e.to_string()))
}

fn coerce_port_range(raw: &str) -> Result<PortRange, CoercionError> {
    let port = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| CoercionError::PortRange(raw.to_string()))
    };
    match raw.split_once(':') {
        Some((min, max)) => Ok(PortRange {
            min: port(min)?,
            max: port(max)?,
        }),
        None => port(raw).map(PortRange::single),
    }
}

fn coerce_key_values(raw: &str) -> Result<BTreeMap<String, String>, CoercionError> {
    let mut pairs = BTreeMap::new();
    if raw.trim().eq_ignore_ascii_case(NONE_SENTINEL) {
        return Ok(pairs);
    }
    for item in raw.split(',').filter(|item| !item.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| CoercionError::KeyValue(item.to_string()))?;
        if !KV_KEY.is_match(key) || value.trim() != value {
            return Err(CoercionError::KeyValue(item.to_string()));
        }
        pairs.insert(key.to_string(), value.to_string());
    }
    Ok(pairs)
}

fn coerce_proto_port(raw: &str) -> Result<ProtoPort, CoercionError> {
    let fail = || CoercionError::ProtoPort(raw.to_string());
    let parts: Vec<&str> = raw.splitn(3, ':').map(str::trim).collect();
    let (protocol, port, net) = match parts.as_slice() {
        [port] => (DEFAULT_PROTOCOL, *port, None),
        [protocol, port] => (*protocol, *port, None),
        [protocol, port, net] => (*protocol, *port, Some(*net)),
        _ => return Err(fail()),
    };
    if !PROTOCOL.is_match(protocol) {
        return Err(fail());
    }
    let port = port.parse::<u16>().map_err(|_| fail())?;
    let net = net
        .map(|n| n.parse::<IpNetwork>().map_err(|_| fail()))
        .transpose()?;
    Ok(ProtoPort {
        protocol: protocol.to_ascii_lowercase(),
        port,
        net,
    })
}

fn coerce_route_table_range(raw: &str) -> Result<RouteTableRange, CoercionError> {
    let fail = || CoercionError::RouteTableRange(raw.to_string());
    let trimmed = raw.trim();
    let (min, max) = trimmed
        .split_once(',')
        .or_else(|| trimmed.split_once(':'))
        .or_else(|| trimmed.split_once('-'))
        .ok_or_else(fail)?;
    Ok(RouteTableRange {
        min: min.trim().parse().map_err(|_| fail())?,
        max: max.trim().parse().map_err(|_| fail())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LOG_LEVELS: &[&str] = &["Debug", "Info", "Warning"];

    #[test]
    fn bools_accept_common_spellings() {
        for raw in ["true", "TRUE", "Yes", "1"] {
            assert_eq!(coerce(ValueKind::Bool, raw), Ok(Value::Bool(true)));
        }
        for raw in ["false", "No", "0"] {
            assert_eq!(coerce(ValueKind::Bool, raw), Ok(Value::Bool(false)));
        }
        assert!(coerce(ValueKind::Bool, "maybe").is_err());
    }

    #[test]
    fn ints_are_not_range_checked() {
        assert_eq!(coerce(ValueKind::Int, "40000"), Ok(Value::Int(40000)));
        assert_eq!(coerce(ValueKind::Int, "-5"), Ok(Value::Int(-5)));
        assert!(coerce(ValueKind::Int, "12abc").is_err());
    }

    #[test]
    fn marks_accept_hex() {
        assert_eq!(
            coerce(ValueKind::Mark, "0xff000000"),
            Ok(Value::Int(0xff00_0000))
        );
        assert_eq!(coerce(ValueKind::Mark, "255"), Ok(Value::Int(255)));
        assert!(coerce(ValueKind::Mark, "0x1ffffffff").is_err());
    }

    #[test]
    fn bare_durations_use_declared_scale() {
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Seconds), "10"),
            Ok(Value::Duration(Duration::from_secs(10)))
        );
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Milliseconds), "10"),
            Ok(Value::Duration(Duration::from_millis(10)))
        );
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Seconds), "1.5"),
            Ok(Value::Duration(Duration::from_millis(1500)))
        );
    }

    #[test]
    fn textual_durations_ignore_scale() {
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Seconds), "50ms"),
            Ok(Value::Duration(Duration::from_millis(50)))
        );
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Milliseconds), "2m"),
            Ok(Value::Duration(Duration::from_secs(120)))
        );
        assert_eq!(
            coerce(ValueKind::Duration(TimeScale::Seconds), "0"),
            Ok(Value::Duration(Duration::ZERO))
        );
        assert!(coerce(ValueKind::Duration(TimeScale::Seconds), "-3").is_err());
        assert!(coerce(ValueKind::Duration(TimeScale::Seconds), "soon").is_err());
    }

    #[test]
    fn enums_are_case_sensitive() {
        assert_eq!(
            coerce(ValueKind::Enum(LOG_LEVELS), "Info"),
            Ok(Value::Str("Info".into()))
        );
        assert!(matches!(
            coerce(ValueKind::Enum(LOG_LEVELS), "info"),
            Err(CoercionError::Enum { .. })
        ));
        assert!(matches!(
            coerce(ValueKind::Enum(LOG_LEVELS), " Info "),
            Err(CoercionError::Enum { .. })
        ));
    }

    #[test]
    fn string_lists_drop_empty_elements() {
        assert_eq!(
            coerce(ValueKind::StringList, "kube-ipvs0,, /^veth/ ,"),
            Ok(Value::List(vec!["kube-ipvs0".into(), "/^veth/".into()]))
        );
        assert_eq!(coerce(ValueKind::StringList, "NONE"), Ok(Value::List(vec![])));
    }

    #[test]
    fn key_values_last_duplicate_wins() {
        let Value::KeyValues(pairs) = coerce(
            ValueKind::KeyValueList,
            "SNATFullyRandom=true,RestoreSupportsLock=,SNATFullyRandom=false",
        )
        .unwrap() else {
            panic!("expected key values");
        };
        assert_eq!(pairs["SNATFullyRandom"], "false");
        assert_eq!(pairs["RestoreSupportsLock"], "");
    }

    #[test]
    fn key_values_none_is_explicitly_empty() {
        assert_eq!(
            coerce(ValueKind::KeyValueList, "None"),
            Ok(Value::KeyValues(BTreeMap::new()))
        );
        assert_eq!(Value::KeyValues(BTreeMap::new()).to_string(), "none");
    }

    #[test]
    fn key_values_reject_whitespace() {
        assert!(coerce(ValueKind::KeyValueList, "a=b, c=d").is_err());
        assert!(coerce(ValueKind::KeyValueList, "a= b").is_err());
        assert!(coerce(ValueKind::KeyValueList, "novalue").is_err());
    }

    #[test]
    fn proto_ports_default_to_tcp() {
        let value = coerce(ValueKind::ProtoPortList, "22, udp:68, tcp:179:10.0.0.0/8").unwrap();
        assert_eq!(
            value,
            Value::ProtoPorts(vec![
                ProtoPort::new("tcp", 22),
                ProtoPort::new("udp", 68),
                ProtoPort::new("tcp", 179).with_net("10.0.0.0/8".parse().unwrap()),
            ])
        );
    }

    #[test]
    fn proto_ports_accept_ipv6_nets() {
        let value = coerce(ValueKind::ProtoPortList, "udp:53:fd00::/8").unwrap();
        assert_eq!(
            value,
            Value::ProtoPorts(vec![
                ProtoPort::new("udp", 53).with_net("fd00::/8".parse().unwrap())
            ])
        );
    }

    #[test]
    fn proto_ports_none_is_explicitly_empty() {
        assert_eq!(
            coerce(ValueKind::ProtoPortList, "None"),
            Ok(Value::ProtoPorts(vec![]))
        );
        assert!(coerce(ValueKind::ProtoPortList, "tcp:http").is_err());
    }

    #[test]
    fn route_table_ranges_accept_both_separators() {
        let expected = Value::RouteTableRange(RouteTableRange { min: 1, max: 250 });
        assert_eq!(coerce(ValueKind::RouteTableRange, "1,250"), Ok(expected.clone()));
        assert_eq!(coerce(ValueKind::RouteTableRange, "1:250"), Ok(expected.clone()));
        assert_eq!(coerce(ValueKind::RouteTableRange, "1-250"), Ok(expected));
        assert!(coerce(ValueKind::RouteTableRange, "250").is_err());
    }

    #[test]
    fn port_ranges() {
        assert_eq!(
            coerce(ValueKind::PortRangeList, "30000:32767,8080"),
            Ok(Value::PortRanges(vec![
                PortRange {
                    min: 30000,
                    max: 32767
                },
                PortRange::single(8080)
            ]))
        );
        assert!(coerce(ValueKind::PortRange, "70000").is_err());
    }

    fn proto_port_strategy() -> impl Strategy<Value = ProtoPort> {
        (
            prop_oneof![Just("tcp"), Just("udp"), Just("sctp")],
            any::<u16>(),
            proptest::option::of((any::<[u8; 4]>(), 0u8..=32)),
        )
            .prop_map(|(protocol, port, net)| {
                let pp = ProtoPort::new(protocol, port);
                match net {
                    Some((octets, prefix)) => {
                        let net = ipnetwork::Ipv4Network::new(octets.into(), prefix)
                            .expect("prefix within 0..=32");
                        pp.with_net(IpNetwork::V4(net))
                    }
                    None => pp,
                }
            })
    }

    proptest! {
        #[test]
        fn proto_port_lists_survive_wire_encoding(
            ports in proptest::collection::vec(proto_port_strategy(), 0..8)
        ) {
            let value = Value::ProtoPorts(ports);
            let encoded = value.to_string();
            prop_assert_eq!(coerce(ValueKind::ProtoPortList, &encoded), Ok(value));
        }

        #[test]
        fn route_table_ranges_survive_wire_encoding(
            min in 0i64..=300,
            max in 0i64..=300,
            separator in prop_oneof![Just(','), Just(':'), Just('-')],
        ) {
            let range = RouteTableRange { min, max };
            let value = Value::RouteTableRange(range);
            prop_assert_eq!(coerce(ValueKind::RouteTableRange, &value.to_string()), Ok(value));

            let spelled = format!("{min}{separator}{max}");
            prop_assert_eq!(
                coerce(ValueKind::RouteTableRange, &spelled),
                Ok(Value::RouteTableRange(range))
            );
        }

        #[test]
        fn durations_survive_wire_encoding(millis in 0u64..10_000_000) {
            let value = Value::Duration(Duration::from_millis(millis));
            let encoded = value.to_string();
            prop_assert_eq!(
                coerce(ValueKind::Duration(TimeScale::Seconds), &encoded),
                Ok(value)
            );
        }
    }
}
