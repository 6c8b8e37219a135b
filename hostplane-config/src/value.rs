//! Typed parameter values and their wire encoding.
//!
//! `Display` renders the canonical wire form of a value. Coercing that string
//! with the same [`ValueKind`](crate::ValueKind) yields an equal value, which is
//! what lets a resolved snapshot be written back into any source.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use ipnetwork::IpNetwork;
use serde::{Serialize, Serializer};

/// Literal accepted by list kinds to mean "explicitly empty".
pub const NONE_SENTINEL: &str = "none";

/// One `protocol:port[:cidr]` entry of a failsafe port list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtoPort {
    pub protocol: String,
    pub port: u16,
    pub net: Option<IpNetwork>,
}

impl ProtoPort {
    pub fn new(protocol: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            port,
            net: None,
        }
    }

    pub fn with_net(mut self, net: IpNetwork) -> Self {
        self.net = Some(net);
        self
    }
}

impl fmt::Display for ProtoPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.port)?;
        if let Some(net) = &self.net {
            write!(f, ":{net}")?;
        }
        Ok(())
    }
}

/// Inclusive port range. `0` (both ends zero) means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub const UNSET: PortRange = PortRange { min: 0, max: 0 };

    pub fn single(port: u16) -> Self {
        Self {
            min: port,
            max: port,
        }
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}:{}", self.min, self.max)
        }
    }
}

/// Indices of the Linux routing tables the dataplane may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteTableRange {
    pub min: i64,
    pub max: i64,
}

impl fmt::Display for RouteTableRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    PortRange(PortRange),
    PortRanges(Vec<PortRange>),
    Duration(Duration),
    Str(String),
    List(Vec<String>),
    Cidrs(Vec<IpNetwork>),
    KeyValues(BTreeMap<String, String>),
    ProtoPorts(Vec<ProtoPort>),
    RouteTableRange(RouteTableRange),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::PortRange(_) => "port-range",
            Value::PortRanges(_) => "port-range-list",
            Value::Duration(_) => "duration",
            Value::Str(_) => "string",
            Value::List(_) => "string-list",
            Value::Cidrs(_) => "cidr-list",
            Value::KeyValues(_) => "key-value-list",
            Value::ProtoPorts(_) => "proto-port-list",
            Value::RouteTableRange(_) => "route-table-range",
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    if items.is_empty() {
        return f.write_str(NONE_SENTINEL);
    }
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::PortRange(r) => write!(f, "{r}"),
            Value::PortRanges(ranges) => write_joined(f, ranges),
            Value::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => write_joined(f, items),
            Value::Cidrs(nets) => write_joined(f, nets),
            Value::KeyValues(pairs) if pairs.is_empty() => f.write_str(NONE_SENTINEL),
            Value::KeyValues(pairs) => {
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                Ok(())
            }
            Value::ProtoPorts(ports) => write_joined(f, ports),
            Value::RouteTableRange(r) => write!(f, "{r}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            other => serializer.collect_str(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_render_as_none() {
        assert_eq!(Value::List(vec![]).to_string(), "none");
        assert_eq!(Value::ProtoPorts(vec![]).to_string(), "none");
        assert_eq!(Value::PortRanges(vec![]).to_string(), "none");
        assert_eq!(Value::KeyValues(BTreeMap::new()).to_string(), "none");
    }

    #[test]
    fn proto_port_with_net() {
        let pp = ProtoPort::new("udp", 68).with_net("10.0.0.0/8".parse().unwrap());
        assert_eq!(pp.to_string(), "udp:68:10.0.0.0/8");
        assert_eq!(ProtoPort::new("tcp", 22).to_string(), "tcp:22");
    }

    #[test]
    fn single_port_range_renders_as_port() {
        assert_eq!(PortRange::single(80).to_string(), "80");
        assert_eq!(
            PortRange {
                min: 30000,
                max: 32767
            }
            .to_string(),
            "30000:32767"
        );
    }

    #[test]
    fn key_values_render_sorted() {
        let mut pairs = BTreeMap::new();
        pairs.insert("SNATFullyRandom".to_string(), "true".to_string());
        pairs.insert("MASQFullyRandom".to_string(), "false".to_string());
        assert_eq!(
            Value::KeyValues(pairs).to_string(),
            "MASQFullyRandom=false,SNATFullyRandom=true"
        );
    }
}
