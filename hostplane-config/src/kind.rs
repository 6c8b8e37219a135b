//! Value kinds a parameter can be declared with.

use std::fmt;
use std::time::Duration;

/// Unit applied to a bare number supplied for a duration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScale {
    Seconds,
    Milliseconds,
}

impl TimeScale {
    /// Length of one unit.
    pub fn unit(self) -> Duration {
        match self {
            TimeScale::Seconds => Duration::from_secs(1),
            TimeScale::Milliseconds => Duration::from_millis(1),
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeScale::Seconds => f.write_str("seconds"),
            TimeScale::Milliseconds => f.write_str("milliseconds"),
        }
    }
}

/// Declared kind of a parameter; decides how raw strings are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    /// Base-10 integer. Bounds are a validator concern.
    Int,
    /// 32-bit mark mask, decimal or `0x` hex.
    Mark,
    /// `port` or `min:max`.
    PortRange,
    PortRangeList,
    Duration(TimeScale),
    Str,
    /// Case-sensitive literal set.
    Enum(&'static [&'static str]),
    StringList,
    CidrList,
    KeyValueList,
    ProtoPortList,
    RouteTableRange,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Int => f.write_str("int"),
            ValueKind::Mark => f.write_str("mark"),
            ValueKind::PortRange => f.write_str("port-range"),
            ValueKind::PortRangeList => f.write_str("port-range-list"),
            ValueKind::Duration(scale) => write!(f, "duration({scale})"),
            ValueKind::Str => f.write_str("string"),
            ValueKind::Enum(literals) => write!(f, "enum({})", literals.join("|")),
            ValueKind::StringList => f.write_str("string-list"),
            ValueKind::CidrList => f.write_str("cidr-list"),
            ValueKind::KeyValueList => f.write_str("key-value-list"),
            ValueKind::ProtoPortList => f.write_str("proto-port-list"),
            ValueKind::RouteTableRange => f.write_str("route-table-range"),
        }
    }
}
