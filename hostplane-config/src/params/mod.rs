//! Built-in parameter table, grouped by dataplane area.
//!
//! Defaults are written in wire form and checked when the registry is built.

use crate::kind::{TimeScale, ValueKind};
use crate::registry::FieldDescriptor;

mod bpf;
mod dataplane;
mod dns;
mod encap;
mod flowlogs;
mod iptables;
mod l7;
mod logging;
mod reporting;

pub(crate) const SECS: ValueKind = ValueKind::Duration(TimeScale::Seconds);
pub(crate) const MILLIS: ValueKind = ValueKind::Duration(TimeScale::Milliseconds);

pub(crate) const LOG_LEVELS: &[&str] = &["Debug", "Info", "Warning", "Error", "Fatal"];
pub(crate) const LOG_LEVELS_OR_NONE: &[&str] =
    &["None", "Debug", "Info", "Warning", "Error", "Fatal"];

pub(crate) fn field(name: &'static str, kind: ValueKind, default: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(name, kind, default)
}

/// Every built-in parameter, in declaration order.
pub fn all() -> Vec<FieldDescriptor> {
    let mut fields = Vec::with_capacity(192);
    fields.extend(dataplane::fields());
    fields.extend(iptables::fields());
    fields.extend(encap::fields());
    fields.extend(logging::fields());
    fields.extend(reporting::fields());
    fields.extend(bpf::fields());
    fields.extend(flowlogs::fields());
    fields.extend(dns::fields());
    fields.extend(l7::fields());
    fields
}
