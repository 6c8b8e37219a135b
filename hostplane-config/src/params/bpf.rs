//! XDP, the BPF dataplane and transparent proxying.

use super::{field, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const BPF_LOG_LEVELS: &[&str] = &["Off", "Info", "Debug"];
const BPF_SERVICE_MODES: &[&str] = &["Tunnel", "DSR"];
const TPROXY_MODES: &[&str] = &["Disabled", "Enabled", "EnabledAllServices"];

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("xdpRefreshInterval", SECS, "90").live(),
        field("xdpEnabled", Bool, "true"),
        field("genericXDPEnabled", Bool, "false"),
        field("bpfEnabled", Bool, "false"),
        field("bpfDisableUnprivileged", Bool, "true"),
        field("bpfLogLevel", ValueKind::Enum(BPF_LOG_LEVELS), "Off"),
        field("bpfDataIfacePattern", Str, "^(en.*|eth.*|tunl0$)")
            .rule(Rule::Regex)
            .doc("Interfaces BPF programs attach to for host traffic."),
        field("bpfConnectTimeLoadBalancingEnabled", Bool, "true"),
        field("bpfExternalServiceMode", ValueKind::Enum(BPF_SERVICE_MODES), "Tunnel"),
        field("bpfExtToServiceConnmark", Int, "0").rule(Rule::Range {
            min: 0,
            max: i64::from(u32::MAX),
        }),
        field("bpfKubeProxyIptablesCleanupEnabled", Bool, "true"),
        field("bpfKubeProxyMinSyncPeriod", SECS, "1"),
        field("bpfKubeProxyEndpointSlicesEnabled", Bool, "false"),
        field("tproxyMode", ValueKind::Enum(TPROXY_MODES), "Disabled"),
        field("tproxyPort", Int, "16001").rule(Rule::Range { min: 1, max: 65535 }),
    ]
}
