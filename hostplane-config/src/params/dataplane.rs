//! Driver selection, interface handling, routing and host-level knobs.

use super::{field, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const CHAIN_INSERT_MODES: &[&str] = &["insert", "append"];
const ENDPOINT_TO_HOST_ACTIONS: &[&str] = &["Drop", "Accept", "Return"];
const ROUTE_SOURCES: &[&str] = &["CalicoIPAM", "WorkloadIPs"];
const AWS_SRC_DST_CHECK: &[&str] = &["DoNothing", "Enable", "Disable"];
const SERVICE_LOOP_PREVENTION: &[&str] = &["Drop", "Reject", "Disabled"];

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("useInternalDataplaneDriver", Bool, "true"),
        field("dataplaneDriver", Str, "calico-iptables-plugin"),
        field("ipv6Support", Bool, "true"),
        field("routeRefreshInterval", SECS, "90")
            .live()
            .doc("Period at which routes are re-checked; 0 disables the refresh."),
        field("interfaceRefreshInterval", SECS, "90")
            .live()
            .doc("Period at which local interfaces are rescanned; 0 disables the rescan."),
        field("netlinkTimeout", SECS, "10").aliases(&["NetlinkTimeoutSecs"]),
        field("metadataAddr", Str, "127.0.0.1")
            .doc("Cloud-init metadata server; `none` disables the NAT rule."),
        field("metadataPort", Int, "8775").rule(Rule::Range { min: 1, max: 65535 }),
        field("openstackRegion", Str, ""),
        field("interfacePrefix", Str, "cali")
            .doc("Name prefix identifying workload interfaces."),
        field("interfaceExclude", StringList, "kube-ipvs0")
            .rule(Rule::InterfaceList)
            .doc("Interfaces ignored for host endpoints; `/regex/` entries allowed."),
        field("chainInsertMode", ValueKind::Enum(CHAIN_INSERT_MODES), "insert"),
        field(
            "defaultEndpointToHostAction",
            ValueKind::Enum(ENDPOINT_TO_HOST_ACTIONS),
            "Drop",
        ),
        field("disableConntrackInvalidCheck", Bool, "false"),
        field("natPortRange", PortRange, "0").rule(Rule::PortRanges),
        field("natOutgoingAddress", Str, "").rule(Rule::IpAddr),
        field("deviceRouteSourceAddress", Str, "").rule(Rule::IpAddr),
        field("deviceRouteProtocol", Int, "3").rule(Rule::Range { min: 0, max: 255 }),
        field("removeExternalRoutes", Bool, "true"),
        field("externalNodesList", CidrList, "none").aliases(&["externalNodesCIDRList"]),
        field("sidecarAccelerationEnabled", Bool, "false"),
        field("routeSource", ValueKind::Enum(ROUTE_SOURCES), "CalicoIPAM"),
        field("routeTableRange", RouteTableRange, "1,250")
            .rule(Rule::RouteTableRange)
            .doc("Indices of the routing tables the dataplane may claim."),
        field("awsSrcDstCheck", ValueKind::Enum(AWS_SRC_DST_CHECK), "DoNothing"),
        field(
            "serviceLoopPrevention",
            ValueKind::Enum(SERVICE_LOOP_PREVENTION),
            "Drop",
        ),
        field("mtuIfacePattern", Str, "^((en|wl|ww|sl|ib)[opsx].*|(eth|wlan|wwan).*)")
            .rule(Rule::Regex),
        field("windowsNetworkName", Str, "(?i)calico.*").rule(Rule::Regex),
        field("policySyncPathPrefix", Str, ""),
        field("kubeMasqueradeBit", Int, "14").rule(Rule::Range { min: 0, max: 31 }),
        field("kubeNodePortRanges", PortRangeList, "30000:32767").rule(Rule::PortRanges),
        field(
            "failsafeInboundHostPorts",
            ProtoPortList,
            "tcp:22,udp:68,tcp:179,tcp:2379,tcp:2380,tcp:6443,tcp:6666,tcp:6667",
        )
        .rule(Rule::ProtoPorts)
        .doc("Ports always open to inbound host traffic; `none` closes all."),
        field(
            "failsafeOutboundHostPorts",
            ProtoPortList,
            "udp:53,udp:67,tcp:179,tcp:2379,tcp:2380,tcp:6443,tcp:6666,tcp:6667",
        )
        .rule(Rule::ProtoPorts)
        .doc("Ports always open to outbound host traffic; `none` closes all."),
        field("captureDir", Str, "/var/log/calico/pcap").rule(Rule::NonEmpty),
        field("captureMaxSizeBytes", Int, "10000000").rule(Rule::Positive),
        field("captureRotationSeconds", Int, "3600").rule(Rule::Positive),
        field("captureMaxFiles", Int, "2").rule(Rule::Positive),
    ]
}
