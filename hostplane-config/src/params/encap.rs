//! Overlay encapsulation, egress gateways, WireGuard and IPsec.

use super::{field, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const EGRESS_IP_SUPPORT: &[&str] = &[
    "Disabled",
    "EnabledPerNamespace",
    "EnabledPerNamespaceOrPerPod",
];
const IPSEC_MODES: &[&str] = &["", "PSK"];
const IPSEC_LOG_LEVELS: &[&str] = &["None", "Notice", "Info", "Debug", "Verbose"];

const PORT: Rule = Rule::Range { min: 1, max: 65535 };
const RULE_PRIORITY: Rule = Rule::Range { min: 1, max: 32765 };
const MTU: Rule = Rule::Range { min: 0, max: 65535 };

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("ipipEnabled", Bool, "false").aliases(&["IpInIpEnabled"]),
        field("ipipMTU", Int, "1440").aliases(&["IpInIpMtu"]).rule(MTU),
        field("allowIPIPPacketsFromWorkloads", Bool, "false"),
        field("vxlanEnabled", Bool, "false"),
        field("vxlanMTU", Int, "1440").rule(MTU),
        field("vxlanPort", Int, "4789").rule(PORT),
        field("vxlanVNI", Int, "4096").rule(Rule::Range { min: 1, max: 16_777_215 }),
        field("allowVXLANPacketsFromWorkloads", Bool, "false"),
        field("egressIPSupport", ValueKind::Enum(EGRESS_IP_SUPPORT), "Disabled"),
        field("egressIPVXLANPort", Int, "4790").rule(PORT),
        field("egressIPVXLANVNI", Int, "4097").rule(Rule::Range { min: 1, max: 16_777_215 }),
        field("egressIPRoutingRulePriority", Int, "100").rule(RULE_PRIORITY),
        field("wireguardEnabled", Bool, "false"),
        field("wireguardListeningPort", Int, "51820").rule(PORT),
        field("wireguardRoutingRulePriority", Int, "99").rule(RULE_PRIORITY),
        field("wireguardInterfaceName", Str, "wg.calico").rule(Rule::InterfaceName),
        field("wireguardMTU", Int, "1420").rule(MTU),
        field("wireguardHostEncryptionEnabled", Bool, "false"),
        field("ipsecMode", ValueKind::Enum(IPSEC_MODES), "")
            .doc("Empty leaves IPsec disabled."),
        field("ipsecAllowUnsecuredTraffic", Bool, "false"),
        field("ipsecIKEAlgorithm", Str, "aes128gcm16-prfsha256-ecp256").rule(Rule::NonEmpty),
        field("ipsecESPAlgorithm", Str, "aes128gcm16-ecp256").rule(Rule::NonEmpty),
        field("ipsecLogLevel", ValueKind::Enum(IPSEC_LOG_LEVELS), "Info").live(),
        field("ipsecPolicyRefreshInterval", SECS, "600").live(),
    ]
}
