//! iptables and ipset programming.

use super::{field, MILLIS, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const IPTABLES_BACKENDS: &[&str] = &["Legacy", "NFT"];
const ACCEPT_RETURN: &[&str] = &["Accept", "Return"];
const DROP_ACTION_OVERRIDES: &[&str] = &["Drop", "LogAndDrop", "Accept", "LogAndAccept"];

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("iptablesRefreshInterval", SECS, "10").live(),
        field("iptablesPostWriteCheckInterval", SECS, "1")
            .aliases(&["IptablesPostWriteCheckIntervalSecs"])
            .live(),
        field("iptablesLockFilePath", Str, "/run/xtables.lock").rule(Rule::NonEmpty),
        field("iptablesLockTimeout", SECS, "0")
            .aliases(&["IptablesLockTimeoutSecs"])
            .doc("Time to wait for the iptables lock; 0 disables locking."),
        field("iptablesLockProbeInterval", MILLIS, "50")
            .aliases(&["IptablesLockProbeIntervalMillis"]),
        field("featureDetectOverride", KeyValueList, "")
            .rule(Rule::FeatureOverrides)
            .doc("Forces detected features, e.g. `SNATFullyRandom=true,RestoreSupportsLock=`."),
        field("ipsetsRefreshInterval", SECS, "90").live(),
        field("maxIpsetSize", Int, "1048576").rule(Rule::Positive),
        field("iptablesBackend", ValueKind::Enum(IPTABLES_BACKENDS), "Legacy"),
        field("iptablesFilterAllowAction", ValueKind::Enum(ACCEPT_RETURN), "Accept"),
        field("iptablesMangleAllowAction", ValueKind::Enum(ACCEPT_RETURN), "Accept"),
        field("iptablesMarkMask", Mark, "0xff000000").rule(Rule::MarkMask),
        field("iptablesNATOutgoingInterfaceFilter", Str, "").rule(Rule::InterfaceFilter),
        field("dropActionOverride", ValueKind::Enum(DROP_ACTION_OVERRIDES), "Drop"),
    ]
}
