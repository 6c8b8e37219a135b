//! DNS policy support: trusted servers, the learnt-name cache and DNS logs.

use super::{field, SECS};
use crate::kind::ValueKind::*;
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("dnsTrustedServers", StringList, "k8s-service:kube-dns")
            .rule(Rule::DnsServers)
            .doc("`<ip>[:<port>]` or `k8s-service:[<namespace>/]<name>[:port]` entries."),
        field("dnsCacheFile", Str, "/var/run/calico/felix-dns-cache.txt"),
        field("dnsCacheSaveInterval", SECS, "60").live(),
        field("dnsCacheEpoch", Int, "0")
            .live()
            .doc("Changing this discards all learnt DNS information."),
        field("dnsExtraTTL", SECS, "0").live(),
        field("dnsLogsFlushInterval", SECS, "300").live(),
        field("dnsLogsFileEnabled", Bool, "false"),
        field("dnsLogsFileMaxFiles", Int, "5").rule(Rule::Positive),
        field("dnsLogsFileMaxFileSizeMB", Int, "100").rule(Rule::Positive),
        field("dnsLogsFileDirectory", Str, "/var/log/calico/dnslogs").rule(Rule::NonEmpty),
        field("dnsLogsFileIncludeLabels", Bool, "true"),
        field("dnsLogsFileAggregationKind", Int, "1")
            .rule(Rule::Range { min: 0, max: 1 })
            .live(),
        field("dnsLogsFilePerNodeLimit", Int, "0")
            .rule(Rule::Range { min: 0, max: i64::from(u32::MAX) })
            .doc("0 means no limit."),
        field("dnsLogsLatency", Bool, "true"),
        field("windowsDnsCacheFile", Str, r"c:\TigeraCalico\felix-dns-cache.txt"),
        field("windowsDnsExtraTTL", SECS, "120"),
    ]
}
