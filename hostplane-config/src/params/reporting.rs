//! Status reporting, health and Prometheus endpoints.

use super::{field, SECS};
use crate::kind::ValueKind::*;
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const PORT: Rule = Rule::Range { min: 1, max: 65535 };

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("reportingInterval", SECS, "30")
            .aliases(&["ReportingIntervalSecs"])
            .live()
            .doc("Status report period; 0 disables reporting."),
        field("reportingTTL", SECS, "90")
            .aliases(&["ReportingTTLSecs"])
            .live(),
        field("endpointReportingEnabled", Bool, "false"),
        field("endpointReportingDelay", SECS, "1")
            .aliases(&["EndpointReportingDelaySecs"])
            .live(),
        field("healthEnabled", Bool, "false"),
        field("healthHost", Str, "localhost").rule(Rule::Host),
        field("healthPort", Int, "9099").rule(PORT),
        field("prometheusMetricsEnabled", Bool, "false"),
        field("prometheusMetricsHost", Str, "").rule(Rule::Host),
        field("prometheusMetricsPort", Int, "9091").rule(PORT),
        field("prometheusGoMetricsEnabled", Bool, "true"),
        field("prometheusProcessMetricsEnabled", Bool, "true"),
        field("prometheusWireGuardMetricsEnabled", Bool, "true"),
        field("prometheusMetricsCertFile", Str, ""),
        field("prometheusMetricsKeyFile", Str, ""),
        field("prometheusMetricsCAFile", Str, ""),
        field("prometheusReporterEnabled", Bool, "false"),
        field("prometheusReporterPort", Int, "9092").rule(PORT),
        field("prometheusReporterCertFile", Str, ""),
        field("prometheusReporterKeyFile", Str, ""),
        field("prometheusReporterCAFile", Str, ""),
        field("deletedMetricsRetentionSecs", Int, "30").rule(Rule::Range {
            min: 0,
            max: i64::from(u32::MAX),
        }),
        field("usageReportingEnabled", Bool, "true").live(),
        field("usageReportingInitialDelay", SECS, "300")
            .aliases(&["UsageReportingInitialDelaySecs"])
            .live(),
        field("usageReportingInterval", SECS, "86400")
            .aliases(&["UsageReportingIntervalSecs"])
            .live(),
        field("nfNetlinkBufSize", Str, "65536"),
        field("statsDumpFilePath", Str, "/var/log/calico/stats/dump"),
    ]
}
