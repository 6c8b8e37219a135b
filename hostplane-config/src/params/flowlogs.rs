//! Flow log export and aggregation.

use super::{field, SECS};
use crate::kind::ValueKind::*;
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

/// 0 none, 1 source port, 2 pod prefix, 3 no destination ports.
const AGGREGATION_KIND: Rule = Rule::Range { min: 0, max: 3 };

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("flowLogsFlushInterval", SECS, "300").live(),
        field("flowLogsEnableHostEndpoint", Bool, "false"),
        field("flowLogsEnableNetworkSets", Bool, "false"),
        field("flowLogsMaxOriginalIPsIncluded", Int, "50").rule(Rule::Positive),
        field("flowLogsCollectProcessInfo", Bool, "false"),
        field("flowLogsCollectTcpStats", Bool, "false"),
        field("flowLogsCollectProcessPath", Bool, "false")
            .doc("Only takes effect together with flowLogsCollectProcessInfo."),
        field("flowLogsFileEnabled", Bool, "false"),
        field("flowLogsFileMaxFiles", Int, "5").rule(Rule::Positive),
        field("flowLogsFileMaxFileSizeMB", Int, "100").rule(Rule::Positive),
        field("flowLogsFileDirectory", Str, "/var/log/calico/flowlogs").rule(Rule::NonEmpty),
        field("flowLogsFileIncludeLabels", Bool, "false"),
        field("flowLogsFileIncludePolicies", Bool, "false"),
        field("flowLogsFileIncludeService", Bool, "false"),
        field("flowLogsFileAggregationKindForAllowed", Int, "2")
            .rule(AGGREGATION_KIND)
            .live(),
        field("flowLogsFileAggregationKindForDenied", Int, "1")
            .rule(AGGREGATION_KIND)
            .live(),
        field("flowLogsFileEnabledForAllowed", Bool, "true"),
        field("flowLogsFileEnabledForDenied", Bool, "true"),
        field("flowLogsDynamicAggregationEnabled", Bool, "false"),
        field("flowLogsPositionFilePath", Str, "/var/log/calico/flows.log.pos"),
        field("flowLogsAggregationThresholdBytes", Int, "8192").rule(Rule::Positive),
        field("flowLogsFilePerFlowProcessLimit", Int, "2").rule(Rule::Range {
            min: 0,
            max: i64::from(u16::MAX),
        }),
        field("windowsFlowLogsFileDirectory", Str, r"c:\TigeraCalico\flowlogs"),
        field(
            "windowsFlowLogsPositionFilePath",
            Str,
            r"c:\TigeraCalico\flowlogs\flows.log.pos",
        ),
        field("windowsStatsDumpFilePath", Str, r"c:\TigeraCalico\stats\dump"),
    ]
}
