//! L7 (HTTP) log export and aggregation.

use super::{field, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;
use crate::validation::Rule;

const HTTP_HEADER_INFO: &[&str] = &["IncludeL7HTTPHeaderInfo", "ExcludeL7HTTPHeaderInfo"];
const HTTP_METHOD: &[&str] = &["IncludeL7HTTPMethod", "ExcludeL7HTTPMethod"];
const SERVICE_INFO: &[&str] = &["IncludeL7ServiceInfo", "ExcludeL7ServiceInfo"];
const DESTINATION_INFO: &[&str] = &["IncludeL7DestinationInfo", "ExcludeL7DestinationInfo"];
const SOURCE_INFO: &[&str] = &[
    "IncludeL7SourceInfo",
    "IncludeL7SourceInfoNoPort",
    "ExcludeL7SourceInfo",
];
const RESPONSE_CODE: &[&str] = &["IncludeL7ResponseCode", "ExcludeL7ResponseCode"];
const TRIM_URL: &[&str] = &[
    "IncludeL7FullURL",
    "TrimURLQuery",
    "TrimURLQueryAndPath",
    "ExcludeL7URL",
];

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("l7LogsFlushInterval", SECS, "300").live(),
        field("l7LogsFileEnabled", Bool, "true"),
        field("l7LogsFileMaxFiles", Int, "5").rule(Rule::Positive),
        field("l7LogsFileMaxFileSizeMB", Int, "100").rule(Rule::Positive),
        field("l7LogsFileDirectory", Str, "/var/log/calico/l7logs").rule(Rule::NonEmpty),
        field(
            "l7LogsFileAggregationHTTPHeaderInfo",
            ValueKind::Enum(HTTP_HEADER_INFO),
            "ExcludeL7HTTPHeaderInfo",
        ),
        field(
            "l7LogsFileAggregationHTTPMethod",
            ValueKind::Enum(HTTP_METHOD),
            "IncludeL7HTTPMethod",
        ),
        field(
            "l7LogsFileAggregationServiceInfo",
            ValueKind::Enum(SERVICE_INFO),
            "IncludeL7ServiceInfo",
        ),
        field(
            "l7LogsFileAggregationDestinationInfo",
            ValueKind::Enum(DESTINATION_INFO),
            "IncludeL7DestinationInfo",
        ),
        field(
            "l7LogsFileAggregationSourceInfo",
            ValueKind::Enum(SOURCE_INFO),
            "IncludeL7SourceInfoNoPort",
        ),
        field(
            "l7LogsFileAggregationResponseCode",
            ValueKind::Enum(RESPONSE_CODE),
            "IncludeL7ResponseCode",
        ),
        field(
            "l7LogsFileAggregationTrimURL",
            ValueKind::Enum(TRIM_URL),
            "IncludeL7FullURL",
        ),
        // Negative keeps every path component.
        field("l7LogsFileAggregationNumURLPath", Int, "5"),
        field("l7LogsFileAggregationURLCharLimit", Int, "250").rule(Rule::Positive),
        field("l7LogsFilePerNodeLimit", Int, "1500")
            .rule(Rule::Range { min: 0, max: i64::from(u32::MAX) })
            .doc("0 means no limit."),
    ]
}
