//! Agent logging, packet LOG rules and debug hooks.

use super::{field, LOG_LEVELS, LOG_LEVELS_OR_NONE, SECS};
use crate::kind::ValueKind::{self, *};
use crate::registry::FieldDescriptor;

pub(super) fn fields() -> Vec<FieldDescriptor> {
    vec![
        field("logPrefix", Str, "calico-packet"),
        field("logDropActionOverride", Bool, "false").live(),
        field("logFilePath", Str, "/var/log/calico/felix.log")
            .doc("`none` disables file logging."),
        field("logSeverityFile", ValueKind::Enum(LOG_LEVELS_OR_NONE), "Info").live(),
        field("logSeverityScreen", ValueKind::Enum(LOG_LEVELS), "Info").live(),
        field("logSeveritySys", ValueKind::Enum(LOG_LEVELS_OR_NONE), "Info")
            .live()
            .doc("`None` disables syslog."),
        field("syslogReporterNetwork", Str, ""),
        field("syslogReporterAddress", Str, ""),
        field("debugMemoryProfilePath", Str, ""),
        field("debugDisableLogDropping", Bool, "false"),
        field("debugSimulateCalcGraphHangAfter", SECS, "0").live(),
        field("debugSimulateDataplaneHangAfter", SECS, "0").live(),
    ]
}
