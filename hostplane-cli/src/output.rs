use std::collections::BTreeMap;

use serde::Serialize;

use hostplane_config::{FieldDescriptor, Registry};
use hostplane_core::{ConfigUpdate, Outcome, ResolvedValue, Snapshot};

use crate::commands::Format;

pub fn print_snapshot(
    snapshot: &Snapshot,
    format: Format,
    only_overridden: bool,
) -> anyhow::Result<()> {
    match format {
        Format::Text => print!("{}", snapshot_text(snapshot, only_overridden)),
        Format::Yaml if only_overridden => {
            print!("{}", serde_yaml::to_string(&overridden_map(snapshot))?)
        }
        Format::Yaml => print!("{}", serde_yaml::to_string(snapshot)?),
        Format::Json if only_overridden => {
            println!("{}", serde_json::to_string_pretty(&overridden_map(snapshot))?)
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(snapshot)?),
    }
    Ok(())
}

fn overridden_map(snapshot: &Snapshot) -> BTreeMap<&'static str, &ResolvedValue> {
    snapshot
        .iter()
        .filter(|(_, resolved)| resolved.outcome != Outcome::Default)
        .map(|(descriptor, resolved)| (descriptor.name, resolved))
        .collect()
}

fn snapshot_text(snapshot: &Snapshot, only_overridden: bool) -> String {
    let mut out = String::new();
    for (descriptor, resolved) in snapshot.iter() {
        let note = match (resolved.outcome, resolved.source) {
            (Outcome::Default, _) if only_overridden => continue,
            (Outcome::Default, _) => String::new(),
            (Outcome::Overridden, Some(source)) => format!("  [{source}]"),
            (Outcome::Fallback, Some(source)) => format!("  [default; {source} value rejected]"),
            (_, None) => String::new(),
        };
        out.push_str(&format!("{} = {}{note}\n", descriptor.name, resolved.value));
    }
    out
}

pub fn print_changes(update: &ConfigUpdate) {
    print!("{}", changes_text(update));
}

fn changes_text(update: &ConfigUpdate) -> String {
    let mut out = format!(
        "generation {}: {} change(s)\n",
        update.snapshot.generation(),
        update.changes.len()
    );
    for change in &update.changes {
        let marker = if change.requires_restart { " (restart)" } else { "" };
        out.push_str(&format!(
            "  {}: {} -> {}{marker}\n",
            change.field, change.old, change.new
        ));
    }
    if update.requires_restart() {
        out.push_str("  agent restart required\n");
    }
    out
}

#[derive(Serialize)]
struct DescriptorView {
    name: &'static str,
    aliases: &'static [&'static str],
    kind: String,
    default: String,
    rule: &'static str,
    restart: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    doc: &'static str,
}

fn view(registry: &Registry, descriptor: &FieldDescriptor) -> DescriptorView {
    let default = registry
        .lookup(descriptor.name)
        .map(|found| registry.default_value(found.index).to_string())
        .unwrap_or_else(|| descriptor.default.to_string());
    DescriptorView {
        name: descriptor.name,
        aliases: descriptor.aliases,
        kind: descriptor.kind.to_string(),
        default,
        rule: descriptor.rule.name(),
        restart: descriptor.requires_restart(),
        doc: descriptor.doc,
    }
}

pub fn print_descriptors(
    registry: &Registry,
    descriptors: &[&FieldDescriptor],
    format: Format,
) -> anyhow::Result<()> {
    let views: Vec<_> = descriptors.iter().map(|d| view(registry, d)).collect();
    match format {
        Format::Text => {
            for v in &views {
                print!("{}", descriptor_text(v));
            }
        }
        Format::Yaml => print!("{}", serde_yaml::to_string(&views)?),
        Format::Json => println!("{}", serde_json::to_string_pretty(&views)?),
    }
    Ok(())
}

fn descriptor_text(v: &DescriptorView) -> String {
    let mut out = format!("{} ({})\n  default: {}\n", v.name, v.kind, v.default);
    if !v.aliases.is_empty() {
        out.push_str(&format!("  aliases: {}\n", v.aliases.join(", ")));
    }
    out.push_str(&format!("  rule: {}\n", v.rule));
    out.push_str(if v.restart { "  change requires restart\n" } else { "  applied live\n" });
    if !v.doc.is_empty() {
        out.push_str(&format!("  {}\n", v.doc));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn defaults_snapshot_has_no_overrides() {
        let registry = Registry::builtin().unwrap();
        let snapshot = Snapshot::defaults(Arc::clone(&registry));

        assert!(snapshot_text(&snapshot, true).is_empty());
        assert!(overridden_map(&snapshot).is_empty());
        let full = snapshot_text(&snapshot, false);
        assert!(full.contains("logSeverityScreen = Info\n"));
        assert_eq!(full.lines().count(), registry.len());
    }

    #[test]
    fn describes_aliases_and_restart() {
        let registry = Registry::builtin().unwrap();
        let descriptor = registry.descriptor_for("ReportingIntervalSecs").unwrap();
        let text = descriptor_text(&view(&registry, descriptor));

        assert!(text.starts_with("reportingInterval (duration"));
        assert!(text.contains("aliases: ReportingIntervalSecs"));
        assert!(text.contains("applied live"));
    }
}
