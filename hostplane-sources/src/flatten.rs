//! Flattening of structured configuration objects into wire strings.
//!
//! Datastore objects and YAML/JSON files carry typed JSON values. The engine
//! only deals in raw strings, so every value is rendered in the wire form a
//! flat source (environment, INI file) would have used for it.

use serde_json::{Map, Value};

use crate::{RawMap, SourceError};

const NONE: &str = "none";

/// Flattens a configuration object, accepting either `{"spec": {...}}` or the
/// bare spec. Null values are treated as not supplied.
pub fn flatten_object(object: &Value) -> Result<RawMap, SourceError> {
    let spec = match object.get("spec") {
        Some(spec @ Value::Object(_)) => spec,
        Some(Value::Null) => return Ok(RawMap::new()),
        Some(_) => return Err(SourceError::Malformed("'spec' is not an object".into())),
        None => object,
    };
    let fields = spec
        .as_object()
        .ok_or_else(|| SourceError::Malformed("expected an object".into()))?;

    let mut raw = RawMap::new();
    for (key, value) in fields {
        if let Some(wire) = to_wire(key, value)? {
            raw.insert(key.clone(), wire);
        }
    }
    Ok(raw)
}

fn to_wire(key: &str, value: &Value) -> Result<Option<String>, SourceError> {
    let rendered = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => NONE.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| element_to_wire(key, item))
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
        Value::Object(fields) => object_to_wire(key, fields)?,
    };
    Ok(Some(rendered))
}

fn element_to_wire(key: &str, item: &Value) -> Result<String, SourceError> {
    match item {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Object(fields) if fields.contains_key("port") => proto_port_to_wire(key, fields),
        _ => Err(SourceError::Malformed(format!(
            "'{key}': unsupported list element {item}"
        ))),
    }
}

/// `{"protocol": "tcp", "port": 22, "net": "10.0.0.0/8"}` → `tcp:22:10.0.0.0/8`.
fn proto_port_to_wire(key: &str, fields: &Map<String, Value>) -> Result<String, SourceError> {
    let port = fields
        .get("port")
        .and_then(scalar)
        .ok_or_else(|| SourceError::Malformed(format!("'{key}': port entry without a port")))?;
    let mut wire = match fields.get("protocol").and_then(scalar) {
        Some(protocol) if !protocol.is_empty() => format!("{protocol}:{port}"),
        _ => port,
    };
    if let Some(net) = fields.get("net").and_then(scalar).filter(|n| !n.is_empty()) {
        wire.push(':');
        wire.push_str(&net);
    }
    Ok(wire)
}

fn object_to_wire(key: &str, fields: &Map<String, Value>) -> Result<String, SourceError> {
    if let (Some(min), Some(max)) = (fields.get("min"), fields.get("max")) {
        return match (scalar(min), scalar(max)) {
            (Some(min), Some(max)) => Ok(format!("{min},{max}")),
            _ => Err(SourceError::Malformed(format!("'{key}': non-scalar range bound"))),
        };
    }
    fields
        .iter()
        .map(|(k, v)| {
            scalar(v)
                .map(|v| format!("{k}={v}"))
                .ok_or_else(|| SourceError::Malformed(format!("'{key}.{k}' is not a scalar")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|mut pairs| {
            pairs.sort();
            pairs.join(",")
        })
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
