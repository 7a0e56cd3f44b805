//! JSON form of decoded values.
//!
//! Integers, text, messages and repeated values map onto plain JSON. The
//! kinds JSON cannot tell apart are wrapped in single-key objects:
//!
//! ```text
//! {"$f32": 1.5}   Float
//! {"$f64": 0.1}   Double
//! {"$bytes": "ff00"}   Bytes, lowercase hex
//! ```
//!
//! Non-finite floats are written as the strings `"NaN"`, `"inf"` and `"-inf"`.

use anyhow::{bail, Context, Result};
use protoguess_core::{Message, Value};
use serde_json::{Map, Number, Value as Json};

const FLOAT_KEY: &str = "$f32";
const DOUBLE_KEY: &str = "$f64";
const BYTES_KEY: &str = "$bytes";

/// Converts a decoded value to JSON
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Integer(v) => Json::from(*v),
        Value::Float(v) => tagged(FLOAT_KEY, float_to_json(f64::from(*v))),
        Value::Double(v) => tagged(DOUBLE_KEY, float_to_json(*v)),
        Value::Text(text) => Json::String(text.clone()),
        Value::Bytes(bytes) => tagged(BYTES_KEY, Json::String(to_hex(bytes))),
        Value::Message(message) => Json::Object(
            message
                .iter()
                .map(|(field, value)| (field.to_string(), to_json(value)))
                .collect(),
        ),
        Value::Repeated(values) => Json::Array(values.iter().map(to_json).collect()),
    }
}

/// Converts JSON back to a value the encoder accepts.
///
/// Untagged non-integer numbers are read as doubles.
pub fn from_json(json: &Json) -> Result<Value> {
    match json {
        Json::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(Value::Integer(v))
            } else if let Some(v) = n.as_i64() {
                Ok(Value::from(v))
            } else {
                n.as_f64()
                    .map(Value::Double)
                    .with_context(|| format!("unrepresentable number {}", n))
            }
        }
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Array(items) => items
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Repeated),
        Json::Object(map) => from_object(map),
        Json::Null | Json::Bool(_) => bail!("unsupported JSON value: {}", json),
    }
}

fn from_object(map: &Map<String, Json>) -> Result<Value> {
    if let (1, Some((key, inner))) = (map.len(), map.iter().next()) {
        match key.as_str() {
            FLOAT_KEY => return Ok(Value::Float(float_from_json(inner)? as f32)),
            DOUBLE_KEY => return Ok(Value::Double(float_from_json(inner)?)),
            BYTES_KEY => {
                let hex = inner.as_str().context("$bytes must be a hex string")?;
                return Ok(Value::from(from_hex(hex)?));
            }
            _ => {}
        }
    }

    let mut message = Message::new();
    for (key, inner) in map {
        let field: u64 = key
            .parse()
            .with_context(|| format!("object key '{}' is not a field number", key))?;
        let value = from_json(inner).with_context(|| format!("in field {}", field))?;
        message.insert(field, value);
    }
    Ok(Value::Message(message))
}

fn tagged(key: &str, inner: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), inner);
    Json::Object(map)
}

fn float_to_json(v: f64) -> Json {
    match Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None if v.is_nan() => Json::from("NaN"),
        None if v > 0.0 => Json::from("inf"),
        None => Json::from("-inf"),
    }
}

fn float_from_json(json: &Json) -> Result<f64> {
    match json {
        Json::Number(n) => n.as_f64().with_context(|| format!("bad float {}", n)),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            _ => bail!("bad float '{}'", s),
        },
        _ => bail!("bad float {}", json),
    }
}

/// Lowercase hex rendering of `bytes`
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("hex string has odd length {}", hex.len());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .with_context(|| format!("invalid hex at offset {}", i))
        })
        .collect()
}
