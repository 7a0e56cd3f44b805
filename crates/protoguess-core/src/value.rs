//! Structured values produced by the decoder and consumed by the encoder.

use bytes::Bytes;
use std::collections::btree_map::{self, BTreeMap};

/// A best-effort decoded value
///
/// `Bytes` and `Text` only come out of the decoder as raw fallbacks: the
/// whole byte range of a scope that did not parse as a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Varint payload
    Integer(u64),
    /// FIXED32 payload as an IEEE-754 single
    Float(f32),
    /// FIXED64 payload as an IEEE-754 double
    Double(f64),
    /// Raw bytes
    Bytes(Bytes),
    /// Raw bytes interpreted under a text encoding
    Text(String),
    /// Nested message
    Message(Message),
    /// Values of a field number that occurred more than once
    Repeated(Vec<Value>),
}

impl Value {
    /// Returns a short name of the value kind
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Message(_) => "message",
            Value::Repeated(_) => "repeated",
        }
    }

    /// Returns true for raw fallback kinds (bytes or text)
    pub fn is_raw(&self) -> bool {
        matches!(self, Value::Bytes(_) | Value::Text(_))
    }

    /// Returns the integer payload, if this is an integer
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested message, if this is a message
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements, if this is a repeated value
    pub fn as_repeated(&self) -> Option<&[Value]> {
        match self {
            Value::Repeated(values) => Some(values),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Integer(v)
    }
}

/// Negative numbers are stored in two's complement, as protobuf `int64` does.
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Value {
    fn from(v: &'static [u8]) -> Self {
        Value::Bytes(Bytes::from_static(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<Message> for Value {
    fn from(v: Message) -> Self {
        Value::Message(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Repeated(v)
    }
}

/// A schema-less message: field numbers mapped to values in ascending order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: BTreeMap<u64, Value>,
}

impl Message {
    /// Creates an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`, returning the previous value
    pub fn insert(&mut self, field: u64, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field, value.into())
    }

    /// Records another occurrence of `field`
    ///
    /// The first occurrence is stored as-is. The second turns the stored
    /// value into a [`Value::Repeated`] of both; later ones append to it.
    pub fn push(&mut self, field: u64, value: Value) {
        match self.fields.entry(field) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            btree_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Repeated(values) => values.push(value),
                existing => {
                    let first = std::mem::replace(existing, Value::Repeated(Vec::new()));
                    *existing = Value::Repeated(vec![first, value]);
                }
            },
        }
    }

    /// Builder-style [`Message::insert`]
    pub fn with(mut self, field: u64, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns the value stored under `field`
    pub fn get(&self, field: u64) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// Returns true if `field` is present
    pub fn contains(&self, field: u64) -> bool {
        self.fields.contains_key(&field)
    }

    /// Number of distinct field numbers
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in ascending field-number order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Value)> {
        self.fields.iter().map(|(&field, value)| (field, value))
    }
}

impl FromIterator<(u64, Value)> for Message {
    fn from_iter<I: IntoIterator<Item = (u64, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Message {
    type Item = (u64, Value);
    type IntoIter = btree_map::IntoIter<u64, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_converts_on_second_occurrence() {
        let mut message = Message::new();
        message.push(2, Value::Integer(1));
        assert_eq!(message.get(2), Some(&Value::Integer(1)));

        message.push(2, Value::Integer(2));
        message.push(2, Value::Integer(3));
        assert_eq!(
            message.get(2),
            Some(&Value::Repeated(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ]))
        );
        assert_eq!(message.len(), 1);
    }

    #[test]
    fn test_iter_is_ordered() {
        let message = Message::new().with(9, 1u64).with(3, "x").with(5, 2.5f64);
        let fields: Vec<u64> = message.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec![3, 5, 9]);
    }

    #[test]
    fn test_collect_and_consume() {
        let message: Message = vec![(4, Value::from(1u64)), (2, Value::from("a"))]
            .into_iter()
            .collect();
        assert!(message.contains(2));
        assert!(!message.contains(3));

        let fields: Vec<(u64, Value)> = message.into_iter().collect();
        assert_eq!(
            fields,
            vec![(2, Value::Text("a".into())), (4, Value::Integer(1))]
        );
    }

    #[test]
    fn test_signed_integer_conversion() {
        assert_eq!(Value::from(-1i64), Value::Integer(u64::MAX));
        assert_eq!(Value::from(7i64).as_integer(), Some(7));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::from(1.0f32).kind(), "float");
        assert_eq!(Value::from(1.0f64).kind(), "double");
        assert!(Value::from(vec![1u8]).is_raw());
        assert!(!Value::from(Message::new()).is_raw());
    }
}
