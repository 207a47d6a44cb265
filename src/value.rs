use std::io::{BufRead, Write};

use linked_hash_map::LinkedHashMap;

use crate::bdecode::{DictAccess, ListAccess};
use crate::bencode::{Encode, Encoder};
use crate::bind::Bind;
use crate::bytestring::ByteString;
use crate::error::{DecodeError, EncodeError};
use crate::number::{Integer, Number};

/// A bencode value whose shape is decided by the wire rather than by a declared type.
///
/// Dictionaries keep their entries in wire order, so decoding and re-encoding
/// a dynamic value reproduces the input byte for byte.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    /// Integers land in the native signed representation.
    Integer(i64),
    Bytes(ByteString),
    List(Vec<Value>),
    Dict(LinkedHashMap<ByteString, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Bytes(ByteString::from(s))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b.as_bytes()),
            _ => None,
        }
    }

    /// Returns the byte string as text when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&LinkedHashMap<ByteString, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ByteString> for Value {
    fn from(b: ByteString) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<LinkedHashMap<ByteString, Value>> for Value {
    fn from(d: LinkedHashMap<ByteString, Value>) -> Self {
        Value::Dict(d)
    }
}

impl Bind for Value {
    const TARGET: &'static str = "Value";

    fn bind_integer(&mut self, literal: &[u8]) -> Result<(), DecodeError> {
        let number = Number::parse(literal, i64::WIDTH)?;
        *self = Value::Integer(i64::from_number(number));
        Ok(())
    }

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<(), DecodeError> {
        *self = Value::Bytes(ByteString(bytes));
        Ok(())
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<(), DecodeError> {
        let mut items: Vec<Value> = Vec::new();
        items.bind_list(list)?;
        *self = Value::List(items);
        Ok(())
    }

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<(), DecodeError> {
        let mut entries: LinkedHashMap<ByteString, Value> = LinkedHashMap::new();
        entries.bind_dict(dict)?;
        *self = Value::Dict(entries);
        Ok(())
    }
}

impl Encode for Value {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), EncodeError> {
        match self {
            Value::Integer(i) => i.encode_to(encoder),
            Value::Bytes(b) => b.encode_to(encoder),
            Value::List(l) => l.encode_to(encoder),
            Value::Dict(d) => d.encode_to(encoder),
        }
    }
}
