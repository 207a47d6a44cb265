//! Bencode encoding and decoding with binding to typed values.
//!
//! Bencode is the length-prefixed format BitTorrent uses for `.torrent` files,
//! tracker responses and DHT messages.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! Values are decoded straight into a destination implementing [`Bind`] and
//! encoded from anything implementing [`Encode`]. Both are provided for the
//! integer types, `String`, byte containers, vectors, fixed-size arrays, maps,
//! the dynamic [`Value`], and structs declared with [`record!`].
//!
//! # Decoding
//!
//! ```
//! use std::collections::HashMap;
//! use bencode_bind::{decode, decode_value, Value};
//!
//! let mut n = 0u16;
//! decode(b"i42e", &mut n).unwrap();
//! assert_eq!(42, n);
//!
//! let mut id = [0u8; 3];
//! decode(b"5:abcde", &mut id).unwrap();
//! assert_eq!(*b"abc", id);
//!
//! let mut peers: HashMap<String, Vec<u8>> = HashMap::new();
//! decode(b"d3:foo3:bare", &mut peers).unwrap();
//! assert_eq!(b"bar".to_vec(), peers["foo"]);
//!
//! let value = decode_value(b"l4:spami42ee").unwrap();
//! assert_eq!(Some(2), value.as_list().map(|l| l.len()));
//! ```
//!
//! # Encoding
//!
//! ```
//! use bencode_bind::{encode, Encoder};
//! use std::collections::HashMap;
//!
//! assert_eq!(b"i-7e".to_vec(), encode(&-7i32).unwrap());
//! assert_eq!(b"l5:helloi1ee".to_vec(), encode(&bencode_bind::Value::List(vec![
//!     "hello".into(),
//!     1i64.into(),
//! ])).unwrap());
//!
//! // Canonical output with sorted keys
//! let mut dict = HashMap::new();
//! dict.insert("b".to_string(), 2u8);
//! dict.insert("a".to_string(), 1u8);
//! let mut encoder = Encoder::new(Vec::new()).sort_keys(true);
//! encoder.encode(&dict).unwrap();
//! assert_eq!(b"d1:ai1e1:bi2ee".to_vec(), encoder.into_inner());
//! ```
//!
//! # Lenience
//!
//! Dictionary keys no field claims are skipped, fixed-size arrays keep only
//! as many list elements or string bytes as they have room for, and dictionary
//! key order is neither checked nor, unless asked for, produced canonically.
//!
//! # Error Handling
//!
//! - [`DecodeError::UnexpectedEof`] - Input ended inside a value
//! - [`DecodeError::NumberParse`] - Literal does not fit the target width
//! - [`DecodeError::TypeMismatch`] - Wire value has the wrong shape for the target
//! - [`DecodeError::NestingTooDeep`] - Recursion limit exceeded (64 levels by default)
//! - [`EncodeError::UnsupportedType`] - Value has no bencode form, such as `bool`

mod bdecode;
mod bencode;
mod bind;
mod bytestring;
mod config;
mod error;
mod number;
pub mod record;
mod value;

pub use bdecode::{decode, decode_value, Decoder, DictAccess, ListAccess};
pub use bencode::{encode, encode_to_bytes, DictEncoder, Encode, Encoder};
pub use bind::{Bind, Discard};
pub use bytestring::{ByteString, MapKey, ToByteString};
pub use config::{DecoderConfig, EncoderConfig, DEFAULT_MAX_DEPTH};
pub use error::{DecodeError, EncodeError, Token};
pub use number::{Integer, Number, Width};
pub use record::Record;
pub use value::Value;
