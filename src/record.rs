//! Typed records mapped onto bencode dictionaries.
//!
//! A record is a struct whose fields are bound to dictionary keys by name.
//! The [`record!`](crate::record!) macro declares such a struct and wires it up:
//!
//! ```
//! use bencode_bind::{decode, encode, record};
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Args {
//!         #[bencode(rename = "id")]
//!         pub node_id: [u8; 20],
//!     }
//! }
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Query {
//!         #[bencode(rename = "t")]
//!         pub transaction: String,
//!         pub q: String,
//!         #[bencode(rename = "a")]
//!         pub args: Args,
//!     }
//! }
//!
//! let mut query = Query::default();
//! decode(b"d1:ad2:id20:abcdefghij0123456789e1:q4:ping1:t2:aae", &mut query).unwrap();
//! assert_eq!("ping", query.q);
//! assert_eq!(b"abcdefghij0123456789", &query.args.node_id);
//!
//! let bytes = encode(&query).unwrap();
//! assert_eq!(b"d1:t2:aa1:q4:ping1:ad2:id20:abcdefghij0123456789ee".to_vec(), bytes);
//! ```
//!
//! # Key resolution
//!
//! For every key on the wire the decoder looks, in order, at
//!
//! 1. fields marked `#[bencode(embed)]`, each resolved with these same rules,
//!    in declaration order; the first one that claims the key wins;
//! 2. fields whose `rename` equals the key;
//! 3. fields whose name equals the key, ignoring ASCII case.
//!
//! Keys no field claims are skipped. When encoding, fields are written in
//! declaration order under their `rename`, or their lower-cased name. An
//! embedded record contributes its own fields in place rather than a nested
//! dictionary, and an `Option` field holding `None` is left out.
//!
//! Field names are matched as written, so raw identifiers such as `r#type`
//! need a `rename`.
//!
//! Nothing stops an embedded record from promoting a key that the outer
//! record also uses. Such a record is written with the key twice, and reading
//! it back hands both values to the embedded field. With
//! [`Encoder::sort_keys`](crate::Encoder::sort_keys) on, encoding it fails
//! with [`EncodeError::DuplicateKey`](crate::EncodeError::DuplicateKey).

use std::io::{BufRead, Write};

use tracing::trace;

use crate::bdecode::DictAccess;
use crate::bencode::{DictEncoder, Encoder};
use crate::error::{DecodeError, EncodeError};

/// A struct whose fields map onto the entries of a bencode dictionary.
///
/// Usually implemented through [`record!`](crate::record!).
pub trait Record {
    /// Routes the value of dictionary entry `key` into the field that claims it.
    ///
    /// Returns `false`, without consuming the value, when no field does.
    fn bind_field<R: BufRead>(
        &mut self,
        key: &[u8],
        dict: &mut DictAccess<'_, R>,
    ) -> Result<bool, DecodeError>;

    /// Writes every field as a dictionary entry, in declaration order.
    fn encode_fields<W: Write>(&self, dict: &mut DictEncoder<'_, W>) -> Result<(), EncodeError>;
}

pub fn bind_record<T, R>(record: &mut T, dict: &mut DictAccess<'_, R>) -> Result<(), DecodeError>
where
    T: Record + ?Sized,
    R: BufRead,
{
    while let Some(key) = dict.next_key()? {
        if !record.bind_field(key.as_bytes(), dict)? {
            trace!(key = %key, "skipping unknown key");
            dict.skip()?;
        }
    }
    Ok(())
}

pub fn encode_record<T, W>(record: &T, encoder: &mut Encoder<W>) -> Result<(), EncodeError>
where
    T: Record + ?Sized,
    W: Write,
{
    let mut dict = encoder.encode_dict()?;
    record.encode_fields(&mut dict)?;
    dict.finish()
}

/// Wire name of a field without a `rename`.
pub fn wire_name(field: &str) -> String {
    field.to_lowercase()
}

/// Declares a struct and implements [`Record`], [`Bind`](crate::Bind) and
/// [`Encode`](crate::Encode) for it.
///
/// Fields may carry doc comments and at most one `#[bencode(...)]` attribute,
/// either `#[bencode(rename = "key")]` or `#[bencode(embed)]`. Every field
/// type must itself be bindable and encodable; embedded fields must be records.
/// See the [module documentation](crate::record) for how keys are resolved,
/// and for what happens when an embedded record shares a key with its parent.
#[macro_export]
macro_rules! record {
    (@embedded [embed] $field:expr, $key:ident, $dict:ident) => {
        if $crate::Record::bind_field(&mut $field, $key, $dict)? {
            return ::std::result::Result::Ok(true);
        }
    };
    (@embedded [rename = $tag:literal] $field:expr, $key:ident, $dict:ident) => {};
    (@embedded [] $field:expr, $key:ident, $dict:ident) => {};

    (@tagged [rename = $tag:literal] $field:expr, $key:ident, $dict:ident) => {
        if $key == $tag.as_bytes() {
            $dict.value(&mut $field)?;
            return ::std::result::Result::Ok(true);
        }
    };
    (@tagged [embed] $field:expr, $key:ident, $dict:ident) => {};
    (@tagged [] $field:expr, $key:ident, $dict:ident) => {};

    (@named [embed] $field:expr, $name:expr, $key:ident, $dict:ident) => {};
    (@named [$($opt:tt)*] $field:expr, $name:expr, $key:ident, $dict:ident) => {
        if $key.eq_ignore_ascii_case($name.as_bytes()) {
            $dict.value(&mut $field)?;
            return ::std::result::Result::Ok(true);
        }
    };

    (@encode [embed] $field:expr, $name:expr, $dict:ident) => {
        $crate::Record::encode_fields(&$field, $dict)?;
    };
    (@encode [rename = $tag:literal] $field:expr, $name:expr, $dict:ident) => {
        $dict.entry($tag.as_bytes(), &$field)?;
    };
    (@encode [] $field:expr, $name:expr, $dict:ident) => {
        $dict.entry($crate::record::wire_name($name).as_bytes(), &$field)?;
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[bencode($($opt:tt)*)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn bind_field<R: ::std::io::BufRead>(
                &mut self,
                key: &[u8],
                dict: &mut $crate::DictAccess<'_, R>,
            ) -> ::std::result::Result<bool, $crate::DecodeError> {
                $( $crate::record!(@embedded [$($($opt)*)?] (self.$field), key, dict); )*
                $( $crate::record!(@tagged [$($($opt)*)?] (self.$field), key, dict); )*
                $(
                    $crate::record!(
                        @named [$($($opt)*)?] (self.$field), stringify!($field), key, dict
                    );
                )*
                ::std::result::Result::Ok(false)
            }

            fn encode_fields<W: ::std::io::Write>(
                &self,
                dict: &mut $crate::DictEncoder<'_, W>,
            ) -> ::std::result::Result<(), $crate::EncodeError> {
                $(
                    $crate::record!(@encode [$($($opt)*)?] (self.$field), stringify!($field), dict);
                )*
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::Bind for $name {
            const TARGET: &'static str = stringify!($name);

            fn bind_dict<R: ::std::io::BufRead>(
                &mut self,
                dict: &mut $crate::DictAccess<'_, R>,
            ) -> ::std::result::Result<(), $crate::DecodeError> {
                $crate::record::bind_record(self, dict)
            }
        }

        impl $crate::Encode for $name {
            fn encode_to<W: ::std::io::Write>(
                &self,
                encoder: &mut $crate::Encoder<W>,
            ) -> ::std::result::Result<(), $crate::EncodeError> {
                $crate::record::encode_record(self, encoder)
            }
        }
    };
}
