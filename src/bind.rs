use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::io::BufRead;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use linked_hash_map::LinkedHashMap;
use tracing::trace;

use crate::bdecode::{DictAccess, ListAccess};
use crate::bytestring::{ByteString, MapKey};
use crate::error::{DecodeError, Token};
use crate::number::{Integer, Number};

type Result<T> = std::result::Result<T, DecodeError>;

/// A decode destination.
///
/// The decoder reads the leading token of a value and calls the matching
/// method. Every method defaults to a [`DecodeError::TypeMismatch`], so an
/// implementation only overrides the shapes it can hold.
pub trait Bind {
    /// Type name reported in mismatch errors.
    const TARGET: &'static str;

    /// Receives the raw digits of an integer, without the `i`/`e` delimiters.
    fn bind_integer(&mut self, literal: &[u8]) -> Result<()> {
        let _ = literal;
        Err(DecodeError::mismatch(Token::Integer, Self::TARGET))
    }

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        let _ = bytes;
        Err(DecodeError::mismatch(Token::String, Self::TARGET))
    }

    /// Receives one byte of a string being spread over a sequence of elements.
    fn bind_byte(&mut self, byte: u8) -> Result<()> {
        let _ = byte;
        Err(DecodeError::mismatch(Token::String, Self::TARGET))
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
        let _ = list;
        Err(DecodeError::mismatch(Token::List, Self::TARGET))
    }

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
        let _ = dict;
        Err(DecodeError::mismatch(Token::Dictionary, Self::TARGET))
    }
}

/// Accepts and drops any value. Used to step over entries nobody claims.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Bind for Discard {
    const TARGET: &'static str = "Discard";

    fn bind_integer(&mut self, _literal: &[u8]) -> Result<()> {
        Ok(())
    }

    fn bind_string(&mut self, _bytes: Vec<u8>) -> Result<()> {
        Ok(())
    }

    fn bind_byte(&mut self, _byte: u8) -> Result<()> {
        Ok(())
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
        while list.next_element(&mut Discard)? {}
        Ok(())
    }

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
        while dict.next_key()?.is_some() {
            dict.skip()?;
        }
        Ok(())
    }
}

fn bind_number<T: Integer>(target: &mut T, literal: &[u8]) -> Result<()> {
    *target = T::from_number(Number::parse(literal, T::WIDTH)?);
    Ok(())
}

macro_rules! bind_integer {
    ($($t:ty),*) => {
        $(
            impl Bind for $t {
                const TARGET: &'static str = stringify!($t);

                fn bind_integer(&mut self, literal: &[u8]) -> Result<()> {
                    bind_number(self, literal)
                }
            }
        )*
    };
}

bind_integer!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

// u8 doubles as the element type of byte sequences.
impl Bind for u8 {
    const TARGET: &'static str = "u8";

    fn bind_integer(&mut self, literal: &[u8]) -> Result<()> {
        bind_number(self, literal)
    }

    fn bind_byte(&mut self, byte: u8) -> Result<()> {
        *self = byte;
        Ok(())
    }
}

macro_rules! bind_nothing {
    ($($t:ty),*) => {
        $(
            impl Bind for $t {
                const TARGET: &'static str = stringify!($t);
            }
        )*
    };
}

// No wire representation; every token is a mismatch.
bind_nothing!(bool, f32, f64, char, ());

impl Bind for String {
    const TARGET: &'static str = "String";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        *self = String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
        Ok(())
    }
}

impl Bind for ByteString {
    const TARGET: &'static str = "ByteString";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.0 = bytes;
        Ok(())
    }
}

impl Bind for Bytes {
    const TARGET: &'static str = "Bytes";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        *self = Bytes::from(bytes);
        Ok(())
    }
}

impl<T: Bind + Default> Bind for Vec<T> {
    const TARGET: &'static str = "Vec";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        let mut items = Vec::with_capacity(bytes.len());
        for byte in bytes {
            let mut item = T::default();
            item.bind_byte(byte)?;
            items.push(item);
        }
        *self = items;
        Ok(())
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
        self.clear();
        loop {
            let mut item = T::default();
            if !list.next_element(&mut item)? {
                return Ok(());
            }
            self.push(item);
        }
    }
}

// Fixed capacity: fill slots positionally and let the rest go. Slots past
// the end of the wire value keep whatever they held.
impl<T: Bind> Bind for [T] {
    const TARGET: &'static str = "slice";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        if bytes.len() > self.len() {
            trace!(len = bytes.len(), capacity = self.len(), "truncating byte string");
        }
        for (slot, byte) in self.iter_mut().zip(bytes) {
            slot.bind_byte(byte)?;
        }
        Ok(())
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
        for slot in self.iter_mut() {
            if !list.next_element(slot)? {
                break;
            }
        }
        Ok(())
    }
}

impl<T: Bind, const N: usize> Bind for [T; N] {
    const TARGET: &'static str = "array";

    fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.as_mut_slice().bind_string(bytes)
    }

    fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
        self.as_mut_slice().bind_list(list)
    }
}

// Each entry gets a fresh value, so a repeated key replaces the earlier one.
fn bind_entries<K, V, R, F>(dict: &mut DictAccess<'_, R>, mut insert: F) -> Result<()>
where
    K: MapKey,
    V: Bind + Default,
    R: BufRead,
    F: FnMut(K, V),
{
    while let Some(key) = dict.next_key()? {
        let mut value = V::default();
        dict.value(&mut value)?;
        insert(K::from_wire(key), value);
    }
    Ok(())
}

impl<K, V, S> Bind for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Bind + Default,
    S: BuildHasher,
{
    const TARGET: &'static str = "HashMap";

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
        bind_entries(dict, |key, value| {
            self.insert(key, value);
        })
    }
}

impl<K, V> Bind for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Bind + Default,
{
    const TARGET: &'static str = "BTreeMap";

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
        bind_entries(dict, |key, value| {
            self.insert(key, value);
        })
    }
}

impl<K, V> Bind for LinkedHashMap<K, V>
where
    K: MapKey + Eq + Hash,
    V: Bind + Default,
{
    const TARGET: &'static str = "LinkedHashMap";

    fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
        bind_entries(dict, |key, value| {
            self.insert(key, value);
        })
    }
}

// Forwards every capability to the value reached through `$inner`.
macro_rules! bind_through {
    ($this:ident => $inner:expr) => {
        fn bind_integer(&mut self, literal: &[u8]) -> Result<()> {
            let $this = self;
            $inner.bind_integer(literal)
        }

        fn bind_string(&mut self, bytes: Vec<u8>) -> Result<()> {
            let $this = self;
            $inner.bind_string(bytes)
        }

        fn bind_byte(&mut self, byte: u8) -> Result<()> {
            let $this = self;
            $inner.bind_byte(byte)
        }

        fn bind_list<R: BufRead>(&mut self, list: &mut ListAccess<'_, R>) -> Result<()> {
            let $this = self;
            $inner.bind_list(list)
        }

        fn bind_dict<R: BufRead>(&mut self, dict: &mut DictAccess<'_, R>) -> Result<()> {
            let $this = self;
            $inner.bind_dict(dict)
        }
    };
}

// An unset option is allocated on first use.
impl<T: Bind + Default> Bind for Option<T> {
    const TARGET: &'static str = T::TARGET;

    bind_through!(this => this.get_or_insert_with(T::default));
}

impl<T: Bind + ?Sized> Bind for Box<T> {
    const TARGET: &'static str = T::TARGET;

    bind_through!(this => (**this));
}

// A shared handle cannot be written through.
impl<T: Bind + ?Sized> Bind for Rc<T> {
    const TARGET: &'static str = "Rc";

    bind_through!(this => Rc::get_mut(this).ok_or(DecodeError::InvalidTarget(Self::TARGET))?);
}

impl<T: Bind + ?Sized> Bind for Arc<T> {
    const TARGET: &'static str = "Arc";

    bind_through!(this => Arc::get_mut(this).ok_or(DecodeError::InvalidTarget(Self::TARGET))?);
}
