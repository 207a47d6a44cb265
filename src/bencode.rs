use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use linked_hash_map::LinkedHashMap;

use crate::bytestring::{ByteString, MapKey};
use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::number::{Integer, Number};

type Result<T> = std::result::Result<T, EncodeError>;

/// Writes bencode values into a byte sink.
pub struct Encoder<W> {
    writer: W,
    config: EncoderConfig,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Encoder<W> {
        Encoder { writer, config: EncoderConfig::default() }
    }

    pub fn with_config(mut self, config: EncoderConfig) -> Encoder<W> {
        self.config = config;
        self
    }

    /// Emit dictionary keys in raw byte order instead of declaration order.
    pub fn sort_keys(mut self, sort: bool) -> Encoder<W> {
        self.config.sort_keys = sort;
        self
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.encode_to(self)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn encode_int(&mut self, number: Number) -> Result<()> {
        write!(self.writer, "i{}e", number)?;
        Ok(())
    }

    pub fn encode_bytestring(&mut self, bytes: &[u8]) -> Result<()> {
        write!(self.writer, "{}:", bytes.len())?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn encode_list<'a, T, I>(&mut self, items: I) -> Result<()>
    where
        T: Encode + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.writer.write_all(b"l")?;
        for item in items {
            item.encode_to(self)?;
        }
        self.writer.write_all(b"e")?;
        Ok(())
    }

    /// Opens a dictionary. Entries go through the returned [`DictEncoder`],
    /// which must be closed with [`DictEncoder::finish`].
    pub fn encode_dict(&mut self) -> Result<DictEncoder<'_, W>> {
        self.writer.write_all(b"d")?;
        let sorted = if self.config.sort_keys { Some(Vec::new()) } else { None };
        Ok(DictEncoder { encoder: self, sorted })
    }
}

/// An open dictionary on an [`Encoder`].
///
/// Entries are written through as they arrive, unless key sorting is on, in
/// which case each value is encoded aside and everything is flushed in key
/// order on [`DictEncoder::finish`]. Sorted output is canonical, so a key
/// added twice fails there with [`EncodeError::DuplicateKey`].
pub struct DictEncoder<'a, W> {
    encoder: &'a mut Encoder<W>,
    sorted: Option<Vec<(Vec<u8>, Vec<u8>)>>,
}

impl<W: Write> DictEncoder<'_, W> {
    /// Adds one entry. Values that report themselves absent are left out.
    pub fn entry<T: Encode + ?Sized>(&mut self, key: &[u8], value: &T) -> Result<()> {
        if value.is_absent() {
            return Ok(());
        }
        match &mut self.sorted {
            Some(entries) => {
                let mut aside = Encoder::new(Vec::new()).with_config(self.encoder.config);
                value.encode_to(&mut aside)?;
                entries.push((key.to_vec(), aside.into_inner()));
            }
            None => {
                self.encoder.encode_bytestring(key)?;
                value.encode_to(self.encoder)?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        if let Some(mut entries) = self.sorted {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                let key = String::from_utf8_lossy(&pair[0].0).into_owned();
                return Err(EncodeError::DuplicateKey(key));
            }
            for (key, value) in entries {
                self.encoder.encode_bytestring(&key)?;
                self.encoder.writer.write_all(&value)?;
            }
        }
        self.encoder.writer.write_all(b"e")?;
        Ok(())
    }
}

/// A value with a bencode representation.
pub trait Encode {
    /// Set for `u8` only: sequences of it are written as byte strings, not lists.
    const IS_BYTE: bool = false;

    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()>;

    fn as_byte(&self) -> Option<u8> {
        None
    }

    /// Whether a dictionary should omit this value instead of writing it.
    fn is_absent(&self) -> bool {
        false
    }
}

macro_rules! encode_integer {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
                    encoder.encode_int(self.to_number())
                }
            }
        )*
    };
}

encode_integer!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

impl Encode for u8 {
    const IS_BYTE: bool = true;

    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.encode_int(self.to_number())
    }

    fn as_byte(&self) -> Option<u8> {
        Some(*self)
    }
}

macro_rules! encode_unsupported {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode_to<W: Write>(&self, _encoder: &mut Encoder<W>) -> Result<()> {
                    Err(EncodeError::UnsupportedType(stringify!($t)))
                }
            }
        )*
    };
}

encode_unsupported!(bool, f32, f64, char, ());

impl Encode for str {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.encode_bytestring(self.as_bytes())
    }
}

impl Encode for String {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.encode_bytestring(self.as_bytes())
    }
}

impl Encode for ByteString {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.encode_bytestring(&self.0)
    }
}

impl Encode for Bytes {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.encode_bytestring(self)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        if T::IS_BYTE {
            let bytes: Vec<u8> = self.iter().filter_map(Encode::as_byte).collect();
            encoder.encode_bytestring(&bytes)
        } else {
            encoder.encode_list(self)
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.as_slice().encode_to(encoder)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.as_slice().encode_to(encoder)
    }
}

fn encode_map<'a, K, V, I, W>(encoder: &mut Encoder<W>, entries: I) -> Result<()>
where
    K: MapKey + 'a,
    V: Encode + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
    W: Write,
{
    let mut dict = encoder.encode_dict()?;
    for (key, value) in entries {
        dict.entry(key.as_wire(), value)?;
    }
    dict.finish()
}

// HashMap iteration order is unspecified; turn on key sorting for stable output.
impl<K: MapKey, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encode_map(encoder, self)
    }
}

impl<K: MapKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encode_map(encoder, self)
    }
}

impl<K: MapKey + std::hash::Hash + Eq, V: Encode> Encode for LinkedHashMap<K, V> {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encode_map(encoder, self.iter())
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        match self {
            Some(value) => value.encode_to(encoder),
            None => Err(EncodeError::UnsupportedType("Option::None")),
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

macro_rules! encode_through {
    ($($ptr:ident),*) => {
        $(
            impl<T: Encode + ?Sized> Encode for $ptr<T> {
                fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
                    (**self).encode_to(encoder)
                }

                fn is_absent(&self) -> bool {
                    (**self).is_absent()
                }
            }
        )*
    };
}

encode_through!(Box, Rc, Arc);

impl<T: Encode + ?Sized> Encode for &T {
    fn encode_to<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        (**self).encode_to(encoder)
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

/// Encodes `value` into a fresh buffer.
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

pub fn encode_to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Bytes> {
    encode(value).map(Bytes::from)
}

#[cfg(test)]
mod test {
    use super::*;

    fn encoded<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
        encode(value).unwrap()
    }

    #[test]
    fn encode_int_zero() {
        assert_eq!(b"i0e".to_vec(), encoded(&0i32));
    }

    #[test]
    fn encode_int_positive_number() {
        let mut encoder = Encoder::new(Vec::new());
        encoder.encode(&1234u32).unwrap();
        assert_eq!(b"i1234e".to_vec(), encoder.writer);

        encoder.encode(&567i64).unwrap();
        assert_eq!(b"i1234ei567e".to_vec(), encoder.into_inner());
    }

    #[test]
    fn encode_int_negative_number() {
        let mut encoder = Encoder::new(Vec::new());
        encoder.encode(&-123i16).unwrap();
        encoder.encode(&-45i8).unwrap();
        encoder.encode(&67isize).unwrap();
        assert_eq!(b"i-123ei-45ei67e".to_vec(), encoder.into_inner());
    }

    #[test]
    fn encode_int_boundaries() {
        assert_eq!(b"i-9223372036854775808e".to_vec(), encoded(&i64::MIN));
        assert_eq!(b"i18446744073709551615e".to_vec(), encoded(&u64::MAX));
        assert_eq!(b"i255e".to_vec(), encoded(&u8::MAX));
        assert_eq!(b"i-128e".to_vec(), encoded(&i8::MIN));
    }

    #[test]
    fn test_encode_bytestring() {
        assert_eq!(b"4:abcd".to_vec(), encoded("abcd"));
        assert_eq!(b"3:123".to_vec(), encoded(&"123".to_string()));
        assert_eq!(b"6:\n\r\t\\/,".to_vec(), encoded(&ByteString(b"\n\r\t\\/,".to_vec())));
        assert_eq!(b"0:".to_vec(), encoded(&Bytes::new()));
    }

    #[test]
    fn byte_sequences_are_strings() {
        assert_eq!(b"3:abc".to_vec(), encoded(&b"abc".to_vec()));
        assert_eq!(b"2:\x01\x02".to_vec(), encoded(&[1u8, 2u8]));
        assert_eq!(b"0:".to_vec(), encoded(&Vec::<u8>::new()));
    }

    #[test]
    fn encode_list_empty() {
        assert_eq!(b"le".to_vec(), encoded(&Vec::<i32>::new()));
    }

    #[test]
    fn encode_list_flat() {
        let list = vec![345i64, -1, 0];
        assert_eq!(b"li345ei-1ei0ee".to_vec(), encoded(&list));
        assert_eq!(b"l3:abc3:defe".to_vec(), encoded(&["abc", "def"]));
    }

    #[test]
    fn encode_list_inner() {
        let list: Vec<Vec<Vec<u16>>> = vec![vec![vec![1], vec![]], vec![]];
        assert_eq!(b"llli1eeleelee".to_vec(), encoded(&list));
    }

    #[test]
    fn encode_dict_empty() {
        assert_eq!(b"de".to_vec(), encoded(&BTreeMap::<String, i32>::new()));
    }

    #[test]
    fn encode_dict_flat() {
        let mut dict = LinkedHashMap::new();
        dict.insert("item1".to_string(), 123i64);
        dict.insert("item0".to_string(), 7);
        assert_eq!(b"d5:item1i123e5:item0i7ee".to_vec(), encoded(&dict));
    }

    #[test]
    fn encode_dict_layered() {
        let mut innermost = BTreeMap::new();
        innermost.insert(ByteString::from("core"), 50000u32);
        let mut inner = BTreeMap::new();
        inner.insert(ByteString::from("inner"), innermost);
        assert_eq!(b"d5:innerd4:corei50000eee".to_vec(), encoded(&inner));
    }

    #[test]
    fn sorted_keys_are_canonical() {
        let mut dict = LinkedHashMap::new();
        dict.insert(ByteString::from("zz"), vec![3u64]);
        dict.insert(ByteString::from("a"), vec![]);
        dict.insert(ByteString::from("ab"), vec![1, 2]);

        let mut encoder = Encoder::new(Vec::new()).sort_keys(true);
        encoder.encode(&dict).unwrap();
        assert_eq!(b"d1:ale2:abli1ei2ee2:zzli3eee".to_vec(), encoder.into_inner());
    }

    #[test]
    fn sorting_reaches_nested_dictionaries() {
        let mut inner = LinkedHashMap::new();
        inner.insert("y".to_string(), 2i32);
        inner.insert("x".to_string(), 1);
        let mut outer = LinkedHashMap::new();
        outer.insert("b".to_string(), inner);
        outer.insert("a".to_string(), LinkedHashMap::new());

        let config = EncoderConfig { sort_keys: true };
        let mut encoder = Encoder::new(Vec::new()).with_config(config);
        encoder.encode(&outer).unwrap();
        assert_eq!(b"d1:ade1:bd1:xi1e1:yi2eee".to_vec(), encoder.into_inner());
    }

    #[test]
    fn duplicate_keys_only_fail_when_sorted() {
        let mut encoder = Encoder::new(Vec::new());
        let mut dict = encoder.encode_dict().unwrap();
        dict.entry(b"a", &1u8).unwrap();
        dict.entry(b"a", &2u8).unwrap();
        dict.finish().unwrap();
        assert_eq!(b"d1:ai1e1:ai2ee".to_vec(), encoder.into_inner());

        let mut encoder = Encoder::new(Vec::new()).sort_keys(true);
        let mut dict = encoder.encode_dict().unwrap();
        dict.entry(b"b", &1u8).unwrap();
        dict.entry(b"a", &2u8).unwrap();
        dict.entry(b"b", &3u8).unwrap();
        let res = dict.finish();
        assert!(matches!(res, Err(EncodeError::DuplicateKey(ref key)) if key == "b"));
    }

    #[test]
    fn unsupported_shapes() {
        assert!(matches!(encode(&true), Err(EncodeError::UnsupportedType("bool"))));
        assert!(matches!(encode(&1.5f64), Err(EncodeError::UnsupportedType("f64"))));
        assert!(matches!(encode(&vec![false]), Err(EncodeError::UnsupportedType("bool"))));
        assert!(matches!(encode(&None::<i32>), Err(EncodeError::UnsupportedType("Option::None"))));
    }

    #[test]
    fn indirections_are_followed() {
        assert_eq!(b"i5e".to_vec(), encoded(&Box::new(5i32)));
        assert_eq!(b"2:hi".to_vec(), encoded(&Rc::new("hi".to_string())));
        assert_eq!(b"li1ee".to_vec(), encoded(&Arc::new(vec![1u32])));
        assert_eq!(b"i9e".to_vec(), encoded(&Some(9u8)));
        assert_eq!(b"i9e".to_vec(), encoded(&&9u8));
    }

    #[test]
    fn absent_map_values_are_skipped() {
        let mut dict = BTreeMap::new();
        dict.insert("a".to_string(), Some(1i32));
        dict.insert("b".to_string(), None);
        assert_eq!(b"d1:ai1ee".to_vec(), encoded(&dict));
    }

    #[test]
    fn write_failures_surface_as_io() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut encoder = Encoder::new(Broken);
        assert!(matches!(encoder.encode(&1i32), Err(EncodeError::Io(_))));
    }

    #[test]
    fn into_shared_bytes() {
        assert_eq!(Bytes::from_static(b"4:spam"), encode_to_bytes("spam").unwrap());
    }
}
