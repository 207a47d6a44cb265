use std::io::{BufRead, Read};

use tracing::{debug, trace};

use crate::bind::{Bind, Discard};
use crate::bytestring::ByteString;
use crate::config::DecoderConfig;
use crate::error::{DecodeError, Token};
use crate::number::{self, MAX_LITERAL_LEN};
use crate::value::Value;

type Result<T> = std::result::Result<T, DecodeError>;

// Upper bound on what is reserved up front for a byte string, so a forged
// length prefix cannot force a huge allocation before any data arrives.
const MAX_PREALLOC: usize = 64 * 1024;

/// Pulls bencode values out of a byte source and binds them into targets.
///
/// The decoder reads exactly one value per [`Decoder::decode`] call and
/// leaves any bytes after it unread.
pub struct Decoder<R> {
    reader: R,
    config: DecoderConfig,
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Decoder<R> {
        Decoder { reader, config: DecoderConfig::default() }
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Decoder<R> {
        self.config = config;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Decoder<R> {
        self.config.max_depth = max_depth;
        self
    }

    /// Decodes the next value from the source into `target`.
    ///
    /// On failure `target` may be partially populated.
    pub fn decode<T: Bind + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        self.parse_type(target, 0)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn parse_type<T: Bind + ?Sized>(&mut self, target: &mut T, depth: usize) -> Result<()> {
        let token = self.advance()?;
        self.dispatch(token, target, depth)
    }

    fn dispatch<T: Bind + ?Sized>(
        &mut self,
        token: u8,
        target: &mut T,
        depth: usize,
    ) -> Result<()> {
        match Token::from_byte(token) {
            Some(Token::Integer) => {
                let literal = self.parse_int()?;
                target.bind_integer(&literal)
            }
            Some(Token::String) => {
                let bytes = self.parse_str(token)?;
                target.bind_string(bytes)
            }
            Some(Token::List) => self.parse_list(target, depth),
            Some(Token::Dictionary) => self.parse_dict(target, depth),
            None => Err(DecodeError::UnexpectedToken(token as char)),
        }
    }

    // Collects the literal up to the closing `e`; the target decides how to parse it.
    // Bytes past the length limit are consumed but not kept, so an overlong
    // literal still reaches the target and is rejected against its width.
    fn parse_int(&mut self) -> Result<Vec<u8>> {
        let limit = MAX_LITERAL_LEN + 1;
        let mut literal = Vec::new();
        let mut chunk = Vec::new();
        loop {
            let read = (&mut self.reader).take(limit as u64).read_until(b'e', &mut chunk)?;
            if read == 0 {
                return Err(DecodeError::UnexpectedEof);
            }
            let closed = chunk.last() == Some(&b'e');
            if closed {
                chunk.pop();
            }
            let room = limit.saturating_sub(literal.len());
            literal.extend(chunk.drain(..).take(room));
            if closed {
                return Ok(literal);
            }
        }
    }

    // The dispatch token is the first digit of the length prefix.
    fn parse_str(&mut self, first: u8) -> Result<Vec<u8>> {
        let mut prefix = vec![first];
        loop {
            match self.advance()? {
                b':' => break,
                digit if digit.is_ascii_digit() && prefix.len() < MAX_LITERAL_LEN => {
                    prefix.push(digit)
                }
                digit if digit.is_ascii_digit() => {
                    prefix.push(digit);
                    return Err(DecodeError::NumberParse {
                        literal: String::from_utf8_lossy(&prefix).into_owned(),
                        width: number::Width::new(usize::BITS, false),
                    });
                }
                other => return Err(DecodeError::UnexpectedToken(other as char)),
            }
        }
        let len = number::parse_length(&prefix)?;
        let mut data = Vec::with_capacity(len.min(MAX_PREALLOC));
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut data)?;
        if read < len {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(data)
    }

    fn parse_list<T: Bind + ?Sized>(&mut self, target: &mut T, depth: usize) -> Result<()> {
        let depth = self.descend(depth)?;
        let mut list = ListAccess { decoder: self, depth, done: false };
        target.bind_list(&mut list)?;
        list.finish()
    }

    fn parse_dict<T: Bind + ?Sized>(&mut self, target: &mut T, depth: usize) -> Result<()> {
        let depth = self.descend(depth)?;
        let mut dict = DictAccess { decoder: self, depth, done: false };
        target.bind_dict(&mut dict)?;
        dict.finish()
    }

    fn descend(&self, depth: usize) -> Result<usize> {
        if depth >= self.config.max_depth {
            return Err(DecodeError::NestingTooDeep(self.config.max_depth));
        }
        Ok(depth + 1)
    }

    fn advance(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// Element-by-element view of a list being decoded, handed to [`Bind::bind_list`].
pub struct ListAccess<'a, R> {
    decoder: &'a mut Decoder<R>,
    depth: usize,
    done: bool,
}

impl<R: BufRead> ListAccess<'_, R> {
    /// Decodes the next element into `target`.
    ///
    /// Returns `false`, leaving `target` untouched, once the list terminator is reached.
    pub fn next_element<T: Bind + ?Sized>(&mut self, target: &mut T) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let token = self.decoder.advance()?;
        if token == b'e' {
            self.done = true;
            return Ok(false);
        }
        self.decoder.dispatch(token, target, self.depth)?;
        Ok(true)
    }

    // Elements the target did not take still have to be consumed.
    fn finish(mut self) -> Result<()> {
        let mut dropped = 0usize;
        while self.next_element(&mut Discard)? {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "discarded list elements beyond target capacity");
        }
        Ok(())
    }
}

/// Entry-by-entry view of a dictionary being decoded, handed to [`Bind::bind_dict`].
///
/// Every key returned by [`DictAccess::next_key`] must be followed by exactly
/// one call to [`DictAccess::value`] or [`DictAccess::skip`].
pub struct DictAccess<'a, R> {
    decoder: &'a mut Decoder<R>,
    depth: usize,
    done: bool,
}

impl<R: BufRead> DictAccess<'_, R> {
    /// Reads the next key, or `None` once the dictionary terminator is reached.
    pub fn next_key(&mut self) -> Result<Option<ByteString>> {
        if self.done {
            return Ok(None);
        }
        match self.decoder.advance()? {
            b'e' => {
                self.done = true;
                Ok(None)
            }
            digit if digit.is_ascii_digit() => Ok(Some(ByteString(self.decoder.parse_str(digit)?))),
            other => Err(DecodeError::UnexpectedToken(other as char)),
        }
    }

    /// Decodes the value of the current entry into `target`.
    pub fn value<T: Bind + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        self.decoder.parse_type(target, self.depth)
    }

    /// Consumes the value of the current entry without binding it.
    pub fn skip(&mut self) -> Result<()> {
        self.value(&mut Discard)
    }

    fn finish(mut self) -> Result<()> {
        while let Some(key) = self.next_key()? {
            trace!(key = %key, "skipping dictionary entry");
            self.skip()?;
        }
        Ok(())
    }
}

/// Decodes one value from an in-memory buffer into `target`.
pub fn decode<T: Bind + ?Sized>(bytes: &[u8], target: &mut T) -> Result<()> {
    Decoder::new(bytes).decode(target)
}

/// Decodes one value from an in-memory buffer without a declared shape.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut value = Value::default();
    decode(bytes, &mut value)?;
    Ok(value)
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use linked_hash_map::LinkedHashMap;

    use super::*;
    use crate::bytestring::ToByteString;
    use crate::number::Integer;

    fn decode_with_rest<'a, T: Bind + Default>(inp: &'a [u8]) -> (Result<T>, &'a [u8]) {
        let mut decoder = Decoder::new(inp);
        let mut target = T::default();
        let result = decoder.decode(&mut target).map(|_| target);
        (result, decoder.into_inner())
    }

    fn string(s: &str) -> Value {
        Value::Bytes(s.to_byte_string())
    }

    #[test]
    pub fn test_parse_integer() {
        let (res, rest) = decode_with_rest::<i64>(b"i123e");
        assert_eq!(123, res.unwrap());
        assert!(rest.is_empty());

        let (res, rest) = decode_with_rest::<i64>(b"i-123eXY");
        assert_eq!(-123, res.unwrap());
        assert_eq!(b"XY", rest);

        assert!(matches!(decode_with_rest::<i64>(b"i23").0, Err(DecodeError::UnexpectedEof)));
        let res = decode_with_rest::<i64>(b"iabce").0;
        assert!(matches!(res, Err(DecodeError::NumberParse { .. })));
        assert!(matches!(decode_with_rest::<i64>(b"ie").0, Err(DecodeError::NumberParse { .. })));
    }

    #[test]
    pub fn test_parse_integer_literal_too_long() {
        let mut inp = b"i".to_vec();
        inp.extend(std::iter::repeat(b'1').take(200));
        inp.extend_from_slice(b"eXY");

        let (res, rest) = decode_with_rest::<u8>(&inp);
        match res {
            Err(DecodeError::NumberParse { width, .. }) => assert_eq!(u8::WIDTH, width),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(b"XY", rest);

        let res = decode_with_rest::<i64>(&inp).0;
        assert!(matches!(res, Err(DecodeError::NumberParse { width, .. }) if width == i64::WIDTH));

        let mut unterminated = b"i".to_vec();
        unterminated.extend(std::iter::repeat(b'1').take(200));
        let res = decode_with_rest::<u8>(&unterminated).0;
        assert!(matches!(res, Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    pub fn test_overlong_integer_under_unknown_key_is_skipped() {
        let mut inp = b"d1:xi".to_vec();
        inp.extend(std::iter::repeat(b'9').take(100));
        inp.extend_from_slice(b"e1:ai1ee");
        let value = decode_with_rest::<std::collections::HashMap<String, Discard>>(&inp);
        assert!(value.0.is_ok());
        assert!(value.1.is_empty());
    }

    #[test]
    pub fn test_parse_string() {
        let (res, rest) = decode_with_rest::<String>(b"3:abc");
        assert_eq!("abc", res.unwrap());
        assert!(rest.is_empty());

        assert_eq!("", decode_with_rest::<String>(b"0:").0.unwrap());
        assert_eq!("ab", decode_with_rest::<String>(b"2:abc").0.unwrap());
        assert!(matches!(decode_with_rest::<String>(b"3:ab").0, Err(DecodeError::UnexpectedEof)));
        let res = decode_with_rest::<String>(b"3abc").0;
        assert!(matches!(res, Err(DecodeError::UnexpectedToken('a'))));
        assert!(matches!(decode_with_rest::<String>(b"12").0, Err(DecodeError::UnexpectedEof)));
        assert!(matches!(decode_with_rest::<String>(b"").0, Err(DecodeError::UnexpectedEof)));
        let res = decode_with_rest::<String>(b"x").0;
        assert!(matches!(res, Err(DecodeError::UnexpectedToken('x'))));
    }

    #[test]
    pub fn test_parse_string_forged_length() {
        let res = decode_with_rest::<Vec<u8>>(b"99999999999:abc").0;
        assert!(matches!(res, Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    pub fn test_parse_list() {
        assert_eq!(Value::List(vec![]), decode_value(b"le").unwrap());
        assert_eq!(Value::List(vec![Value::Integer(123)]), decode_value(b"li123ee").unwrap());
        assert_eq!(
            Value::List(vec![string("abc"), string("defg")]),
            decode_value(b"l3:abc4:defge").unwrap()
        );
        assert_eq!(
            Value::List(vec![
                Value::List(vec![Value::List(vec![])]),
                Value::List(vec![Value::List(vec![])]),
            ]),
            decode_value(b"llleelleee").unwrap()
        );
        assert!(matches!(decode_value(b"l3:abc"), Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    pub fn test_list_stops_at_terminator() {
        let (res, rest) = decode_with_rest::<Vec<i32>>(b"li1ei2eei3e");
        assert_eq!(vec![1, 2], res.unwrap());
        assert_eq!(b"i3e", rest);
    }

    #[test]
    pub fn test_parse_dictionary() {
        assert_eq!(Value::Dict(LinkedHashMap::new()), decode_value(b"de").unwrap());

        let mut dct = LinkedHashMap::new();
        dct.insert("a".to_byte_string(), Value::List(vec![string("hey")]));
        dct.insert("b".to_byte_string(), Value::List(vec![]));
        assert_eq!(Value::Dict(dct), decode_value(b"d1:al3:heye1:blee").unwrap());

        let mut inner_dct = LinkedHashMap::new();
        inner_dct.insert("a".to_byte_string(), Value::Integer(345));
        inner_dct.insert("b".to_byte_string(), string("wow"));
        let mut dct = LinkedHashMap::new();
        dct.insert("inner".to_byte_string(), Value::Dict(inner_dct));
        dct.insert("inner2".to_byte_string(), Value::Dict(LinkedHashMap::new()));
        let res = decode_value(b"d5:innerd1:ai345e1:b3:wowe6:inner2dee").unwrap();
        assert_eq!(Value::Dict(dct), res);

        assert!(matches!(decode_value(b"d4:iteme"), Err(DecodeError::UnexpectedToken('e'))));
        assert!(matches!(decode_value(b"d1:a2:bc"), Err(DecodeError::UnexpectedEof)));
        assert!(matches!(decode_value(b"d1:ai1e"), Err(DecodeError::UnexpectedEof)));
        assert!(matches!(decode_value(b"di1ei2ee"), Err(DecodeError::UnexpectedToken('i'))));
    }

    #[test]
    pub fn test_duplicate_keys_last_write_wins() {
        let value = decode_value(b"d1:ai1e1:ai2ee").unwrap();
        assert_eq!(Some(&Value::Integer(2)), value.get(b"a"));
        assert_eq!(1, value.as_dict().unwrap().len());
    }

    #[test]
    pub fn test_type_mismatch() {
        let res = decode_with_rest::<i32>(b"li1ee").0;
        assert!(matches!(
            res,
            Err(DecodeError::TypeMismatch { token: Token::List, target: "i32" })
        ));

        let res = decode_with_rest::<String>(b"i1e").0;
        assert!(matches!(
            res,
            Err(DecodeError::TypeMismatch { token: Token::Integer, target: "String" })
        ));
    }

    #[test]
    pub fn test_nesting_limit() {
        let mut decoder = Decoder::new(&b"llee"[..]).with_max_depth(2);
        assert!(decoder.decode(&mut Value::default()).is_ok());

        let mut decoder = Decoder::new(&b"llleee"[..]).with_max_depth(2);
        let res = decoder.decode(&mut Value::default());
        assert!(matches!(res, Err(DecodeError::NestingTooDeep(2))));

        let deep = [vec![b'l'; 100], vec![b'e'; 100]].concat();
        assert!(matches!(decode_value(&deep), Err(DecodeError::NestingTooDeep(64))));
    }

    #[test]
    pub fn test_consecutive_values_from_stream() {
        let reader = BufReader::new(&b"i1e3:twoli3ee"[..]);
        let mut decoder = Decoder::new(reader);

        let mut first = 0u8;
        decoder.decode(&mut first).unwrap();
        let mut second = String::new();
        decoder.decode(&mut second).unwrap();
        let mut third: Vec<u16> = Vec::new();
        decoder.decode(&mut third).unwrap();

        assert_eq!((1, "two".to_string(), vec![3]), (first, second, third));
        assert!(matches!(decoder.decode(&mut first), Err(DecodeError::UnexpectedEof)));
    }
}
