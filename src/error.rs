use std::fmt;
use std::io;

use thiserror::Error;

use crate::number::Width;

/// Kind of a bencode value, as announced by its leading byte on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Token {
    Integer,
    String,
    List,
    Dictionary,
}

impl Token {
    pub fn from_byte(byte: u8) -> Option<Token> {
        match byte {
            b'i' => Some(Token::Integer),
            b'l' => Some(Token::List),
            b'd' => Some(Token::Dictionary),
            b'0'..=b'9' => Some(Token::String),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Integer => write!(f, "integer"),
            Token::String => write!(f, "string"),
            Token::List => write!(f, "list"),
            Token::Dictionary => write!(f, "dictionary"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[source] io::Error),
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("can not parse {literal} to {width} value")]
    NumberParse { literal: String, width: Width },
    #[error("can not set {token} value to variable of type {target}")]
    TypeMismatch { token: Token, target: &'static str },
    #[error("decode target of type {0} is not writable")]
    InvalidTarget(&'static str),
    #[error("Unexpected character '{0}'")]
    UnexpectedToken(char),
    #[error("Nesting deeper than {0} levels")]
    NestingTooDeep(usize),
}

impl DecodeError {
    pub(crate) fn mismatch(token: Token, target: &'static str) -> DecodeError {
        DecodeError::TypeMismatch { token, target }
    }
}

// A source running dry mid-value is a structural error, not a transport one.
impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEof
        } else {
            DecodeError::Io(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("not supported {0} value")]
    UnsupportedType(&'static str),
    #[error("duplicate dictionary key {0}")]
    DuplicateKey(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eof_is_structural() {
        let err = DecodeError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, DecodeError::UnexpectedEof));

        let err = DecodeError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn token_from_byte() {
        assert_eq!(Some(Token::Integer), Token::from_byte(b'i'));
        assert_eq!(Some(Token::String), Token::from_byte(b'7'));
        assert_eq!(Some(Token::List), Token::from_byte(b'l'));
        assert_eq!(Some(Token::Dictionary), Token::from_byte(b'd'));
        assert_eq!(None, Token::from_byte(b'e'));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = DecodeError::NumberParse {
            literal: "300".to_string(),
            width: Width::new(8, false),
        };
        assert_eq!("can not parse 300 to u8 value", err.to_string());

        let err = DecodeError::mismatch(Token::List, "i32");
        assert_eq!("can not set list value to variable of type i32", err.to_string());

        let err = EncodeError::UnsupportedType("bool");
        assert_eq!("not supported bool value", err.to_string());
    }
}
