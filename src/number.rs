use std::fmt;

use nom::character::complete::{digit1, one_of, u64 as length_prefix};
use nom::combinator::{all_consuming, opt, recognize};
use nom::sequence::pair;
use nom::IResult;

use crate::error::DecodeError;

type Result<T> = std::result::Result<T, DecodeError>;

// Longest integer literal or length prefix worth buffering. Anything longer
// cannot fit a 64-bit target, even allowing for a sign and leading zeros.
pub(crate) const MAX_LITERAL_LEN: usize = 64;

/// Declared bit width and signedness of an integer binding target.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Width {
    pub bits: u32,
    pub signed: bool,
}

impl Width {
    pub const fn new(bits: u32, signed: bool) -> Width {
        Width { bits, signed }
    }

    fn min_signed(&self) -> i64 {
        if self.bits >= 64 {
            i64::MIN
        } else {
            -(1i64 << (self.bits - 1))
        }
    }

    fn max_signed(&self) -> i64 {
        if self.bits >= 64 {
            i64::MAX
        } else {
            (1i64 << (self.bits - 1)) - 1
        }
    }

    fn max_unsigned(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{}{}", prefix, self.bits)
    }
}

/// A decoded integer, already checked against the width it was parsed for.
///
/// Keeping the signed and unsigned shapes apart lets a caller project the
/// result into any narrower integer type without parsing the literal again.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Number {
    Signed(i64),
    Unsigned(u64),
}

impl Number {
    /// Parses the digits found between `i` and `e` for a target of the given width.
    pub fn parse(literal: &[u8], width: Width) -> Result<Number> {
        let fail = || DecodeError::NumberParse {
            literal: String::from_utf8_lossy(literal).into_owned(),
            width,
        };
        if literal.len() > MAX_LITERAL_LEN {
            return Err(fail());
        }
        let text = std::str::from_utf8(literal).map_err(|_| fail())?;
        if !is_integer_literal(text, width.signed) {
            return Err(fail());
        }
        if width.signed {
            let value: i64 = text.parse().map_err(|_| fail())?;
            if value < width.min_signed() || value > width.max_signed() {
                return Err(fail());
            }
            Ok(Number::Signed(value))
        } else {
            let value: u64 = text.parse().map_err(|_| fail())?;
            if value > width.max_unsigned() {
                return Err(fail());
            }
            Ok(Number::Unsigned(value))
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Number::Unsigned(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Signed(v) => write!(f, "{}", v),
            Number::Unsigned(v) => write!(f, "{}", v),
        }
    }
}

fn is_integer_literal(text: &str, signed: bool) -> bool {
    let parsed: IResult<&str, &str> = if signed {
        all_consuming(recognize(pair(opt(one_of("+-")), digit1)))(text)
    } else {
        all_consuming(digit1)(text)
    };
    parsed.is_ok()
}

/// Parses the decimal length prefix of a byte string.
pub(crate) fn parse_length(literal: &[u8]) -> Result<usize> {
    let width = Width::new(usize::BITS, false);
    let fail = || DecodeError::NumberParse {
        literal: String::from_utf8_lossy(literal).into_owned(),
        width,
    };
    let text = std::str::from_utf8(literal).map_err(|_| fail())?;
    let parsed: IResult<&str, u64> = all_consuming(length_prefix)(text);
    let (_, len) = parsed.map_err(|_| fail())?;
    usize::try_from(len).map_err(|_| fail())
}

/// Host integer types that a bencode integer can be bound to or encoded from.
pub trait Integer: Copy {
    const WIDTH: Width;

    /// Narrows a number that was parsed for `Self::WIDTH`.
    fn from_number(number: Number) -> Self;

    fn to_number(self) -> Number;
}

macro_rules! signed_integer {
    ($($t:ty),*) => {
        $(
            impl Integer for $t {
                const WIDTH: Width = Width::new(<$t>::BITS, true);

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Signed(v) => v as $t,
                        Number::Unsigned(v) => v as $t,
                    }
                }

                fn to_number(self) -> Number {
                    Number::Signed(self as i64)
                }
            }
        )*
    };
}

macro_rules! unsigned_integer {
    ($($t:ty),*) => {
        $(
            impl Integer for $t {
                const WIDTH: Width = Width::new(<$t>::BITS, false);

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Signed(v) => v as $t,
                        Number::Unsigned(v) => v as $t,
                    }
                }

                fn to_number(self) -> Number {
                    Number::Unsigned(self as u64)
                }
            }
        )*
    };
}

signed_integer!(i8, i16, i32, i64, isize);
unsigned_integer!(u8, u16, u32, u64, usize);
