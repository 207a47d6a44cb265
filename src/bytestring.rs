use std::borrow::Borrow;
use std::fmt::Display;

// Custom ByteString wrapper to avoid String allocations.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteString(pub Vec<u8>);

impl ByteString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

pub trait ToByteString {
    fn to_byte_string(&self) -> ByteString;
}

impl ToByteString for &str {
    fn to_byte_string(&self) -> ByteString {
        ByteString(self.as_bytes().to_vec())
    }
}

impl ToByteString for &[u8] {
    fn to_byte_string(&self) -> ByteString {
        ByteString(self.to_vec())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        ByteString(bytes)
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        s.to_byte_string()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Lets dictionaries keyed by ByteString be queried with plain byte slices.
impl Borrow<[u8]> for ByteString {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Display for ByteString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = String::from_utf8_lossy(&self.0);
        write!(f, "{}", s)
    }
}

/// Key types a dynamic map can use for bencode dictionary keys.
pub trait MapKey {
    fn from_wire(key: ByteString) -> Self;

    fn as_wire(&self) -> &[u8];
}

impl MapKey for String {
    fn from_wire(key: ByteString) -> Self {
        String::from_utf8(key.0)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
    }

    fn as_wire(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl MapKey for ByteString {
    fn from_wire(key: ByteString) -> Self {
        key
    }

    fn as_wire(&self) -> &[u8] {
        &self.0
    }
}

impl MapKey for Vec<u8> {
    fn from_wire(key: ByteString) -> Self {
        key.0
    }

    fn as_wire(&self) -> &[u8] {
        self
    }
}
