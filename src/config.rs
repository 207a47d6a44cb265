/// Nesting limit applied when no other is configured.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings for a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DecoderConfig {
    /// Deepest list/dictionary nesting accepted before decoding fails fast.
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Settings for an [`Encoder`](crate::Encoder).
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct EncoderConfig {
    /// Emit dictionary keys sorted by their raw bytes (canonical bencode)
    /// instead of declaration or iteration order.
    pub sort_keys: bool,
}
