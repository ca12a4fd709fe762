#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Code,
    StringLiteral,
    Comment,
}

impl SpanKind {
    pub const fn is_code(self) -> bool {
        matches!(self, Self::Code)
    }

    /// Literal content that rewriting passes must never touch.
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::StringLiteral | Self::Comment)
    }
}

/// A tagged, contiguous slice of source text. Spans are produced gap-free by
/// the tokenizer: concatenating their texts in order reproduces the input
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub text: String,
    pub start: usize,
}

impl Span {
    pub fn new(kind: SpanKind, text: impl Into<String>, start: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
        }
    }
}
