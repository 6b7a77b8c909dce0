/// A view of bytes plus a flag saying whether more input may still arrive.
///
/// The `complete` bit is what lets [`crate::lexer::extract`] tell a token
/// that merely runs up against the end of the buffer (need more bytes)
/// apart from one that legitimately ends there (final short token).
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    bytes: &'a [u8],
    complete: bool,
}

impl<'a> Chunk<'a> {
    pub fn new(bytes: &'a [u8], complete: bool) -> Self {
        Chunk { bytes, complete }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn get(&self, idx: usize) -> Option<u8> {
        self.bytes.get(idx).copied()
    }
}

/// Classification of one token.
///
/// `Incomplete` is a sentinel used internally by [`crate::lexer::prequalify`]
/// to request more input; it is never handed to consumers of [`crate::lexer::Lexer`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Word,
    Symbol,
    Whitespace,
    Newline,
    ContinueLine,
    SingleLineComment,
    MultiLineComment,
    StringLiteral,
    RawStringLiteral,
    Incomplete,
}

/// A classified slice of source bytes, owned so it can outlive the buffer
/// window it was extracted from.
///
/// This is `Vec<u8>`, not `String`: a `Chunk` is a view of bytes with no
/// UTF-8 requirement (§3), and comments, string literals, and raw string
/// literals may legally carry non-UTF-8 bytes in real C/C++ source. Storing
/// anything but the exact input bytes here would break the round-trip
/// invariant that concatenating token spans reproduces the original input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub bytes: Vec<u8>,
}

impl Token {
    pub fn new(kind: TokenKind, bytes: Vec<u8>) -> Self {
        Token { kind, bytes }
    }
}

pub(crate) fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'#'
}

pub(crate) fn is_word_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn is_inline_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t'
}
