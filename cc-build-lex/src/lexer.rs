use crate::token::{
    is_inline_whitespace, is_word_continue, is_word_start, Chunk, Token,
    TokenKind,
};

/// Hard lexical errors. Callers turn any of these into "skip file, log,
/// continue" per the file-scan policy in [`crate::source_parser`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("line continuation not followed by a newline")]
    ContinueLineInvalid,
    #[error("unterminated multi-line comment")]
    MultiLineCommentUnterminated,
    #[error("unterminated string literal")]
    StringLiteralUnterminated,
    #[error("raw string literal missing opening delimiter")]
    RawStringLiteralMissingOpeningDelimiter,
    #[error("unterminated raw string literal")]
    RawStringLiteralUnterminated,
}

const TWO_CHAR_OPERATORS: &[&[u8; 2]] = &[
    b"&&", b"||", b"==", b"!=", b"<=", b">=", b"<<", b">>", b"->", b"::",
    b"++", b"--", b"+=", b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=",
];

fn starts_two_char_operator(first: u8) -> bool {
    matches!(
        first,
        b'&' | b'|'
            | b'='
            | b'!'
            | b'<'
            | b'>'
            | b'-'
            | b':'
            | b'+'
            | b'*'
            | b'/'
            | b'%'
            | b'^'
    )
}

/// Pure classification based on a short prefix. Returns [`TokenKind::Incomplete`]
/// only when the chunk is empty, or when the prefix is `/` or `R` and more
/// bytes could still turn it into a different kind.
pub fn prequalify(chunk: &Chunk) -> TokenKind {
    let Some(first) = chunk.get(0) else {
        return TokenKind::Incomplete;
    };
    match first {
        b'\n' | b'\r' => TokenKind::Newline,
        b' ' | b'\t' => TokenKind::Whitespace,
        b'\\' => TokenKind::ContinueLine,
        b'/' => match chunk.get(1) {
            Some(b'/') => TokenKind::SingleLineComment,
            Some(b'*') => TokenKind::MultiLineComment,
            Some(_) => TokenKind::Symbol,
            None if !chunk.complete() => TokenKind::Incomplete,
            None => TokenKind::Word,
        },
        b'"' => TokenKind::StringLiteral,
        b'R' => match chunk.get(1) {
            Some(b'"') => TokenKind::RawStringLiteral,
            Some(_) => TokenKind::Word,
            None if !chunk.complete() => TokenKind::Incomplete,
            None => TokenKind::Word,
        },
        b if is_word_start(b) => TokenKind::Word,
        _ => TokenKind::Symbol,
    }
}

/// Returns the longest valid prefix that forms one complete token of the
/// prequalified kind. `Ok(None)` means more input is required; the caller
/// should refill the chunk and retry, or mark it `complete` to force a
/// final decision.
pub fn extract(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    match prequalify(chunk) {
        TokenKind::Incomplete => Ok(None),
        TokenKind::Newline => Ok(Some(1)),
        TokenKind::Whitespace => extract_whitespace(chunk),
        TokenKind::ContinueLine => extract_continue_line(chunk),
        TokenKind::SingleLineComment => extract_single_line_comment(chunk),
        TokenKind::MultiLineComment => extract_multi_line_comment(chunk),
        TokenKind::StringLiteral => extract_string_literal(chunk),
        TokenKind::RawStringLiteral => extract_raw_string_literal(chunk),
        TokenKind::Word => extract_word(chunk),
        TokenKind::Symbol => extract_symbol(chunk),
    }
}

fn extract_whitespace(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    let run = bytes.iter().take_while(|&&b| is_inline_whitespace(b)).count();
    if run == bytes.len() && !chunk.complete() {
        Ok(None)
    } else {
        Ok(Some(run))
    }
}

fn extract_continue_line(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    debug_assert_eq!(bytes.first(), Some(&b'\\'));
    let mut pos = 1;
    while let Some(b) = bytes.get(pos) {
        if is_inline_whitespace(*b) {
            pos += 1;
        } else {
            break;
        }
    }
    match bytes.get(pos) {
        Some(b'\n') | Some(b'\r') => Ok(Some(pos + 1)),
        Some(_) => Err(LexError::ContinueLineInvalid),
        None => {
            if chunk.complete() {
                Err(LexError::ContinueLineInvalid)
            } else {
                Ok(None)
            }
        }
    }
}

fn extract_single_line_comment(
    chunk: &Chunk,
) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    debug_assert!(bytes.starts_with(b"//"));
    match bytes[2..].iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(rel) => Ok(Some(2 + rel)),
        None => {
            if chunk.complete() {
                Ok(Some(bytes.len()))
            } else {
                Ok(None)
            }
        }
    }
}

fn extract_multi_line_comment(
    chunk: &Chunk,
) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    debug_assert!(bytes.starts_with(b"/*"));
    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
            return Ok(Some(pos + 2));
        }
        pos += 1;
    }
    if chunk.complete() {
        Err(LexError::MultiLineCommentUnterminated)
    } else {
        Ok(None)
    }
}

fn extract_string_literal(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    debug_assert_eq!(bytes.first(), Some(&b'"'));
    let mut pos = 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if pos + 1 < bytes.len() => pos += 2,
            b'\\' => {
                // Escape at the very end of the chunk: need to see what
                // follows before we know whether it escapes a newline.
                return if chunk.complete() {
                    Err(LexError::StringLiteralUnterminated)
                } else {
                    Ok(None)
                };
            }
            b'\n' | b'\r' => return Err(LexError::StringLiteralUnterminated),
            b'"' => return Ok(Some(pos + 1)),
            _ => pos += 1,
        }
    }
    if chunk.complete() {
        Err(LexError::StringLiteralUnterminated)
    } else {
        Ok(None)
    }
}

fn extract_raw_string_literal(
    chunk: &Chunk,
) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    debug_assert!(bytes.starts_with(b"R\""));
    let mut pos = 2;
    let delim_start = pos;
    loop {
        match bytes.get(pos) {
            Some(b'(') => break,
            Some(b'"') => {
                return if chunk.complete() {
                    Err(LexError::RawStringLiteralMissingOpeningDelimiter)
                } else {
                    Ok(None)
                };
            }
            Some(_) => pos += 1,
            None => {
                return if chunk.complete() {
                    Err(LexError::RawStringLiteralMissingOpeningDelimiter)
                } else {
                    Ok(None)
                };
            }
        }
    }
    let delim = &bytes[delim_start..pos];
    let body_start = pos + 1;
    let terminator_len = 1 + delim.len() + 1;
    let mut search = body_start;
    loop {
        if search + terminator_len > bytes.len() {
            return if chunk.complete() {
                Err(LexError::RawStringLiteralUnterminated)
            } else {
                Ok(None)
            };
        }
        if bytes[search] == b')'
            && &bytes[search + 1..search + 1 + delim.len()] == delim
            && bytes[search + 1 + delim.len()] == b'"'
        {
            return Ok(Some(search + terminator_len));
        }
        search += 1;
    }
}

fn extract_word(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    let first = bytes[0];
    if !is_word_start(first) {
        // The degenerate "lone trailing `/`" case: prequalify only reaches
        // Word here when complete=true and there is nothing left to extend
        // it, so it stands alone as a one-byte token.
        return Ok(Some(1));
    }
    let mut pos = 1;
    while let Some(&b) = bytes.get(pos) {
        if is_word_continue(b) {
            pos += 1;
        } else {
            return Ok(Some(pos));
        }
    }
    if chunk.complete() {
        Ok(Some(pos))
    } else {
        Ok(None)
    }
}

fn extract_symbol(chunk: &Chunk) -> Result<Option<usize>, LexError> {
    let bytes = chunk.bytes();
    let first = bytes[0];
    if !starts_two_char_operator(first) {
        return Ok(Some(1));
    }
    match bytes.get(1) {
        Some(&second) => {
            let pair = [first, second];
            if TWO_CHAR_OPERATORS.iter().any(|op| op.as_slice() == pair) {
                Ok(Some(2))
            } else {
                Ok(Some(1))
            }
        }
        None => {
            if chunk.complete() {
                Ok(Some(1))
            } else {
                Ok(None)
            }
        }
    }
}

/// Incremental, suspension-free driver: owns a growing buffer and turns
/// `prequalify`/`extract` into a token-at-a-time iterator. Its only
/// "suspension point" is returning `Ok(None)` from [`Lexer::next_token`]
/// while not yet at end of input, meaning "feed more bytes and call again".
pub struct Lexer {
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Lexer { buf: Vec::new(), pos: 0, eof: false }
    }

    /// Append more bytes to the buffer. Call [`Lexer::close`] once no more
    /// bytes will ever arrive.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Mark the stream as ended: from now on `Chunk::complete()` is true.
    pub fn close(&mut self) {
        self.eof = true;
    }

    /// Pull the next token. `Ok(None)` means either "need more bytes" (call
    /// [`Lexer::feed`] then retry) when the stream isn't closed yet, or
    /// "end of stream" when it is.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let chunk = Chunk::new(&self.buf[self.pos..], self.eof);
        if chunk.is_empty() && self.eof {
            return Ok(None);
        }
        let kind = prequalify(&chunk);
        match extract(&chunk)? {
            Some(n) => {
                debug_assert!(n > 0, "extract must consume at least one byte");
                let bytes = chunk.bytes()[..n].to_vec();
                self.pos += n;
                self.compact();
                Ok(Some(Token::new(kind, bytes)))
            }
            None => Ok(None),
        }
    }

    /// Drop already-consumed bytes so the buffer doesn't grow unbounded
    /// over a long incremental feed.
    fn compact(&mut self) {
        if self.pos > 4096 {
            self.buf.drain(0..self.pos);
            self.pos = 0;
        }
    }
}

#[cfg(test)]
mod lexer_tests {
    use super::*;
    use proptest::prelude::*;

    fn tokenize_all(src: &[u8]) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new();
        lexer.feed(src);
        lexer.close();
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    #[test]
    fn raw_string_literal_with_parens_in_payload() {
        let src = br#"R"delim(hello "(world)" bye)delim""#;
        let tokens = tokenize_all(src).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::RawStringLiteral);
        assert_eq!(tokens[0].bytes, src.to_vec());
    }

    #[test]
    fn continue_line_then_word() {
        let src = b"\\   \nX";
        let tokens = tokenize_all(src).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::ContinueLine);
        assert_eq!(tokens[0].bytes, b"\\   \n".to_vec());
        assert_eq!(tokens[1].kind, TokenKind::Word);
        assert_eq!(tokens[1].bytes, b"X".to_vec());
    }

    #[test]
    fn unterminated_multi_line_comment_errors() {
        let err = tokenize_all(b"/* not closed").unwrap_err();
        assert_eq!(err, LexError::MultiLineCommentUnterminated);
    }

    #[test]
    fn unterminated_string_literal_errors() {
        let err = tokenize_all(b"\"not closed").unwrap_err();
        assert_eq!(err, LexError::StringLiteralUnterminated);
    }

    #[test]
    fn bare_newline_in_string_literal_errors() {
        let err = tokenize_all(b"\"line one\nstill in quotes\"").unwrap_err();
        assert_eq!(err, LexError::StringLiteralUnterminated);
    }

    #[test]
    fn trailing_continue_line_without_newline_errors() {
        let err = tokenize_all(b"int x = 1; \\").unwrap_err();
        assert_eq!(err, LexError::ContinueLineInvalid);
    }

    #[test]
    fn raw_string_missing_opening_delimiter_errors() {
        let err = tokenize_all(br#"R"oops"#).unwrap_err();
        assert_eq!(err, LexError::RawStringLiteralMissingOpeningDelimiter);
    }

    #[test]
    fn two_char_operators_are_greedy() {
        let tokens = tokenize_all(b"a->b==c").unwrap();
        let symbols: Vec<&[u8]> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Symbol)
            .map(|t| t.bytes.as_slice())
            .collect();
        assert_eq!(symbols, vec![b"->".as_slice(), b"==".as_slice()]);
    }

    #[test]
    fn chunked_feed_matches_single_shot_feed() {
        let src = b"#include <a/b.h>\nint main(int argc, char **argv) { return argc; }\n";
        let whole = tokenize_all(src).unwrap();

        let mut lexer = Lexer::new();
        let mut tokens = Vec::new();
        for byte in src {
            lexer.feed(std::slice::from_ref(byte));
            while let Some(tok) = lexer.next_token().unwrap() {
                tokens.push(tok);
            }
        }
        lexer.close();
        while let Some(tok) = lexer.next_token().unwrap() {
            tokens.push(tok);
        }

        assert_eq!(tokens, whole);
    }

    #[test]
    fn incomplete_chunk_needs_more_for_unresolved_word() {
        let chunk = Chunk::new(b"foo", false);
        assert_eq!(extract(&chunk).unwrap(), None);
        let chunk_complete = Chunk::new(b"foo", true);
        assert_eq!(extract(&chunk_complete).unwrap(), Some(3));
    }

    #[test]
    fn incomplete_chunk_needs_more_for_ambiguous_two_char_operator_prefix() {
        let chunk = Chunk::new(b"-", false);
        assert_eq!(extract(&chunk).unwrap(), None);
        let chunk_complete = Chunk::new(b"-", true);
        assert_eq!(extract(&chunk_complete).unwrap(), Some(1));
    }

    proptest! {
        #[test]
        fn round_trip_reproduces_source_bytes(
            src in prop::collection::vec(any::<u8>(), 0..120)
        ) {
            // Arbitrary bytes, not just printable ASCII: a byte outside
            // valid UTF-8 still has to survive the round trip unchanged,
            // since Chunk/Token carry raw bytes with no UTF-8 requirement.
            if let Ok(tokens) = tokenize_all(&src) {
                let rebuilt: Vec<u8> =
                    tokens.into_iter().flat_map(|t| t.bytes).collect();
                prop_assert_eq!(rebuilt, src);
            }
        }
    }
}
