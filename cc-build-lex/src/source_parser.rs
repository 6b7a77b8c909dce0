use std::fs;
use std::io;
use std::path::Path;

use crate::lexer::{LexError, Lexer};
use crate::token::TokenKind;

/// Ordered pair of ordered include-path sequences, in source-text order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Includes {
    /// `"…"` quoted includes (local/project-relative).
    pub double_quote: Vec<String>,
    /// `<…>` bracketed includes (system/external).
    pub bracket: Vec<String>,
}

/// Per-file parse result.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourceInfo {
    pub includes: Includes,
    /// True iff a top-level definition of `main` was observed.
    pub has_main: bool,
}

/// Failure reading or lexing one file. Per the file-scan policy, callers
/// turn any of these into "skip file, log, continue".
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    Io(#[source] io::Error),
    #[error("{0}")]
    Lex(#[source] LexError),
}

/// Parses a file on disk into a [`SourceInfo`], streaming its bytes through
/// the [`Lexer`].
pub fn parse_source_file(path: &Path) -> Result<SourceInfo, ParseError> {
    let bytes = fs::read(path).map_err(ParseError::Io)?;
    parse_source_bytes(&bytes).map_err(ParseError::Lex)
}

/// Parses an in-memory buffer into a [`SourceInfo`].
pub fn parse_source_bytes(bytes: &[u8]) -> Result<SourceInfo, LexError> {
    let mut lexer = Lexer::new();
    lexer.feed(bytes);
    lexer.close();
    parse_tokens(&mut lexer)
}

/// Include paths are surfaced as `String`; lossily decoding here (rather
/// than in [`crate::token::Token`] itself) only affects the payload of an
/// `#include` directive, which is always textual in practice, and never
/// the byte-exact token stream the lexer's round-trip invariant covers.
fn strip_quotes(raw: &[u8]) -> String {
    let raw = raw.strip_prefix(b"\"").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\"").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Collects a `<…>` include payload after the opening `<` Symbol token has
/// already been consumed. Returns `None` (no include recorded) if a real
/// newline ends the logical line before a matching `>` is found.
fn collect_bracket_include(lexer: &mut Lexer) -> Result<Option<String>, LexError> {
    let mut payload: Vec<u8> = Vec::new();
    loop {
        let Some(tok) = lexer.next_token()? else {
            return Ok(None);
        };
        match tok.kind {
            TokenKind::Newline => return Ok(None),
            TokenKind::ContinueLine
            | TokenKind::Whitespace
            | TokenKind::SingleLineComment
            | TokenKind::MultiLineComment => continue,
            TokenKind::Symbol if tok.bytes.as_slice() == b">" => {
                return Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
            }
            _ => payload.extend_from_slice(&tok.bytes),
        }
    }
}

fn parse_tokens(lexer: &mut Lexer) -> Result<SourceInfo, LexError> {
    let mut double_quote = Vec::new();
    let mut bracket = Vec::new();
    let mut has_main = false;
    let mut brace_depth: i32 = 0;
    // Waiting for the token right after `#include` to be a delimiter.
    let mut awaiting_include_payload = false;
    // Saw `main` at brace depth zero; waiting for an immediate `(`.
    let mut pending_main = false;

    loop {
        let Some(tok) = lexer.next_token()? else {
            break;
        };
        match tok.kind {
            TokenKind::Whitespace
            | TokenKind::Newline
            | TokenKind::ContinueLine
            | TokenKind::SingleLineComment
            | TokenKind::MultiLineComment => continue,
            TokenKind::Word => {
                awaiting_include_payload = false;
                pending_main = tok.bytes.as_slice() == b"main" && brace_depth == 0;
                if tok.bytes.as_slice() == b"#include" {
                    awaiting_include_payload = true;
                }
            }
            TokenKind::Symbol => {
                if awaiting_include_payload {
                    awaiting_include_payload = false;
                    if tok.bytes.as_slice() == b"<" {
                        if let Some(path) = collect_bracket_include(lexer)? {
                            bracket.push(path);
                        }
                        continue;
                    }
                }
                if pending_main && tok.bytes.as_slice() == b"(" {
                    has_main = true;
                }
                pending_main = false;
                match tok.bytes.as_slice() {
                    b"{" => brace_depth += 1,
                    b"}" => brace_depth = brace_depth.saturating_sub(1),
                    _ => {}
                }
            }
            TokenKind::StringLiteral => {
                if awaiting_include_payload {
                    double_quote.push(strip_quotes(&tok.bytes));
                }
                awaiting_include_payload = false;
                pending_main = false;
            }
            TokenKind::RawStringLiteral => {
                awaiting_include_payload = false;
                pending_main = false;
            }
            TokenKind::Incomplete => {
                unreachable!("Lexer::next_token never yields Incomplete")
            }
        }
    }

    Ok(SourceInfo { includes: Includes { double_quote, bracket }, has_main })
}
