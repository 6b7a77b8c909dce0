//! cc-build-lex
//! ============
//!
//! Incremental, preprocessor-aware lexer for C/C++ source, and the thin
//! parser built on top of it that extracts `#include` directives and a
//! `has_main` heuristic. Decoupled from any particular build tool.

#![forbid(unsafe_code)]
#![deny(warnings)]

pub mod lexer;
pub mod source_file;
pub mod source_parser;
mod token;

pub use lexer::{extract, prequalify, LexError, Lexer};
pub use source_file::{extension, file_stem, is_header, is_source, SourceFile};
pub use source_parser::{
    parse_source_bytes, parse_source_file, Includes, ParseError, SourceInfo,
};
pub use token::{Chunk, Token, TokenKind};
