//! Shared error types used across the compilation pipeline.
//!
//! Each phase owns its own error enum so callers can match on the exact
//! failure, while `CompileError` lifts any of them through `?` for the
//! top-level driver. Every variant carries the source line it refers to.

use snafu::Snafu;

use crate::tokenizer::TokenKind;
use crate::ty::Type;

pub type CompileResult<T> = Result<T, CompileError>;

/// Failure while turning raw text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LexError {
  #[snafu(display("line {line}: unterminated string literal"))]
  UnterminatedString { line: u32 },

  #[snafu(display("line {line}: invalid character '{ch}'"))]
  InvalidCharacter { ch: char, line: u32 },
}

impl LexError {
  pub fn line(&self) -> u32 {
    match self {
      Self::UnterminatedString { line } | Self::InvalidCharacter { line, .. } => *line,
    }
  }
}

/// Failure while matching the token stream against the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SyntaxError {
  #[snafu(display("line {line}: expected {expected}, but got {found} \"{text}\""))]
  UnexpectedToken {
    expected: String,
    found: TokenKind,
    text: String,
    line: u32,
  },

  #[snafu(display("line {line}: expected {expected}, but reached end of input"))]
  UnexpectedEof { expected: String, line: u32 },

  #[snafu(display("line {line}: missing punctuator between identifiers"))]
  MissingPunctuator { line: u32 },

  #[snafu(display("line {line}: invalid integer constant \"{text}\""))]
  InvalidConstant { text: String, line: u32 },
}

impl SyntaxError {
  pub fn line(&self) -> u32 {
    match self {
      Self::UnexpectedToken { line, .. }
      | Self::UnexpectedEof { line, .. }
      | Self::MissingPunctuator { line }
      | Self::InvalidConstant { line, .. } => *line,
    }
  }
}

/// Failure while validating names, initialisation and types.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SemanticError {
  #[snafu(display("line {line}: variable '{name}' is already declared (first declared on line {previous})"))]
  Redeclared { name: String, line: u32, previous: u32 },

  #[snafu(display("line {line}: variable '{name}' is not declared"))]
  Undeclared { name: String, line: u32 },

  #[snafu(display("line {line}: variable '{name}' is not initialized"))]
  Uninitialized { name: String, line: u32 },

  #[snafu(display("line {line}: type mismatch assigning '{name}': expected {expected}, found {found}"))]
  TypeMismatch {
    name: String,
    expected: Type,
    found: Type,
    line: u32,
  },

  #[snafu(display("line {line}: constant {value} does not fit in {ty}"))]
  ConstantOutOfRange { value: i64, ty: Type, line: u32 },
}

impl SemanticError {
  pub fn line(&self) -> u32 {
    match self {
      Self::Redeclared { line, .. }
      | Self::Undeclared { line, .. }
      | Self::Uninitialized { line, .. }
      | Self::TypeMismatch { line, .. }
      | Self::ConstantOutOfRange { line, .. } => *line,
    }
  }

  /// Name of the offending variable, if the error concerns one.
  pub fn name(&self) -> Option<&str> {
    match self {
      Self::Redeclared { name, .. }
      | Self::Undeclared { name, .. }
      | Self::Uninitialized { name, .. }
      | Self::TypeMismatch { name, .. } => Some(name),
      Self::ConstantOutOfRange { .. } => None,
    }
  }
}

/// Any error that aborts a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CompileError {
  #[snafu(context(false), display("lexical error: {source}"))]
  Lex { source: LexError },

  #[snafu(context(false), display("syntax error: {source}"))]
  Syntax { source: SyntaxError },

  #[snafu(context(false), display("semantic error: {source}"))]
  Semantic { source: SemanticError },
}

impl CompileError {
  pub fn line(&self) -> u32 {
    match self {
      Self::Lex { source } => source.line(),
      Self::Syntax { source } => source.line(),
      Self::Semantic { source } => source.line(),
    }
  }
}
