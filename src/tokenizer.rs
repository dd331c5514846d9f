//! Lexical analysis: turns the raw source text into a vector of tokens.
//!
//! The tokenizer knows nothing about the grammar beyond classifying
//! characters, recognising the three keywords and the two-character stream
//! operators. Characters that look like operators the language does not
//! support are kept as `Unknown` tokens so the parser can report them in
//! context; anything else is rejected here.

use std::fmt;

use snafu::ensure;
use tracing::trace;

use crate::error::{InvalidCharacterSnafu, LexError, UnterminatedStringSnafu};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Add,
  Sub,
  Assign,
  Int,
  Cout,
  Cin,
  Delimiter,
  Punctuator,
  Ident,
  Constant,
  Literal,
  CoutOp,
  CinOp,
  Unknown,
}

impl TokenKind {
  /// Keyword kind for `word`, or `Ident` if it is not reserved.
  fn keyword_or_ident(word: &str) -> Self {
    match word {
      "int" => TokenKind::Int,
      "cout" => TokenKind::Cout,
      "cin" => TokenKind::Cin,
      _ => TokenKind::Ident,
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TokenKind::Add => "'+'",
      TokenKind::Sub => "'-'",
      TokenKind::Assign => "'='",
      TokenKind::Int => "keyword 'int'",
      TokenKind::Cout => "keyword 'cout'",
      TokenKind::Cin => "keyword 'cin'",
      TokenKind::Delimiter => "';'",
      TokenKind::Punctuator => "','",
      TokenKind::Ident => "identifier",
      TokenKind::Constant => "constant",
      TokenKind::Literal => "string literal",
      TokenKind::CoutOp => "'<<'",
      TokenKind::CinOp => "'>>'",
      TokenKind::Unknown => "unknown token",
    };
    f.write_str(name)
  }
}

/// One lexeme with its classification and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: u32,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
    }
  }
}

/// Lex the whole input. Lines are counted from 1.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut line = 1u32;
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c == b'\n' {
      line += 1;
      i += 1;
      continue;
    }

    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if input[i..].starts_with("//") {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c == b'"' {
      let start_line = line;
      let start = i + 1;
      i = start;
      while i < bytes.len() && bytes[i] != b'"' {
        if bytes[i] == b'\n' {
          line += 1;
        }
        i += 1;
      }
      ensure!(i < bytes.len(), UnterminatedStringSnafu { line: start_line });
      tokens.push(Token::new(TokenKind::Literal, &input[start..i], start_line));
      i += 1;
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let word = &input[start..i];
      tokens.push(Token::new(TokenKind::keyword_or_ident(word), word, line));
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Constant, &input[start..i], line));
      continue;
    }

    if let Some((op, kind)) = [("<<", TokenKind::CoutOp), (">>", TokenKind::CinOp)]
      .into_iter()
      .find(|(op, _)| input[i..].starts_with(op))
    {
      tokens.push(Token::new(kind, op, line));
      i += op.len();
      continue;
    }

    let kind = match c {
      b';' => Some(TokenKind::Delimiter),
      b',' => Some(TokenKind::Punctuator),
      b'+' => Some(TokenKind::Add),
      b'-' => Some(TokenKind::Sub),
      b'=' => Some(TokenKind::Assign),
      b'*' | b'/' | b'%' | b'^' | b'!' | b'<' | b'>' => Some(TokenKind::Unknown),
      _ => None,
    };
    if let Some(kind) = kind {
      tokens.push(Token::new(kind, &input[i..i + 1], line));
      i += 1;
      continue;
    }

    let ch = input[i..].chars().next().unwrap_or('\0');
    return InvalidCharacterSnafu { ch, line }.fail();
  }

  trace!(count = tokens.len(), "tokenized source");
  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn classifies_keywords_and_operators() {
    use TokenKind::*;
    assert_eq!(
      kinds("int a, b; cout << a + 1; cin >> b; a = b - 2;"),
      vec![
        Int, Ident, Punctuator, Ident, Delimiter, Cout, CoutOp, Ident, Add, Constant, Delimiter,
        Cin, CinOp, Ident, Delimiter, Ident, Assign, Ident, Sub, Constant, Delimiter,
      ]
    );
  }

  #[test]
  fn keywords_need_a_word_boundary() {
    assert_eq!(kinds("integer cinder couts"), vec![TokenKind::Ident; 3]);
  }

  #[test]
  fn tracks_line_numbers() {
    let tokens = tokenize("int a;\n\na = 1;\n").unwrap();
    let lines: Vec<u32> = tokens.iter().map(|token| token.line).collect();
    assert_eq!(lines, vec![1, 1, 1, 3, 3, 3, 3]);
  }

  #[test]
  fn literal_body_is_stored_without_quotes() {
    let tokens = tokenize("cout << \"hello world\";").unwrap();
    assert_eq!(tokens[2], Token::new(TokenKind::Literal, "hello world", 1));
  }

  #[test]
  fn unterminated_literal_is_reported() {
    let err = tokenize("int a;\ncout << \"oops;\n").unwrap_err();
    assert_eq!(err, LexError::UnterminatedString { line: 2 });
  }

  #[test]
  fn unsupported_operators_become_unknown_tokens() {
    assert_eq!(
      kinds("a * b < c"),
      vec![
        TokenKind::Ident,
        TokenKind::Unknown,
        TokenKind::Ident,
        TokenKind::Unknown,
        TokenKind::Ident,
      ]
    );
  }

  #[test]
  fn stray_characters_are_rejected() {
    let err = tokenize("int a;\nint @b;").unwrap_err();
    assert_eq!(err, LexError::InvalidCharacter { ch: '@', line: 2 });
  }

  #[test]
  fn line_comments_are_skipped() {
    assert_eq!(
      kinds("int a; // declare a\n// nothing here\n"),
      vec![TokenKind::Int, TokenKind::Ident, TokenKind::Delimiter]
    );
  }

  #[test]
  fn lexemes_reproduce_significant_characters() {
    let source = "int a, b;\n  a = 5;  b = a + 3;\ncout << b << \"done\";";
    let joined: String = tokenize(source)
      .unwrap()
      .iter()
      .map(|token| match token.kind {
        TokenKind::Literal => format!("\"{}\"", token.text),
        _ => token.text.clone(),
      })
      .collect();
    let expected: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(joined, expected);
  }
}
