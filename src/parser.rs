//! Recursive-descent parser producing the statement list.
//!
//! One token of lookahead, no backtracking. Each top-level iteration parses
//! exactly one statement; running out of tokens anywhere inside a statement
//! is a `SyntaxError` carrying the last line seen, never a panic.

use tracing::{debug, trace};

use crate::ast::{
  Assignment, BinaryOp, Constant, Declaration, Declarator, Expression, Identifier, Node, Operand,
  OutputItem, StringLiteral, Value,
};
use crate::error::{
  InvalidConstantSnafu, MissingPunctuatorSnafu, SyntaxError, UnexpectedEofSnafu,
  UnexpectedTokenSnafu,
};
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

type ParseResult<T> = Result<T, SyntaxError>;

/// Parse a whole program.
pub fn parse(tokens: &[Token]) -> ParseResult<Vec<Node>> {
  let mut stream = TokenStream::new(tokens);
  let mut nodes = Vec::new();

  while !stream.is_eof() {
    parse_stmt(&mut stream, &mut nodes)?;
  }

  debug!(statements = nodes.len(), "parsed program");
  Ok(nodes)
}

/// statement := assignment | declaration | cout_stmt | cin_stmt
///
/// A declaration may expand to two nodes, so statements are pushed onto
/// `nodes` rather than returned.
fn parse_stmt(stream: &mut TokenStream, nodes: &mut Vec<Node>) -> ParseResult<()> {
  let Some(kind) = stream.peek_kind() else {
    return Err(stream.unexpected("a statement"));
  };
  trace!(?kind, line = stream.line(), "parsing statement");

  match kind {
    TokenKind::Ident => {
      let assign = parse_assign(stream)?;
      nodes.push(Node::Sequence(vec![Node::Assignment(assign)]));
    }
    TokenKind::Int => parse_declaration(stream, nodes)?,
    TokenKind::Cout => nodes.push(parse_cout(stream)?),
    TokenKind::Cin => nodes.push(parse_cin(stream)?),
    _ => return Err(stream.unexpected("a statement")),
  }
  Ok(())
}

/// assignment := IDENT '=' expression ';'
fn parse_assign(stream: &mut TokenStream) -> ParseResult<Assignment> {
  let target = parse_ident(stream)?;
  if stream.peek_kind() == Some(TokenKind::Ident) {
    return MissingPunctuatorSnafu { line: stream.line() }.fail();
  }
  stream.skip(TokenKind::Assign)?;
  let value = parse_expr(stream)?;
  stream.skip(TokenKind::Delimiter)?;
  Ok(Assignment { target, value })
}

/// declaration := 'int' ( IDENT (',' IDENT)* | (IDENT ',')* IDENT '=' expression ) ';'
///
/// Identifiers listed before an initialised one are kept as their own
/// list declaration, so `int a, b = 5;` declares both.
fn parse_declaration(stream: &mut TokenStream, nodes: &mut Vec<Node>) -> ParseResult<()> {
  stream.skip(TokenKind::Int)?;
  let ty = Type::Int;
  let mut idents = Vec::new();

  loop {
    let ident = parse_ident(stream)?;

    if stream.equal(TokenKind::Assign) {
      let value = parse_expr(stream)?;
      stream.skip(TokenKind::Delimiter)?;
      if !idents.is_empty() {
        nodes.push(Node::Declaration(Declaration {
          ty,
          product: Declarator::List(idents),
        }));
      }
      nodes.push(Node::Declaration(Declaration {
        ty,
        product: Declarator::Init(Assignment {
          target: ident,
          value,
        }),
      }));
      return Ok(());
    }

    idents.push(ident);

    match stream.peek_kind() {
      Some(TokenKind::Punctuator) => {
        stream.advance();
      }
      Some(TokenKind::Ident) => {
        return MissingPunctuatorSnafu { line: stream.line() }.fail();
      }
      _ => break,
    }
  }

  stream.skip(TokenKind::Delimiter)?;
  nodes.push(Node::Declaration(Declaration {
    ty,
    product: Declarator::List(idents),
  }));
  Ok(())
}

/// cout_stmt := 'cout' ( '<<' item | item )* ';'  where item is an
/// expression or a string literal.
fn parse_cout(stream: &mut TokenStream) -> ParseResult<Node> {
  stream.skip(TokenKind::Cout)?;
  let mut items = Vec::new();

  loop {
    match stream.peek_kind() {
      Some(TokenKind::CoutOp) => {
        stream.advance();
        if !matches!(
          stream.peek_kind(),
          Some(TokenKind::Ident | TokenKind::Constant | TokenKind::Literal)
        ) {
          return Err(stream.unexpected("identifier, constant, or literal after '<<'"));
        }
      }
      Some(TokenKind::Ident | TokenKind::Constant) => {
        items.push(OutputItem::from(parse_expr(stream)?));
      }
      Some(TokenKind::Literal) => {
        let token = stream.skip(TokenKind::Literal)?;
        items.push(OutputItem::Literal(StringLiteral {
          text: token.text.clone(),
          line: token.line,
        }));
      }
      _ => break,
    }
  }

  stream.skip(TokenKind::Delimiter)?;
  Ok(Node::Cout(items))
}

/// cin_stmt := 'cin' ( '>>' IDENT | IDENT )* ';'
fn parse_cin(stream: &mut TokenStream) -> ParseResult<Node> {
  stream.skip(TokenKind::Cin)?;
  let mut idents = Vec::new();

  loop {
    match stream.peek_kind() {
      Some(TokenKind::CinOp) => {
        stream.advance();
        if stream.peek_kind() != Some(TokenKind::Ident) {
          return Err(stream.unexpected("identifier after '>>'"));
        }
      }
      Some(TokenKind::Ident) => idents.push(parse_ident(stream)?),
      _ => break,
    }
  }

  stream.skip(TokenKind::Delimiter)?;
  Ok(Node::Cin(idents))
}

/// expression := operand (('+' | '-') operand)?
fn parse_expr(stream: &mut TokenStream) -> ParseResult<Value> {
  let lhs = parse_operand(stream)?;

  let op = match stream.peek_kind() {
    Some(TokenKind::Add) => BinaryOp::Add,
    Some(TokenKind::Sub) => BinaryOp::Sub,
    _ => return Ok(Value::Operand(lhs)),
  };
  stream.advance();

  let rhs = parse_operand(stream)?;
  Ok(Value::Expression(Expression::new(op, lhs, rhs)))
}

/// operand := IDENT | CONSTANT
fn parse_operand(stream: &mut TokenStream) -> ParseResult<Operand> {
  match stream.peek_kind() {
    Some(TokenKind::Ident) => Ok(Operand::Identifier(parse_ident(stream)?)),
    Some(TokenKind::Constant) => {
      let token = stream.skip(TokenKind::Constant)?;
      let Ok(value) = token.text.parse::<i64>() else {
        return InvalidConstantSnafu {
          text: token.text.clone(),
          line: token.line,
        }
        .fail();
      };
      Ok(Operand::Constant(Constant::new(value, token.line)))
    }
    _ => Err(stream.unexpected("identifier or constant")),
  }
}

fn parse_ident(stream: &mut TokenStream) -> ParseResult<Identifier> {
  let token = stream.skip(TokenKind::Ident)?;
  Ok(Identifier::new(token.text.clone(), token.line))
}

/// Forward-only cursor over the token slice.
struct TokenStream<'a> {
  tokens: &'a [Token],
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: &'a [Token]) -> Self {
    Self { tokens, pos: 0 }
  }

  fn peek(&self) -> Option<&'a Token> {
    self.tokens.get(self.pos)
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek().map(|token| token.kind)
  }

  fn advance(&mut self) -> Option<&'a Token> {
    let token = self.peek()?;
    self.pos += 1;
    Some(token)
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek_kind() == Some(kind) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume a token of the given kind or fail naming what was found.
  fn skip(&mut self, kind: TokenKind) -> ParseResult<&'a Token> {
    match self.peek() {
      Some(token) if token.kind == kind => {
        self.pos += 1;
        Ok(token)
      }
      _ => Err(self.unexpected(&kind.to_string())),
    }
  }

  /// Line of the current token, or of the last one once input is exhausted.
  fn line(&self) -> u32 {
    self
      .peek()
      .or_else(|| self.tokens.last())
      .map_or(1, |token| token.line)
  }

  fn unexpected(&self, expected: &str) -> SyntaxError {
    match self.peek() {
      Some(token) => UnexpectedTokenSnafu {
        expected,
        found: token.kind,
        text: token.text.clone(),
        line: token.line,
      }
      .build(),
      None => UnexpectedEofSnafu {
        expected,
        line: self.line(),
      }
      .build(),
    }
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.tokens.len()
  }
}
