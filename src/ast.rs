//! Syntax tree produced by the parser.
//!
//! Every statement is a `Node`; the operand positions use narrower enums so
//! the tree can only hold shapes the grammar allows (an `Expression` never
//! nests, `cin` only reads into identifiers). Children are owned by their
//! parent, nothing is shared.

use std::fmt;

use crate::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
  pub name: String,
  pub line: u32,
}

impl Identifier {
  pub fn new(name: impl Into<String>, line: u32) -> Self {
    Self {
      name: name.into(),
      line,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
  pub value: i64,
  pub line: u32,
}

impl Constant {
  pub fn new(value: i64, line: u32) -> Self {
    Self { value, line }
  }
}

/// Raw body of a string literal, quotes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
  pub text: String,
  pub line: u32,
}

/// Identifier or constant usable on either side of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Identifier(Identifier),
  Constant(Constant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
}

impl BinaryOp {
  pub fn symbol(&self) -> char {
    match self {
      BinaryOp::Add => '+',
      BinaryOp::Sub => '-',
    }
  }
}

/// A single binary operation. Chains and parentheses are not part of the
/// language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
  pub op: BinaryOp,
  pub lhs: Operand,
  pub rhs: Operand,
}

impl Expression {
  pub fn new(op: BinaryOp, lhs: Operand, rhs: Operand) -> Self {
    Self { op, lhs, rhs }
  }
}

/// Right-hand side of an assignment, and the value shape `expression`
/// yields in the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Operand(Operand),
  Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
  pub target: Identifier,
  pub value: Value,
}

/// What an `int ...;` statement introduces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declarator {
  /// `int a, b, c;` – never empty.
  List(Vec<Identifier>),
  /// `int a = <expression>;`
  Init(Assignment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
  pub ty: Type,
  pub product: Declarator,
}

/// One item printed by `cout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
  Identifier(Identifier),
  Constant(Constant),
  Expression(Expression),
  Literal(StringLiteral),
}

impl From<Value> for OutputItem {
  fn from(value: Value) -> Self {
    match value {
      Value::Operand(Operand::Identifier(ident)) => OutputItem::Identifier(ident),
      Value::Operand(Operand::Constant(constant)) => OutputItem::Constant(constant),
      Value::Expression(expr) => OutputItem::Expression(expr),
    }
  }
}

/// Top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Declaration(Declaration),
  Assignment(Assignment),
  /// Statement group; the parser wraps each bare assignment in one.
  Sequence(Vec<Node>),
  Cout(Vec<OutputItem>),
  Cin(Vec<Identifier>),
}

impl fmt::Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand::Identifier(ident) => write!(f, "{ident}"),
      Operand::Constant(constant) => write!(f, "{}", constant.value),
    }
  }
}

impl fmt::Display for Expression {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} {}", self.lhs, self.op.symbol(), self.rhs)
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Operand(operand) => write!(f, "{operand}"),
      Value::Expression(expr) => write!(f, "{expr}"),
    }
  }
}

impl fmt::Display for OutputItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutputItem::Identifier(ident) => write!(f, "{ident}"),
      OutputItem::Constant(constant) => write!(f, "{}", constant.value),
      OutputItem::Expression(expr) => write!(f, "{expr}"),
      OutputItem::Literal(literal) => write!(f, "{:?}", literal.text),
    }
  }
}

/// Indented tree dump used by `--ast`.
impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_node(f, self, 0)
  }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
  let pad = "  ".repeat(depth);
  match node {
    Node::Declaration(decl) => match &decl.product {
      Declarator::List(idents) => {
        let names: Vec<&str> = idents.iter().map(|ident| ident.name.as_str()).collect();
        writeln!(f, "{pad}Declaration {} [{}]", decl.ty, names.join(", "))
      }
      Declarator::Init(assign) => {
        writeln!(f, "{pad}Declaration {}", decl.ty)?;
        writeln!(f, "{pad}  Assignment {} = {}", assign.target, assign.value)
      }
    },
    Node::Assignment(assign) => writeln!(f, "{pad}Assignment {} = {}", assign.target, assign.value),
    Node::Sequence(nodes) => {
      writeln!(f, "{pad}Sequence")?;
      for node in nodes {
        write_node(f, node, depth + 1)?;
      }
      Ok(())
    }
    Node::Cout(items) => {
      let items: Vec<String> = items.iter().map(ToString::to_string).collect();
      writeln!(f, "{pad}Cout [{}]", items.join(", "))
    }
    Node::Cin(idents) => {
      let names: Vec<&str> = idents.iter().map(|ident| ident.name.as_str()).collect();
      writeln!(f, "{pad}Cin [{}]", names.join(", "))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pretty_prints_nested_statements() {
    let node = Node::Sequence(vec![Node::Assignment(Assignment {
      target: Identifier::new("b", 1),
      value: Value::Expression(Expression::new(
        BinaryOp::Add,
        Operand::Identifier(Identifier::new("a", 1)),
        Operand::Constant(Constant::new(3, 1)),
      )),
    })]);
    assert_eq!(node.to_string(), "Sequence\n  Assignment b = a + 3\n");
  }

  #[test]
  fn cout_items_render_literals_quoted() {
    let node = Node::Cout(vec![
      OutputItem::Literal(StringLiteral {
        text: "sum".to_string(),
        line: 1,
      }),
      OutputItem::Constant(Constant::new(4, 1)),
    ]);
    assert_eq!(node.to_string(), "Cout [\"sum\", 4]\n");
  }
}
