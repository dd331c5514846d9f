//! Semantic analysis.
//!
//! A single top-to-bottom walk over the statement list that enforces
//! declare-before-use, initialise-before-read and type agreement between a
//! variable and the value assigned to it. The language has no nested scopes,
//! so one flat symbol table lives for the whole pass.

use std::collections::HashMap;

use snafu::ensure;
use tracing::{debug, trace};

use crate::ast::{
  Assignment, Constant, Declaration, Declarator, Expression, Identifier, Node, Operand,
  OutputItem, Value,
};
use crate::error::{
  ConstantOutOfRangeSnafu, RedeclaredSnafu, SemanticError, TypeMismatchSnafu, UndeclaredSnafu,
  UninitializedSnafu,
};
use crate::ty::Type;

type SemaResult<T> = Result<T, SemanticError>;

/// What the analyzer knows about one declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
  pub ty: Type,
  pub initialized: bool,
  /// Line of the declaration.
  pub line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
  symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
  /// Add `ident` as an uninitialised variable of type `ty`.
  pub fn declare(&mut self, ident: &Identifier, ty: Type) -> SemaResult<()> {
    if let Some(previous) = self.symbols.get(&ident.name) {
      return RedeclaredSnafu {
        name: ident.name.as_str(),
        line: ident.line,
        previous: previous.line,
      }
      .fail();
    }
    self.symbols.insert(
      ident.name.clone(),
      Symbol {
        ty,
        initialized: false,
        line: ident.line,
      },
    );
    Ok(())
  }

  pub fn lookup(&self, ident: &Identifier) -> SemaResult<&Symbol> {
    match self.symbols.get(&ident.name) {
      Some(symbol) => Ok(symbol),
      None => UndeclaredSnafu {
        name: ident.name.as_str(),
        line: ident.line,
      }
      .fail(),
    }
  }

  /// Record that `ident` now holds a value. The variable must be declared.
  pub fn mark_initialized(&mut self, ident: &Identifier) -> SemaResult<()> {
    match self.symbols.get_mut(&ident.name) {
      Some(symbol) => {
        symbol.initialized = true;
        Ok(())
      }
      None => UndeclaredSnafu {
        name: ident.name.as_str(),
        line: ident.line,
      }
      .fail(),
    }
  }

  /// Look up `ident` for reading: it must be declared and initialised.
  pub fn read(&self, ident: &Identifier) -> SemaResult<&Symbol> {
    let symbol = self.lookup(ident)?;
    ensure!(
      symbol.initialized,
      UninitializedSnafu {
        name: ident.name.as_str(),
        line: ident.line,
      }
    );
    Ok(symbol)
  }

  pub fn get(&self, name: &str) -> Option<&Symbol> {
    self.symbols.get(name)
  }
}

/// Validate a parsed program and return the symbol table it builds.
///
/// Stops at the first violation. Every call starts from an empty table, so
/// analysing the same nodes twice gives the same answer.
pub fn analyze(nodes: &[Node]) -> SemaResult<SymbolTable> {
  let mut analyzer = Analyzer::default();
  for node in nodes {
    analyzer.visit_node(node)?;
  }
  debug!(symbols = analyzer.symbols.symbols.len(), "semantic analysis passed");
  Ok(analyzer.symbols)
}

#[derive(Default)]
struct Analyzer {
  symbols: SymbolTable,
}

impl Analyzer {
  fn visit_node(&mut self, node: &Node) -> SemaResult<()> {
    match node {
      Node::Declaration(decl) => self.visit_declaration(decl),
      Node::Assignment(assign) => {
        self.symbols.lookup(&assign.target)?;
        self.visit_assignment(assign)
      }
      Node::Sequence(nodes) => {
        for node in nodes {
          self.visit_node(node)?;
        }
        Ok(())
      }
      Node::Cout(items) => {
        for item in items {
          self.visit_output(item)?;
        }
        Ok(())
      }
      Node::Cin(idents) => {
        for ident in idents {
          self.symbols.lookup(ident)?;
          self.symbols.mark_initialized(ident)?;
          self.symbols.read(ident)?;
        }
        Ok(())
      }
    }
  }

  fn visit_declaration(&mut self, decl: &Declaration) -> SemaResult<()> {
    match &decl.product {
      Declarator::List(idents) => {
        for ident in idents {
          trace!(name = %ident.name, ty = %decl.ty, "declare");
          self.symbols.declare(ident, decl.ty)?;
        }
        Ok(())
      }
      Declarator::Init(assign) => {
        trace!(name = %assign.target.name, ty = %decl.ty, "declare with initializer");
        self.symbols.declare(&assign.target, decl.ty)?;
        self.visit_assignment(assign)
      }
    }
  }

  /// The target is marked initialised before the right-hand side is checked.
  fn visit_assignment(&mut self, assign: &Assignment) -> SemaResult<()> {
    self.symbols.mark_initialized(&assign.target)?;
    let target_ty = self.symbols.lookup(&assign.target)?.ty;

    match &assign.value {
      Value::Operand(Operand::Constant(constant)) => self.check_constant(constant, target_ty),
      Value::Operand(Operand::Identifier(source)) => {
        let found = self.symbols.read(source)?.ty;
        ensure!(
          found == target_ty,
          TypeMismatchSnafu {
            name: assign.target.name.as_str(),
            expected: target_ty,
            found,
            line: source.line,
          }
        );
        Ok(())
      }
      Value::Expression(expr) => self.visit_expression(expr, target_ty),
    }
  }

  fn visit_expression(&self, expr: &Expression, ty: Type) -> SemaResult<()> {
    for operand in [&expr.lhs, &expr.rhs] {
      match operand {
        Operand::Identifier(ident) => {
          self.symbols.read(ident)?;
        }
        Operand::Constant(constant) => self.check_constant(constant, ty)?,
      }
    }
    Ok(())
  }

  fn visit_output(&self, item: &OutputItem) -> SemaResult<()> {
    match item {
      OutputItem::Identifier(ident) => {
        self.symbols.read(ident)?;
        Ok(())
      }
      OutputItem::Constant(constant) => self.check_constant(constant, Type::Int),
      OutputItem::Expression(expr) => self.visit_expression(expr, Type::Int),
      OutputItem::Literal(_) => Ok(()),
    }
  }

  fn check_constant(&self, constant: &Constant, ty: Type) -> SemaResult<()> {
    ensure!(
      ty.holds(constant.value),
      ConstantOutOfRangeSnafu {
        value: constant.value,
        ty,
        line: constant.line,
      }
    );
    Ok(())
  }
}
