//! Crate root: wires together the compilation pipeline.
//!
//! The stages run strictly one after another over fully materialised input:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the statement list.
//! - `sema` walks the statements once, checking declarations and
//!   initialisation against its own symbol table.
//! - `codegen` lowers the validated statements into NASM win64 assembly.
//! - `toolchain` hands the result to an external assembler and linker.
//! - `error` holds the per-phase error types shared by the other modules.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod sema;
pub mod tokenizer;
pub mod toolchain;
pub mod ty;

use tracing::debug;

pub use error::{CompileError, CompileResult, LexError, SemanticError, SyntaxError};

/// Intermediate result passed to the observer of `compile_with`.
#[derive(Debug, Clone, Copy)]
pub enum Stage<'a> {
  Tokens(&'a [tokenizer::Token]),
  Syntax(&'a [ast::Node]),
}

/// Compile a source string into assembly text.
///
/// Fails on the first error of any phase; no output is produced unless every
/// phase succeeds.
pub fn compile(source: &str) -> CompileResult<String> {
  compile_with(source, |_| {})
}

/// Like `compile`, handing the token stream and the syntax tree to `observe`
/// as soon as each phase produces them.
pub fn compile_with(source: &str, mut observe: impl FnMut(Stage<'_>)) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  debug!(tokens = tokens.len(), "lexed source");
  observe(Stage::Tokens(&tokens));

  let program = parser::parse(&tokens)?;
  observe(Stage::Syntax(&program));

  sema::analyze(&program)?;
  Ok(codegen::generate(&program))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn observed(source: &str) -> (CompileResult<String>, Vec<&'static str>) {
    let mut stages = Vec::new();
    let result = compile_with(source, |stage| {
      stages.push(match stage {
        Stage::Tokens(_) => "tokens",
        Stage::Syntax(_) => "syntax",
      })
    });
    (result, stages)
  }

  #[test]
  fn observer_sees_every_stage_in_order() {
    let (result, stages) = observed("int a = 1; cout << a;");
    assert!(result.is_ok());
    assert_eq!(stages, ["tokens", "syntax"]);
  }

  #[test]
  fn observer_stops_at_the_failing_phase() {
    let (result, stages) = observed("int a b;");
    assert!(matches!(result, Err(CompileError::Syntax { .. })));
    assert_eq!(stages, ["tokens"]);

    let (result, stages) = observed("cout << \"open;");
    assert!(matches!(result, Err(CompileError::Lex { .. })));
    assert!(stages.is_empty());
  }

  #[test]
  fn syntax_stage_carries_the_parsed_program() {
    let mut statements = 0;
    compile_with("int a; a = 1;", |stage| {
      if let Stage::Syntax(nodes) = stage {
        statements = nodes.len();
      }
    })
    .unwrap();
    assert_eq!(statements, 2);
  }
}
