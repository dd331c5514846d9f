//! Code generation: lower the validated statement list into NASM assembly
//! for 64-bit Windows.
//!
//! Variables live in static storage: list declarations reserve a slot in
//! `.bss`, initialised declarations define one in `.data`. Arithmetic goes
//! through `eax`. `cout`/`cin` become one `printf`/`scanf` call per operand
//! using the Microsoft x64 convention (format in `rcx`, argument in `rdx`).
//! The input is assumed to have passed semantic analysis.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::ast::{
  Assignment, BinaryOp, Declaration, Declarator, Expression, Identifier, Node, Operand,
  OutputItem, StringLiteral, Value,
};

/// Generator-side view of a variable's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  /// Reserved in `.bss`, no value written yet.
  Reserved,
  /// Holds a value, either from `.data` or from a store.
  Initialized,
}

/// Emit assembly for a whole program.
pub fn generate(nodes: &[Node]) -> String {
  let mut generator = Generator::new();
  generator.emit_program(nodes);
  generator.finish()
}

/// Accumulates the three output sections while walking the AST.
#[derive(Debug)]
pub struct Generator {
  bss: String,
  data: String,
  text: String,
  slots: BTreeMap<String, Slot>,
  literals: HashMap<String, String>,
}

impl Default for Generator {
  fn default() -> Self {
    Self::new()
  }
}

impl Generator {
  pub fn new() -> Self {
    let mut data = String::from("section .data\n");
    data.push_str("    input_int db \"%d\", 0\n");
    data.push_str("    fmt_int db \"%d\", 10, 0\n");
    data.push_str("    fmt_literal db \"%s\", 10, 0\n");

    let mut text = String::from("section .text\n");
    text.push_str("    global main\n");
    text.push_str("main:\n");
    text.push_str("    push rbp\n");
    text.push_str("    mov rbp, rsp\n");
    // shadow space for callees, keeps rsp 16-byte aligned
    text.push_str("    sub rsp, 32\n");

    Self {
      bss: String::from("section .bss\n"),
      data,
      text,
      slots: BTreeMap::new(),
      literals: HashMap::new(),
    }
  }

  pub fn emit_program(&mut self, nodes: &[Node]) {
    for node in nodes {
      self.emit_node(node);
    }
  }

  /// Storage state recorded for `name`, if it was declared.
  pub fn slot(&self, name: &str) -> Option<Slot> {
    self.slots.get(name).copied()
  }

  /// Concatenate header, `.bss`, `.data` and `.text` into the final listing.
  pub fn finish(mut self) -> String {
    self.text.push_str("    xor ecx, ecx\n");
    self.text.push_str("    call ExitProcess\n");

    debug!(
      slots = self.slots.len(),
      literals = self.literals.len(),
      "generated assembly"
    );

    let mut asm = String::new();
    asm.push_str("default rel\n");
    asm.push_str("extern ExitProcess\n");
    asm.push_str("extern printf\n");
    asm.push_str("extern scanf\n\n");
    asm.push_str(&self.bss);
    asm.push('\n');
    asm.push_str(&self.data);
    asm.push('\n');
    asm.push_str(&self.text);
    asm
  }

  fn emit_node(&mut self, node: &Node) {
    match node {
      Node::Declaration(decl) => self.emit_declaration(decl),
      Node::Assignment(assign) => self.emit_assignment(assign),
      Node::Sequence(nodes) => self.emit_program(nodes),
      Node::Cout(items) => {
        for item in items {
          self.emit_output(item);
        }
      }
      Node::Cin(idents) => {
        for ident in idents {
          self.emit_input(ident);
        }
      }
    }
  }

  fn emit_declaration(&mut self, decl: &Declaration) {
    match &decl.product {
      Declarator::List(idents) => {
        for ident in idents {
          trace!(name = %ident.name, "reserve slot");
          self.bss.push_str(&format!(
            "    {} {} 1\n",
            label(ident),
            decl.ty.reserve_directive()
          ));
          self.slots.insert(ident.name.clone(), Slot::Reserved);
        }
      }
      Declarator::Init(assign) => {
        let directive = decl.ty.define_directive();
        match &assign.value {
          Value::Operand(Operand::Constant(constant)) => {
            trace!(name = %assign.target.name, "define constant slot");
            self.data.push_str(&format!(
              "    {} {directive} {}\n",
              label(&assign.target),
              constant.value
            ));
          }
          value => {
            trace!(name = %assign.target.name, "define computed slot");
            self
              .data
              .push_str(&format!("    {} {directive} 0\n", label(&assign.target)));
            self.emit_value(value);
            self.store_eax(&assign.target);
          }
        }
        self
          .slots
          .insert(assign.target.name.clone(), Slot::Initialized);
      }
    }
  }

  fn emit_assignment(&mut self, assign: &Assignment) {
    match &assign.value {
      Value::Operand(Operand::Constant(constant)) => {
        self.text.push_str(&format!(
          "    mov dword [{}], {}\n",
          label(&assign.target),
          constant.value
        ));
      }
      value => {
        self.emit_value(value);
        self.store_eax(&assign.target);
      }
    }
    self.mark_initialized(&assign.target);
  }

  /// Leave `value` in `eax`.
  fn emit_value(&mut self, value: &Value) {
    match value {
      Value::Operand(operand) => {
        self
          .text
          .push_str(&format!("    mov eax, {}\n", operand_ref(operand)));
      }
      Value::Expression(expr) => self.emit_expr(expr),
    }
  }

  fn emit_expr(&mut self, expr: &Expression) {
    self
      .text
      .push_str(&format!("    mov eax, {}\n", operand_ref(&expr.lhs)));
    let mnemonic = match expr.op {
      BinaryOp::Add => "add",
      BinaryOp::Sub => "sub",
    };
    self
      .text
      .push_str(&format!("    {mnemonic} eax, {}\n", operand_ref(&expr.rhs)));
  }

  fn store_eax(&mut self, target: &Identifier) {
    self
      .text
      .push_str(&format!("    mov dword [{}], eax\n", label(target)));
  }

  fn emit_output(&mut self, item: &OutputItem) {
    match item {
      OutputItem::Identifier(ident) => {
        self.text.push_str("    lea rcx, [fmt_int]\n");
        self
          .text
          .push_str(&format!("    mov edx, dword [{}]\n", label(ident)));
      }
      OutputItem::Constant(constant) => {
        self.text.push_str("    lea rcx, [fmt_int]\n");
        self
          .text
          .push_str(&format!("    mov edx, {}\n", constant.value));
      }
      OutputItem::Expression(expr) => {
        self.emit_expr(expr);
        self.text.push_str("    lea rcx, [fmt_int]\n");
        self.text.push_str("    mov edx, eax\n");
      }
      OutputItem::Literal(literal) => {
        let name = self.intern_literal(literal);
        self.text.push_str("    lea rcx, [fmt_literal]\n");
        self.text.push_str(&format!("    lea rdx, [{name}]\n"));
      }
    }
    self.text.push_str("    call printf\n");
  }

  fn emit_input(&mut self, ident: &Identifier) {
    self.text.push_str("    lea rcx, [input_int]\n");
    self
      .text
      .push_str(&format!("    lea rdx, [{}]\n", label(ident)));
    self.text.push_str("    call scanf\n");
    self.mark_initialized(ident);
  }

  /// Define `literal` in `.data` once and return its label.
  fn intern_literal(&mut self, literal: &StringLiteral) -> String {
    if let Some(name) = self.literals.get(&literal.text) {
      return name.clone();
    }

    let name = format!("lit{}_{}", self.literals.len(), literal_label(&literal.text));
    self
      .data
      .push_str(&format!("    {name} db {}\n", db_operands(&literal.text)));
    self.literals.insert(literal.text.clone(), name.clone());
    name
  }

  fn mark_initialized(&mut self, ident: &Identifier) {
    if let Some(slot) = self.slots.get_mut(&ident.name) {
      *slot = Slot::Initialized;
    }
  }
}

/// Variables are prefixed so names like `rax` or `printf` stay usable.
fn label(ident: &Identifier) -> String {
  format!("var_{}", ident.name)
}

fn operand_ref(operand: &Operand) -> String {
  match operand {
    Operand::Identifier(ident) => format!("dword [{}]", label(ident)),
    Operand::Constant(constant) => constant.value.to_string(),
  }
}

/// Whitespace becomes `_`; anything else that cannot appear in a label is
/// dropped.
fn literal_label(text: &str) -> String {
  text
    .chars()
    .map(|c| if c.is_whitespace() { '_' } else { c })
    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
    .take(32)
    .collect()
}

/// `db` operand list for a NUL-terminated string. Non-printable bytes are
/// written numerically since NASM strings have no escapes.
fn db_operands(text: &str) -> String {
  let mut parts = Vec::new();
  let mut run = String::new();

  for byte in text.bytes() {
    if (0x20..0x7f).contains(&byte) {
      run.push(byte as char);
      continue;
    }
    if !run.is_empty() {
      parts.push(format!("\"{run}\""));
      run.clear();
    }
    parts.push(byte.to_string());
  }
  if !run.is_empty() {
    parts.push(format!("\"{run}\""));
  }
  parts.push("0".to_string());
  parts.join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn compile(source: &str) -> String {
    generate(&parse(&tokenize(source).unwrap()).unwrap())
  }

  fn section<'a>(asm: &'a str, name: &str) -> &'a str {
    let start = asm.find(&format!("section {name}")).unwrap();
    let rest = &asm[start..];
    let end = rest[1..].find("section ").map_or(rest.len(), |i| i + 1);
    &rest[..end]
  }

  fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
      let found = haystack[from..]
        .find(needle)
        .unwrap_or_else(|| panic!("missing {needle:?} after offset {from} in:\n{haystack}"));
      from += found + needle.len();
    }
  }

  #[test]
  fn sections_come_in_fixed_order() {
    let asm = compile("int a;");
    assert_in_order(
      &asm,
      &[
        "default rel",
        "extern ExitProcess",
        "extern printf",
        "extern scanf",
        "section .bss",
        "section .data",
        "section .text",
        "main:",
        "call ExitProcess",
      ],
    );
  }

  #[test]
  fn list_declaration_reserves_bss_slots() {
    let asm = compile("int a, b;");
    let bss = section(&asm, ".bss");
    assert!(bss.contains("var_a resd 1"));
    assert!(bss.contains("var_b resd 1"));
  }

  #[test]
  fn constant_initializer_goes_to_data() {
    let asm = compile("int x = 7;");
    assert!(section(&asm, ".data").contains("var_x dd 7"));
    assert!(!section(&asm, ".text").contains("var_x"));
  }

  #[test]
  fn expression_initializer_computes_then_stores() {
    let asm = compile("int x = 10 - 4;");
    assert!(section(&asm, ".data").contains("var_x dd 0"));
    assert_in_order(
      section(&asm, ".text"),
      &["mov eax, 10", "sub eax, 4", "mov dword [var_x], eax"],
    );
  }

  #[test]
  fn assignment_forms() {
    let asm = compile("int a, b; a = 5; b = a + 3; a = b;");
    assert_in_order(
      section(&asm, ".text"),
      &[
        "mov dword [var_a], 5",
        "mov eax, dword [var_a]",
        "add eax, 3",
        "mov dword [var_b], eax",
        "mov eax, dword [var_b]",
        "mov dword [var_a], eax",
      ],
    );
  }

  #[test]
  fn identifier_on_the_right_of_sub_is_dereferenced() {
    let asm = compile("int a = 1; int b = 9 - a;");
    assert!(section(&asm, ".text").contains("sub eax, dword [var_a]"));
  }

  #[test]
  fn cout_calls_printf_per_operand() {
    let asm = compile("int b = 2; cout << b << 4 << b + 1;");
    let text = section(&asm, ".text");
    assert_eq!(text.matches("call printf").count(), 3);
    assert_in_order(
      text,
      &[
        "lea rcx, [fmt_int]",
        "mov edx, dword [var_b]",
        "call printf",
        "mov edx, 4",
        "call printf",
        "add eax, 1",
        "mov edx, eax",
        "call printf",
      ],
    );
  }

  #[test]
  fn string_literals_get_a_data_label() {
    let asm = compile("cout << \"hello world\" << \"hello world\" << \"bye!\";");
    let data = section(&asm, ".data");
    assert!(data.contains("lit0_hello_world db \"hello world\", 0"));
    assert!(data.contains("lit1_bye db \"bye!\", 0"));
    let text = section(&asm, ".text");
    assert_eq!(text.matches("lea rdx, [lit0_hello_world]").count(), 2);
    assert_eq!(text.matches("lea rcx, [fmt_literal]").count(), 3);
  }

  #[test]
  fn cin_calls_scanf_with_slot_address() {
    let asm = compile("int x; cin >> x;");
    assert_in_order(
      section(&asm, ".text"),
      &["lea rcx, [input_int]", "lea rdx, [var_x]", "call scanf"],
    );
  }

  #[test]
  fn slots_track_initialization() {
    let nodes = parse(&tokenize("int a, b, c; a = 1; cin >> b;").unwrap()).unwrap();
    let mut generator = Generator::new();
    generator.emit_program(&nodes);
    assert_eq!(generator.slot("a"), Some(Slot::Initialized));
    assert_eq!(generator.slot("b"), Some(Slot::Initialized));
    assert_eq!(generator.slot("c"), Some(Slot::Reserved));
    assert_eq!(generator.slot("d"), None);
  }

  #[test]
  fn db_operands_escape_control_bytes() {
    assert_eq!(db_operands("a\tb"), "\"a\", 9, \"b\", 0");
    assert_eq!(db_operands(""), "0");
  }
}
