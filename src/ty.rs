use std::fmt;

/// Declared type of a variable. The language only knows `int` today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
}

impl Type {
  /// Whether a constant can be stored in a slot of this type.
  pub fn holds(&self, value: i64) -> bool {
    match self {
      Type::Int => i32::try_from(value).is_ok(),
    }
  }

  /// NASM directive reserving one uninitialised slot.
  pub fn reserve_directive(&self) -> &'static str {
    match self {
      Type::Int => "resd",
    }
  }

  /// NASM directive defining one initialised slot.
  pub fn define_directive(&self) -> &'static str {
    match self {
      Type::Int => "dd",
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Int => write!(f, "int"),
    }
  }
}
