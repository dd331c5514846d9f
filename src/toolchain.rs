//! Turning the emitted `.asm` into an executable with external tools.
//!
//! The assembler is invoked NASM-style (`-f win64 -o <obj> <asm>`) and the
//! linker gcc-style (`-o <exe> <obj>`). Both are resolved on `PATH` first so
//! a missing tool is reported by name instead of as a bare spawn failure.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use snafu::{ResultExt, Snafu, ensure};
use tracing::info;

#[derive(Debug, Snafu)]
pub enum ToolchainError {
  #[snafu(display("could not find `{tool}` on PATH"))]
  NotFound { tool: String, source: which::Error },

  #[snafu(display("failed to run `{tool}`"))]
  Spawn {
    tool: String,
    source: std::io::Error,
  },

  #[snafu(display("`{tool}` exited with {status}"))]
  Failed { tool: String, status: ExitStatus },
}

/// External programs used after code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  pub assembler: String,
  pub linker: String,
  pub object_format: String,
}

impl Default for Toolchain {
  fn default() -> Self {
    Self {
      assembler: "nasm".to_string(),
      linker: "gcc".to_string(),
      object_format: "win64".to_string(),
    }
  }
}

impl Toolchain {
  /// Arguments passed to the assembler for `asm` → `obj`.
  pub fn assemble_args(&self, asm: &Path, obj: &Path) -> Vec<String> {
    vec![
      "-f".to_string(),
      self.object_format.clone(),
      "-o".to_string(),
      obj.display().to_string(),
      asm.display().to_string(),
    ]
  }

  /// Arguments passed to the linker for `obj` → `exe`.
  pub fn link_args(&self, obj: &Path, exe: &Path) -> Vec<String> {
    vec![
      "-o".to_string(),
      exe.display().to_string(),
      obj.display().to_string(),
    ]
  }

  pub fn assemble(&self, asm: &Path, obj: &Path) -> Result<(), ToolchainError> {
    run(&self.assembler, &self.assemble_args(asm, obj))
  }

  pub fn link(&self, obj: &Path, exe: &Path) -> Result<(), ToolchainError> {
    run(&self.linker, &self.link_args(obj, exe))
  }

  /// Assemble `asm` next to itself and link it into `exe`. Returns the
  /// object file path.
  pub fn build(&self, asm: &Path, exe: &Path) -> Result<PathBuf, ToolchainError> {
    let obj = asm.with_extension("obj");
    self.assemble(asm, &obj)?;
    self.link(&obj, exe)?;
    Ok(obj)
  }
}

fn run(tool: &str, args: &[String]) -> Result<(), ToolchainError> {
  let program = which::which(tool).context(NotFoundSnafu { tool })?;
  info!("{} {}", tool, args.join(" "));

  let status = Command::new(&program)
    .args(args)
    .status()
    .context(SpawnSnafu { tool })?;
  ensure!(status.success(), FailedSnafu { tool, status });
  Ok(())
}
