use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use coutc::toolchain::Toolchain;
use coutc::{Stage, compile_with};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
  /// Source file to compile; the assembly is written next to it as `.asm`.
  source: PathBuf,
  /// Executable to build from the assembly. Without it compilation stops
  /// after writing the `.asm` file.
  output: Option<PathBuf>,
  /// Print the token table.
  #[arg(long)]
  tokens: bool,
  /// Print the parsed syntax tree.
  #[arg(long)]
  ast: bool,
  /// Raise log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
  /// NASM-compatible assembler used when OUTPUT is given.
  #[arg(long, env = "COUTC_ASSEMBLER", default_value = "nasm")]
  assembler: String,
  /// Linker producing the executable from the win64 object file.
  #[arg(long, env = "COUTC_LINKER", default_value = "gcc")]
  linker: String,
}

/// Which intermediate results to print while compiling.
#[derive(Debug, Clone, Copy, Default)]
struct Dumps {
  tokens: bool,
  ast: bool,
}

fn main() {
  let args = match Args::try_parse() {
    Ok(args) => args,
    Err(err) if err.use_stderr() => {
      let _ = err.print();
      process::exit(1);
    }
    Err(err) => err.exit(),
  };

  init_tracing(args.verbose);

  if let Err(err) = run(&args) {
    eprintln!("error: {err:#}");
    process::exit(1);
  }
}

fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
  let dumps = Dumps {
    tokens: args.tokens,
    ast: args.ast,
  };
  let asm_path = write_assembly(&args.source, dumps)?;

  if let Some(output) = &args.output {
    let exe = output.with_extension("exe");
    let toolchain = Toolchain {
      assembler: args.assembler.clone(),
      linker: args.linker.clone(),
      ..Toolchain::default()
    };
    toolchain
      .build(&asm_path, &exe)
      .with_context(|| format!("could not build {}", exe.display()))?;
    println!("Built {}", exe.display());
  }

  Ok(())
}

/// Compile `source` and write the assembly next to it, returning the `.asm`
/// path. Nothing is written unless every phase succeeds.
fn write_assembly(source: &Path, dumps: Dumps) -> anyhow::Result<PathBuf> {
  if source
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("asm"))
  {
    bail!(
      "{}: source already has the .asm extension and would be overwritten",
      source.display()
    );
  }

  let text = fs::read_to_string(source)
    .with_context(|| format!("could not open file {}", source.display()))?;

  let asm = match compile_with(&text, |stage| print_stage(stage, dumps)) {
    Ok(asm) => asm,
    Err(err) => bail!("{}: {err}", source.display()),
  };

  let asm_path = source.with_extension("asm");
  fs::write(&asm_path, asm).with_context(|| format!("could not write {}", asm_path.display()))?;
  info!(path = %asm_path.display(), "wrote assembly");
  Ok(asm_path)
}

fn print_stage(stage: Stage<'_>, dumps: Dumps) {
  match stage {
    Stage::Tokens(tokens) if dumps.tokens => {
      for token in tokens {
        println!("{} :: {} :: LINE {}", token.text, token.kind, token.line);
      }
    }
    Stage::Syntax(program) if dumps.ast => {
      for node in program {
        print!("{node}");
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("coutc-{}-{name}", process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn successful_compile_writes_asm_next_to_source() {
    let dir = scratch_dir("ok");
    let source = dir.join("prog.cpp");
    fs::write(&source, "int a = 2; cout << a;").unwrap();

    let asm_path = write_assembly(&source, Dumps::default()).unwrap();
    assert_eq!(asm_path, dir.join("prog.asm"));
    assert!(fs::read_to_string(&asm_path).unwrap().contains("call printf"));

    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn failed_compile_leaves_no_asm() {
    let dir = scratch_dir("fail");
    let source = dir.join("prog.cpp");
    fs::write(&source, "int x; cout << x;").unwrap();

    let err = write_assembly(&source, Dumps::default()).unwrap_err();
    assert!(err.to_string().contains("'x' is not initialized"));
    assert!(!dir.join("prog.asm").exists());

    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn asm_source_is_not_overwritten() {
    let dir = scratch_dir("asm-src");
    let source = dir.join("prog.asm");
    fs::write(&source, "int a;").unwrap();

    assert!(write_assembly(&source, Dumps::default()).is_err());
    assert_eq!(fs::read_to_string(&source).unwrap(), "int a;");

    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn missing_source_is_reported() {
    let dir = scratch_dir("missing");
    let err = write_assembly(&dir.join("nope.cpp"), Dumps::default()).unwrap_err();
    assert!(err.to_string().contains("could not open file"));
    fs::remove_dir_all(&dir).unwrap();
  }
}
