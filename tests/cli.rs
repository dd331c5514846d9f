use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("coutc-cli-{}-{name}", std::process::id()));
  fs::create_dir_all(&dir).unwrap();
  dir
}

fn coutc(args: &[&std::ffi::OsStr]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_coutc"))
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .unwrap()
}

#[test]
fn missing_source_argument_exits_with_one() {
  let output = coutc(&[]);
  assert_eq!(output.status.code(), Some(1));
  assert!(!output.stderr.is_empty());
}

#[test]
fn unreadable_source_exits_with_one() {
  let dir = scratch_dir("unreadable");
  let output = coutc(&[dir.join("absent.cpp").as_os_str()]);
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("could not open file"));
  fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn compile_error_exits_with_one_and_writes_nothing() {
  let dir = scratch_dir("error");
  let source = dir.join("bad.cpp");
  fs::write(&source, "int n;\nn n;\n").unwrap();

  let output = coutc(&[source.as_os_str()]);
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("line 2: missing punctuator between identifiers"));
  assert!(!dir.join("bad.asm").exists());

  fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn asm_source_exits_with_one_and_is_left_alone() {
  let dir = scratch_dir("asm");
  let source = dir.join("prog.asm");
  fs::write(&source, "int a = 1;").unwrap();

  let output = coutc(&[source.as_os_str()]);
  assert_eq!(output.status.code(), Some(1));
  assert_eq!(fs::read_to_string(&source).unwrap(), "int a = 1;");

  fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn success_writes_asm_and_dumps_tokens() {
  let dir = scratch_dir("ok");
  let source = dir.join("prog.cpp");
  fs::write(&source, "int a = 1;\ncout << a;\n").unwrap();

  let output = coutc(&[source.as_os_str(), "--tokens".as_ref()]);
  assert_eq!(output.status.code(), Some(0));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("cout :: keyword 'cout' :: LINE 2"));
  assert!(fs::read_to_string(dir.join("prog.asm")).unwrap().contains("call printf"));

  fs::remove_dir_all(&dir).unwrap();
}
