//! Child-process runner for the compiler adapters.
//!
//! Every invocation spawns a fresh process, consumes stdout and stderr to
//! completion and enforces a deadline. Stdin is never used.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use hdlint_log::log_dbg;

/// Combined output of one tool invocation.
#[derive(Debug, Default)]
pub struct CommandOutput {
  /// stdout followed by stderr, split into lines.
  pub lines: Vec<String>,
  /// The process ran past its deadline and was terminated.
  pub timed_out: bool,
  /// Exit status, `None` when the process was killed.
  pub exit_code: Option<i32>,
}

/// Runs `argv` and captures its output. A nonzero exit is not an error;
/// compilers routinely fail while still printing useful diagnostics.
pub fn run_command(
  argv: &[String],
  cwd: Option<&Path>,
  timeout: Duration,
) -> std::io::Result<CommandOutput> {
  let (program, args) = argv.split_first().ok_or_else(|| {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
  })?;

  log_dbg!("Running: {}", argv.join(" "));

  let mut command = Command::new(program);
  command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
  if let Some(cwd) = cwd {
    command.current_dir(cwd);
  }

  let mut child = command.spawn()?;

  // Drain both pipes on their own threads so a chatty tool can't fill one
  // buffer and deadlock against our wait.
  let stdout = child.stdout.take();
  let stderr = child.stderr.take();
  let stdout_reader = std::thread::spawn(move || read_all(stdout));
  let stderr_reader = std::thread::spawn(move || read_all(stderr));

  let status = child.wait_timeout(timeout)?;
  let timed_out = status.is_none();
  if timed_out {
    // Best-effort termination; don't block the engine on a stuck tool.
    let _ = child.kill();
    let _ = child.wait();
  }

  let mut lines = Vec::new();
  for text in [stdout_reader.join().unwrap_or_default(), stderr_reader.join().unwrap_or_default()] {
    lines.extend(text.lines().map(str::to_string));
  }

  Ok(CommandOutput {
    lines,
    timed_out,
    exit_code: status.and_then(|s| s.code()),
  })
}

fn read_all<R: Read>(source: Option<R>) -> String {
  let mut text = String::new();
  if let Some(mut source) = source {
    let mut bytes = Vec::new();
    if source.read_to_end(&mut bytes).is_ok() {
      text = String::from_utf8_lossy(&bytes).into_owned();
    }
  }
  text
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn captures_stdout_and_exit_code() {
    let output = run_command(&args(&["echo", "hello"]), None, Duration::from_secs(5)).unwrap();
    assert_eq!(output.lines, vec!["hello"]);
    assert_eq!(output.exit_code, Some(0));
    assert!(!output.timed_out);
  }

  #[test]
  fn nonzero_exit_is_not_an_error() {
    let output = run_command(&args(&["sh", "-c", "echo oops >&2; exit 3"]), None, Duration::from_secs(5)).unwrap();
    assert_eq!(output.exit_code, Some(3));
    assert!(output.lines.contains(&"oops".to_string()));
  }

  #[test]
  fn missing_binary_is_an_error() {
    assert!(run_command(&args(&["definitely-not-a-real-tool"]), None, Duration::from_secs(5)).is_err());
  }

  #[test]
  fn deadline_terminates_the_child() {
    let output = run_command(&args(&["sleep", "30"]), None, Duration::from_millis(200)).unwrap();
    assert!(output.timed_out);
    assert_eq!(output.exit_code, None);
  }
}
