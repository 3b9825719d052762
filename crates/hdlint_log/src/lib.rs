//! Logging utilities for hdlint.
//!
//! Provides level-gated macros (`log_err!`, `log_warn!`, `log_info!`,
//! `log_dbg!`). Output goes to stderr by default to avoid mixing with the
//! LSP transport on stdout; `--log-stream FILE` redirects it to a file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Verbosity levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
  Error,
  Warning,
  Info,
  Debug,
}

impl LogLevel {
  pub fn parse(value: &str) -> Option<LogLevel> {
    match value.to_ascii_lowercase().as_str() {
      "error" => Some(LogLevel::Error),
      "warning" | "warn" => Some(LogLevel::Warning),
      "info" => Some(LogLevel::Info),
      "debug" => Some(LogLevel::Debug),
      _ => None,
    }
  }

  pub fn tag(self) -> &'static str {
    match self {
      LogLevel::Error => "error",
      LogLevel::Warning => "warning",
      LogLevel::Info => "info",
      LogLevel::Debug => "debug",
    }
  }
}

struct Sink {
  level: LogLevel,
  stream: Option<PathBuf>,
}

static SINK: Lazy<Mutex<Sink>> = Lazy::new(|| {
  Mutex::new(Sink {
    level: LogLevel::Warning,
    stream: None,
  })
});

/// Sets the process-wide log level.
pub fn set_level(level: LogLevel) {
  if let Ok(mut sink) = SINK.lock() {
    sink.level = level;
  }
}

/// Redirects log output from stderr into `path` (appending).
pub fn set_stream(path: PathBuf) {
  if let Ok(mut sink) = SINK.lock() {
    sink.stream = Some(path);
  }
}

pub fn enabled(level: LogLevel) -> bool {
  SINK.lock().map(|sink| level <= sink.level).unwrap_or(false)
}

/// Writes one formatted record. Use the macros instead of calling this
/// directly.
pub fn write_record(
  level: LogLevel,
  message: std::fmt::Arguments<'_>,
) {
  use colored::Colorize;

  let Ok(sink) = SINK.lock() else {
    return;
  };
  if level > sink.level {
    return;
  }

  match &sink.stream {
    Some(path) => {
      if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}: {}", level.tag(), message);
      }
    },
    None => {
      let tag = match level {
        LogLevel::Error => level.tag().red().bold(),
        LogLevel::Warning => level.tag().yellow().bold(),
        LogLevel::Info => level.tag().cyan(),
        LogLevel::Debug => level.tag().dimmed(),
      };
      eprintln!("{}: {}", tag, message);
    },
  }
}

#[macro_export]
macro_rules! log_err {
  ($fmt:literal $(, $arg:expr)* $(,)?) => {
    $crate::write_record($crate::LogLevel::Error, format_args!($fmt $(, $arg)*))
  };
}

#[macro_export]
macro_rules! log_warn {
  ($fmt:literal $(, $arg:expr)* $(,)?) => {
    $crate::write_record($crate::LogLevel::Warning, format_args!($fmt $(, $arg)*))
  };
}

#[macro_export]
macro_rules! log_info {
  ($fmt:literal $(, $arg:expr)* $(,)?) => {
    $crate::write_record($crate::LogLevel::Info, format_args!($fmt $(, $arg)*))
  };
}

#[macro_export]
macro_rules! log_dbg {
  ($fmt:literal $(, $arg:expr)* $(,)?) => {
    $crate::write_record($crate::LogLevel::Debug, format_args!($fmt $(, $arg)*))
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_accepts_known_levels() {
    assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
    assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warning));
    assert_eq!(LogLevel::parse("nope"), None);
  }

  #[test]
  fn level_ordering_gates_output() {
    assert!(LogLevel::Error < LogLevel::Debug);
    set_level(LogLevel::Info);
    assert!(enabled(LogLevel::Warning));
    assert!(!enabled(LogLevel::Debug));
  }
}
