use std::path::PathBuf;

use clap::Parser;

/// Language-server front end for HDL projects.
#[derive(Parser, Debug, Clone)]
#[command(name = "hdlint", version, about)]
pub struct Cli {
  /// Run as a language server over stdio
  #[arg(long)]
  pub lsp: bool,

  /// Address to bind in HTTP mode
  #[arg(long)]
  pub host: Option<String>,

  /// Port to bind in HTTP mode
  #[arg(long)]
  pub port: Option<u16>,

  /// Exit when the given process dies
  #[arg(long = "attach-to-pid")]
  pub attach_to_pid: Option<u32>,

  /// Logging verbosity: error, warning, info or debug
  #[arg(long = "log-level", default_value = "warning")]
  pub log_level: String,

  /// Write log records to this file instead of stderr
  #[arg(long = "log-stream")]
  pub log_stream: Option<PathBuf>,

  /// File that receives a copy of server stdout chatter
  #[arg(long)]
  pub stdout: Option<PathBuf>,

  /// File that receives a copy of server stderr chatter
  #[arg(long)]
  pub stderr: Option<PathBuf>,
}
