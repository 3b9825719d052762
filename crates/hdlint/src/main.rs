mod cli;

use std::time::Duration;

use clap::Parser;

use cli::Cli;
use hdlint_log::{log_err, log_warn, LogLevel};

fn main() {
  let cli = Cli::parse();

  match LogLevel::parse(&cli.log_level) {
    Some(level) => hdlint_log::set_level(level),
    None => {
      eprintln!("Unknown log level '{}'", cli.log_level);
      std::process::exit(1);
    },
  }
  // --stderr is an alias kept for older editor plugins; --log-stream wins
  // when both are given.
  if let Some(stream) = cli.log_stream.clone().or(cli.stderr.clone()) {
    hdlint_log::set_stream(stream);
  }

  if cli.stdout.is_some() {
    log_warn!("--stdout only applies to HTTP mode and has no effect here");
  }

  if let Some(pid) = cli.attach_to_pid {
    watch_pid(pid);
  }

  if cli.lsp {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
      Ok(runtime) => runtime,
      Err(error) => {
        log_err!("Could not start the async runtime: {}", error);
        std::process::exit(1);
      },
    };
    runtime.block_on(hdlint_lsp::run());
    return;
  }

  if cli.host.is_some() || cli.port.is_some() {
    eprintln!("HTTP mode is not available in this build; use --lsp");
    std::process::exit(1);
  }

  eprintln!("Nothing to do: pass --lsp to run the language server");
  std::process::exit(1);
}

/// Exits the process once `pid` is gone, so an orphaned server does not
/// outlive its editor.
fn watch_pid(pid: u32) {
  std::thread::spawn(move || loop {
    if !pid_alive(pid) {
      log_warn!("Watched pid {} is gone, shutting down", pid);
      std::process::exit(0);
    }
    std::thread::sleep(Duration::from_secs(2));
  });
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
  std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
  true
}
