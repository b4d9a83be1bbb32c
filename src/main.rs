use std::{
  process::exit,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use clap::Parser;
use env_logger::Env;
use ffline::cli::{run, Cli};
use log::warn;

fn main() {
  env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

  // The encoder shares our process group and receives the same Ctrl+C, so it
  // is left to wind down on its own.
  let cancel = Arc::new(AtomicBool::new(false));
  let flag = Arc::clone(&cancel);
  if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
    warn!("Failed to install the interrupt handler: {}", e);
  }

  let code = match run(Cli::parse(), &cancel) {
    Ok(code) => code,
    Err(e) => {
      eprintln!("\x1b[31;1mError:\x1b[0m {:#}", e);
      1
    }
  };
  exit(code);
}
