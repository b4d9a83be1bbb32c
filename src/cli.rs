//! The `ffline` command line: mode keywords, preset expansion, and dispatch to
//! a single encode, a batch, crop detection or audio sync.

use std::{env, io::Write, path::{Path, PathBuf}, sync::atomic::AtomicBool};

use anyhow::{bail, Context};
use clap::Parser;
use log::{debug, warn};

use crate::{
  args::{expand_filter_args, first_input, substitute_filenames},
  audio_sync::audio_sync,
  batch::{expand_inputs, run_batch, BatchReport},
  classifier::Classifier,
  crop::{self, CropSettings},
  encode::{encode, EncodeOptions},
  logfile::{LogLocation, LogWriter},
  options::{parse_modes, Modes},
  paths::ffmpeg_path,
  patterns::Patterns,
  presets::Presets,
  terminal::Console,
  version::version_report,
};

#[derive(Parser, Debug)]
#[command(
  name = "ffline",
  about = "Run FFmpeg with a compact single-line progress display",
  disable_help_flag = true,
  disable_version_flag = true
)]
pub struct Cli {
  /// FFmpeg binary to run instead of the one found next to ffline or on PATH
  #[arg(long, env = "FFLINE_FFMPEG", value_name = "PATH")]
  pub ffmpeg: Option<PathBuf>,

  /// Mode keywords followed by FFmpeg arguments
  #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
  pub args: Vec<String>,
}

/// Usage text with the preset table appended.
pub fn help_text(presets: &Presets) -> String {
  format!(
    "\x1b[32;1mffline\x1b[0m [--ffmpeg PATH] [MODES...] FFMPEG_ARGS...\n\
     \n\
     Modes:\n    \
     ffmpeg        show FFmpeg's own output unmodified\n    \
     nologs        do not write <input>.#err files\n    \
     cwdlogs       write .#err files to the current directory\n    \
     mute          no bell when an encode finishes\n    \
     sync          resample the 2nd input's audio to the 1st input's duration\n    \
     crop[N:L]     detect crop borders at N points with limit L\n    \
     version       show versions\n\
     \n\
     Batch inputs: -i list:\"a.mkv b.mkv\", -i \"*.mkv\", -i inputs.txt\n\
     Output names: [prefix?]old::new builds a name from the first input\n\
     \n\
     Presets:\n{}",
    presets.help_table()
  )
}

fn log_location(modes: &Modes) -> anyhow::Result<LogLocation> {
  Ok(match (modes.nologs, modes.cwdlogs) {
    (true, _) => LogLocation::Disabled,
    (false, true) => LogLocation::Directory(env::current_dir().context("No current directory")?),
    (false, false) => LogLocation::NextToInput,
  })
}

/// Run the command line and return the process exit code.
pub fn run(cli: Cli, cancel: &AtomicBool) -> anyhow::Result<i32> {
  let exe = cli.ffmpeg.unwrap_or_else(ffmpeg_path);
  debug!("Using encoder {}", exe.display());
  let presets = Presets::default();
  let classifier = Classifier::new(Patterns::new().context("Failed to compile patterns")?);
  let mut console = Console::stderr();

  if cli.args.is_empty() {
    console.print(&help_text(&presets))?;
    return Ok(0);
  }

  let (modes, rest) = parse_modes(&cli.args, &classifier.patterns().crop_mode)?;
  if modes.version {
    console.print(&version_report(&exe))?;
    return Ok(0);
  }

  let args = expand_filter_args(&presets.expand_all(&rest), &classifier.patterns().filter_range);
  let Some(input) = first_input(&args).map(str::to_string) else {
    bail!("No input file given (-i)");
  };
  let batch = expand_inputs(&input, &args)?;

  if let Some(settings) = modes.crop {
    let inputs = batch.unwrap_or_else(|| vec![input]);
    return run_crop(&exe, &inputs, &settings, &classifier, &mut console);
  }

  let options = EncodeOptions {
    passthrough: modes.passthrough,
    batch_mode: batch.is_some(),
    mute: modes.mute,
  };
  let logs = LogWriter::new(log_location(&modes)?);
  // batch inputs substitute per input, from the untouched template
  let single_args = substitute_filenames(&args);

  if modes.sync {
    let synced = audio_sync(&exe, &single_args, &classifier, &mut console, cancel, &options)?;
    let Some(outcome) = synced else {
      return Ok(0);
    };
    write_log(&logs, &input, &outcome.transcript);
    return Ok(if outcome.success { 0 } else { 1 });
  }

  match batch {
    None => {
      let outcome = encode(&exe, &single_args, &classifier, &mut console, cancel, &options)?;
      write_log(&logs, &input, &outcome.transcript);
      Ok(if outcome.success { 0 } else { 1 })
    }
    Some(inputs) => {
      if inputs.is_empty() {
        bail!("No files match {}", input);
      }
      let report = run_batch(&inputs, &args, cancel, |input, args| {
        let outcome = encode(&exe, args, &classifier, &mut console, cancel, &options)?;
        write_log(&logs, input, &outcome.transcript);
        Ok(outcome)
      });
      print_report(&report, &mut console, modes.mute)?;
      Ok(if report.failed() { 1 } else { 0 })
    }
  }
}

fn write_log(logs: &LogWriter, input: &str, transcript: &[String]) {
  match logs.write(input, transcript) {
    Ok(Some(path)) => debug!("Errors logged to {}", path.display()),
    Ok(None) => {}
    Err(e) => warn!("Failed to write the log for {}: {}", input, e),
  }
}

fn print_report<W: Write>(
  report: &BatchReport,
  console: &mut Console<W>,
  mute: bool,
) -> anyhow::Result<()> {
  console.print(&report.summary())?;
  console.bell(mute)?;
  Ok(())
}

fn run_crop<W: Write>(
  exe: &Path,
  inputs: &[String],
  settings: &CropSettings,
  classifier: &Classifier,
  console: &mut Console<W>,
) -> anyhow::Result<i32> {
  let mut code = 0;
  for input in inputs {
    if let Err(e) = crop::detect(exe, input, settings, &classifier.patterns().crop, console) {
      console.print(&format!("\x1b[31;1m{:#}\x1b[0m\n", e))?;
      code = 1;
    }
  }
  Ok(code)
}
