//! Runs one encoder invocation and drives its stderr through the pipeline.

use std::{
  ffi::OsStr,
  io::{self, BufReader, Write},
  sync::atomic::{AtomicBool, Ordering},
  time::{Duration, Instant},
};

use anyhow::{bail, Context};
use log::{debug, warn};

use crate::{
  child::EncodeChild,
  classifier::Classifier,
  command::EncodeCommand,
  event::Phase,
  line_splitter::LineSplitter,
  pipeline::Pipeline,
  terminal::Console,
  timecode::seconds_to_timecode,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
  /// Echo stderr unmodified instead of rendering it
  pub passthrough: bool,
  /// Keep classified errors in the transcript and skip the bell
  pub batch_mode: bool,
  pub mute: bool,
}

#[derive(Debug, Clone)]
pub struct EncodeOutcome {
  /// The encoder exited with status zero
  pub success: bool,
  pub interrupted: bool,
  pub transcript: Vec<String>,
  /// Wall-clock time from spawn to exit
  pub elapsed: Duration,
}

/// Spawn the encoder with `args` and render its stderr to `console` until it
/// exits.
///
/// `cancel` is only read, never reset. It decides whether the final summary
/// reports completion or an interruption.
///
/// The encoder is always waited for before this returns. When the console
/// stops accepting output, stderr is still drained so the encode can finish;
/// the write error is returned afterwards.
pub fn encode<S, W>(
  exe: S,
  args: &[String],
  classifier: &Classifier,
  console: &mut Console<W>,
  cancel: &AtomicBool,
  options: &EncodeOptions,
) -> anyhow::Result<EncodeOutcome>
where
  S: AsRef<OsStr>,
  W: Write,
{
  let mut command = EncodeCommand::new_with_exe(exe.as_ref());
  command.args(args);
  if !options.passthrough {
    console.print(&command.display())?;
  }

  let started_at = Instant::now();
  let mut child = command
    .spawn()
    .with_context(|| format!("Failed to start {}", exe.as_ref().to_string_lossy()))?;
  let Some(stderr) = child.take_stderr() else {
    reap(&mut child);
    bail!("Encoder stderr was not captured");
  };

  let mut write_error: Option<io::Error> = None;
  if !options.passthrough {
    attempt(&mut write_error, || console.hide_cursor());
  }

  let mut pipeline =
    Pipeline::new(classifier, started_at, options.passthrough, options.batch_mode);
  for line in LineSplitter::new(BufReader::new(stderr)) {
    let line = match line {
      Ok(line) => line,
      Err(e) => {
        warn!("Error reading encoder output: {}", e);
        break;
      }
    };
    let rendered = pipeline.feed(&line, Instant::now(), cancel.load(Ordering::SeqCst));
    attempt(&mut write_error, || console.print(&rendered));
  }

  // Dropping the reader above closes our end of the pipe, so a child still
  // writing gets EPIPE instead of blocking forever.
  let status = child.wait().context("Failed to wait for the encoder")?;
  let elapsed = started_at.elapsed();
  let session = pipeline.into_session();
  debug!("Encoder exited with {} in phase {:?}", status, session.phase());

  if !options.passthrough {
    if session.in_place() {
      attempt(&mut write_error, || console.print("\n"));
    }
    if !status.success() && session.phase() != Phase::Interrupted {
      let failed = format!(
        "\x1b[31;1mFailed\x1b[0m ({}) et={}\n",
        status,
        seconds_to_timecode(elapsed.as_secs_f64())
      );
      attempt(&mut write_error, || console.print(&failed));
    }
    attempt(&mut write_error, || console.show_cursor());
  }

  let finished = session.phase() == Phase::Finished;
  let interrupted = session.phase() == Phase::Interrupted;
  if finished && !options.batch_mode {
    attempt(&mut write_error, || console.bell(options.mute));
  }

  if let Some(e) = write_error {
    return Err(anyhow::Error::new(e).context("Failed to write to the console"));
  }

  Ok(EncodeOutcome {
    success: status.success(),
    interrupted,
    transcript: session.into_transcript(),
    elapsed,
  })
}

/// Run a console write unless an earlier one already failed, remembering the
/// first failure.
fn attempt<F>(write_error: &mut Option<io::Error>, write: F)
where
  F: FnOnce() -> io::Result<()>,
{
  if write_error.is_some() {
    return;
  }
  if let Err(e) = write() {
    warn!("Console write failed, waiting for the encoder: {}", e);
    *write_error = Some(e);
  }
}

/// Kill and wait for a child that will not be read from.
fn reap(child: &mut EncodeChild) {
  if let Err(e) = child.kill().and_then(|_| child.wait().map(|_| ())) {
    warn!("Failed to stop the encoder: {}", e);
  }
}

/// Run `command` to completion and collect its stderr lines without
/// rendering anything. Used to read durations and crop reports.
///
/// The exit status is ignored: `ffmpeg -i <file>` without an output always
/// fails, yet prints the information we are after.
pub fn capture_stderr(command: &mut EncodeCommand) -> anyhow::Result<Vec<String>> {
  command.null_stdout();
  debug!("Capturing stderr of {:?}", command);

  let program = command.get_program().to_string_lossy().into_owned();
  let mut child = command.spawn().with_context(|| format!("Failed to start {}", program))?;
  let Some(stderr) = child.take_stderr() else {
    reap(&mut child);
    bail!("Encoder stderr was not captured");
  };
  let lines = LineSplitter::new(BufReader::new(stderr)).collect::<io::Result<Vec<String>>>();
  if lines.is_err() {
    reap(&mut child);
  } else {
    child.wait().context("Failed to wait for the encoder")?;
  }
  lines.context("Failed to read encoder output")
}
