//! Stretches the second input's audio so its duration matches the first.

use std::{ffi::OsStr, io::Write, path::Path, sync::atomic::AtomicBool};

use anyhow::bail;
use log::info;

use crate::{
  args::inputs,
  classifier::{try_parse_duration, Classifier},
  command::EncodeCommand,
  encode::{capture_stderr, encode, EncodeOptions, EncodeOutcome},
  event::FfmpegDuration,
  terminal::Console,
  timecode::round,
};

const SAMPLE_RATE: i64 = 48000;

/// Resampling rate that makes audio of length `d2` play for `d1` seconds.
///
/// ```rust
/// use ffline::audio_sync::sync_rate;
/// assert_eq!(sync_rate(100.0, 100.0), Some(48000));
/// assert_eq!(sync_rate(100.0, 104.2), Some(50016));
/// assert_eq!(sync_rate(0.0, 10.0), None);
/// ```
pub fn sync_rate(d1: f64, d2: f64) -> Option<i64> {
  if d1 <= 0.0 {
    return None;
  }
  Some(round(SAMPLE_RATE as f64 * d2 / d1))
}

/// `dir/track.wav` -> `dir/track_SYNC.flac`
pub fn sync_output_name(input: &str) -> String {
  let stem = Path::new(input).with_extension("");
  format!("{}_SYNC.flac", stem.to_string_lossy())
}

pub fn sync_args(input: &str, rate: i64) -> Vec<String> {
  [
    "-hide_banner",
    "-i",
    input,
    "-af",
    &format!("asetrate={},aresample={}", rate, SAMPLE_RATE),
    "-vn",
    "-acodec",
    "flac",
    "-compression_level",
    "0",
    "-map_metadata",
    "-1",
    "-map_chapters",
    "-1",
    &sync_output_name(input),
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

/// Known durations reported while opening `inputs`, in order.
pub fn read_durations<S>(exe: S, inputs: &[&str]) -> anyhow::Result<Vec<FfmpegDuration>>
where
  S: AsRef<OsStr>,
{
  let mut command = EncodeCommand::new_with_exe(exe);
  command.hide_banner();
  for input in inputs {
    command.input(input);
  }
  let lines = capture_stderr(&mut command)?;
  Ok(
    lines
      .iter()
      .filter_map(|line| try_parse_duration(line))
      .filter(|duration| duration.seconds.is_some())
      .collect(),
  )
}

/// Resample the second input of `args` to the duration of the first.
///
/// Returns `None` when the durations already match and nothing was encoded.
pub fn audio_sync<S, W>(
  exe: S,
  args: &[String],
  classifier: &Classifier,
  console: &mut Console<W>,
  cancel: &AtomicBool,
  options: &EncodeOptions,
) -> anyhow::Result<Option<EncodeOutcome>>
where
  S: AsRef<OsStr>,
  W: Write,
{
  let found: Vec<&str> = inputs(args).take(2).collect();
  let [input1, input2] = found[..] else {
    bail!("sync mode requires two input files");
  };

  let durations = read_durations(exe.as_ref(), &[input1, input2])?;
  let (Some(d1), Some(d2)) = (durations.first(), durations.get(1)) else {
    bail!("cannot determine durations for input files");
  };
  let (Some(s1), Some(s2)) = (d1.seconds, d2.seconds) else {
    bail!("cannot determine durations for input files");
  };
  let Some(rate) = sync_rate(s1, s2) else {
    bail!("{} has zero duration", input1);
  };

  if rate == SAMPLE_RATE {
    console.print(&format!("\x1b[32m{}\x1b[0m {}\n", input1, d1.text))?;
    console.print(&format!("\x1b[32m{}\x1b[0m {}\n", input2, d2.text))?;
    console.print("\x1b[32;1mAudioSync is not needed.\x1b[0m\n")?;
    return Ok(None);
  }

  info!("Resampling {} at {} Hz", input2, rate);
  let outcome = encode(
    exe,
    &sync_args(input2, rate),
    classifier,
    console,
    cancel,
    options,
  )?;
  Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_output_name() {
    assert_eq!(sync_output_name("dir/track.wav"), "dir/track_SYNC.flac");
    assert_eq!(sync_output_name("track"), "track_SYNC.flac");
  }

  #[test]
  fn test_sync_args() {
    let args = sync_args("a.ac3", 47952);
    assert_eq!(args[2], "a.ac3");
    assert_eq!(args[4], "asetrate=47952,aresample=48000");
    assert_eq!(args.last().unwrap(), "a_SYNC.flac");
  }

  #[cfg(unix)]
  #[test]
  fn test_requires_two_inputs() {
    use crate::patterns::Patterns;

    let classifier = Classifier::new(Patterns::new().unwrap());
    let mut console = Console::new(Vec::new(), false);
    let args: Vec<String> = vec!["-i".into(), "a.mkv".into()];
    let err = audio_sync(
      "sh",
      &args,
      &classifier,
      &mut console,
      &AtomicBool::new(false),
      &EncodeOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("two input files"));
  }
}
