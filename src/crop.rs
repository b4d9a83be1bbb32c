//! Crop detection: sample the input at evenly spaced points with FFmpeg's
//! `cropdetect` filter and report the widest region found at each.

use std::{ffi::OsStr, io::Write};

use anyhow::{bail, Context};
use log::debug;
use regex::Regex;

use crate::{
  classifier::try_parse_duration,
  command::EncodeCommand,
  encode::capture_stderr,
  error::{Error, Result},
  terminal::Console,
  timecode::{round, seconds_to_timecode},
};

/// Seconds of video analysed at each sample point.
const SAMPLE_SECONDS: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
  pub samples: u32,
  pub limit: f64,
}

impl Default for CropSettings {
  fn default() -> Self {
    Self {
      samples: 5,
      limit: 0.10625,
    }
  }
}

impl CropSettings {
  /// Parse the `crop`, `crop[V]` and `crop[N:L]` keyword. `None` when `word`
  /// is not a crop keyword at all.
  ///
  /// A single value below 1 is the limit, anything else the sample count.
  ///
  /// ```rust
  /// use ffline::{crop::CropSettings, patterns::Patterns};
  /// let pattern = Patterns::new().unwrap().crop_mode;
  /// let settings = CropSettings::parse("crop[0.2]", &pattern).unwrap().unwrap();
  /// assert_eq!((settings.samples, settings.limit), (5, 0.2));
  /// let settings = CropSettings::parse("crop[8:0.1]", &pattern).unwrap().unwrap();
  /// assert_eq!((settings.samples, settings.limit), (8, 0.1));
  /// assert!(CropSettings::parse("cropped.mkv", &pattern).is_none());
  /// ```
  pub fn parse(word: &str, pattern: &Regex) -> Option<Result<Self>> {
    let values = pattern.captures(word)?.get(1).map_or("", |m| m.as_str());
    Some(Self::from_values(values))
  }

  fn from_values(values: &str) -> Result<Self> {
    let mut settings = Self::default();
    if values.is_empty() {
      return Ok(settings);
    }
    let invalid =
      |e: &dyn std::fmt::Display| Error::msg(format!("Invalid crop values '{}': {}", values, e));

    match values.split_once(':') {
      None => {
        let value = values.parse::<f64>().map_err(|e| invalid(&e))?;
        match value < 1.0 {
          true => settings.limit = value,
          false => settings.samples = round(value).max(1) as u32,
        }
      }
      Some((samples, limit)) => {
        settings.samples = samples.parse::<u32>().map_err(|e| invalid(&e))?;
        settings.limit = limit.parse::<f64>().map_err(|e| invalid(&e))?;
      }
    }
    Ok(settings)
  }

  /// `cropdetect` filter parameters: `limit:round:reset`.
  pub fn filter_params(&self) -> String {
    format!("{}:2:0", self.limit)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
  pub w: u32,
  pub h: u32,
  pub x: u32,
  pub y: u32,
}

/// Every `crop=w:h:x:y` reported in `lines`.
pub fn parse_crop_reports(lines: &[String], pattern: &Regex) -> Vec<CropRect> {
  lines
    .iter()
    .flat_map(|line| pattern.captures_iter(line))
    .filter_map(|caps| {
      let n = |i: usize| caps[i].parse::<u32>().ok();
      Some(CropRect {
        w: n(1)?,
        h: n(2)?,
        x: n(3)?,
        y: n(4)?,
      })
    })
    .collect()
}

/// The first rectangle, replaced by any later one that is wider or taller.
pub fn pick_largest(rects: &[CropRect]) -> Option<CropRect> {
  let mut best = *rects.first()?;
  for rect in rects {
    if rect.w > best.w || rect.h > best.h {
      best = *rect;
    }
  }
  Some(best)
}

/// `samples` points evenly spaced inside `duration`, excluding both ends.
pub fn sample_points(duration: f64, samples: u32) -> Vec<f64> {
  (1..=samples)
    .map(|i| duration * i as f64 / (samples as f64 + 1.0))
    .collect()
}

/// The first known `Duration:` in the encoder's stderr.
pub fn read_duration<S: AsRef<OsStr>>(exe: S, input: &str) -> anyhow::Result<f64> {
  let lines = capture_stderr(EncodeCommand::new_with_exe(exe).hide_banner().input(input))?;
  lines
    .iter()
    .filter_map(|line| try_parse_duration(line))
    .find_map(|duration| duration.seconds)
    .with_context(|| format!("Cannot determine the duration of {}", input))
}

/// Run crop detection on `input` and print one line per sample point.
pub fn detect<S, W>(
  exe: S,
  input: &str,
  settings: &CropSettings,
  pattern: &Regex,
  console: &mut Console<W>,
) -> anyhow::Result<Vec<(f64, CropRect)>>
where
  S: AsRef<OsStr>,
  W: Write,
{
  let duration = read_duration(exe.as_ref(), input)?;
  let params = settings.filter_params();
  console.print(&format!("\x1b[32;1m{}\x1b[0m\n", input))?;
  console.print(&format!(
    "\x1b[30;1mRunning cropdetect {} times, with the following parameters {}\x1b[0m\n",
    settings.samples, params
  ))?;

  let mut found = Vec::new();
  for at in sample_points(duration, settings.samples) {
    let mut command = EncodeCommand::new_with_exe(exe.as_ref());
    command
      .hide_banner()
      .seek(at.to_string())
      .input(input)
      .arg("-vf")
      .arg(format!("cropdetect={}", params))
      .duration(SAMPLE_SECONDS)
      .args(["-an", "-f", "null", "-"]);
    let lines = capture_stderr(&mut command)?;
    let reports = parse_crop_reports(&lines, pattern);
    debug!("{} cropdetect report(s) at {:.3}s", reports.len(), at);

    let Some(rect) = pick_largest(&reports) else {
      bail!("cropdetect reported nothing at {}", seconds_to_timecode(at));
    };
    console.print(&format!(
      "\x1b[30;1m{} crop=\x1b[0m{}\x1b[30;1m:\x1b[0m{}\x1b[30;1m:\x1b[0m{}\x1b[30;1m:\x1b[0m{}\n",
      seconds_to_timecode(at),
      rect.w,
      rect.h,
      rect.x,
      rect.y
    ))?;
    found.push((at, rect));
  }
  Ok(found)
}
