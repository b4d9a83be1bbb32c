//! The catalogue of FFmpeg stderr patterns, compiled once and shared by the
//! classifier and the helper workflows.
//!
//! Error and warning phrases are plain data. FFmpeg's wording shifts between
//! releases, so callers can swap in their own lists with
//! [`Patterns::with_catalogues`].

use regex::Regex;

use crate::error::Result;

/// Substrings that mark a line as an error. Order is irrelevant inside the
/// catalogue; the catalogue as a whole is matched after the structured headers
/// and before warnings and progress.
pub const DEFAULT_ERROR_PHRASES: &[&str] = &[
  "No such file",
  "Invalid data",
  "At least one output file must be specified",
  "Unrecognized option",
  "Option not found",
  "matches no streams",
  "not supported",
  "Invalid argument",
  "Permission denied",
  "Unknown encoder",
  "Unknown decoder",
  "No such filter",
  "does not contain",
  "not exist",
  "-vf/-af/-filter",
  "Not overwriting - exiting",
  "[y/N]",
  "mismatch",
  "incompatible",
  "Error",
  "error",
];

/// Substrings that mark a line as a warning.
pub const DEFAULT_WARNING_PHRASES: &[&str] = &[
  "Warning:",
  "warning:",
  "too large",
  "bitrate is too low",
  "Estimating duration from bitrate",
  "Non-monotonous DTS",
  "non monotonically increasing dts",
  "deprecated pixel format used",
  "Guessed Channel Layout",
  "fontselect:",
  "Glyph 0x",
];

/// Lines that carry no information for the reader and are never shown.
pub const SUPPRESSIBLE_PHRASES: &[&str] = &[
  "Press [q] to stop",
  "Last message repeated",
  "Enter command: ",
];

pub struct Patterns {
  pub mapping_header: Regex,
  pub errors: Regex,
  pub warnings: Regex,
  pub suppressible: Regex,
  pub finished: Regex,
  /// ` @ 0x55d5c0a1b2c0` inside a `[context @ address]` log prefix
  pub context_address: Regex,
  /// `crop=w:h:x:y` as reported by the `cropdetect` filter
  pub crop: Regex,
  /// The `crop`, `crop[N]`, `crop[N:L]` mode keyword
  pub crop_mode: Regex,
  /// `[a-b:t]`, `[i:t1-t2]` and `[a-b:t1-t2]` input labels in a filter graph
  pub filter_range: Regex,
}

impl Patterns {
  pub fn new() -> Result<Self> {
    Self::with_catalogues(DEFAULT_ERROR_PHRASES, DEFAULT_WARNING_PHRASES)
  }

  pub fn with_catalogues(error_phrases: &[&str], warning_phrases: &[&str]) -> Result<Self> {
    Ok(Self {
      mapping_header: Regex::new(r"^\s*Stream mapping:")?,
      errors: phrase_regex(error_phrases)?,
      warnings: phrase_regex(warning_phrases)?,
      suppressible: phrase_regex(SUPPRESSIBLE_PHRASES)?,
      finished: Regex::new(r"video:.*audio:.*subtitle:.*other streams:.*global headers:")?,
      context_address: Regex::new(r" @ 0x[0-9a-fA-F]+")?,
      crop: Regex::new(r"crop=(\d+):(\d+):(\d+):(\d+)")?,
      crop_mode: Regex::new(r"^crop\[?([0-9.:]*)\]?$")?,
      filter_range: Regex::new(r"\[(\d+)(?:-(\d+))?:(\d+)(?:-(\d+))?\]")?,
    })
  }
}

/// Compile a list of literal phrases into one alternation.
/// An empty list yields a pattern that never matches.
fn phrase_regex(phrases: &[&str]) -> Result<Regex> {
  if phrases.is_empty() {
    return Ok(Regex::new(r"\b\B")?);
  }
  let alternation = phrases
    .iter()
    .map(|p| regex::escape(p))
    .collect::<Vec<String>>()
    .join("|");
  Ok(Regex::new(&alternation)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_phrases_are_literal() {
    let patterns = Patterns::new().unwrap();
    // `[y/N]` and `-vf/-af/-filter` contain regex metacharacters
    assert!(patterns.errors.is_match("Overwrite? [y/N] "));
    assert!(!patterns.errors.is_match("Overwrite? y"));
    assert!(patterns.errors.is_match("Use -vf/-af/-filter instead"));
  }

  #[test]
  fn test_empty_catalogue_never_matches() {
    let patterns = Patterns::with_catalogues(&[], &[]).unwrap();
    assert!(!patterns.errors.is_match("Error while opening encoder"));
    assert!(!patterns.warnings.is_match("Warning: something"));
    assert!(!patterns.errors.is_match(""));
  }

  #[test]
  fn test_finished_marker() {
    let patterns = Patterns::new().unwrap();
    assert!(patterns.finished.is_match(
      "[out#0/mp4 @ 0x5581] video:1024KiB audio:256KiB subtitle:0KiB other streams:0KiB \
       global headers:0KiB muxing overhead: 0.5%"
    ));
    assert!(patterns
      .finished
      .is_match("video:1kB audio:2kB subtitle:0kB other streams:0kB global headers:0kB"));
  }
}
