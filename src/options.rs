//! Mode keywords accepted in front of the encoder arguments.

use regex::Regex;

use crate::{crop::CropSettings, error::Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modes {
  /// `ffmpeg`: echo the encoder's stderr unmodified
  pub passthrough: bool,
  /// `nologs`: never write `.#err` files
  pub nologs: bool,
  /// `cwdlogs`: write `.#err` files to the working directory
  pub cwdlogs: bool,
  /// `mute`: no bell when an encode finishes
  pub mute: bool,
  /// `sync`: resample the second input to the first one's duration
  pub sync: bool,
  /// `crop`, `crop[N]`, `crop[N:L]`: detect crop borders instead of encoding
  pub crop: Option<CropSettings>,
  /// `version`: report versions and exit
  pub version: bool,
}

/// Consume mode keywords from the front of `args` and return them along with
/// the remaining arguments. Parsing stops at the first word that is not a
/// keyword, so an output file named `mute` further along is left alone.
///
/// ```rust
/// use ffline::{options::parse_modes, patterns::Patterns};
/// let args: Vec<String> = ["mute", "nologs", "-i", "in.mkv", "out.mkv"]
///   .iter()
///   .map(|s| s.to_string())
///   .collect();
/// let (modes, rest) = parse_modes(&args, &Patterns::new().unwrap().crop_mode).unwrap();
/// assert!(modes.mute && modes.nologs && !modes.passthrough);
/// assert_eq!(rest, ["-i", "in.mkv", "out.mkv"]);
/// ```
pub fn parse_modes(args: &[String], crop_mode: &Regex) -> Result<(Modes, Vec<String>)> {
  let mut modes = Modes::default();
  let mut consumed = 0;
  for arg in args {
    match arg.as_str() {
      "ffmpeg" => modes.passthrough = true,
      "nologs" => modes.nologs = true,
      "cwdlogs" => modes.cwdlogs = true,
      "mute" => modes.mute = true,
      "sync" => modes.sync = true,
      "version" => modes.version = true,
      word => match CropSettings::parse(word, crop_mode) {
        Some(settings) => modes.crop = Some(settings?),
        None => break,
      },
    }
    consumed += 1;
  }
  Ok((modes, args[consumed..].to_vec()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::patterns::Patterns;

  fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_combined_keywords() {
    let pattern = Patterns::new().unwrap().crop_mode;
    let args = strings(&["ffmpeg", "cwdlogs", "crop[8:0.2]", "-i", "a"]);
    let (modes, rest) = parse_modes(&args, &pattern).unwrap();
    assert!(modes.passthrough);
    assert!(modes.cwdlogs);
    assert_eq!(
      modes.crop,
      Some(CropSettings {
        samples: 8,
        limit: 0.2
      })
    );
    assert_eq!(rest, ["-i", "a"]);
  }

  #[test]
  fn test_keywords_only_at_the_front() {
    let pattern = Patterns::new().unwrap().crop_mode;
    let (modes, rest) = parse_modes(&strings(&["-i", "a.mkv", "mute"]), &pattern).unwrap();
    assert_eq!(modes, Modes::default());
    assert_eq!(rest.len(), 3);
  }

  #[test]
  fn test_bad_crop_values() {
    let pattern = Patterns::new().unwrap().crop_mode;
    assert!(parse_modes(&strings(&["crop[2.5:0.1]"]), &pattern).is_err());
  }

  #[test]
  fn test_keywords_without_arguments() {
    let pattern = Patterns::new().unwrap().crop_mode;
    let (modes, rest) = parse_modes(&strings(&["version"]), &pattern).unwrap();
    assert!(modes.version);
    assert!(rest.is_empty());
  }
}
