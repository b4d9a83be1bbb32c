//! Shorthand arguments that expand to common option groups.

use std::collections::BTreeMap;

const DEFAULT_PRESETS: &[(&str, &str)] = &[
  ("x264", "-c:v libx264 -preset veryslow -crf 18 -pix_fmt yuv420p"),
  ("x265", "-c:v libx265 -preset slow -crf 20 -pix_fmt yuv420p10le"),
  ("vcopy", "-c:v copy"),
  ("acopy", "-c:a copy"),
  ("scopy", "-c:s copy"),
  ("aac192", "-c:a aac -b:a 192k"),
  ("ac3_640", "-c:a ac3 -b:a 640k"),
  ("flac0", "-c:a flac -compression_level 0"),
  ("nometa", "-map_metadata -1 -map_chapters -1"),
  ("mapall", "-map 0"),
  ("deint", "-vf yadif"),
  ("webopt", "-movflags +faststart"),
  ("downmix2", "-ac 2"),
];

/// An immutable table of presets, built once at startup.
#[derive(Debug, Clone)]
pub struct Presets {
  table: BTreeMap<String, String>,
}

impl Default for Presets {
  fn default() -> Self {
    Self::from_pairs(DEFAULT_PRESETS)
  }
}

impl Presets {
  pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
    let table = pairs
      .iter()
      .map(|(name, expansion)| (name.to_string(), expansion.to_string()))
      .collect();
    Self { table }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.table.get(name).map(String::as_str)
  }

  /// An argument naming a preset becomes the preset's words; anything else
  /// passes through unchanged.
  ///
  /// ```rust
  /// use ffline::presets::Presets;
  /// let presets = Presets::default();
  /// assert_eq!(presets.expand("vcopy"), ["-c:v", "copy"]);
  /// assert_eq!(presets.expand("out.mkv"), ["out.mkv"]);
  /// ```
  pub fn expand(&self, arg: &str) -> Vec<String> {
    match self.get(arg) {
      Some(expansion) => expansion.split_whitespace().map(str::to_string).collect(),
      None => vec![arg.to_string()],
    }
  }

  /// Expand every argument and prepend `-hide_banner`.
  pub fn expand_all(&self, args: &[String]) -> Vec<String> {
    let mut out = vec!["-hide_banner".to_string()];
    for arg in args {
      out.extend(self.expand(arg));
    }
    out
  }

  /// Presets in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .table
      .iter()
      .map(|(name, expansion)| (name.as_str(), expansion.as_str()))
  }

  /// Aligned `name    expansion` lines for the help text.
  pub fn help_table(&self) -> String {
    let width = self.table.keys().map(String::len).max().unwrap_or(0);
    self
      .iter()
      .map(|(name, expansion)| format!("    {:width$}    {}\n", name, expansion, width = width))
      .collect()
  }
}
