//! Appends error transcripts to `<input>.#err` files.

use std::{
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
};

use log::debug;

use crate::{error::Result, terminal::strip_escapes};

const EXTENSION: &str = ".#err";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLocation {
  /// `<input>.#err`, next to the input
  NextToInput,
  /// `<file name>.#err` inside the given directory
  Directory(PathBuf),
  Disabled,
}

#[derive(Debug, Clone)]
pub struct LogWriter {
  location: LogLocation,
}

impl LogWriter {
  pub fn new(location: LogLocation) -> Self {
    Self { location }
  }

  /// Where the log for `input` goes, if anywhere.
  ///
  /// ```rust
  /// use ffline::logfile::{LogLocation, LogWriter};
  /// use std::path::Path;
  ///
  /// let writer = LogWriter::new(LogLocation::NextToInput);
  /// assert_eq!(writer.path_for("dir/a.mkv").unwrap(), Path::new("dir/a.mkv.#err"));
  ///
  /// let writer = LogWriter::new(LogLocation::Directory("logs".into()));
  /// assert_eq!(writer.path_for("dir/a.mkv").unwrap(), Path::new("logs/a.mkv.#err"));
  /// ```
  pub fn path_for(&self, input: &str) -> Option<PathBuf> {
    match &self.location {
      LogLocation::NextToInput => Some(PathBuf::from(format!("{}{}", input, EXTENSION))),
      LogLocation::Directory(dir) => {
        let name = Path::new(input)
          .file_name()
          .map_or_else(|| input.into(), |name| name.to_string_lossy());
        Some(dir.join(format!("{}{}", name, EXTENSION)))
      }
      LogLocation::Disabled => None,
    }
  }

  /// Append the escape-stripped transcript. Nothing is written for an empty
  /// transcript. Returns the path written to.
  pub fn write(&self, input: &str, transcript: &[String]) -> Result<Option<PathBuf>> {
    if transcript.is_empty() {
      return Ok(None);
    }
    let Some(path) = self.path_for(input) else {
      return Ok(None);
    };

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    for line in transcript {
      file.write_all(strip_escapes(line).as_bytes())?;
    }
    debug!("Wrote {} line(s) to {}", transcript.len(), path.display());
    Ok(Some(path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn transcript() -> Vec<String> {
    vec![
      "\x1b[33;1m 10%\x1b[0m time=00:00:10.00\n".to_string(),
      "     \x1b[31;1mconcealing 10 DC\x1b[0m\n".to_string(),
    ]
  }

  #[test]
  fn test_appends_stripped_lines() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.mkv").to_string_lossy().into_owned();
    let writer = LogWriter::new(LogLocation::NextToInput);

    let path = writer.write(&input, &transcript()).unwrap().unwrap();
    writer.write(&input, &transcript()[1..]).unwrap();

    assert_eq!(
      fs::read_to_string(path).unwrap(),
      " 10% time=00:00:10.00\n     concealing 10 DC\n     concealing 10 DC\n"
    );
  }

  #[test]
  fn test_directory_location() {
    let dir = tempfile::tempdir().unwrap();
    let writer = LogWriter::new(LogLocation::Directory(dir.path().to_path_buf()));
    let path = writer
      .write("/somewhere/else/b.mkv", &transcript())
      .unwrap()
      .unwrap();
    assert_eq!(path, dir.path().join("b.mkv.#err"));
    assert!(path.exists());
  }

  #[test]
  fn test_nothing_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("c.mkv").to_string_lossy().into_owned();

    let writer = LogWriter::new(LogLocation::NextToInput);
    assert_eq!(writer.write(&input, &[]).unwrap(), None);

    let writer = LogWriter::new(LogLocation::Disabled);
    assert_eq!(writer.write(&input, &transcript()).unwrap(), None);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
  }
}
