use crate::error::Result;
use std::{
  env::current_exe,
  path::{Path, PathBuf},
};

/// The encoder binary to run when `--ffmpeg` is not given: an `ffmpeg` next to
/// our own executable if there is one, otherwise plain `ffmpeg` resolved
/// through `PATH` when the command is spawned.
pub fn ffmpeg_path() -> PathBuf {
  let default = Path::new("ffmpeg").to_path_buf();
  match adjacent_path() {
    Ok(path) if path.exists() => path,
    _ => default,
  }
}

/// The (expected) path to an FFmpeg binary in the same directory as the
/// running executable. Windows adds the `.exe` extension.
pub fn adjacent_path() -> Result<PathBuf> {
  let mut path = current_exe()?
    .parent()
    .ok_or("Can't get parent of current_exe")?
    .join("ffmpeg");
  if cfg!(windows) {
    path.set_extension("exe");
  }
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_adjacent_to_test_binary() {
    let path = adjacent_path().unwrap();
    assert_eq!(path.parent(), current_exe().unwrap().parent());
    assert_eq!(path.file_stem().unwrap(), "ffmpeg");
  }

  #[test]
  fn test_falls_back_to_path_lookup() {
    let path = ffmpeg_path();
    assert!(path == Path::new("ffmpeg") || path == adjacent_path().unwrap());
  }
}
